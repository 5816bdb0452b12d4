//! Taskmate: turn chat messages into tasks and remind owners on the day.
//!
//! Two flows share one store and one set of transports:
//!
//! - **Inbound**: webhook → identity resolution → structured extraction →
//!   task assembly → acknowledgement on the originating channel
//!   ([`inbound::InboundPipeline`]).
//! - **Reminders**: a scan (cron-triggered or periodic) selects tasks due
//!   today, claims each exactly once and notifies the owner by message and
//!   email ([`reminders::ReminderScanner`]).
//!
//! External services sit behind traits so tests run without the network:
//! [`extractor::LanguageModel`], [`channels::MessageSender`],
//! [`notify::EmailSender`] and the [`store`] traits.

pub mod app;
pub mod assembler;
pub mod channels;
pub mod clock;
pub mod config;
pub mod error;
pub mod extractor;
pub mod identity;
pub mod inbound;
pub mod model;
pub mod notify;
pub mod reminders;
pub mod store;

pub use app::AppState;
pub use config::AppConfig;
pub use error::{Result, TaskError};
pub use inbound::{InboundOutcome, InboundPipeline};
pub use model::{Account, Task, TaskDraft};
pub use reminders::{ReminderJob, ReminderScanner};
