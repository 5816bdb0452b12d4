//! Day-of reminder dispatch.
//!
//! [`ReminderScanner`] performs one scan; [`ReminderJob`] repeats it on an
//! interval for deployments without an external cron trigger.

pub mod job;
pub mod scanner;

pub use job::ReminderJob;
pub use scanner::{ReminderScanner, ScanError, ScanReport, TaskOutcome, TaskScanRecord};
