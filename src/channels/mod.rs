//! Messaging channel adapters and the webhook gateway.
//!
//! Channel-specific adapters are pluggable behind
//! [`MessageSender`](traits::MessageSender); the gateway owns the HTTP
//! routes and hands inbound messages to the pipeline.

pub mod gateway;
pub mod traits;
pub mod whatsapp;

pub use gateway::{router, run_gateway, serve};
pub use traits::{ChannelInboundMessage, ChannelOutboundMessage, MessageSender};
pub use whatsapp::{TwilioInboundForm, WhatsAppAdapter};
