use async_trait::async_trait;

use crate::notify::DispatchError;

/// Inbound message received from a messaging channel webhook.
#[derive(Debug, Clone)]
pub struct ChannelInboundMessage {
    pub channel: String,
    /// Channel-native sender address, e.g. `whatsapp:+919999999999`.
    pub sender: String,
    pub text: String,
}

/// Outbound message to one channel address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOutboundMessage {
    /// `+<country code><number>`, optionally channel-prefixed.
    pub to: String,
    pub text: String,
}

/// Outbound messaging contract. New channels only need to implement this trait.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Stable channel identifier (e.g. `whatsapp`).
    fn id(&self) -> &'static str;

    /// Deliver one message. Failures are returned, never swallowed.
    async fn send(&self, message: ChannelOutboundMessage) -> Result<(), DispatchError>;
}
