use crate::channels::traits::{ChannelInboundMessage, ChannelOutboundMessage, MessageSender};
use crate::config::TwilioConfig;
use crate::identity::mask_address;
use crate::notify::DispatchError;
use async_trait::async_trait;
use std::time::Duration;

const CHANNEL: &str = "whatsapp";
const ADDRESS_PREFIX: &str = "whatsapp:";

/// Twilio form fields posted to the inbound webhook.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct TwilioInboundForm {
    #[serde(rename = "Body", default)]
    pub body: Option<String>,
    #[serde(rename = "From", default)]
    pub from: Option<String>,
}

impl TwilioInboundForm {
    /// Convert to a channel-agnostic inbound message.
    ///
    /// Returns `None` when `From` is missing or blank. A missing `Body` is
    /// kept as empty text so the pipeline can answer it.
    #[must_use]
    pub fn into_inbound(self) -> Option<ChannelInboundMessage> {
        let sender = self.from.as_deref().map(str::trim).unwrap_or_default();
        if sender.is_empty() {
            return None;
        }
        Some(ChannelInboundMessage {
            channel: CHANNEL.to_owned(),
            sender: sender.to_owned(),
            text: self.body.as_deref().unwrap_or_default().trim().to_owned(),
        })
    }
}

/// WhatsApp over the Twilio Messages API.
///
/// Inbound messages are webhook-driven (form posts handled by the gateway);
/// this adapter only sends.
#[derive(Clone)]
pub struct WhatsAppAdapter {
    api_base: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for WhatsAppAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhatsAppAdapter")
            .field("api_base", &self.api_base)
            .field("from_number", &mask_address(&self.from_number))
            .finish()
    }
}

/// Prefix `address` with `whatsapp:` unless it already carries it.
#[must_use]
pub fn whatsapp_address(address: &str) -> String {
    let address = address.trim();
    if address.starts_with(ADDRESS_PREFIX) {
        address.to_owned()
    } else {
        format!("{ADDRESS_PREFIX}{address}")
    }
}

impl WhatsAppAdapter {
    pub fn new(config: &TwilioConfig) -> Self {
        Self {
            api_base: config.api_base.trim_end_matches('/').to_owned(),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from_number: config.from_number.clone(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs.max(1)))
                .build()
                .unwrap_or_default(),
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, self.account_sid
        )
    }

    fn form_fields(&self, message: &ChannelOutboundMessage) -> [(&'static str, String); 3] {
        [
            ("From", whatsapp_address(&self.from_number)),
            ("To", whatsapp_address(&message.to)),
            ("Body", message.text.clone()),
        ]
    }
}

#[async_trait]
impl MessageSender for WhatsAppAdapter {
    fn id(&self) -> &'static str {
        CHANNEL
    }

    async fn send(&self, message: ChannelOutboundMessage) -> Result<(), DispatchError> {
        if self.account_sid.trim().is_empty() || self.auth_token.trim().is_empty() {
            return Err(DispatchError::NotConfigured {
                channel: CHANNEL,
                reason: "twilio account sid or auth token is empty".to_owned(),
            });
        }
        if self.from_number.trim().is_empty() {
            return Err(DispatchError::NotConfigured {
                channel: CHANNEL,
                reason: "twilio from_number is empty".to_owned(),
            });
        }

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&self.form_fields(&message))
            .send()
            .await
            .map_err(|e| DispatchError::Request {
                channel: CHANNEL,
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Rejected {
                channel: CHANNEL,
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
