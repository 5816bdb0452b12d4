use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

use super::{DispatchError, EmailMessage, EmailSender};
use crate::config::EmailConfig;

const CHANNEL: &str = "email";

/// Resend transactional email API client.
#[derive(Clone)]
pub struct ResendEmailSender {
    api_base: String,
    api_key: String,
    from: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for ResendEmailSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResendEmailSender")
            .field("api_base", &self.api_base)
            .field("from", &self.from)
            .finish()
    }
}

impl ResendEmailSender {
    pub fn new(config: &EmailConfig) -> Self {
        Self {
            api_base: config.api_base.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
            from: config.from.clone(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs.max(1)))
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl EmailSender for ResendEmailSender {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), DispatchError> {
        if self.api_key.trim().is_empty() {
            return Err(DispatchError::NotConfigured {
                channel: CHANNEL,
                reason: "resend api key is empty".to_owned(),
            });
        }

        let url = format!("{}/emails", self.api_base);
        let body = serde_json::json!({
            "from": self.from,
            "to": email.to,
            "subject": email.subject,
            "text": email.text,
            "html": email.html,
        });
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
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

        info!(subject = %email.subject, "email sent");
        Ok(())
    }
}
