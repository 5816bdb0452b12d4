//! Outbound notifications: acknowledgements and day-of reminders.
//!
//! [`NotificationDispatcher`] owns the message texts and the fan-out rules;
//! transports sit behind [`MessageSender`] and [`EmailSender`].

pub mod email_template;
pub mod resend;

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

use crate::channels::traits::{ChannelOutboundMessage, MessageSender};
use crate::identity::mask_address;
use crate::model::{Account, Task};

pub use resend::ResendEmailSender;

/// Errors from a message or email transport.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The transport is missing credentials or a sender address.
    #[error("{channel} is not configured: {reason}")]
    NotConfigured {
        channel: &'static str,
        reason: String,
    },

    /// Transport failure before a response was received.
    #[error("{channel} request failed: {reason}")]
    Request {
        channel: &'static str,
        reason: String,
    },

    /// The provider answered with a non-success status.
    #[error("{channel} send failed (HTTP {status}): {body}")]
    Rejected {
        channel: &'static str,
        status: u16,
        body: String,
    },
}

/// One email to one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Outbound email contract.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), DispatchError>;
}

/// Result of one channel leg of a reminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ChannelOutcome {
    Sent,
    /// Not attempted (no address, or channel disabled).
    Skipped(String),
    Failed(String),
}

impl ChannelOutcome {
    #[must_use]
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }

    fn from_result(result: Result<(), DispatchError>) -> Self {
        match result {
            Ok(()) => Self::Sent,
            Err(e) => Self::Failed(e.to_string()),
        }
    }
}

/// Per-channel outcome of [`NotificationDispatcher::remind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReminderReport {
    pub message: ChannelOutcome,
    pub email: ChannelOutcome,
}

static NON_WORD: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_\s-]").ok());
static WHITESPACE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\s+").ok());

/// URL slug of a task title: lowercase, trimmed, non-word characters
/// removed, whitespace runs collapsed to `-`.
#[must_use]
pub fn url_slug(title: &str) -> String {
    let lowered = title.to_lowercase();
    let trimmed = lowered.trim();
    let stripped = match NON_WORD.as_ref() {
        Some(re) => re.replace_all(trimmed, "").into_owned(),
        None => trimmed.to_owned(),
    };
    match WHITESPACE.as_ref() {
        Some(re) => re.replace_all(&stripped, "-").into_owned(),
        None => stripped,
    }
}

/// Dashboard deep link for a task.
#[must_use]
pub fn task_link(dashboard_url: &str, task: &Task) -> String {
    format!(
        "{}/{}/{}",
        dashboard_url.trim_end_matches('/'),
        url_slug(&task.title),
        task.id
    )
}

/// Channel text of a reminder.
#[must_use]
pub fn reminder_text(task: &Task, link: &str) -> String {
    format!(
        "*Reminder*:\nYour task *{}* is due today.\nYou can access it on {link}",
        task.title
    )
}

/// Email of a reminder: subject, plain text and branded HTML.
#[must_use]
pub fn reminder_email(task: &Task, to: &str, link: &str, dashboard_url: &str) -> EmailMessage {
    let subject = format!("{} - Reminder", task.title);
    let text = format!(
        "Your task {} is due today.\nYou can access it on {link}",
        task.title.to_uppercase()
    );
    let html = email_template::render_email_html(&subject, &text, dashboard_url);
    EmailMessage {
        to: to.to_owned(),
        subject,
        text,
        html,
    }
}

/// Sends acknowledgements and reminders.
#[derive(Clone)]
pub struct NotificationDispatcher {
    messaging: Arc<dyn MessageSender>,
    email: Option<Arc<dyn EmailSender>>,
    dashboard_url: String,
    default_country_code: String,
}

impl NotificationDispatcher {
    pub fn new(
        messaging: Arc<dyn MessageSender>,
        email: Option<Arc<dyn EmailSender>>,
        dashboard_url: impl Into<String>,
        default_country_code: impl Into<String>,
    ) -> Self {
        Self {
            messaging,
            email,
            dashboard_url: dashboard_url.into(),
            default_country_code: default_country_code.into(),
        }
    }

    /// Send `text` to `address` on the messaging channel.
    ///
    /// # Errors
    ///
    /// Returns the transport's [`DispatchError`] unchanged.
    pub async fn notify(&self, address: &str, text: &str) -> Result<(), DispatchError> {
        self.messaging
            .send(ChannelOutboundMessage {
                to: address.to_owned(),
                text: text.to_owned(),
            })
            .await?;
        info!(
            channel = self.messaging.id(),
            to = %mask_address(address),
            "notification sent"
        );
        Ok(())
    }

    /// Remind `owner` about `task` by message and, when they have an email
    /// address, by email. Both legs run concurrently and both are attempted.
    pub async fn remind(&self, task: &Task, owner: &Account) -> ReminderReport {
        let link = task_link(&self.dashboard_url, task);

        let message_leg = async {
            let Some(address) = owner.messaging_address(&self.default_country_code) else {
                return ChannelOutcome::Skipped("owner has no phone".to_owned());
            };
            ChannelOutcome::from_result(self.notify(&address, &reminder_text(task, &link)).await)
        };

        let email_leg = async {
            let Some(sender) = self.email.as_ref() else {
                return ChannelOutcome::Skipped("email disabled".to_owned());
            };
            let Some(to) = owner.email_address() else {
                return ChannelOutcome::Skipped("owner has no email".to_owned());
            };
            let email = reminder_email(task, to, &link, &self.dashboard_url);
            ChannelOutcome::from_result(sender.send_email(&email).await)
        };

        let (message, email) = tokio::join!(message_leg, email_leg);

        if let ChannelOutcome::Failed(reason) = &message {
            warn!(task_id = %task.id, %reason, "reminder message failed");
        }
        if let ChannelOutcome::Failed(reason) = &email {
            warn!(task_id = %task.id, %reason, "reminder email failed");
        }

        ReminderReport { message, email }
    }
}
