//! Free-text message → [`TaskDraft`] extraction.
//!
//! The extractor builds a prompt anchored to an injected `now`, asks a
//! [`LanguageModel`] for schema-constrained JSON, and validates the reply at
//! the boundary (see [`parse`]). A bounded timeout wraps the model call.

pub mod openai;
pub mod parse;
pub mod prompt;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use tracing::{debug, warn};

use crate::model::TaskDraft;

pub use openai::OpenAiLanguageModel;
pub use parse::{mentions_time_of_day, resolve_reminder};
pub use prompt::draft_schema;

/// Default bound on a single extraction call.
pub const DEFAULT_EXTRACTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from the language-understanding boundary.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// Nothing to extract from.
    #[error("message is empty")]
    EmptyMessage,

    /// Transport failure talking to the model endpoint.
    #[error("model request failed: {0}")]
    Request(String),

    /// The model did not answer within the configured bound (seconds).
    #[error("model call timed out after {0}s")]
    Timeout(u64),

    /// Non-success HTTP status from the model endpoint.
    #[error("model endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The model answered with no content.
    #[error("model returned an empty response")]
    EmptyResponse,

    /// The model refused to answer.
    #[error("model refused: {0}")]
    Refused(String),

    /// The content was not JSON.
    #[error("model returned invalid JSON: {0}")]
    InvalidJson(String),

    /// JSON that does not match the draft schema.
    #[error("model output does not match schema: {0}")]
    SchemaViolation(String),

    /// A reminder string that is not a recognisable timestamp.
    #[error("unrecognised reminder value: {0}")]
    InvalidReminder(String),
}

/// A schema-constrained completion request.
#[derive(Debug, Clone)]
pub struct StructuredRequest {
    pub system: String,
    pub user: String,
    pub schema_name: String,
    pub schema: serde_json::Value,
}

/// A language model able to answer with JSON conforming to a schema.
///
/// Implementations return the raw content string; validation happens in the
/// extractor so every backend is held to the same rules.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete_json(&self, request: &StructuredRequest) -> Result<String, ExtractionError>;
}

/// Turns inbound message text into a validated [`TaskDraft`].
#[derive(Clone)]
pub struct StructuredExtractor {
    model: Arc<dyn LanguageModel>,
    timeout: Duration,
}

impl StructuredExtractor {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            timeout: DEFAULT_EXTRACTION_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Extract a draft from `message`, resolving relative dates against `now`.
    ///
    /// # Errors
    ///
    /// [`ExtractionError::EmptyMessage`] for blank input (the model is not
    /// called), [`ExtractionError::Timeout`] when the bound elapses, and any
    /// transport or validation error otherwise.
    pub async fn extract(
        &self,
        message: &str,
        now: DateTime<FixedOffset>,
    ) -> Result<TaskDraft, ExtractionError> {
        if message.trim().is_empty() {
            return Err(ExtractionError::EmptyMessage);
        }

        let (system, user) = prompt::build_extraction_prompt(message, now);
        let request = StructuredRequest {
            system,
            user,
            schema_name: prompt::SCHEMA_NAME.to_owned(),
            schema: prompt::draft_schema(),
        };

        let raw = match tokio::time::timeout(self.timeout, self.model.complete_json(&request)).await
        {
            Ok(result) => result?,
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "extraction timed out");
                return Err(ExtractionError::Timeout(self.timeout.as_secs()));
            }
        };

        let draft = parse::parse_draft(&raw, message, now)?;
        debug!(
            title = %draft.title,
            has_reminder = draft.reminder.is_some(),
            "extracted task draft"
        );
        Ok(draft)
    }
}
