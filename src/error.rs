//! Error types for the taskmate pipeline.
//!
//! [`TaskError`] is the user-visible taxonomy: every inbound message ends in
//! either a created task or exactly one of these variants. The per-layer
//! errors ([`StoreError`](crate::store::StoreError),
//! [`ExtractionError`](crate::extractor::ExtractionError),
//! [`DispatchError`](crate::notify::DispatchError)) convert into it.

use crate::extractor::ExtractionError;
use crate::notify::DispatchError;
use crate::store::StoreError;

/// Top-level error type for inbound processing and reminder dispatch.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The sender address does not belong to any account.
    #[error("sender {0} is not registered")]
    NotRegistered(String),

    /// The language-understanding call failed or returned an invalid shape.
    #[error("extraction failed: {0}")]
    ExtractionFailed(#[from] ExtractionError),

    /// The draft lacked a title or body after trimming.
    #[error("missing required fields: {0}")]
    ValidationFailed(String),

    /// The store rejected a create or update.
    #[error("task creation failed: {0}")]
    PersistenceFailed(#[from] StoreError),

    /// A channel or email send failed.
    #[error("dispatch failed: {0}")]
    DispatchFailed(#[from] DispatchError),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TaskError {
    /// Text sent back through the originating channel for this outcome.
    ///
    /// `registration_url` is appended to the not-registered hint.
    #[must_use]
    pub fn user_message(&self, registration_url: &str) -> String {
        match self {
            Self::NotRegistered(_) => format!(
                "Please register yourself (or add your WhatsApp number) in the application to create tasks. {registration_url}"
            ),
            Self::ExtractionFailed(_) => "Sorry, I couldn't understand the task details. Please provide title and body to start creating your tasks.".to_owned(),
            Self::ValidationFailed(_) => {
                "Missing information. Please provide title and body to start creating your tasks."
                    .to_owned()
            }
            Self::PersistenceFailed(_) => {
                "Failed to create task. Please try again later.".to_owned()
            }
            Self::DispatchFailed(_) | Self::Config(_) | Self::Io(_) => {
                "Something went wrong on our side. Please try again later.".to_owned()
            }
        }
    }

    /// Stable snake_case code used in HTTP responses and log fields.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotRegistered(_) => "not_registered",
            Self::ExtractionFailed(_) => "extraction_failed",
            Self::ValidationFailed(_) => "validation_failed",
            Self::PersistenceFailed(_) => "persistence_failed",
            Self::DispatchFailed(_) => "dispatch_failed",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
        }
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, TaskError>;
