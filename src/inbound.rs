//! Inbound message → task pipeline.
//!
//! resolve sender → extract draft → assemble task → acknowledge. Every
//! business outcome ends in exactly one message back to the sender; a failed
//! acknowledgement is logged and never changes the outcome.

use chrono::{DateTime, FixedOffset};
use tracing::{info, warn};

use crate::assembler::TaskAssembler;
use crate::error::TaskError;
use crate::extractor::StructuredExtractor;
use crate::identity::{IdentityResolver, mask_address};
use crate::model::Task;
use crate::notify::NotificationDispatcher;

/// Text sent after a task is created.
pub const SUCCESS_MESSAGE: &str = "Task created successfully.";

/// Result of handling one inbound message.
#[derive(Debug)]
pub enum InboundOutcome {
    Created(Task),
    Rejected(TaskError),
}

impl InboundOutcome {
    /// Text sent back to the sender for this outcome.
    #[must_use]
    pub fn reply(&self, registration_url: &str) -> String {
        match self {
            Self::Created(_) => SUCCESS_MESSAGE.to_owned(),
            Self::Rejected(err) => err.user_message(registration_url),
        }
    }
}

/// Wires the inbound stages together.
#[derive(Clone)]
pub struct InboundPipeline {
    identity: IdentityResolver,
    extractor: StructuredExtractor,
    assembler: TaskAssembler,
    dispatcher: NotificationDispatcher,
    registration_url: String,
}

impl InboundPipeline {
    pub fn new(
        identity: IdentityResolver,
        extractor: StructuredExtractor,
        assembler: TaskAssembler,
        dispatcher: NotificationDispatcher,
        registration_url: impl Into<String>,
    ) -> Self {
        Self {
            identity,
            extractor,
            assembler,
            dispatcher,
            registration_url: registration_url.into(),
        }
    }

    /// Handle one message from `sender` received at `now`.
    pub async fn handle(&self, sender: &str, text: &str, now: DateTime<FixedOffset>) -> InboundOutcome {
        let outcome = match self.process(sender, text, now).await {
            Ok(task) => InboundOutcome::Created(task),
            Err(err) => {
                warn!(
                    sender = %mask_address(sender),
                    code = err.code(),
                    "inbound message rejected: {err}"
                );
                InboundOutcome::Rejected(err)
            }
        };

        let reply = outcome.reply(&self.registration_url);
        if let Err(e) = self.dispatcher.notify(sender, &reply).await {
            warn!(sender = %mask_address(sender), "acknowledgement failed: {e}");
        }
        outcome
    }

    async fn process(
        &self,
        sender: &str,
        text: &str,
        now: DateTime<FixedOffset>,
    ) -> Result<Task, TaskError> {
        let owner = self.identity.resolve(sender)?;
        let draft = self.extractor.extract(text, now).await?;
        let task = self.assembler.assemble(draft, &owner, now)?;
        info!(task_id = %task.id, sender = %mask_address(sender), "task created from message");
        Ok(task)
    }
}
