//! Draft → persisted task.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use tracing::info;

use crate::error::{Result, TaskError};
use crate::extractor::resolve_reminder;
use crate::model::{Account, NewTask, Task, TaskDraft};
use crate::store::TaskStore;

/// Validates extraction drafts and persists them for their owner.
#[derive(Clone)]
pub struct TaskAssembler {
    tasks: Arc<dyn TaskStore>,
}

impl TaskAssembler {
    pub fn new(tasks: Arc<dyn TaskStore>) -> Self {
        Self { tasks }
    }

    /// Validate `draft` and create the task owned by `owner`.
    ///
    /// # Errors
    ///
    /// [`TaskError::ValidationFailed`] when title or body is blank,
    /// [`TaskError::ExtractionFailed`] when the reminder is not a timestamp,
    /// and [`TaskError::PersistenceFailed`] when the store rejects the insert.
    pub fn assemble(
        &self,
        draft: TaskDraft,
        owner: &Account,
        now: DateTime<FixedOffset>,
    ) -> Result<Task> {
        let new_task = prepare(draft, owner, now)?;
        let task = self.tasks.create_task(new_task, now.with_timezone(&Utc))?;
        info!(task_id = %task.id, owner_id = %task.owner_id, "task created");
        Ok(task)
    }
}

/// Apply validation and defaults without touching the store.
pub fn prepare(draft: TaskDraft, owner: &Account, now: DateTime<FixedOffset>) -> Result<NewTask> {
    let title = draft.title.trim();
    let body = draft.body.trim();

    let missing: Vec<&str> = [("title", title), ("body", body)]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect();
    if !missing.is_empty() {
        return Err(TaskError::ValidationFailed(missing.join(", ")));
    }

    let reminder = match draft.reminder.as_deref() {
        Some(raw) => Some(resolve_reminder(raw, now)?.with_timezone(&Utc)),
        None => None,
    };

    Ok(NewTask {
        title: title.to_owned(),
        body: body.to_owned(),
        reminder,
        tags: draft.tags.unwrap_or_default(),
        is_completed: draft.is_completed.unwrap_or(false),
        owner_id: owner.id.clone(),
    })
}
