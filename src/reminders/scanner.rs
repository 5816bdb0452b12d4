//! One reminder scan: load pending, filter to today, claim, notify.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};
use futures_util::future::join_all;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::model::Task;
use crate::notify::{NotificationDispatcher, ReminderReport};
use crate::store::{AccountStore, StoreError, TaskStore};

/// Scan-level failures. Per-task failures never surface here.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Another scan in this process has not finished.
    #[error("a reminder scan is already running")]
    InProgress,

    /// Loading pending tasks failed.
    #[error("failed to load pending tasks: {0}")]
    Store(#[from] StoreError),
}

/// What happened to one due task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TaskOutcome {
    /// Claimed and handed to the dispatcher.
    Reminded { report: ReminderReport },
    /// Another scan claimed it first.
    AlreadyClaimed,
    /// The claim update itself failed; the task stays pending.
    ClaimFailed { error: String },
    /// The owner lookup failed after the claim.
    OwnerLookupFailed { error: String },
    /// The owner account no longer exists.
    OwnerMissing,
    /// The owner has no phone on file.
    NoPhone,
    /// Dispatch did not finish within the per-task bound. The task stays
    /// claimed.
    DispatchTimedOut { after_ms: u64 },
}

/// Upper bound on one task's dispatch (message and email legs together).
pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskScanRecord {
    pub task_id: String,
    #[serde(flatten)]
    pub outcome: TaskOutcome,
}

/// Result of [`ReminderScanner::scan`].
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    /// Every task that was pending when the scan started, as loaded.
    pub pending: Vec<Task>,
    /// One record per due-today task.
    pub outcomes: Vec<TaskScanRecord>,
}

impl ScanReport {
    /// Number of tasks whose reminder was handed to the dispatcher.
    #[must_use]
    pub fn reminded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|r| matches!(r.outcome, TaskOutcome::Reminded { .. }))
            .count()
    }
}

/// Finds due-today tasks and reminds their owners, at most once per task.
#[derive(Clone)]
pub struct ReminderScanner {
    tasks: Arc<dyn TaskStore>,
    accounts: Arc<dyn AccountStore>,
    dispatcher: NotificationDispatcher,
    default_country_code: String,
    dispatch_timeout: Duration,
    guard: Arc<Mutex<()>>,
}

impl ReminderScanner {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        accounts: Arc<dyn AccountStore>,
        dispatcher: NotificationDispatcher,
        default_country_code: impl Into<String>,
    ) -> Self {
        Self {
            tasks,
            accounts,
            dispatcher,
            default_country_code: default_country_code.into(),
            dispatch_timeout: DEFAULT_DISPATCH_TIMEOUT,
            guard: Arc::new(Mutex::new(())),
        }
    }

    /// Bound each task's dispatch so a stalled transport cannot hold the
    /// scan guard.
    #[must_use]
    pub fn with_dispatch_timeout(mut self, timeout: Duration) -> Self {
        self.dispatch_timeout = timeout;
        self
    }

    /// Run one scan as of `now`. "Today" is `now`'s calendar date in its own
    /// offset.
    ///
    /// # Errors
    ///
    /// [`ScanError::InProgress`] when a scan is already running in this
    /// process, [`ScanError::Store`] when pending tasks cannot be loaded.
    pub async fn scan(&self, now: DateTime<FixedOffset>) -> Result<ScanReport, ScanError> {
        let Ok(_running) = self.guard.try_lock() else {
            warn!("reminder scan skipped; previous scan still running");
            return Err(ScanError::InProgress);
        };

        let pending = self.tasks.pending_tasks()?;
        let due: Vec<&Task> = pending.iter().filter(|t| t.is_due_today(now)).collect();
        debug!(pending = pending.len(), due = due.len(), "reminder scan loaded tasks");

        let now_utc = now.with_timezone(&Utc);
        let outcomes = join_all(due.into_iter().map(|task| async move {
            TaskScanRecord {
                task_id: task.id.clone(),
                outcome: self.process(task, now_utc).await,
            }
        }))
        .await;

        let report = ScanReport { pending, outcomes };
        info!(
            pending = report.pending.len(),
            due = report.outcomes.len(),
            reminded = report.reminded(),
            "reminder scan finished"
        );
        Ok(report)
    }

    async fn process(&self, task: &Task, now: DateTime<Utc>) -> TaskOutcome {
        match self.tasks.claim_reminder(&task.id, now) {
            Ok(true) => {}
            Ok(false) => {
                debug!(task_id = %task.id, "reminder already claimed");
                return TaskOutcome::AlreadyClaimed;
            }
            Err(e) => {
                error!(task_id = %task.id, "failed to claim reminder: {e}");
                return TaskOutcome::ClaimFailed {
                    error: e.to_string(),
                };
            }
        }

        let owner = match self.accounts.get_account(&task.owner_id) {
            Ok(Some(owner)) => owner,
            Ok(None) => {
                warn!(task_id = %task.id, owner_id = %task.owner_id, "reminder owner not found");
                return TaskOutcome::OwnerMissing;
            }
            Err(e) => {
                error!(task_id = %task.id, owner_id = %task.owner_id, "owner lookup failed: {e}");
                return TaskOutcome::OwnerLookupFailed {
                    error: e.to_string(),
                };
            }
        };

        if owner.messaging_address(&self.default_country_code).is_none() {
            warn!(task_id = %task.id, owner_id = %owner.id, "reminder owner has no phone");
            return TaskOutcome::NoPhone;
        }

        match tokio::time::timeout(self.dispatch_timeout, self.dispatcher.remind(task, &owner)).await
        {
            Ok(report) => TaskOutcome::Reminded { report },
            Err(_) => {
                let after_ms = u64::try_from(self.dispatch_timeout.as_millis()).unwrap_or(u64::MAX);
                error!(task_id = %task.id, after_ms, "reminder dispatch timed out");
                TaskOutcome::DispatchTimedOut { after_ms }
            }
        }
    }
}
