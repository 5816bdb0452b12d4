//! Task, account and extraction-draft records.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// A persisted task owned by one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    /// Free text; may carry lightweight markup from the dashboard editor.
    pub body: String,
    /// Absolute reminder time. `None` means no reminder is scheduled.
    pub reminder: Option<DateTime<Utc>>,
    pub reminder_sent: bool,
    pub tags: Vec<String>,
    pub is_completed: bool,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Where a task sits in the reminder lifecycle relative to a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderState {
    /// No reminder is scheduled; never scanned.
    Unscheduled,
    /// Reminder scheduled for another day and not yet sent.
    Pending,
    /// Reminder falls on the current calendar day and has not been sent.
    DueToday,
    /// Reminder already dispatched. Terminal.
    Notified,
}

impl Task {
    /// Reminder lifecycle state as seen on `now`'s calendar day.
    ///
    /// Day comparison happens in `now`'s offset; time-of-day is ignored.
    #[must_use]
    pub fn reminder_state(&self, now: DateTime<FixedOffset>) -> ReminderState {
        if self.reminder_sent {
            return ReminderState::Notified;
        }
        let Some(reminder) = self.reminder else {
            return ReminderState::Unscheduled;
        };
        if reminder.with_timezone(now.offset()).date_naive() == now.date_naive() {
            ReminderState::DueToday
        } else {
            ReminderState::Pending
        }
    }

    /// Whether a scan running at `now` should remind about this task.
    #[must_use]
    pub fn is_due_today(&self, now: DateTime<FixedOffset>) -> bool {
        self.reminder_state(now) == ReminderState::DueToday
    }
}

/// Fields required to create a task. Ids and timestamps are store-assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub body: String,
    pub reminder: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub is_completed: bool,
    pub owner_id: String,
}

/// Partial update applied by the dashboard's edit form.
///
/// Changing `reminder` re-arms the reminder (`reminder_sent` goes back to
/// `false`); no other field touches `reminder_sent`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub body: Option<String>,
    pub reminder: Option<Option<DateTime<Utc>>>,
    pub tags: Option<Vec<String>>,
    pub is_completed: Option<bool>,
}

/// An account as seen by the pipeline. Credentials live elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub country_code: Option<String>,
}

impl Account {
    /// Messaging address `+<country code><phone>`, or `None` without a phone.
    ///
    /// Falls back to `default_country_code` when the account has none.
    #[must_use]
    pub fn messaging_address(&self, default_country_code: &str) -> Option<String> {
        let phone = self.phone.as_deref().map(str::trim).filter(|p| !p.is_empty())?;
        let code = self
            .country_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(default_country_code);
        let code = code.trim_start_matches('+');
        Some(format!("+{code}{phone}"))
    }

    /// Email address when present and non-blank.
    #[must_use]
    pub fn email_address(&self) -> Option<&str> {
        self.email.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }
}

/// Structured output of the language-understanding call.
///
/// Field names follow the wire schema sent to the model. Unknown fields are
/// rejected so a drifting response fails extraction instead of being guessed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskDraft {
    pub title: String,
    pub body: String,
    pub reminder: Option<String>,
    pub tags: Option<Vec<String>>,
    #[serde(rename = "isCompleted", default)]
    pub is_completed: Option<bool>,
}
