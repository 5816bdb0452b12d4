//! Task and account persistence.
//!
//! The pipeline talks to storage only through [`TaskStore`] and
//! [`AccountStore`]. [`SqliteStore`] is the bundled implementation; any
//! find/update/create key-value store keyed by id can stand in for it.

mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::model::{Account, NewTask, Task, TaskPatch};
use chrono::{DateTime, Utc};

/// Errors raised by a store implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// SQLite driver error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The store cannot serve requests (lock poisoned, backend down).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Filesystem error while opening the database.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Task persistence.
pub trait TaskStore: Send + Sync {
    /// Insert a new task, assigning id and timestamps. `reminder_sent` starts
    /// `false`.
    fn create_task(&self, task: NewTask, now: DateTime<Utc>) -> StoreResult<Task>;

    fn get_task(&self, id: &str) -> StoreResult<Option<Task>>;

    /// All tasks for one owner, newest first.
    fn list_tasks_for_owner(&self, owner_id: &str) -> StoreResult<Vec<Task>>;

    /// Apply a partial update. Returns `None` when the task does not exist.
    fn update_task(&self, id: &str, patch: TaskPatch, now: DateTime<Utc>)
    -> StoreResult<Option<Task>>;

    /// Returns `true` when a task was deleted.
    fn delete_task(&self, id: &str) -> StoreResult<bool>;

    /// Every task whose reminder has not been sent (including tasks without a
    /// reminder; callers filter).
    fn pending_tasks(&self) -> StoreResult<Vec<Task>>;

    /// Atomically flip `reminder_sent` from `false` to `true`.
    ///
    /// Returns `true` only for the caller that performed the transition.
    fn claim_reminder(&self, id: &str, now: DateTime<Utc>) -> StoreResult<bool>;
}

/// Account lookups. The pipeline never creates or deletes accounts.
pub trait AccountStore: Send + Sync {
    fn get_account(&self, id: &str) -> StoreResult<Option<Account>>;

    /// Find the account whose `country_code + phone` (or bare `phone`) equals
    /// `digits`, a sender number reduced to ASCII digits.
    ///
    /// Accounts without a country code are matched with
    /// `default_country_code`.
    fn find_account_by_phone(
        &self,
        digits: &str,
        default_country_code: &str,
    ) -> StoreResult<Option<Account>>;

    /// Seed an account (deployment bootstrap and tests).
    fn insert_account(&self, account: &Account) -> StoreResult<()>;
}

/// A store serving both tasks and accounts.
pub trait Store: TaskStore + AccountStore {}

impl<T: TaskStore + AccountStore> Store for T {}
