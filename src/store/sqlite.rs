//! SQLite-backed task and account store.
//!
//! A single database file holds both tables. Thread-safe via an internal
//! `Mutex<Connection>`; every operation holds the lock for its whole
//! read-modify-write, which is what makes [`TaskStore::claim_reminder`] and
//! [`TaskStore::update_task`] atomic.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::schema::{apply_schema, read_schema_version};
use super::{AccountStore, StoreError, StoreResult, TaskStore};
use crate::model::{Account, NewTask, Task, TaskPatch};

const TASK_COLUMNS: &str = "id, title, body, reminder, reminder_sent, tags, is_completed, \
                            owner_id, created_at, updated_at";

const ACCOUNT_COLUMNS: &str = "id, name, email, phone, country_code";

/// SQLite task/account store.
pub struct SqliteStore {
    path: Option<PathBuf>,
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database file at `path`, creating parent
    /// directories and applying the schema.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        apply_schema(&conn)?;
        Ok(Self {
            path: Some(path.to_path_buf()),
            conn: Mutex::new(conn),
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self {
            path: None,
            conn: Mutex::new(conn),
        })
    }

    /// Database file path, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn schema_version(&self) -> StoreResult<Option<u32>> {
        let conn = self.lock()?;
        Ok(read_schema_version(&conn)?)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_owned()))
    }
}

impl TaskStore for SqliteStore {
    fn create_task(&self, task: NewTask, now: DateTime<Utc>) -> StoreResult<Task> {
        let record = Task {
            id: uuid::Uuid::new_v4().to_string(),
            title: task.title,
            body: task.body,
            reminder: task.reminder,
            reminder_sent: false,
            tags: task.tags,
            is_completed: task.is_completed,
            owner_id: task.owner_id,
            created_at: now,
            updated_at: now,
        };
        let conn = self.lock()?;
        conn.execute(
            &format!(
                "INSERT INTO tasks ({TASK_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
            ),
            params![
                record.id,
                record.title,
                record.body,
                record.reminder.map(format_ts),
                record.reminder_sent,
                encode_tags(&record.tags),
                record.is_completed,
                record.owner_id,
                format_ts(record.created_at),
                format_ts(record.updated_at),
            ],
        )?;
        Ok(record)
    }

    fn get_task(&self, id: &str) -> StoreResult<Option<Task>> {
        let conn = self.lock()?;
        select_task(&conn, id)
    }

    fn list_tasks_for_owner(&self, owner_id: &str) -> StoreResult<Vec<Task>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE owner_id = ?1 ORDER BY created_at DESC"
        ))?;
        let rows = stmt.query_map(params![owner_id], row_to_task)?;
        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?);
        }
        Ok(tasks)
    }

    fn update_task(
        &self,
        id: &str,
        patch: TaskPatch,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Task>> {
        let conn = self.lock()?;
        let Some(mut task) = select_task(&conn, id)? else {
            return Ok(None);
        };

        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(body) = patch.body {
            task.body = body;
        }
        if let Some(reminder) = patch.reminder
            && reminder != task.reminder
        {
            task.reminder = reminder;
            task.reminder_sent = false;
        }
        if let Some(tags) = patch.tags {
            task.tags = tags;
        }
        if let Some(done) = patch.is_completed {
            task.is_completed = done;
        }
        task.updated_at = now;

        conn.execute(
            "UPDATE tasks SET title = ?2, body = ?3, reminder = ?4, reminder_sent = ?5, \
             tags = ?6, is_completed = ?7, updated_at = ?8 WHERE id = ?1",
            params![
                task.id,
                task.title,
                task.body,
                task.reminder.map(format_ts),
                task.reminder_sent,
                encode_tags(&task.tags),
                task.is_completed,
                format_ts(task.updated_at),
            ],
        )?;
        Ok(Some(task))
    }

    fn delete_task(&self, id: &str) -> StoreResult<bool> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    fn pending_tasks(&self) -> StoreResult<Vec<Task>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE reminder_sent = 0 ORDER BY created_at ASC"
        ))?;
        let rows = stmt.query_map([], row_to_task)?;
        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?);
        }
        Ok(tasks)
    }

    fn claim_reminder(&self, id: &str, now: DateTime<Utc>) -> StoreResult<bool> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE tasks SET reminder_sent = 1, updated_at = ?2 \
             WHERE id = ?1 AND reminder_sent = 0",
            params![id, format_ts(now)],
        )?;
        Ok(changed == 1)
    }
}

impl AccountStore for SqliteStore {
    fn get_account(&self, id: &str) -> StoreResult<Option<Account>> {
        let conn = self.lock()?;
        let account = conn
            .query_row(
                &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1"),
                params![id],
                row_to_account,
            )
            .optional()?;
        Ok(account)
    }

    fn find_account_by_phone(
        &self,
        digits: &str,
        default_country_code: &str,
    ) -> StoreResult<Option<Account>> {
        if digits.is_empty() {
            return Ok(None);
        }
        let conn = self.lock()?;
        let account = conn
            .query_row(
                &format!(
                    "SELECT {ACCOUNT_COLUMNS} FROM accounts \
                     WHERE phone IS NOT NULL AND TRIM(phone) != '' AND ( \
                        REPLACE(COALESCE(NULLIF(TRIM(country_code), ''), ?2) || TRIM(phone), '+', '') = ?1 \
                        OR REPLACE(TRIM(phone), '+', '') = ?1 \
                     ) ORDER BY id LIMIT 1"
                ),
                params![digits, default_country_code],
                row_to_account,
            )
            .optional()?;
        Ok(account)
    }

    fn insert_account(&self, account: &Account) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO accounts ({ACCOUNT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"
            ),
            params![
                account.id,
                account.name,
                account.email,
                account.phone,
                account.country_code,
            ],
        )?;
        Ok(())
    }
}

fn select_task(conn: &Connection, id: &str) -> StoreResult<Option<Task>> {
    let task = conn
        .query_row(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
            params![id],
            row_to_task,
        )
        .optional()?;
    Ok(task)
}

fn row_to_task(row: &Row<'_>) -> rusqlite::Result<Task> {
    let reminder: Option<String> = row.get(3)?;
    let tags: String = row.get(5)?;
    let created_at: String = row.get(8)?;
    let updated_at: String = row.get(9)?;
    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        body: row.get(2)?,
        reminder: reminder.as_deref().map(|r| parse_ts(3, r)).transpose()?,
        reminder_sent: row.get(4)?,
        tags: decode_tags(5, &tags)?,
        is_completed: row.get(6)?,
        owner_id: row.get(7)?,
        created_at: parse_ts(8, &created_at)?,
        updated_at: parse_ts(9, &updated_at)?,
    })
}

fn row_to_account(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        country_code: row.get(4)?,
    })
}

fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_ts(column: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

fn encode_tags(tags: &[String]) -> String {
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_owned())
}

fn decode_tags(column: usize, raw: &str) -> rusqlite::Result<Vec<String>> {
    serde_json::from_str(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}
