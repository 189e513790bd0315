// SPDX-FileCopyrightText: 2026 Taskwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Task queries.
//!
//! The WHERE clauses in [`TaskFilter`] mirror `Task::status`: closed beats
//! done, done beats expired.

use chrono::{DateTime, Utc};
use rusqlite::params;
use taskwarden_core::{ChatId, NewTask, Task, TaskId, TaskwardenError};

use crate::database::{Database, map_tr_err};
use crate::queries::timestamp_at;

const TASK_COLUMNS: &str =
    "id, title, executor_contact, executor_chat_id, deadline, done, expired, closed";

fn task_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: TaskId(row.get(0)?),
        title: row.get(1)?,
        executor_contact: row.get(2)?,
        executor_chat_id: row.get::<_, Option<i64>>(3)?.map(ChatId),
        deadline: timestamp_at(row, 4)?,
        done: row.get(5)?,
        expired: row.get(6)?,
        closed: row.get(7)?,
    })
}

/// Status-based task selections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskFilter {
    All,
    Open,
    Done,
    Closed,
    Expired,
}

impl TaskFilter {
    fn where_clause(self) -> &'static str {
        match self {
            TaskFilter::All => "1 = 1",
            TaskFilter::Open => "closed = 0 AND done = 0 AND expired = 0",
            TaskFilter::Done => "closed = 0 AND done = 1",
            TaskFilter::Closed => "closed = 1",
            TaskFilter::Expired => "closed = 0 AND done = 0 AND expired = 1",
        }
    }
}

/// Insert a task. Returns the assigned id.
pub async fn insert_task(db: &Database, task: NewTask) -> Result<TaskId, TaskwardenError> {
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.execute(
                "INSERT INTO tasks (title, executor_contact, executor_chat_id, deadline)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    task.title,
                    task.executor_contact,
                    task.executor_chat_id.map(|c| c.0),
                    task.deadline.timestamp()
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map(TaskId)
        .map_err(map_tr_err)
}

/// List tasks matching `filter`, ordered by id.
pub async fn list_tasks(db: &Database, filter: TaskFilter) -> Result<Vec<Task>, TaskwardenError> {
    db.connection()
        .call(move |conn| -> Result<Vec<Task>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks WHERE {} ORDER BY id",
                filter.where_clause()
            ))?;
            let rows = stmt.query_map([], task_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Tasks assigned to `contact`, ordered by id.
pub async fn list_for_executor(
    db: &Database,
    contact: &str,
) -> Result<Vec<Task>, TaskwardenError> {
    let contact = contact.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<Task>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks WHERE executor_contact = ?1 ORDER BY id"
            ))?;
            let rows = stmt.query_map(params![contact], task_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Which flag [`set_flag`] raises.
#[derive(Debug, Clone, Copy)]
pub enum TaskFlag {
    Done,
    Closed,
}

/// Set `done` or `closed` on one task. `TaskNotFound` when the id is unknown.
pub async fn set_flag(db: &Database, id: TaskId, flag: TaskFlag) -> Result<(), TaskwardenError> {
    let sql = match flag {
        TaskFlag::Done => "UPDATE tasks SET done = 1 WHERE id = ?1",
        TaskFlag::Closed => "UPDATE tasks SET closed = 1 WHERE id = ?1",
    };
    let updated = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> { conn.execute(sql, params![id.0]) })
        .await
        .map_err(map_tr_err)?;
    found_or(updated, id)
}

pub async fn delete_task(db: &Database, id: TaskId) -> Result<(), TaskwardenError> {
    let deleted = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute("DELETE FROM tasks WHERE id = ?1", params![id.0])
        })
        .await
        .map_err(map_tr_err)?;
    found_or(deleted, id)
}

/// Move the deadline and clear `expired`.
pub async fn change_deadline(
    db: &Database,
    id: TaskId,
    deadline: DateTime<Utc>,
) -> Result<(), TaskwardenError> {
    let updated = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE tasks SET deadline = ?2, expired = 0 WHERE id = ?1",
                params![id.0, deadline.timestamp()],
            )
        })
        .await
        .map_err(map_tr_err)?;
    found_or(updated, id)
}

/// Flag every due task as expired and return the flagged rows.
///
/// Selection and update share one transaction, so a task is returned once.
pub async fn expire_due(db: &Database, now: DateTime<Utc>) -> Result<Vec<Task>, TaskwardenError> {
    db.connection()
        .call(move |conn| -> Result<Vec<Task>, rusqlite::Error> {
            let tx = conn.transaction()?;

            let due = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {TASK_COLUMNS} FROM tasks
                     WHERE done = 0 AND closed = 0 AND expired = 0 AND deadline <= ?1
                     ORDER BY id"
                ))?;
                let rows = stmt.query_map(params![now.timestamp()], task_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            };

            {
                let mut update = tx.prepare("UPDATE tasks SET expired = 1 WHERE id = ?1")?;
                for task in &due {
                    update.execute(params![task.id.0])?;
                }
            }
            tx.commit()?;

            Ok(due
                .into_iter()
                .map(|task| Task {
                    expired: true,
                    ..task
                })
                .collect())
        })
        .await
        .map_err(map_tr_err)
}

fn found_or(affected: usize, id: TaskId) -> Result<(), TaskwardenError> {
    if affected == 0 {
        Err(TaskwardenError::TaskNotFound(id))
    } else {
        Ok(())
    }
}
