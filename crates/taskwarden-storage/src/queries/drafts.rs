// SPDX-FileCopyrightText: 2026 Taskwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Task-in-progress rows, one per chat.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};
use taskwarden_core::{ChatId, TaskDraft, TaskwardenError};

use crate::database::{Database, map_tr_err};
use crate::queries::optional_timestamp_at;

pub async fn get_draft(db: &Database, chat_id: ChatId) -> Result<TaskDraft, TaskwardenError> {
    db.connection()
        .call(move |conn| -> Result<Option<TaskDraft>, rusqlite::Error> {
            conn.query_row(
                "SELECT title, executor_contact, executor_chat_id, deadline
                 FROM tasks_in_progress WHERE chat_id = ?1",
                params![chat_id.0],
                |row| {
                    Ok(TaskDraft {
                        title: row.get(0)?,
                        executor_contact: row.get(1)?,
                        executor_chat_id: row.get::<_, Option<i64>>(2)?.map(ChatId),
                        deadline: optional_timestamp_at(row, 3)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map(Option::unwrap_or_default)
        .map_err(map_tr_err)
}

pub async fn set_title(db: &Database, chat_id: ChatId, title: &str) -> Result<(), TaskwardenError> {
    let title = title.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO tasks_in_progress (chat_id, title) VALUES (?1, ?2)
                 ON CONFLICT(chat_id) DO UPDATE SET title = excluded.title",
                params![chat_id.0, title],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn set_executor(
    db: &Database,
    chat_id: ChatId,
    contact: &str,
    executor_chat_id: Option<ChatId>,
) -> Result<(), TaskwardenError> {
    let contact = contact.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO tasks_in_progress (chat_id, executor_contact, executor_chat_id)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(chat_id) DO UPDATE SET
                    executor_contact = excluded.executor_contact,
                    executor_chat_id = excluded.executor_chat_id",
                params![chat_id.0, contact, executor_chat_id.map(|c| c.0)],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn set_deadline(
    db: &Database,
    chat_id: ChatId,
    deadline: DateTime<Utc>,
) -> Result<(), TaskwardenError> {
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO tasks_in_progress (chat_id, deadline) VALUES (?1, ?2)
                 ON CONFLICT(chat_id) DO UPDATE SET deadline = excluded.deadline",
                params![chat_id.0, deadline.timestamp()],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn clear_draft(db: &Database, chat_id: ChatId) -> Result<(), TaskwardenError> {
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "DELETE FROM tasks_in_progress WHERE chat_id = ?1",
                params![chat_id.0],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
