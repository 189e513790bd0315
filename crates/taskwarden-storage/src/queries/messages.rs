// SPDX-FileCopyrightText: 2026 Taskwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound message mailbox.

use rusqlite::params;
use taskwarden_core::{ChatId, QueuedMessage, TaskwardenError};

use crate::database::{Database, map_tr_err};

/// Append a message. Returns its id.
pub async fn enqueue(db: &Database, chat_id: ChatId, text: &str) -> Result<i64, TaskwardenError> {
    let text = text.to_string();
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.execute(
                "INSERT INTO messages (chat_id, text) VALUES (?1, ?2)",
                params![chat_id.0, text],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Unhandled messages, oldest first.
pub async fn list_unhandled(db: &Database) -> Result<Vec<QueuedMessage>, TaskwardenError> {
    db.connection()
        .call(|conn| -> Result<Vec<QueuedMessage>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, chat_id, text, handled FROM messages
                 WHERE handled = 0 ORDER BY id",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(QueuedMessage {
                    id: row.get(0)?,
                    chat_id: ChatId(row.get(1)?),
                    text: row.get(2)?,
                    handled: row.get(3)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Mark one message handled. Unknown ids are ignored.
pub async fn mark_handled(db: &Database, id: i64) -> Result<(), TaskwardenError> {
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute("UPDATE messages SET handled = 1 WHERE id = ?1", params![id])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Delete handled messages. Returns the number of rows removed.
pub async fn delete_handled(db: &Database) -> Result<usize, TaskwardenError> {
    db.connection()
        .call(|conn| -> Result<usize, rusqlite::Error> {
            conn.execute("DELETE FROM messages WHERE handled = 1", [])
        })
        .await
        .map_err(map_tr_err)
}

/// Count of messages per handled flag, `(unhandled, handled)`.
pub async fn counts(db: &Database) -> Result<(i64, i64), TaskwardenError> {
    db.connection()
        .call(|conn| -> Result<(i64, i64), rusqlite::Error> {
            conn.query_row(
                "SELECT COALESCE(SUM(handled = 0), 0), COALESCE(SUM(handled = 1), 0) FROM messages",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
        })
        .await
        .map_err(map_tr_err)
}
