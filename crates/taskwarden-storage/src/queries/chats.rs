// SPDX-FileCopyrightText: 2026 Taskwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat identity, role, and stage queries.

use std::collections::HashMap;

use rusqlite::{OptionalExtension, params};
use taskwarden_core::{Chat, ChatId, Role, Stage, TaskwardenError};

use crate::database::{Database, map_tr_err};
use crate::queries::enum_at;

const CHAT_COLUMNS: &str = "chat_id, username, phone, role, stage";

fn chat_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Chat> {
    Ok(Chat {
        chat_id: ChatId(row.get(0)?),
        username: row.get(1)?,
        phone: row.get(2)?,
        role: enum_at(row, 3)?,
        stage: enum_at(row, 4)?,
    })
}

/// Upsert identity and role. The stage of an existing row is kept; a
/// `None` phone keeps the stored phone.
pub async fn upsert_chat(
    db: &Database,
    chat_id: ChatId,
    username: &str,
    phone: Option<&str>,
    role: Role,
) -> Result<(), TaskwardenError> {
    let username = username.to_string();
    let phone = phone.map(str::to_string);
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO chats (chat_id, username, phone, role, stage)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(chat_id) DO UPDATE SET
                    username = excluded.username,
                    phone = COALESCE(excluded.phone, chats.phone),
                    role = excluded.role",
                params![chat_id.0, username, phone, role.as_ref(), Stage::Unknown.as_ref()],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Find a chat whose username or phone equals `contact`.
pub async fn find_by_contact(
    db: &Database,
    contact: &str,
) -> Result<Option<Chat>, TaskwardenError> {
    let contact = contact.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Chat>, rusqlite::Error> {
            conn.query_row(
                &format!(
                    "SELECT {CHAT_COLUMNS} FROM chats
                     WHERE username = ?1 OR phone = ?1
                     ORDER BY chat_id LIMIT 1"
                ),
                params![contact],
                chat_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_chat_by_id(
    db: &Database,
    chat_id: ChatId,
) -> Result<Option<Chat>, TaskwardenError> {
    db.connection()
        .call(move |conn| -> Result<Option<Chat>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {CHAT_COLUMNS} FROM chats WHERE chat_id = ?1"),
                params![chat_id.0],
                chat_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Update role and/or stage in one statement.
///
/// Returns `ChatNotFound` when no row matched.
pub async fn update_role_stage(
    db: &Database,
    chat_id: ChatId,
    role: Option<Role>,
    stage: Option<Stage>,
) -> Result<(), TaskwardenError> {
    let role = role.map(|r| r.as_ref().to_string());
    let stage = stage.map(|s| s.as_ref().to_string());
    let updated = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE chats SET role = COALESCE(?2, role), stage = COALESCE(?3, stage)
                 WHERE chat_id = ?1",
                params![chat_id.0, role, stage],
            )
        })
        .await
        .map_err(map_tr_err)?;

    if updated == 0 {
        return Err(TaskwardenError::ChatNotFound(chat_id));
    }
    Ok(())
}

pub async fn list_by_role(
    db: &Database,
    role: Role,
) -> Result<HashMap<ChatId, Chat>, TaskwardenError> {
    db.connection()
        .call(move |conn| -> Result<HashMap<ChatId, Chat>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CHAT_COLUMNS} FROM chats WHERE role = ?1"
            ))?;
            let rows = stmt.query_map(params![role.as_ref()], chat_from_row)?;
            rows.map(|chat| chat.map(|c| (c.chat_id, c))).collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_all(db: &Database) -> Result<Vec<Chat>, TaskwardenError> {
    db.connection()
        .call(|conn| -> Result<Vec<Chat>, rusqlite::Error> {
            let mut stmt =
                conn.prepare(&format!("SELECT {CHAT_COLUMNS} FROM chats ORDER BY chat_id"))?;
            let rows = stmt.query_map([], chat_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
