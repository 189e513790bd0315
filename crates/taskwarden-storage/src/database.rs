// SPDX-FileCopyrightText: 2026 Taskwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All statements are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use std::path::Path;

use taskwarden_core::TaskwardenError;
use tracing::debug;

use crate::migrations;

/// Per-connection pragmas.
const CONNECTION_PRAGMAS: &str = "PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 5000;
PRAGMA synchronous = NORMAL;";

/// Handle to the SQLite database.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Opens (creating if needed) the database at `path` and applies migrations.
    ///
    /// Migrations run on a short-lived synchronous connection before the
    /// async connection is handed out.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, TaskwardenError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| TaskwardenError::Storage { source: Box::new(e) })?;
            }
        }

        {
            let mut setup = rusqlite::Connection::open(path).map_err(map_tr_err)?;
            if wal_mode {
                // journal_mode returns a row, so it cannot go through execute_batch.
                let mode: String = setup
                    .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
                    .map_err(map_tr_err)?;
                debug!(journal_mode = %mode, "journal mode set");
            }
            migrations::run_migrations(&mut setup)?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(map_tr_err)?;
        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(CONNECTION_PRAGMAS)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The async connection all queries go through.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }
}

/// Wraps any tokio-rusqlite or rusqlite failure as a storage error.
pub(crate) fn map_tr_err<E>(e: E) -> TaskwardenError
where
    E: std::error::Error + Send + Sync + 'static,
{
    TaskwardenError::Storage { source: Box::new(e) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_creates_schema_in_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/dir/tasks.db");
        let db = Database::open(path.to_str().unwrap(), true).await.unwrap();

        let tables: Vec<String> = db
            .connection()
            .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
                )?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.collect()
            })
            .await
            .unwrap();

        for table in ["chats", "messages", "tasks", "tasks_in_progress"] {
            assert!(tables.iter().any(|t| t == table), "missing {table}");
        }
    }

    #[tokio::test]
    async fn reopening_does_not_rerun_migrations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.db");
        let path = path.to_str().unwrap();
        drop(Database::open(path, false).await.unwrap());
        assert!(Database::open(path, false).await.is_ok());
    }
}
