// SPDX-FileCopyrightText: 2026 Taskwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use std::collections::HashMap;
use std::fmt::Write as _;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use taskwarden_config::model::StorageConfig;
use taskwarden_core::{
    AdapterType, Chat, ChatId, HealthStatus, NewTask, PluginAdapter, QueuedMessage, Role, Stage,
    StorageAdapter, Task, TaskDraft, TaskId, TaskwardenError,
};

use crate::database::{Database, map_tr_err};
use crate::queries::tasks::{TaskFilter, TaskFlag};
use crate::queries::{chats, drafts, messages, tasks};

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules. The
/// database is opened on the first call to [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`initialize`](StorageAdapter::initialize) is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, TaskwardenError> {
        self.db.get().ok_or_else(|| TaskwardenError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    async fn checkpoint(&self) -> Result<(), TaskwardenError> {
        if !self.config.wal_mode {
            return Ok(());
        }
        self.db()?
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, TaskwardenError> {
        let Ok(db) = self.db() else {
            return Ok(HealthStatus::Unhealthy("storage not initialized".into()));
        };
        let probe = db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await;
        Ok(match probe {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(format!("sqlite probe failed: {e}")),
        })
    }

    async fn shutdown(&self) -> Result<(), TaskwardenError> {
        if self.db.get().is_some() {
            self.checkpoint().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), TaskwardenError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| TaskwardenError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), TaskwardenError> {
        self.checkpoint().await
    }

    // --- Chats ---

    async fn add_chat(
        &self,
        chat_id: ChatId,
        username: &str,
        phone: Option<&str>,
        role: Role,
    ) -> Result<(), TaskwardenError> {
        chats::upsert_chat(self.db()?, chat_id, username, phone, role).await
    }

    async fn get_chat(&self, contact: &str) -> Result<Option<Chat>, TaskwardenError> {
        chats::find_by_contact(self.db()?, contact).await
    }

    async fn get_chat_by_id(&self, chat_id: ChatId) -> Result<Option<Chat>, TaskwardenError> {
        chats::get_chat_by_id(self.db()?, chat_id).await
    }

    async fn get_role(&self, chat_id: ChatId) -> Result<Option<Role>, TaskwardenError> {
        Ok(chats::get_chat_by_id(self.db()?, chat_id)
            .await?
            .map(|chat| chat.role))
    }

    async fn set_role(&self, chat_id: ChatId, role: Role) -> Result<(), TaskwardenError> {
        chats::update_role_stage(self.db()?, chat_id, Some(role), None).await
    }

    async fn get_stage(&self, chat_id: ChatId) -> Result<Option<Stage>, TaskwardenError> {
        Ok(chats::get_chat_by_id(self.db()?, chat_id)
            .await?
            .map(|chat| chat.stage))
    }

    async fn set_stage(&self, chat_id: ChatId, stage: Stage) -> Result<(), TaskwardenError> {
        chats::update_role_stage(self.db()?, chat_id, None, Some(stage)).await
    }

    async fn set_role_and_stage(
        &self,
        chat_id: ChatId,
        role: Role,
        stage: Stage,
    ) -> Result<(), TaskwardenError> {
        chats::update_role_stage(self.db()?, chat_id, Some(role), Some(stage)).await
    }

    async fn get_observers(&self) -> Result<HashMap<ChatId, Chat>, TaskwardenError> {
        chats::list_by_role(self.db()?, Role::Observer).await
    }

    // --- Tasks ---

    async fn add_task(&self, task: NewTask) -> Result<TaskId, TaskwardenError> {
        tasks::insert_task(self.db()?, task).await
    }

    async fn get_all_tasks(&self) -> Result<Vec<Task>, TaskwardenError> {
        tasks::list_tasks(self.db()?, TaskFilter::All).await
    }

    async fn get_open_tasks(&self) -> Result<Vec<Task>, TaskwardenError> {
        tasks::list_tasks(self.db()?, TaskFilter::Open).await
    }

    async fn get_done_tasks(&self) -> Result<Vec<Task>, TaskwardenError> {
        tasks::list_tasks(self.db()?, TaskFilter::Done).await
    }

    async fn get_closed_tasks(&self) -> Result<Vec<Task>, TaskwardenError> {
        tasks::list_tasks(self.db()?, TaskFilter::Closed).await
    }

    async fn get_expired_tasks(&self) -> Result<Vec<Task>, TaskwardenError> {
        tasks::list_tasks(self.db()?, TaskFilter::Expired).await
    }

    async fn get_user_tasks(&self, contact: &str) -> Result<Vec<Task>, TaskwardenError> {
        tasks::list_for_executor(self.db()?, contact).await
    }

    async fn mark_task_as_done(&self, id: TaskId) -> Result<(), TaskwardenError> {
        tasks::set_flag(self.db()?, id, TaskFlag::Done).await
    }

    async fn mark_task_as_closed(&self, id: TaskId) -> Result<(), TaskwardenError> {
        tasks::set_flag(self.db()?, id, TaskFlag::Closed).await
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), TaskwardenError> {
        tasks::delete_task(self.db()?, id).await
    }

    async fn change_task_deadline(
        &self,
        id: TaskId,
        deadline: DateTime<Utc>,
    ) -> Result<(), TaskwardenError> {
        tasks::change_deadline(self.db()?, id, deadline).await
    }

    async fn get_expired_tasks_to_mark(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Task>, TaskwardenError> {
        tasks::expire_due(self.db()?, now).await
    }

    // --- Task drafts ---

    async fn get_task_in_progress(&self, chat_id: ChatId) -> Result<TaskDraft, TaskwardenError> {
        drafts::get_draft(self.db()?, chat_id).await
    }

    async fn set_task_in_progress_name(
        &self,
        chat_id: ChatId,
        title: &str,
    ) -> Result<(), TaskwardenError> {
        drafts::set_title(self.db()?, chat_id, title).await
    }

    async fn set_task_in_progress_user(
        &self,
        chat_id: ChatId,
        contact: &str,
        executor_chat_id: Option<ChatId>,
    ) -> Result<(), TaskwardenError> {
        drafts::set_executor(self.db()?, chat_id, contact, executor_chat_id).await
    }

    async fn set_task_in_progress_deadline(
        &self,
        chat_id: ChatId,
        deadline: DateTime<Utc>,
    ) -> Result<(), TaskwardenError> {
        drafts::set_deadline(self.db()?, chat_id, deadline).await
    }

    async fn clear_task_in_progress(&self, chat_id: ChatId) -> Result<(), TaskwardenError> {
        drafts::clear_draft(self.db()?, chat_id).await
    }

    // --- Mailbox ---

    async fn add_message(&self, chat_id: ChatId, text: &str) -> Result<i64, TaskwardenError> {
        messages::enqueue(self.db()?, chat_id, text).await
    }

    async fn get_unhandled_messages(&self) -> Result<Vec<QueuedMessage>, TaskwardenError> {
        messages::list_unhandled(self.db()?).await
    }

    async fn set_message_handled(&self, id: i64) -> Result<(), TaskwardenError> {
        messages::mark_handled(self.db()?, id).await
    }

    async fn prune_handled_messages(&self) -> Result<usize, TaskwardenError> {
        messages::delete_handled(self.db()?).await
    }

    // --- Diagnostics ---

    async fn debug_storage(&self) -> Result<String, TaskwardenError> {
        let db = self.db()?;
        let all_chats = chats::list_all(db).await?;
        let all_tasks = tasks::list_tasks(db, TaskFilter::All).await?;
        let (unhandled, handled) = messages::counts(db).await?;

        let mut out = String::new();
        let _ = writeln!(out, "backend: sqlite ({})", self.config.database_path);
        let _ = writeln!(out, "chats: {}", all_chats.len());
        for chat in &all_chats {
            let _ = writeln!(
                out,
                "  {} @{} phone={} role={} stage={}",
                chat.chat_id,
                chat.username,
                chat.phone.as_deref().unwrap_or("-"),
                chat.role,
                chat.stage
            );
        }
        let _ = writeln!(out, "tasks: {}", all_tasks.len());
        for task in &all_tasks {
            let _ = writeln!(
                out,
                "  #{} {:?} executor={} deadline={} done={} expired={} closed={}",
                task.id,
                task.title,
                task.executor_contact,
                task.deadline.to_rfc3339(),
                task.done,
                task.expired,
                task.closed
            );
        }
        let _ = writeln!(out, "messages: {unhandled} unhandled, {handled} handled");
        Ok(out)
    }
}
