// SPDX-FileCopyrightText: 2026 Taskwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for persistence backends.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Chat, NewTask, QueuedMessage, Role, Stage, Task, TaskDraft};
use crate::error::TaskwardenError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChatId, TaskId};

/// Full persistence capability set used by the bot.
///
/// Every backend implements every method; operations a backend cannot offer
/// fail with [`TaskwardenError::Unsupported`]. Lookups that may legitimately
/// find nothing return `Option`, while operations addressed by task id fail
/// with [`TaskwardenError::TaskNotFound`].
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Prepares the backend (migrations, connections).
    async fn initialize(&self) -> Result<(), TaskwardenError>;

    /// Flushes pending writes and releases connections.
    async fn close(&self) -> Result<(), TaskwardenError>;

    // --- Chats ---

    /// Inserts or updates a chat's identity and role.
    ///
    /// A `None` phone keeps any phone already stored. New chats start in
    /// [`Stage::Unknown`]; the stage of existing chats is left untouched.
    async fn add_chat(
        &self,
        chat_id: ChatId,
        username: &str,
        phone: Option<&str>,
        role: Role,
    ) -> Result<(), TaskwardenError>;

    /// Finds a chat by username or phone.
    async fn get_chat(&self, contact: &str) -> Result<Option<Chat>, TaskwardenError>;

    async fn get_chat_by_id(&self, chat_id: ChatId) -> Result<Option<Chat>, TaskwardenError>;

    async fn get_role(&self, chat_id: ChatId) -> Result<Option<Role>, TaskwardenError>;

    async fn set_role(&self, chat_id: ChatId, role: Role) -> Result<(), TaskwardenError>;

    async fn get_stage(&self, chat_id: ChatId) -> Result<Option<Stage>, TaskwardenError>;

    async fn set_stage(&self, chat_id: ChatId, stage: Stage) -> Result<(), TaskwardenError>;

    /// Sets role and stage in one atomic update.
    async fn set_role_and_stage(
        &self,
        chat_id: ChatId,
        role: Role,
        stage: Stage,
    ) -> Result<(), TaskwardenError>;

    /// All chats with the observer role, keyed by chat id.
    async fn get_observers(&self) -> Result<HashMap<ChatId, Chat>, TaskwardenError>;

    // --- Tasks ---

    async fn add_task(&self, task: NewTask) -> Result<TaskId, TaskwardenError>;

    async fn get_all_tasks(&self) -> Result<Vec<Task>, TaskwardenError>;

    async fn get_open_tasks(&self) -> Result<Vec<Task>, TaskwardenError>;

    async fn get_done_tasks(&self) -> Result<Vec<Task>, TaskwardenError>;

    async fn get_closed_tasks(&self) -> Result<Vec<Task>, TaskwardenError>;

    async fn get_expired_tasks(&self) -> Result<Vec<Task>, TaskwardenError>;

    /// Tasks assigned to the given executor contact.
    async fn get_user_tasks(&self, contact: &str) -> Result<Vec<Task>, TaskwardenError>;

    async fn mark_task_as_done(&self, id: TaskId) -> Result<(), TaskwardenError>;

    async fn mark_task_as_closed(&self, id: TaskId) -> Result<(), TaskwardenError>;

    async fn delete_task(&self, id: TaskId) -> Result<(), TaskwardenError>;

    /// Moves the deadline and clears the expired flag.
    async fn change_task_deadline(
        &self,
        id: TaskId,
        deadline: DateTime<Utc>,
    ) -> Result<(), TaskwardenError>;

    /// Flags every task that is due at `now` as expired and returns them.
    ///
    /// Each task is returned by at most one call.
    async fn get_expired_tasks_to_mark(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Task>, TaskwardenError>;

    // --- Task drafts ---

    /// The chat's draft, empty if none was started.
    async fn get_task_in_progress(&self, chat_id: ChatId) -> Result<TaskDraft, TaskwardenError>;

    async fn set_task_in_progress_name(
        &self,
        chat_id: ChatId,
        title: &str,
    ) -> Result<(), TaskwardenError>;

    async fn set_task_in_progress_user(
        &self,
        chat_id: ChatId,
        contact: &str,
        executor_chat_id: Option<ChatId>,
    ) -> Result<(), TaskwardenError>;

    async fn set_task_in_progress_deadline(
        &self,
        chat_id: ChatId,
        deadline: DateTime<Utc>,
    ) -> Result<(), TaskwardenError>;

    async fn clear_task_in_progress(&self, chat_id: ChatId) -> Result<(), TaskwardenError>;

    // --- Mailbox ---

    async fn add_message(&self, chat_id: ChatId, text: &str) -> Result<i64, TaskwardenError>;

    async fn get_unhandled_messages(&self) -> Result<Vec<QueuedMessage>, TaskwardenError>;

    async fn set_message_handled(&self, id: i64) -> Result<(), TaskwardenError>;

    /// Deletes every handled message. Returns how many were removed.
    async fn prune_handled_messages(&self) -> Result<usize, TaskwardenError>;

    // --- Diagnostics ---

    /// Human-readable dump of the stored state.
    async fn debug_storage(&self) -> Result<String, TaskwardenError>;
}
