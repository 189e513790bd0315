// SPDX-FileCopyrightText: 2026 Taskwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Volatile storage backend.
//!
//! Everything lives behind one [`RwLock`], so each trait call is atomic with
//! respect to every other call. Nothing survives a restart.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use taskwarden_core::{
    AdapterType, Chat, ChatId, HealthStatus, NewTask, PluginAdapter, QueuedMessage, Role, Stage,
    StorageAdapter, Task, TaskDraft, TaskId, TaskStatus, TaskwardenError,
};

#[derive(Default)]
struct State {
    chats: HashMap<ChatId, Chat>,
    tasks: BTreeMap<TaskId, Task>,
    last_task_id: i64,
    drafts: HashMap<ChatId, TaskDraft>,
    messages: Vec<QueuedMessage>,
    last_message_id: i64,
}

impl State {
    fn chat_mut(&mut self, chat_id: ChatId) -> Result<&mut Chat, TaskwardenError> {
        self.chats
            .get_mut(&chat_id)
            .ok_or(TaskwardenError::ChatNotFound(chat_id))
    }

    fn task_mut(&mut self, id: TaskId) -> Result<&mut Task, TaskwardenError> {
        self.tasks
            .get_mut(&id)
            .ok_or(TaskwardenError::TaskNotFound(id))
    }

    fn tasks_with(&self, status: TaskStatus) -> Vec<Task> {
        self.tasks
            .values()
            .filter(|task| task.status() == status)
            .cloned()
            .collect()
    }
}

/// In-process storage for development and tests.
#[derive(Default)]
pub struct MemoryStorage {
    state: RwLock<State>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PluginAdapter for MemoryStorage {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, TaskwardenError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TaskwardenError> {
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for MemoryStorage {
    async fn initialize(&self) -> Result<(), TaskwardenError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), TaskwardenError> {
        Ok(())
    }

    async fn add_chat(
        &self,
        chat_id: ChatId,
        username: &str,
        phone: Option<&str>,
        role: Role,
    ) -> Result<(), TaskwardenError> {
        let mut state = self.state.write().await;
        let chat = state.chats.entry(chat_id).or_insert_with(|| Chat {
            chat_id,
            username: String::new(),
            phone: None,
            role,
            stage: Stage::Unknown,
        });
        chat.username = username.to_string();
        chat.role = role;
        if let Some(phone) = phone {
            chat.phone = Some(phone.to_string());
        }
        Ok(())
    }

    async fn get_chat(&self, contact: &str) -> Result<Option<Chat>, TaskwardenError> {
        let state = self.state.read().await;
        Ok(state
            .chats
            .values()
            .filter(|chat| chat.username == contact || chat.phone.as_deref() == Some(contact))
            .min_by_key(|chat| chat.chat_id.0)
            .cloned())
    }

    async fn get_chat_by_id(&self, chat_id: ChatId) -> Result<Option<Chat>, TaskwardenError> {
        Ok(self.state.read().await.chats.get(&chat_id).cloned())
    }

    async fn get_role(&self, chat_id: ChatId) -> Result<Option<Role>, TaskwardenError> {
        Ok(self.state.read().await.chats.get(&chat_id).map(|c| c.role))
    }

    async fn set_role(&self, chat_id: ChatId, role: Role) -> Result<(), TaskwardenError> {
        self.state.write().await.chat_mut(chat_id)?.role = role;
        Ok(())
    }

    async fn get_stage(&self, chat_id: ChatId) -> Result<Option<Stage>, TaskwardenError> {
        Ok(self.state.read().await.chats.get(&chat_id).map(|c| c.stage))
    }

    async fn set_stage(&self, chat_id: ChatId, stage: Stage) -> Result<(), TaskwardenError> {
        self.state.write().await.chat_mut(chat_id)?.stage = stage;
        Ok(())
    }

    async fn set_role_and_stage(
        &self,
        chat_id: ChatId,
        role: Role,
        stage: Stage,
    ) -> Result<(), TaskwardenError> {
        let mut state = self.state.write().await;
        let chat = state.chat_mut(chat_id)?;
        chat.role = role;
        chat.stage = stage;
        Ok(())
    }

    async fn get_observers(&self) -> Result<HashMap<ChatId, Chat>, TaskwardenError> {
        let state = self.state.read().await;
        Ok(state
            .chats
            .values()
            .filter(|chat| chat.role == Role::Observer)
            .map(|chat| (chat.chat_id, chat.clone()))
            .collect())
    }

    async fn add_task(&self, task: NewTask) -> Result<TaskId, TaskwardenError> {
        let mut state = self.state.write().await;
        state.last_task_id += 1;
        let id = TaskId(state.last_task_id);
        state.tasks.insert(id, task.into_task(id));
        Ok(id)
    }

    async fn get_all_tasks(&self) -> Result<Vec<Task>, TaskwardenError> {
        Ok(self.state.read().await.tasks.values().cloned().collect())
    }

    async fn get_open_tasks(&self) -> Result<Vec<Task>, TaskwardenError> {
        Ok(self.state.read().await.tasks_with(TaskStatus::Open))
    }

    async fn get_done_tasks(&self) -> Result<Vec<Task>, TaskwardenError> {
        Ok(self.state.read().await.tasks_with(TaskStatus::Done))
    }

    async fn get_closed_tasks(&self) -> Result<Vec<Task>, TaskwardenError> {
        Ok(self.state.read().await.tasks_with(TaskStatus::Closed))
    }

    async fn get_expired_tasks(&self) -> Result<Vec<Task>, TaskwardenError> {
        Ok(self.state.read().await.tasks_with(TaskStatus::Expired))
    }

    async fn get_user_tasks(&self, contact: &str) -> Result<Vec<Task>, TaskwardenError> {
        let state = self.state.read().await;
        Ok(state
            .tasks
            .values()
            .filter(|task| task.executor_contact == contact)
            .cloned()
            .collect())
    }

    async fn mark_task_as_done(&self, id: TaskId) -> Result<(), TaskwardenError> {
        self.state.write().await.task_mut(id)?.done = true;
        Ok(())
    }

    async fn mark_task_as_closed(&self, id: TaskId) -> Result<(), TaskwardenError> {
        self.state.write().await.task_mut(id)?.closed = true;
        Ok(())
    }

    async fn delete_task(&self, _id: TaskId) -> Result<(), TaskwardenError> {
        Err(TaskwardenError::Unsupported {
            backend: "memory",
            operation: "delete_task",
        })
    }

    async fn change_task_deadline(
        &self,
        id: TaskId,
        deadline: DateTime<Utc>,
    ) -> Result<(), TaskwardenError> {
        let mut state = self.state.write().await;
        let task = state.task_mut(id)?;
        task.deadline = deadline;
        task.expired = false;
        Ok(())
    }

    async fn get_expired_tasks_to_mark(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Task>, TaskwardenError> {
        let mut state = self.state.write().await;
        let mut flagged = Vec::new();
        for task in state.tasks.values_mut() {
            if task.is_due_for_expiry(now) {
                task.expired = true;
                flagged.push(task.clone());
            }
        }
        Ok(flagged)
    }

    async fn get_task_in_progress(&self, chat_id: ChatId) -> Result<TaskDraft, TaskwardenError> {
        Ok(self
            .state
            .read()
            .await
            .drafts
            .get(&chat_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn set_task_in_progress_name(
        &self,
        chat_id: ChatId,
        title: &str,
    ) -> Result<(), TaskwardenError> {
        let mut state = self.state.write().await;
        state.drafts.entry(chat_id).or_default().title = Some(title.to_string());
        Ok(())
    }

    async fn set_task_in_progress_user(
        &self,
        chat_id: ChatId,
        contact: &str,
        executor_chat_id: Option<ChatId>,
    ) -> Result<(), TaskwardenError> {
        let mut state = self.state.write().await;
        let draft = state.drafts.entry(chat_id).or_default();
        draft.executor_contact = Some(contact.to_string());
        draft.executor_chat_id = executor_chat_id;
        Ok(())
    }

    async fn set_task_in_progress_deadline(
        &self,
        chat_id: ChatId,
        deadline: DateTime<Utc>,
    ) -> Result<(), TaskwardenError> {
        let mut state = self.state.write().await;
        state.drafts.entry(chat_id).or_default().deadline = Some(deadline);
        Ok(())
    }

    async fn clear_task_in_progress(&self, chat_id: ChatId) -> Result<(), TaskwardenError> {
        self.state.write().await.drafts.remove(&chat_id);
        Ok(())
    }

    async fn add_message(&self, chat_id: ChatId, text: &str) -> Result<i64, TaskwardenError> {
        let mut state = self.state.write().await;
        state.last_message_id += 1;
        let id = state.last_message_id;
        state.messages.push(QueuedMessage {
            id,
            chat_id,
            text: text.to_string(),
            handled: false,
        });
        Ok(id)
    }

    async fn get_unhandled_messages(&self) -> Result<Vec<QueuedMessage>, TaskwardenError> {
        let state = self.state.read().await;
        Ok(state
            .messages
            .iter()
            .filter(|m| !m.handled)
            .cloned()
            .collect())
    }

    async fn set_message_handled(&self, id: i64) -> Result<(), TaskwardenError> {
        let mut state = self.state.write().await;
        if let Some(message) = state.messages.iter_mut().find(|m| m.id == id) {
            message.handled = true;
        }
        Ok(())
    }

    async fn prune_handled_messages(&self) -> Result<usize, TaskwardenError> {
        let mut state = self.state.write().await;
        let before = state.messages.len();
        state.messages.retain(|m| !m.handled);
        Ok(before - state.messages.len())
    }

    async fn debug_storage(&self) -> Result<String, TaskwardenError> {
        let state = self.state.read().await;
        let mut chats: Vec<&Chat> = state.chats.values().collect();
        chats.sort_by_key(|chat| chat.chat_id.0);

        let mut out = String::from("backend: memory\n");
        let _ = writeln!(out, "chats: {}", chats.len());
        for chat in chats {
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
        let _ = writeln!(out, "tasks: {}", state.tasks.len());
        for task in state.tasks.values() {
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
        let _ = writeln!(out, "drafts: {}", state.drafts.len());
        let unhandled = state.messages.iter().filter(|m| !m.handled).count();
        let _ = writeln!(
            out,
            "messages: {unhandled} unhandled, {} handled",
            state.messages.len() - unhandled
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn new_task(title: &str, contact: &str, deadline: DateTime<Utc>) -> NewTask {
        NewTask {
            title: title.into(),
            executor_contact: contact.into(),
            executor_chat_id: None,
            deadline,
        }
    }

    #[tokio::test]
    async fn ids_increase_from_one() {
        let storage = MemoryStorage::new();
        let deadline = Utc::now() + Duration::hours(1);
        assert_eq!(storage.add_task(new_task("a", "x", deadline)).await.unwrap(), TaskId(1));
        assert_eq!(storage.add_task(new_task("b", "x", deadline)).await.unwrap(), TaskId(2));
    }

    #[tokio::test]
    async fn delete_is_unsupported() {
        let storage = MemoryStorage::new();
        let id = storage
            .add_task(new_task("a", "x", Utc::now() + Duration::hours(1)))
            .await
            .unwrap();
        let err = storage.delete_task(id).await.unwrap_err();
        assert!(matches!(
            err,
            TaskwardenError::Unsupported {
                backend: "memory",
                operation: "delete_task"
            }
        ));
        assert_eq!(storage.get_all_tasks().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn expiry_is_idempotent() {
        let storage = MemoryStorage::new();
        let now = Utc::now();
        storage.add_task(new_task("due now", "x", now)).await.unwrap();
        storage.add_task(new_task("future", "x", now + Duration::hours(1))).await.unwrap();
        let done = storage.add_task(new_task("done", "x", now - Duration::hours(1))).await.unwrap();
        storage.mark_task_as_done(done).await.unwrap();

        let flagged = storage.get_expired_tasks_to_mark(now).await.unwrap();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].title, "due now");
        assert!(storage.get_expired_tasks_to_mark(now).await.unwrap().is_empty());
        assert_eq!(storage.get_expired_tasks().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn closed_wins_over_done() {
        let storage = MemoryStorage::new();
        let id = storage
            .add_task(new_task("a", "x", Utc::now() + Duration::hours(1)))
            .await
            .unwrap();
        storage.mark_task_as_done(id).await.unwrap();
        storage.mark_task_as_closed(id).await.unwrap();
        assert!(storage.get_done_tasks().await.unwrap().is_empty());
        assert_eq!(storage.get_closed_tasks().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_ids_are_reported() {
        let storage = MemoryStorage::new();
        assert!(matches!(
            storage.mark_task_as_done(TaskId(3)).await,
            Err(TaskwardenError::TaskNotFound(TaskId(3)))
        ));
        assert!(matches!(
            storage.set_stage(ChatId(3), Stage::Default).await,
            Err(TaskwardenError::ChatNotFound(ChatId(3)))
        ));
    }

    #[tokio::test]
    async fn re_adding_a_chat_keeps_stage_and_phone() {
        let storage = MemoryStorage::new();
        storage.add_chat(ChatId(1), "alice", Some("79001234567"), Role::Unknown).await.unwrap();
        storage.set_stage(ChatId(1), Stage::DeleteTask).await.unwrap();
        storage.add_chat(ChatId(1), "alice2", None, Role::Admin).await.unwrap();

        let chat = storage.get_chat("79001234567").await.unwrap().unwrap();
        assert_eq!(chat.username, "alice2");
        assert_eq!(chat.role, Role::Admin);
        assert_eq!(chat.stage, Stage::DeleteTask);
    }

    #[tokio::test]
    async fn user_tasks_match_contact() {
        let storage = MemoryStorage::new();
        let deadline = Utc::now() + Duration::hours(1);
        storage.add_task(new_task("mine", "alice", deadline)).await.unwrap();
        storage.add_task(new_task("theirs", "bob", deadline)).await.unwrap();
        let mine = storage.get_user_tasks("alice").await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].title, "mine");
    }

    #[tokio::test]
    async fn draft_and_mailbox_lifecycle() {
        let storage = MemoryStorage::new();
        let chat = ChatId(4);
        storage.set_task_in_progress_name(chat, "title").await.unwrap();
        storage.set_task_in_progress_user(chat, "bob", None).await.unwrap();
        let draft = storage.get_task_in_progress(chat).await.unwrap();
        assert_eq!(draft.title.as_deref(), Some("title"));
        assert!(draft.deadline.is_none());
        storage.clear_task_in_progress(chat).await.unwrap();
        assert_eq!(storage.get_task_in_progress(chat).await.unwrap(), TaskDraft::default());

        let id = storage.add_message(chat, "hi").await.unwrap();
        storage.set_message_handled(id).await.unwrap();
        assert!(storage.get_unhandled_messages().await.unwrap().is_empty());
        assert!(storage.debug_storage().await.unwrap().starts_with("backend: memory"));
    }

    #[tokio::test]
    async fn pruning_keeps_unhandled_messages_and_fresh_ids() {
        let storage = MemoryStorage::new();
        let first = storage.add_message(ChatId(1), "one").await.unwrap();
        let second = storage.add_message(ChatId(1), "two").await.unwrap();
        storage.set_message_handled(first).await.unwrap();

        assert_eq!(storage.prune_handled_messages().await.unwrap(), 1);
        assert_eq!(storage.prune_handled_messages().await.unwrap(), 0);
        let dump = storage.debug_storage().await.unwrap();
        assert!(dump.contains("messages: 1 unhandled, 0 handled"), "{dump}");

        let third = storage.add_message(ChatId(1), "three").await.unwrap();
        assert!(third > second);
        let pending: Vec<i64> = storage
            .get_unhandled_messages()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(pending, vec![second, third]);
    }
}
