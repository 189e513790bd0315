// SPDX-FileCopyrightText: 2026 Taskwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Free-text handling driven by the chat's stage.
//!
//! Invalid input re-prompts and keeps the stage. An unknown task id resets the
//! chat to [`Stage::Default`]. Any other error propagates so the caller can
//! answer with the generic error reply.

use secrecy::SecretString;
use tracing::{debug, info, warn};

use taskwarden_core::domain::{normalize_contact, parse_deadline};
use taskwarden_core::types::{InboundMessage, OutboundMessage, ReplyKeyboard};
use taskwarden_core::{ChatId, Role, Stage, TaskId, TaskStatus, TaskwardenError};

use crate::TaskBot;
use crate::replies;

/// Which single-id operation a numeric reply applies to.
#[derive(Debug, Clone, Copy)]
enum TaskAction {
    Done,
    Close,
    Delete,
}

impl TaskBot {
    pub(crate) async fn handle_text(
        &self,
        msg: &InboundMessage,
        text: &str,
    ) -> Result<(), TaskwardenError> {
        let chat_id = msg.chat_id;
        let chat = self.storage.get_chat_by_id(chat_id).await?;
        let stage = chat.as_ref().map_or(Stage::Unknown, |c| c.stage);
        debug!(chat_id = %chat_id, stage = %stage, "handling text");

        match stage {
            Stage::Unknown => {
                let role = chat.map_or(Role::Unknown, |c| c.role);
                self.introduce(msg, role).await
            }
            Stage::ContactRequest => self.receive_contact(msg).await,
            Stage::Default => {
                self.reply(OutboundMessage::html(chat_id, replies::WELCOME))
                    .await;
                Ok(())
            }
            Stage::BecomeExecutor
            | Stage::BecomeObserver
            | Stage::BecomeChief
            | Stage::BecomeAdmin => self.check_password(msg, stage, text).await,
            Stage::AddTaskName => self.set_draft_title(chat_id, text).await,
            Stage::AddTaskUser => self.set_draft_executor(chat_id, text).await,
            Stage::AddTaskDeadline => self.finish_draft(chat_id, text).await,
            Stage::MarkTaskAsDone => self.apply_to_task(chat_id, text, TaskAction::Done).await,
            Stage::MarkTaskAsClosed => self.apply_to_task(chat_id, text, TaskAction::Close).await,
            Stage::DeleteTask => self.apply_to_task(chat_id, text, TaskAction::Delete).await,
            Stage::ChangeDeadline => self.change_deadline(chat_id, text).await,
        }
    }

    /// First free-text message of a chat: register it and ask for a phone
    /// number unless one is attached.
    async fn introduce(&self, msg: &InboundMessage, role: Role) -> Result<(), TaskwardenError> {
        let chat_id = msg.chat_id;
        let username = msg.username.as_deref().unwrap_or_default();
        let phone = msg
            .contact
            .as_ref()
            .map(|c| normalize_contact(&c.phone_number));

        self.storage
            .add_chat(chat_id, username, phone.as_deref(), role)
            .await?;

        if phone.is_some() {
            self.storage.set_stage(chat_id, Stage::Default).await?;
            self.send_thanks(chat_id).await;
        } else {
            self.storage.set_stage(chat_id, Stage::ContactRequest).await?;
            self.send_contact_request(chat_id).await;
        }
        Ok(())
    }

    async fn receive_contact(&self, msg: &InboundMessage) -> Result<(), TaskwardenError> {
        let chat_id = msg.chat_id;
        let Some(contact) = &msg.contact else {
            self.send_contact_request(chat_id).await;
            return Ok(());
        };

        let phone = normalize_contact(&contact.phone_number);
        let username = msg.username.as_deref().unwrap_or_default();
        self.storage
            .add_chat(chat_id, username, Some(&phone), Role::Unknown)
            .await?;
        self.storage.set_stage(chat_id, Stage::Default).await?;
        info!(chat_id = %chat_id, "contact received");
        self.send_thanks(chat_id).await;
        Ok(())
    }

    async fn send_contact_request(&self, chat_id: ChatId) {
        let msg = OutboundMessage::text(chat_id, replies::CONTACT_REQUEST).with_keyboard(
            ReplyKeyboard::RequestContact {
                label: replies::SHARE_CONTACT_BUTTON.to_string(),
            },
        );
        self.reply(msg).await;
    }

    async fn send_thanks(&self, chat_id: ChatId) {
        let msg = OutboundMessage::text(chat_id, replies::THANKS).with_keyboard(ReplyKeyboard::Remove);
        self.reply(msg).await;
    }

    async fn check_password(
        &self,
        msg: &InboundMessage,
        stage: Stage,
        text: &str,
    ) -> Result<(), TaskwardenError> {
        let chat_id = msg.chat_id;
        let role = stage.target_role().ok_or_else(|| {
            TaskwardenError::Internal(format!("stage {stage} does not request a role"))
        })?;

        if let Err(e) = self.channel.delete_message(chat_id, msg.id).await {
            warn!(chat_id = %chat_id, error = %e, "failed to delete password message");
        }

        let secrets = self.secrets.clone();
        let candidate = SecretString::from(text.to_string());
        let accepted = tokio::task::spawn_blocking(move || secrets.verify(role, &candidate))
            .await
            .map_err(|e| TaskwardenError::Internal(format!("password check panicked: {e}")))?;

        if !accepted {
            info!(chat_id = %chat_id, role = %role, "wrong role password");
            self.reply(OutboundMessage::text(chat_id, replies::WRONG_PASSWORD))
                .await;
            return Ok(());
        }

        self.storage
            .set_role_and_stage(chat_id, role, Stage::Default)
            .await?;
        info!(chat_id = %chat_id, role = %role, "role changed");
        self.reply(OutboundMessage::text(chat_id, replies::ROLE_CHANGED))
            .await;
        self.refresh_menu(chat_id, role).await;
        Ok(())
    }

    async fn set_draft_title(&self, chat_id: ChatId, text: &str) -> Result<(), TaskwardenError> {
        let title = text.trim();
        if title.is_empty() {
            self.reply(OutboundMessage::text(chat_id, replies::ENTER_TASK_NAME))
                .await;
            return Ok(());
        }
        self.storage.set_task_in_progress_name(chat_id, title).await?;
        self.storage.set_stage(chat_id, Stage::AddTaskUser).await?;
        self.reply(OutboundMessage::text(chat_id, replies::ENTER_EXECUTOR))
            .await;
        Ok(())
    }

    async fn set_draft_executor(&self, chat_id: ChatId, text: &str) -> Result<(), TaskwardenError> {
        let contact = normalize_contact(text);
        if contact.is_empty() {
            self.reply(OutboundMessage::text(chat_id, replies::ENTER_EXECUTOR))
                .await;
            return Ok(());
        }
        let executor_chat = self
            .storage
            .get_chat(&contact)
            .await?
            .map(|chat| chat.chat_id);
        self.storage
            .set_task_in_progress_user(chat_id, &contact, executor_chat)
            .await?;
        self.storage.set_stage(chat_id, Stage::AddTaskDeadline).await?;
        self.reply(OutboundMessage::text(chat_id, replies::ENTER_DEADLINE))
            .await;
        Ok(())
    }

    async fn finish_draft(&self, chat_id: ChatId, text: &str) -> Result<(), TaskwardenError> {
        let Some(deadline) = self.read_future_deadline(chat_id, text).await else {
            return Ok(());
        };

        self.storage
            .set_task_in_progress_deadline(chat_id, deadline)
            .await?;
        let draft = self.storage.get_task_in_progress(chat_id).await?;
        let new_task = match draft.complete() {
            Ok(task) => task,
            Err(e) => {
                warn!(chat_id = %chat_id, error = %e, "incomplete task draft, restarting");
                self.storage.set_stage(chat_id, Stage::AddTaskName).await?;
                self.reply(OutboundMessage::text(chat_id, replies::ENTER_TASK_NAME))
                    .await;
                return Ok(());
            }
        };

        let id = self.storage.add_task(new_task.clone()).await?;
        self.storage.clear_task_in_progress(chat_id).await?;
        self.storage.set_stage(chat_id, Stage::Default).await?;
        info!(chat_id = %chat_id, task_id = %id, "task added");

        let task = new_task.into_task(id);
        self.reply(OutboundMessage::html(
            chat_id,
            replies::task_added(&task, self.clock.now()),
        ))
        .await;

        // An executor who also observes gets the update once, as executor.
        let mut observers_exclude = vec![chat_id];
        observers_exclude.extend(task.executor_chat_id);
        if let Err(e) = self.notifier.notify_observers(&task, &observers_exclude).await {
            warn!(task_id = %id, error = %e, "failed to notify observers");
        }
        self.notifier.notify_executor(&task, &[chat_id]).await;
        Ok(())
    }

    async fn apply_to_task(
        &self,
        chat_id: ChatId,
        text: &str,
        action: TaskAction,
    ) -> Result<(), TaskwardenError> {
        let Ok(raw) = text.trim().parse::<i64>() else {
            self.reply(OutboundMessage::text(chat_id, replies::BAD_TASK_ID))
                .await;
            return Ok(());
        };
        let id = TaskId(raw);

        let outcome = match action {
            TaskAction::Done => self.storage.mark_task_as_done(id).await,
            TaskAction::Close => self.storage.mark_task_as_closed(id).await,
            TaskAction::Delete => self.storage.delete_task(id).await,
        };

        match outcome {
            Ok(()) => {}
            Err(TaskwardenError::TaskNotFound(_)) => {
                self.storage.set_stage(chat_id, Stage::Default).await?;
                self.reply(OutboundMessage::text(chat_id, replies::task_not_found(id)))
                    .await;
                return Ok(());
            }
            Err(TaskwardenError::Unsupported { backend, operation }) => {
                warn!(chat_id = %chat_id, task_id = %id, backend, operation, "operation unsupported");
                self.storage.set_stage(chat_id, Stage::Default).await?;
                self.reply(OutboundMessage::text(chat_id, replies::DELETE_UNSUPPORTED))
                    .await;
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        self.storage.set_stage(chat_id, Stage::Default).await?;
        info!(chat_id = %chat_id, task_id = %id, action = ?action, "task updated");

        let status = match action {
            TaskAction::Done => TaskStatus::Done,
            TaskAction::Close => TaskStatus::Closed,
            TaskAction::Delete => {
                self.reply(OutboundMessage::text(chat_id, replies::TASK_DELETED))
                    .await;
                return Ok(());
            }
        };
        self.reply(OutboundMessage::text(chat_id, replies::status_changed(status)))
            .await;
        self.notify_about(chat_id, id).await;
        Ok(())
    }

    async fn change_deadline(&self, chat_id: ChatId, text: &str) -> Result<(), TaskwardenError> {
        let parsed = text
            .trim()
            .split_once(' ')
            .and_then(|(id, rest)| id.parse::<i64>().ok().map(|id| (TaskId(id), rest)));
        let Some((id, rest)) = parsed else {
            self.reply(OutboundMessage::text(chat_id, replies::BAD_ID_AND_DEADLINE))
                .await;
            return Ok(());
        };
        let Some(deadline) = self.read_future_deadline(chat_id, rest).await else {
            return Ok(());
        };

        match self.storage.change_task_deadline(id, deadline).await {
            Ok(()) => {}
            Err(TaskwardenError::TaskNotFound(_)) => {
                self.storage.set_stage(chat_id, Stage::Default).await?;
                self.reply(OutboundMessage::text(chat_id, replies::task_not_found(id)))
                    .await;
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        self.storage.set_stage(chat_id, Stage::Default).await?;
        info!(chat_id = %chat_id, task_id = %id, "deadline changed");
        self.reply(OutboundMessage::text(
            chat_id,
            replies::deadline_changed(id, deadline),
        ))
        .await;
        self.notify_about(chat_id, id).await;
        Ok(())
    }

    /// Parses a deadline that lies strictly in the future, replying with the
    /// matching re-prompt otherwise.
    async fn read_future_deadline(
        &self,
        chat_id: ChatId,
        text: &str,
    ) -> Option<chrono::DateTime<chrono::Utc>> {
        let Ok(deadline) = parse_deadline(text) else {
            self.reply(OutboundMessage::text(chat_id, replies::BAD_DATETIME))
                .await;
            return None;
        };
        if deadline <= self.clock.now() {
            self.reply(OutboundMessage::text(chat_id, replies::DEADLINE_IN_PAST))
                .await;
            return None;
        }
        Some(deadline)
    }

    /// Tells observers other than `actor` about the current state of a task.
    /// Failures are logged.
    async fn notify_about(&self, actor: ChatId, id: TaskId) {
        let task = match self.storage.get_all_tasks().await {
            Ok(tasks) => tasks.into_iter().find(|task| task.id == id),
            Err(e) => {
                warn!(task_id = %id, error = %e, "failed to load task for notification");
                return;
            }
        };
        let Some(task) = task else {
            debug!(task_id = %id, "task vanished before notification");
            return;
        };
        if let Err(e) = self.notifier.notify_observers(&task, &[actor]).await {
            warn!(task_id = %id, error = %e, "failed to notify observers");
        }
    }
}
