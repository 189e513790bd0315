// SPDX-FileCopyrightText: 2026 Taskwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Slash command handling.

use std::collections::BTreeMap;
use std::str::FromStr;

use tracing::{debug, info};

use taskwarden_core::types::{InboundMessage, OutboundMessage};
use taskwarden_core::{Chat, ChatId, HealthStatus, Role, Stage, Task, TaskwardenError};

use crate::TaskBot;
use crate::commands::{self, Command};
use crate::replies;

impl TaskBot {
    pub(crate) async fn handle_command(
        &self,
        msg: &InboundMessage,
        name: &str,
    ) -> Result<(), TaskwardenError> {
        let chat_id = msg.chat_id;
        let chat = self.ensure_registered(msg).await?;

        let command = match Command::from_str(name) {
            Ok(command) if commands::is_allowed(chat.role, command) => command,
            _ => {
                info!(chat_id = %chat_id, command = name, role = %chat.role, "rejected command");
                self.reply(OutboundMessage::text(chat_id, replies::UNKNOWN_COMMAND))
                    .await;
                return Ok(());
            }
        };
        debug!(chat_id = %chat_id, command = %command, role = %chat.role, "running command");

        match command {
            Command::Start => {
                self.reply(OutboundMessage::html(chat_id, replies::WELCOME))
                    .await;
                self.refresh_menu(chat_id, chat.role).await;
            }
            Command::GetRole => {
                self.reply(OutboundMessage::html(chat_id, replies::your_role(chat.role)))
                    .await;
            }
            Command::BecomeExecutor
            | Command::BecomeObserver
            | Command::BecomeChief
            | Command::BecomeAdmin => {
                let stage = command
                    .requested_role()
                    .and_then(Role::password_stage)
                    .ok_or_else(|| {
                        TaskwardenError::Internal(format!("{command} has no password stage"))
                    })?;
                self.prompt(chat_id, stage, replies::ENTER_PASSWORD).await?;
            }
            Command::AddTask => {
                self.storage.clear_task_in_progress(chat_id).await?;
                self.prompt(chat_id, Stage::AddTaskName, replies::ENTER_TASK_NAME)
                    .await?;
            }
            Command::DoTask => {
                self.prompt(chat_id, Stage::MarkTaskAsDone, replies::ENTER_TASK_ID)
                    .await?;
            }
            Command::CloseTask => {
                self.prompt(chat_id, Stage::MarkTaskAsClosed, replies::ENTER_TASK_ID)
                    .await?;
            }
            Command::DeleteTask => {
                self.prompt(chat_id, Stage::DeleteTask, replies::ENTER_TASK_ID)
                    .await?;
            }
            Command::ChangeDeadline => {
                self.prompt(chat_id, Stage::ChangeDeadline, replies::ENTER_ID_AND_DEADLINE)
                    .await?;
            }
            Command::GetAllTasks => {
                let tasks = self.storage.get_all_tasks().await?;
                self.send_list(chat_id, &tasks, replies::NO_TASKS).await;
            }
            Command::GetOpenTasks => {
                let tasks = self.storage.get_open_tasks().await?;
                self.send_list(chat_id, &tasks, replies::NO_OPEN_TASKS).await;
            }
            Command::GetDoneTasks => {
                let tasks = self.storage.get_done_tasks().await?;
                self.send_list(chat_id, &tasks, replies::NO_DONE_TASKS).await;
            }
            Command::GetClosedTasks => {
                let tasks = self.storage.get_closed_tasks().await?;
                self.send_list(chat_id, &tasks, replies::NO_CLOSED_TASKS).await;
            }
            Command::GetExpiredTasks => {
                let tasks = self.storage.get_expired_tasks().await?;
                self.send_list(chat_id, &tasks, replies::NO_EXPIRED_TASKS).await;
            }
            Command::GetSelfTasks => {
                let tasks = self.self_tasks(&chat).await?;
                self.send_list(chat_id, &tasks, replies::NO_SELF_TASKS).await;
            }
            Command::Healthz => {
                let report = self.health_report().await;
                self.reply(OutboundMessage::text(chat_id, report)).await;
            }
            Command::Debug => {
                let dump = self.storage.debug_storage().await?;
                self.reply(OutboundMessage::text(
                    chat_id,
                    replies::debug_dump(chat_id.0, &dump),
                ))
                .await;
            }
        }
        Ok(())
    }

    /// Moves the chat into `stage` and asks for its input.
    async fn prompt(
        &self,
        chat_id: ChatId,
        stage: Stage,
        text: &str,
    ) -> Result<(), TaskwardenError> {
        self.storage.set_stage(chat_id, stage).await?;
        self.reply(OutboundMessage::text(chat_id, text)).await;
        Ok(())
    }

    async fn send_list(&self, chat_id: ChatId, tasks: &[Task], empty: &str) {
        let text = replies::task_list(tasks, self.clock.now(), empty);
        self.reply(OutboundMessage::html(chat_id, text)).await;
    }

    /// Tasks assigned to the chat's username or phone, by id.
    async fn self_tasks(&self, chat: &Chat) -> Result<Vec<Task>, TaskwardenError> {
        let mut found = BTreeMap::new();
        for contact in [Some(chat.username.as_str()), chat.phone.as_deref()]
            .into_iter()
            .flatten()
            .filter(|c| !c.is_empty())
        {
            for task in self.storage.get_user_tasks(contact).await? {
                found.insert(task.id, task);
            }
        }
        Ok(found.into_values().collect())
    }

    async fn health_report(&self) -> String {
        let storage = self
            .storage
            .health_check()
            .await
            .unwrap_or_else(|e| HealthStatus::Unhealthy(e.to_string()));
        let channel = self
            .channel
            .health_check()
            .await
            .unwrap_or_else(|e| HealthStatus::Unhealthy(e.to_string()));

        if storage.is_healthy() && channel.is_healthy() {
            return replies::HEALTHY.to_string();
        }
        format!(
            "storage ({}): {storage:?}\nchannel ({}): {channel:?}",
            self.storage.name(),
            self.channel.name()
        )
    }
}
