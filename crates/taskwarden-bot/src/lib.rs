// SPDX-FileCopyrightText: 2026 Taskwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation engine for the Taskwarden bot.
//!
//! [`TaskBot`] turns one inbound message into storage changes, exactly one
//! reply and optional notifications:
//! - slash commands go through the role access table in [`commands`]
//! - free text is interpreted by the chat's current [`Stage`](taskwarden_core::Stage)
//!
//! [`dispatcher::Dispatcher`] feeds it from the channel with per-chat
//! ordering, and [`reconciler::Reconciler`] flags expired tasks in the
//! background.

pub mod auth;
pub mod commands;
pub mod dispatcher;
pub mod notifier;
pub mod reconciler;
pub mod replies;
mod router;
pub mod shutdown;
mod stage;

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use taskwarden_core::types::{InboundMessage, MessageContent, OutboundMessage};
use taskwarden_core::{
    ChannelAdapter, Chat, ChatId, Clock, Role, Stage, StorageAdapter, TaskwardenError,
};

pub use auth::RoleSecrets;
pub use dispatcher::Dispatcher;
pub use notifier::{Notifier, NotifyReport};
pub use reconciler::Reconciler;

/// Handles inbound messages for every chat.
///
/// Holds no per-chat state of its own; the stage and draft of each chat live
/// in storage. Callers serialize messages of the same chat.
pub struct TaskBot {
    storage: Arc<dyn StorageAdapter>,
    channel: Arc<dyn ChannelAdapter>,
    secrets: Arc<RoleSecrets>,
    clock: Arc<dyn Clock>,
    notifier: Notifier,
}

impl TaskBot {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        channel: Arc<dyn ChannelAdapter>,
        secrets: RoleSecrets,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let notifier = Notifier::new(storage.clone(), channel.clone(), clock.clone());
        Self {
            storage,
            channel,
            secrets: Arc::new(secrets),
            clock,
            notifier,
        }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Processes one inbound message.
    ///
    /// Never fails: infrastructure errors are logged and answered with a
    /// generic error reply, leaving the chat's stage as it was.
    pub async fn handle(&self, msg: InboundMessage) {
        let chat_id = msg.chat_id;
        let result = match &msg.content {
            MessageContent::Command { name, .. } => self.handle_command(&msg, name).await,
            MessageContent::Text(text) => self.handle_text(&msg, text).await,
        };

        if let Err(e) = result {
            error!(chat_id = %chat_id, error = %e, "failed to handle message");
            self.reply(OutboundMessage::text(chat_id, replies::GENERIC_ERROR))
                .await;
        }
    }

    /// Registers `chat_id` as an admin with a finished introduction and
    /// publishes the admin menu.
    pub async fn bootstrap_admin(
        &self,
        chat_id: ChatId,
        username: &str,
    ) -> Result<(), TaskwardenError> {
        let existing = self.storage.get_chat_by_id(chat_id).await?;
        let username = match (existing, username) {
            (Some(chat), "") => chat.username,
            (_, name) => name.to_string(),
        };
        self.storage
            .add_chat(chat_id, &username, None, Role::Admin)
            .await?;
        self.storage
            .set_role_and_stage(chat_id, Role::Admin, Stage::Default)
            .await?;
        self.refresh_menu(chat_id, Role::Admin).await;
        info!(chat_id = %chat_id, "admin chat bootstrapped");
        Ok(())
    }

    /// Loads the chat, registering it with role unknown on first contact.
    async fn ensure_registered(&self, msg: &InboundMessage) -> Result<Chat, TaskwardenError> {
        if let Some(chat) = self.storage.get_chat_by_id(msg.chat_id).await? {
            return Ok(chat);
        }
        let username = msg.username.as_deref().unwrap_or_default();
        self.storage
            .add_chat(msg.chat_id, username, None, Role::Unknown)
            .await?;
        debug!(chat_id = %msg.chat_id, "registered new chat");
        Ok(Chat {
            chat_id: msg.chat_id,
            username: username.to_string(),
            phone: None,
            role: Role::Unknown,
            stage: Stage::Unknown,
        })
    }

    /// Sends a reply, logging delivery failures.
    async fn reply(&self, msg: OutboundMessage) {
        let chat_id = msg.chat_id;
        if let Err(e) = self.channel.send(msg).await {
            warn!(chat_id = %chat_id, error = %e, "failed to send reply");
        }
    }

    /// Publishes the command menu of `role` in `chat_id` unless it is
    /// already shown. Failures are logged.
    async fn refresh_menu(&self, chat_id: ChatId, role: Role) {
        let menu = commands::menu_for(role);
        match self.channel.get_commands(chat_id).await {
            Ok(current) if current == menu => {
                debug!(chat_id = %chat_id, role = %role, "command menu already up to date");
                return;
            }
            Ok(_) => {}
            Err(e) => debug!(chat_id = %chat_id, error = %e, "could not read command menu"),
        }
        if let Err(e) = self.channel.set_commands(chat_id, menu).await {
            warn!(chat_id = %chat_id, role = %role, error = %e, "failed to set command menu");
        }
    }
}
