// SPDX-FileCopyrightText: 2026 Taskwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel adapter trait for the messaging platform.

use async_trait::async_trait;

use crate::error::TaskwardenError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{BotCommand, ChatId, InboundMessage, MessageId, OutboundMessage};

/// Adapter for the bidirectional messaging gateway.
#[async_trait]
pub trait ChannelAdapter: PluginAdapter {
    /// Starts receiving updates from the platform.
    async fn connect(&mut self) -> Result<(), TaskwardenError>;

    /// Receives the next inbound message.
    ///
    /// Fails once the update stream has ended.
    async fn receive(&self) -> Result<InboundMessage, TaskwardenError>;

    /// Sends a message, returning its platform id.
    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, TaskwardenError>;

    /// Deletes a message from a chat.
    async fn delete_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<(), TaskwardenError>;

    /// Returns the command menu currently shown in `chat_id`.
    async fn get_commands(&self, chat_id: ChatId) -> Result<Vec<BotCommand>, TaskwardenError>;

    /// Replaces the command menu shown in `chat_id`.
    async fn set_commands(
        &self,
        chat_id: ChatId,
        commands: Vec<BotCommand>,
    ) -> Result<(), TaskwardenError>;
}
