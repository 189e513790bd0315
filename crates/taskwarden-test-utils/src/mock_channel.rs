// SPDX-FileCopyrightText: 2026 Taskwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel adapter for deterministic testing.
//!
//! `MockChannel` implements `ChannelAdapter` with injectable inbound messages
//! and captured outbound traffic for assertion in tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use taskwarden_core::TaskwardenError;
use taskwarden_core::traits::adapter::PluginAdapter;
use taskwarden_core::traits::channel::ChannelAdapter;
use taskwarden_core::types::{
    AdapterType, BotCommand, ChatId, HealthStatus, InboundMessage, MessageId, OutboundMessage,
};

/// A mock messaging channel for testing.
///
/// - **inbound**: messages injected via `inject_message()` are returned by `receive()`
/// - **sent**: messages passed to `send()` are captured and retrievable via `sent_messages()`
/// - **deleted** and **menus** record `delete_message()` and `set_commands()` calls
pub struct MockChannel {
    inbound: Mutex<VecDeque<InboundMessage>>,
    notify: Notify,
    sent: Mutex<Vec<OutboundMessage>>,
    deleted: Mutex<Vec<(ChatId, MessageId)>>,
    menus: Mutex<HashMap<ChatId, Vec<BotCommand>>>,
    failing: Mutex<HashSet<ChatId>>,
    next_id: AtomicI32,
}

impl MockChannel {
    /// Create a new mock channel with empty queues.
    pub fn new() -> Self {
        Self {
            inbound: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            sent: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            menus: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            next_id: AtomicI32::new(1),
        }
    }

    /// Inject an inbound message into the receive queue.
    pub async fn inject_message(&self, msg: InboundMessage) {
        self.inbound.lock().await.push_back(msg);
        self.notify.notify_one();
    }

    /// Make every `send()` to `chat_id` fail from now on.
    pub async fn fail_for(&self, chat_id: ChatId) {
        self.failing.lock().await.insert(chat_id);
    }

    /// Get all messages that were sent through `send()`.
    pub async fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().await.clone()
    }

    /// Messages sent to one chat, in order.
    pub async fn sent_to(&self, chat_id: ChatId) -> Vec<OutboundMessage> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect()
    }

    /// Text of the most recent message sent to `chat_id`.
    pub async fn last_text(&self, chat_id: ChatId) -> Option<String> {
        self.sent_to(chat_id).await.pop().map(|m| m.text)
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Clear all sent messages.
    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }

    pub async fn deleted_messages(&self) -> Vec<(ChatId, MessageId)> {
        self.deleted.lock().await.clone()
    }

    /// The command menu last published for `chat_id`.
    pub async fn menu(&self, chat_id: ChatId) -> Option<Vec<BotCommand>> {
        self.menus.lock().await.get(&chat_id).cloned()
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockChannel {
    fn name(&self) -> &str {
        "mock-channel"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, TaskwardenError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TaskwardenError> {
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for MockChannel {
    async fn connect(&mut self) -> Result<(), TaskwardenError> {
        Ok(())
    }

    async fn receive(&self) -> Result<InboundMessage, TaskwardenError> {
        loop {
            {
                let mut queue = self.inbound.lock().await;
                if let Some(msg) = queue.pop_front() {
                    return Ok(msg);
                }
            }
            // Wait for notification that a new message was injected
            self.notify.notified().await;
        }
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, TaskwardenError> {
        if self.failing.lock().await.contains(&msg.chat_id) {
            return Err(TaskwardenError::Channel {
                message: format!("mock delivery to {} failed", msg.chat_id),
                source: None,
            });
        }
        let id = MessageId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.sent.lock().await.push(msg);
        Ok(id)
    }

    async fn delete_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<(), TaskwardenError> {
        self.deleted.lock().await.push((chat_id, message_id));
        Ok(())
    }

    async fn get_commands(&self, chat_id: ChatId) -> Result<Vec<BotCommand>, TaskwardenError> {
        Ok(self.menu(chat_id).await.unwrap_or_default())
    }

    async fn set_commands(
        &self,
        chat_id: ChatId,
        commands: Vec<BotCommand>,
    ) -> Result<(), TaskwardenError> {
        self.menus.lock().await.insert(chat_id, commands);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::inbound::text;

    #[tokio::test]
    async fn receive_returns_injected_messages_in_order() {
        let channel = MockChannel::new();
        channel.inject_message(text(1, "first")).await;
        channel.inject_message(text(1, "second")).await;

        let first = channel.receive().await.unwrap();
        let second = channel.receive().await.unwrap();
        assert_eq!(first.content, taskwarden_core::types::MessageContent::Text("first".into()));
        assert_eq!(second.content, taskwarden_core::types::MessageContent::Text("second".into()));
    }

    #[tokio::test]
    async fn receive_waits_for_injection() {
        let channel = Arc::new(MockChannel::new());
        let channel_clone = channel.clone();

        tokio::spawn(async move {
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
            channel_clone.inject_message(text(1, "delayed")).await;
        });

        let received = tokio::time::timeout(
            tokio::time::Duration::from_secs(2),
            channel.receive(),
        )
        .await
        .expect("receive timed out")
        .unwrap();
        assert_eq!(received.chat_id, ChatId(1));
    }

    #[tokio::test]
    async fn send_captures_and_numbers_messages() {
        let channel = MockChannel::new();
        let a = channel.send(OutboundMessage::text(ChatId(1), "a")).await.unwrap();
        let b = channel.send(OutboundMessage::text(ChatId(2), "b")).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(channel.sent_count().await, 2);
        assert_eq!(channel.last_text(ChatId(2)).await.as_deref(), Some("b"));

        channel.clear_sent().await;
        assert_eq!(channel.sent_count().await, 0);
    }

    #[tokio::test]
    async fn failing_chats_reject_sends() {
        let channel = MockChannel::new();
        channel.fail_for(ChatId(9)).await;
        assert!(channel.send(OutboundMessage::text(ChatId(9), "x")).await.is_err());
        assert!(channel.send(OutboundMessage::text(ChatId(8), "x")).await.is_ok());
        assert!(channel.sent_to(ChatId(9)).await.is_empty());
    }

    #[tokio::test]
    async fn menus_and_deletions_are_recorded() {
        let channel = MockChannel::new();
        assert!(channel.get_commands(ChatId(1)).await.unwrap().is_empty());
        channel
            .set_commands(ChatId(1), vec![BotCommand::new("start", "Начать")])
            .await
            .unwrap();
        assert_eq!(channel.get_commands(ChatId(1)).await.unwrap().len(), 1);

        channel.delete_message(ChatId(1), MessageId(5)).await.unwrap();
        assert_eq!(channel.deleted_messages().await, vec![(ChatId(1), MessageId(5))]);
    }
}
