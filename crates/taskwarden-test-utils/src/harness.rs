// SPDX-FileCopyrightText: 2026 Taskwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness assembling a [`TaskBot`] over mock adapters.
//!
//! Uses the in-memory store by default, a temporary SQLite database on
//! request, a [`MockChannel`] and a [`ManualClock`]. Role passwords are
//! hashed with cheap Argon2id parameters.

use std::sync::Arc;

use chrono::Duration;

use taskwarden_bot::auth::{KdfParams, RoleSecrets};
use taskwarden_bot::{Reconciler, TaskBot};
use taskwarden_core::types::InboundMessage;
use taskwarden_core::{ChatId, Role, Stage, StorageAdapter, TaskwardenError};
use taskwarden_storage::{MemoryStorage, SqliteStorage};

use crate::clock::ManualClock;
use crate::inbound;
use crate::mock_channel::MockChannel;

/// Argon2id parameters small enough for unit tests.
pub const CHEAP_KDF: KdfParams = KdfParams {
    memory_cost: 8,
    iterations: 1,
    parallelism: 1,
};

/// Password accepted for every role in a default harness.
pub fn password_for(role: Role) -> String {
    format!("{role}-secret")
}

/// Builder for creating test environments with configurable options.
pub struct TestBotBuilder {
    sqlite: bool,
    passwords: bool,
}

impl TestBotBuilder {
    fn new() -> Self {
        Self {
            sqlite: false,
            passwords: true,
        }
    }

    /// Back the bot with a temporary SQLite database instead of memory.
    pub fn with_sqlite(mut self) -> Self {
        self.sqlite = true;
        self
    }

    /// Leave every role without a password.
    pub fn without_passwords(mut self) -> Self {
        self.passwords = false;
        self
    }

    pub async fn build(self) -> Result<TestBot, TaskwardenError> {
        let (storage, temp_dir): (Arc<dyn StorageAdapter>, _) = if self.sqlite {
            let temp_dir =
                tempfile::TempDir::new().map_err(|e| TaskwardenError::Storage { source: e.into() })?;
            let config = taskwarden_config::model::StorageConfig {
                database_path: temp_dir.path().join("test.db").to_string_lossy().to_string(),
                ..Default::default()
            };
            (Arc::new(SqliteStorage::new(config)), Some(temp_dir))
        } else {
            (Arc::new(MemoryStorage::new()), None)
        };
        storage.initialize().await?;

        let mut secrets = RoleSecrets::default();
        if self.passwords {
            for role in Role::ASSIGNABLE {
                secrets.insert(role, &password_for(role), CHEAP_KDF)?;
            }
        }

        let channel = Arc::new(MockChannel::new());
        let clock = Arc::new(ManualClock::starting_now());
        let bot = Arc::new(TaskBot::new(
            storage.clone(),
            channel.clone(),
            secrets,
            clock.clone(),
        ));

        Ok(TestBot {
            bot,
            storage,
            channel,
            clock,
            _temp_dir: temp_dir,
        })
    }
}

/// A bot wired to mock adapters.
pub struct TestBot {
    pub bot: Arc<TaskBot>,
    pub storage: Arc<dyn StorageAdapter>,
    pub channel: Arc<MockChannel>,
    pub clock: Arc<ManualClock>,
    _temp_dir: Option<tempfile::TempDir>,
}

impl TestBot {
    pub fn builder() -> TestBotBuilder {
        TestBotBuilder::new()
    }

    /// Memory-backed bot with a password for every role.
    pub async fn new() -> Result<Self, TaskwardenError> {
        Self::builder().build().await
    }

    /// Handles one message directly, bypassing the dispatcher.
    pub async fn handle(&self, msg: InboundMessage) {
        self.bot.handle(msg).await;
    }

    /// Sends `body` from `chat_id` and returns the last reply to that chat.
    pub async fn say(&self, chat_id: i64, body: &str) -> Option<String> {
        self.handle(inbound::text(chat_id, body)).await;
        self.channel.last_text(ChatId(chat_id)).await
    }

    /// Registers a chat that already finished the introduction, with `role`.
    pub async fn register(&self, chat_id: i64, username: &str, role: Role) -> Result<(), TaskwardenError> {
        let id = ChatId(chat_id);
        self.storage.add_chat(id, username, None, role).await?;
        self.storage.set_role_and_stage(id, role, Stage::Default).await
    }

    /// A reconciler over the same storage, clock and channel.
    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(
            self.storage.clone(),
            self.bot.notifier().clone(),
            self.clock.clone(),
            std::time::Duration::from_millis(10),
        )
    }

    /// Deadline text `offset` away from the harness clock.
    pub fn deadline_in(&self, offset: Duration) -> String {
        use taskwarden_core::Clock;
        taskwarden_core::domain::format_deadline(self.clock.now() + offset)
    }
}
