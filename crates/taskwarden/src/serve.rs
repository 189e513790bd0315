// SPDX-FileCopyrightText: 2026 Taskwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `taskwarden serve` command implementation.
//!
//! Opens the configured storage backend, connects the Telegram channel and
//! runs the update dispatcher and the reconciliation loop until SIGINT or
//! SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use taskwarden_bot::{Dispatcher, Reconciler, RoleSecrets, TaskBot, shutdown};
use taskwarden_config::model::{StorageBackend, StorageConfig, TaskwardenConfig};
use taskwarden_core::{
    ChannelAdapter, ChatId, PluginAdapter, StorageAdapter, SystemClock, TaskwardenError,
};
use taskwarden_storage::{MemoryStorage, SqliteStorage};
use taskwarden_telegram::TelegramChannel;

/// Runs the bot until a shutdown signal arrives.
pub async fn run_serve(config: TaskwardenConfig) -> Result<(), TaskwardenError> {
    init_tracing(config.bot.effective_log_level());

    info!(name = %config.bot.name, "starting taskwarden serve");

    let storage = open_storage(&config.storage).await?;

    let mut telegram = TelegramChannel::new(config.telegram.clone())?;
    telegram.connect().await?;
    info!("telegram channel connected");
    let channel: Arc<dyn ChannelAdapter> = Arc::new(telegram);

    let cancel = shutdown::install_signal_handler();
    run_bot(&config, storage, channel, cancel).await
}

/// Wires the bot over already opened adapters and runs it until `cancel`
/// fires. Closes both adapters before returning.
pub(crate) async fn run_bot(
    config: &TaskwardenConfig,
    storage: Arc<dyn StorageAdapter>,
    channel: Arc<dyn ChannelAdapter>,
    cancel: CancellationToken,
) -> Result<(), TaskwardenError> {
    let auth = config.auth.clone();
    let secrets = tokio::task::spawn_blocking(move || RoleSecrets::from_config(&auth))
        .await
        .map_err(|e| TaskwardenError::Internal(format!("password hashing panicked: {e}")))??;
    info!(?secrets, "role passwords loaded");

    let clock = Arc::new(SystemClock);
    let bot = Arc::new(TaskBot::new(
        storage.clone(),
        channel.clone(),
        secrets,
        clock.clone(),
    ));

    if let Some(admin) = config.telegram.admin_chat_id {
        let username = config.telegram.admin_username.as_deref().unwrap_or_default();
        if let Err(e) = bot.bootstrap_admin(ChatId(admin), username).await {
            warn!(chat_id = admin, error = %e, "failed to bootstrap admin chat");
        }
    }

    let reconciler = Reconciler::new(
        storage.clone(),
        bot.notifier().clone(),
        clock,
        Duration::from_secs(config.reconciler.interval_secs),
    );
    let reconciler_cancel = cancel.clone();
    let reconciler_handle = tokio::spawn(async move { reconciler.run(reconciler_cancel).await });

    let dispatcher = Dispatcher::new(
        bot,
        channel.clone(),
        storage.clone(),
        config.dispatcher.workers,
    );
    let dispatched = dispatcher.run(cancel.clone()).await;

    // The dispatcher may stop on its own when the channel fails.
    cancel.cancel();
    if let Err(e) = reconciler_handle.await {
        error!(error = %e, "reconciler task panicked");
    }

    if let Err(e) = channel.shutdown().await {
        warn!(error = %e, "channel shutdown failed");
    }
    if let Err(e) = storage.close().await {
        warn!(error = %e, "storage close failed");
    }
    info!("taskwarden stopped");
    dispatched
}

/// Opens and initializes the configured storage backend.
async fn open_storage(config: &StorageConfig) -> Result<Arc<dyn StorageAdapter>, TaskwardenError> {
    let storage: Arc<dyn StorageAdapter> = match config.backend {
        StorageBackend::Memory => {
            warn!("using in-memory storage, all data is lost on restart");
            Arc::new(MemoryStorage::new())
        }
        StorageBackend::Sqlite => Arc::new(SqliteStorage::new(config.clone())),
    };
    storage.initialize().await?;
    info!(backend = storage.name(), "storage initialized");
    Ok(storage)
}

/// Initialize the tracing subscriber with the configured log level.
///
/// `RUST_LOG` takes precedence when set.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("taskwarden={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    use taskwarden_core::{Role, Stage};
    use taskwarden_test_utils::{MockChannel, inbound};

    fn test_config() -> TaskwardenConfig {
        let mut config = TaskwardenConfig::default();
        config.telegram.admin_chat_id = Some(1);
        config.telegram.admin_username = Some("root".into());
        config.auth.admin_password = Some("root-pass".into());
        config.auth.kdf_memory_cost = 8;
        config.auth.kdf_iterations = 1;
        config.auth.kdf_parallelism = 1;
        config.dispatcher.workers = 2;
        config
    }

    #[tokio::test]
    async fn memory_backend_opens() {
        let config = StorageConfig {
            backend: StorageBackend::Memory,
            ..StorageConfig::default()
        };
        let storage = open_storage(&config).await.unwrap();
        assert_eq!(storage.name(), "memory");
    }

    #[tokio::test]
    async fn sqlite_backend_opens_at_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("serve.db");
        let config = StorageConfig {
            backend: StorageBackend::Sqlite,
            database_path: path.display().to_string(),
            wal_mode: true,
        };
        let storage = open_storage(&config).await.unwrap();
        assert_eq!(storage.name(), "sqlite");
        storage.close().await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn run_bot_bootstraps_admin_and_stops_on_cancel() {
        let config = test_config();
        let storage: Arc<dyn StorageAdapter> = Arc::new(MemoryStorage::new());
        storage.initialize().await.unwrap();
        let mock = Arc::new(MockChannel::new());
        mock.inject_message(inbound::text(1, "/healthz")).await;

        let cancel = CancellationToken::new();
        let running = tokio::spawn(run_bot_owned(
            config,
            storage.clone(),
            mock.clone(),
            cancel.clone(),
        ));

        tokio::time::timeout(Duration::from_secs(10), async {
            while mock.last_text(ChatId(1)).await.is_none() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("admin should get a health reply");
        cancel.cancel();
        running.await.unwrap().unwrap();

        let chat = storage.get_chat_by_id(ChatId(1)).await.unwrap().unwrap();
        assert_eq!(chat.role, Role::Admin);
        assert_eq!(chat.stage, Stage::Default);
        assert_eq!(chat.username, "root");
        assert!(mock.menu(ChatId(1)).await.is_some());
        assert_eq!(mock.last_text(ChatId(1)).await.as_deref(), Some("Status Ok!"));
    }

    async fn run_bot_owned(
        config: TaskwardenConfig,
        storage: Arc<dyn StorageAdapter>,
        channel: Arc<MockChannel>,
        cancel: CancellationToken,
    ) -> Result<(), TaskwardenError> {
        run_bot(&config, storage, channel, cancel).await
    }
}
