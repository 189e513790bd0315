// SPDX-FileCopyrightText: 2026 Taskwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram channel adapter for the Taskwarden bot.
//!
//! Implements [`ChannelAdapter`] for the Telegram Bot API via teloxide:
//! long polling, HTML replies with reply keyboards, message deletion and
//! per-chat command menus.

pub mod handler;

use std::time::Duration;

use async_trait::async_trait;
use taskwarden_config::model::TelegramConfig;
use taskwarden_core::error::TaskwardenError;
use taskwarden_core::traits::{ChannelAdapter, PluginAdapter};
use taskwarden_core::types::{
    AdapterType, BotCommand, ChatId, HealthStatus, InboundMessage, MessageId, OutboundMessage,
    ParseMode,
};
use teloxide::update_listeners::Polling;
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::types::{BotCommandScope, Recipient};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

/// Telegram channel adapter implementing [`ChannelAdapter`].
///
/// Long polling runs on a background task started by `connect`; inbound
/// messages are buffered in a bounded channel drained by `receive`.
pub struct TelegramChannel {
    bot: Bot,
    config: TelegramConfig,
    inbound_rx: Mutex<mpsc::Receiver<InboundMessage>>,
    inbound_tx: mpsc::Sender<InboundMessage>,
    polling_handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl TelegramChannel {
    /// Creates a new Telegram channel adapter.
    ///
    /// Requires `config.bot_token` to be set.
    pub fn new(config: TelegramConfig) -> Result<Self, TaskwardenError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            TaskwardenError::Config("telegram.bot_token is required for Telegram adapter".into())
        })?;

        if token.is_empty() {
            return Err(TaskwardenError::Config(
                "telegram.bot_token cannot be empty".into(),
            ));
        }

        let bot = Bot::new(token);
        let (inbound_tx, inbound_rx) = mpsc::channel(100);

        Ok(Self {
            bot,
            config,
            inbound_rx: Mutex::new(inbound_rx),
            inbound_tx,
            polling_handle: Mutex::new(None),
        })
    }

    /// Returns a reference to the underlying teloxide Bot.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
    teloxide::types::ChatId(chat_id.0)
}

fn chat_scope(chat_id: ChatId) -> BotCommandScope {
    BotCommandScope::Chat {
        chat_id: Recipient::Id(tg_chat(chat_id)),
    }
}

fn channel_error(action: &str, e: teloxide::RequestError) -> TaskwardenError {
    TaskwardenError::Channel {
        message: format!("failed to {action}: {e}"),
        source: Some(Box::new(e)),
    }
}

#[async_trait]
impl PluginAdapter for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, TaskwardenError> {
        // getMe doubles as a token check.
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Telegram bot unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), TaskwardenError> {
        if let Some(handle) = self.polling_handle.lock().await.take() {
            handle.abort();
            debug!("Telegram polling stopped");
        }
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for TelegramChannel {
    async fn connect(&mut self) -> Result<(), TaskwardenError> {
        let mut slot = self.polling_handle.lock().await;
        if slot.is_some() {
            return Ok(()); // Already connected
        }

        let bot = self.bot.clone();
        let tx = self.inbound_tx.clone();
        let timeout = Duration::from_secs(u64::from(self.config.poll_timeout_secs));

        info!(timeout_secs = timeout.as_secs(), "starting Telegram long polling");

        let handle = tokio::spawn(async move {
            let handler = Update::filter_message().endpoint(move |msg: Message| {
                let tx = tx.clone();
                async move {
                    if let Some(inbound) = handler::to_inbound_message(&msg) {
                        if tx.send(inbound).await.is_err() {
                            warn!("inbound channel closed, dropping message");
                        }
                    }
                    respond(())
                }
            });

            let listener = Polling::builder(bot.clone()).timeout(timeout).build();
            let mut dispatcher = Dispatcher::builder(bot, handler)
                .default_handler(|_| async {}) // Silently ignore non-message updates
                .build();
            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("error from Telegram update listener"),
                )
                .await;
        });

        *slot = Some(handle);
        Ok(())
    }

    async fn receive(&self) -> Result<InboundMessage, TaskwardenError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await.ok_or_else(|| TaskwardenError::Channel {
            message: "Telegram inbound channel closed".into(),
            source: None,
        })
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, TaskwardenError> {
        let mut request = self.bot.send_message(tg_chat(msg.chat_id), msg.text);
        if let Some(ParseMode::Html) = msg.parse_mode {
            request = request.parse_mode(teloxide::types::ParseMode::Html);
        }
        if let Some(keyboard) = &msg.keyboard {
            request = request.reply_markup(handler::to_reply_markup(keyboard));
        }

        let sent = request
            .await
            .map_err(|e| channel_error("send message", e))?;
        Ok(MessageId(sent.id.0))
    }

    async fn delete_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<(), TaskwardenError> {
        self.bot
            .delete_message(tg_chat(chat_id), teloxide::types::MessageId(message_id.0))
            .await
            .map_err(|e| channel_error("delete message", e))?;
        Ok(())
    }

    async fn get_commands(&self, chat_id: ChatId) -> Result<Vec<BotCommand>, TaskwardenError> {
        let commands = self
            .bot
            .get_my_commands()
            .scope(chat_scope(chat_id))
            .await
            .map_err(|e| channel_error("get commands", e))?;
        Ok(handler::from_telegram_commands(commands))
    }

    async fn set_commands(
        &self,
        chat_id: ChatId,
        commands: Vec<BotCommand>,
    ) -> Result<(), TaskwardenError> {
        self.bot
            .set_my_commands(handler::to_telegram_commands(commands))
            .scope(chat_scope(chat_id))
            .await
            .map_err(|e| channel_error("set commands", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(token: Option<&str>) -> TelegramConfig {
        TelegramConfig {
            bot_token: token.map(str::to_string),
            ..TelegramConfig::default()
        }
    }

    #[test]
    fn new_requires_bot_token() {
        assert!(TelegramChannel::new(config(None)).is_err());
    }

    #[test]
    fn new_rejects_empty_token() {
        assert!(TelegramChannel::new(config(Some(""))).is_err());
    }

    #[test]
    fn new_accepts_valid_token() {
        let channel =
            TelegramChannel::new(config(Some("123456:ABC-DEF1234ghIkl-zyx57W2v1u123ew11"))).unwrap();
        assert_eq!(channel.name(), "telegram");
        assert_eq!(channel.adapter_type(), AdapterType::Channel);
    }

    #[test]
    fn chat_scope_targets_the_chat() {
        let BotCommandScope::Chat { chat_id } = chat_scope(ChatId(100)) else {
            panic!("expected a chat scope");
        };
        assert_eq!(chat_id, Recipient::Id(teloxide::types::ChatId(100)));
    }

    #[tokio::test]
    async fn shutdown_without_connect_is_noop() {
        let channel = TelegramChannel::new(config(Some("test:token"))).unwrap();
        channel.shutdown().await.unwrap();
    }
}
