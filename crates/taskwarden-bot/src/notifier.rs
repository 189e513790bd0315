// SPDX-FileCopyrightText: 2026 Taskwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Task update fan-out to observers and executors.
//!
//! Delivery is best-effort: every recipient is attempted and failures are
//! collected into a [`NotifyReport`] instead of aborting the fan-out.

use std::sync::Arc;

use tracing::{debug, warn};

use taskwarden_core::types::OutboundMessage;
use taskwarden_core::{ChannelAdapter, ChatId, Clock, StorageAdapter, Task, TaskwardenError};

use crate::replies;

/// Outcome of one fan-out.
#[derive(Debug, Default)]
pub struct NotifyReport {
    pub delivered: usize,
    pub failures: Vec<(ChatId, TaskwardenError)>,
}

impl NotifyReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    fn merge(&mut self, other: NotifyReport) {
        self.delivered += other.delivered;
        self.failures.extend(other.failures);
    }
}

/// Sends `UPD:` messages about changed tasks.
#[derive(Clone)]
pub struct Notifier {
    storage: Arc<dyn StorageAdapter>,
    channel: Arc<dyn ChannelAdapter>,
    clock: Arc<dyn Clock>,
}

impl Notifier {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        channel: Arc<dyn ChannelAdapter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            storage,
            channel,
            clock,
        }
    }

    /// Notifies every current observer except the chats in `exclude`.
    ///
    /// Observers are read from storage on every call.
    pub async fn notify_observers(
        &self,
        task: &Task,
        exclude: &[ChatId],
    ) -> Result<NotifyReport, TaskwardenError> {
        let observers = self.storage.get_observers().await?;
        let mut recipients: Vec<ChatId> = observers
            .into_keys()
            .filter(|id| !exclude.contains(id))
            .collect();
        recipients.sort_by_key(|id| id.0);

        let text = replies::notification(task, self.clock.now());
        let mut report = NotifyReport::default();
        for chat_id in recipients {
            report.merge(self.deliver(chat_id, &text).await);
        }
        log_report(task, "observers", &report);
        Ok(report)
    }

    /// Notifies the task's executor chat, if known and not excluded.
    pub async fn notify_executor(&self, task: &Task, exclude: &[ChatId]) -> NotifyReport {
        let Some(chat_id) = task.executor_chat_id else {
            return NotifyReport::default();
        };
        if exclude.contains(&chat_id) {
            return NotifyReport::default();
        }
        let report = self
            .deliver(chat_id, &replies::notification(task, self.clock.now()))
            .await;
        log_report(task, "executor", &report);
        report
    }

    async fn deliver(&self, chat_id: ChatId, text: &str) -> NotifyReport {
        let mut report = NotifyReport::default();
        match self.channel.send(OutboundMessage::html(chat_id, text)).await {
            Ok(_) => report.delivered += 1,
            Err(e) => report.failures.push((chat_id, e)),
        }
        report
    }
}

fn log_report(task: &Task, audience: &str, report: &NotifyReport) {
    for (chat_id, error) in &report.failures {
        warn!(task_id = %task.id, chat_id = %chat_id, error = %error, audience, "notification failed");
    }
    debug!(
        task_id = %task.id,
        audience,
        delivered = report.delivered,
        failed = report.failures.len(),
        "notification fan-out finished"
    );
}
