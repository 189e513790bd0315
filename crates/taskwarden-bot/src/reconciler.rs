// SPDX-FileCopyrightText: 2026 Taskwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic background pass: drain and prune the mailbox, flag expired tasks
//! and tell observers about them.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use taskwarden_core::{Clock, StorageAdapter, TaskwardenError};

use crate::notifier::Notifier;

/// What one tick did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    pub messages_drained: usize,
    pub messages_pruned: usize,
    pub tasks_expired: usize,
    pub notifications_sent: usize,
}

pub struct Reconciler {
    storage: Arc<dyn StorageAdapter>,
    notifier: Notifier,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl Reconciler {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        notifier: Notifier,
        clock: Arc<dyn Clock>,
        interval: Duration,
    ) -> Self {
        Self {
            storage,
            notifier,
            clock,
            interval,
        }
    }

    /// Ticks until `cancel` fires. A failed tick is logged and the loop
    /// carries on. Ticks never overlap.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_ms = self.interval.as_millis() as u64, "reconciler started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("reconciler shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    match self.tick().await {
                        Ok(summary) if summary != TickSummary::default() => {
                            debug!(?summary, "reconciler tick");
                        }
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "reconciler tick failed"),
                    }
                }
            }
        }
    }

    /// Runs one reconciliation pass.
    pub async fn tick(&self) -> Result<TickSummary, TaskwardenError> {
        let mut summary = TickSummary::default();

        for message in self.storage.get_unhandled_messages().await? {
            self.storage.set_message_handled(message.id).await?;
            summary.messages_drained += 1;
        }
        summary.messages_pruned = self.storage.prune_handled_messages().await?;

        let expired = self
            .storage
            .get_expired_tasks_to_mark(self.clock.now())
            .await?;
        summary.tasks_expired = expired.len();

        for task in &expired {
            info!(task_id = %task.id, "task expired");
            match self.notifier.notify_observers(task, &[]).await {
                Ok(report) => summary.notifications_sent += report.delivered,
                Err(e) => warn!(task_id = %task.id, error = %e, "failed to notify about expired task"),
            }
        }
        Ok(summary)
    }
}
