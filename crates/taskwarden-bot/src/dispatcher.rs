// SPDX-FileCopyrightText: 2026 Taskwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Update dispatcher: a fixed pool of workers behind a bounded queue.
//!
//! Updates of one chat are handled one at a time and in arrival order;
//! updates of different chats run concurrently. Each update is appended to
//! the mailbox under its chat lock, so the recorded text can depend on the
//! stage the chat is in when the update is handled.

use std::sync::Arc;
use std::task::Poll;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use taskwarden_core::types::{InboundMessage, MessageContent};
use taskwarden_core::{ChannelAdapter, ChatId, StorageAdapter, TaskwardenError};

use crate::TaskBot;

type ChatLocks = DashMap<ChatId, Arc<Mutex<()>>>;

/// Mailbox text stored in place of a password answer.
pub const REDACTED_TEXT: &str = "[скрыто]";

/// Pulls updates from the channel and hands them to a worker pool.
pub struct Dispatcher {
    bot: Arc<TaskBot>,
    channel: Arc<dyn ChannelAdapter>,
    storage: Arc<dyn StorageAdapter>,
    workers: usize,
    locks: Arc<ChatLocks>,
}

impl Dispatcher {
    pub fn new(
        bot: Arc<TaskBot>,
        channel: Arc<dyn ChannelAdapter>,
        storage: Arc<dyn StorageAdapter>,
        workers: usize,
    ) -> Self {
        Self {
            bot,
            channel,
            storage,
            workers: workers.max(1),
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Runs until `cancel` fires or the channel stops delivering.
    ///
    /// On exit the queue is closed and every update already queued is
    /// handled before the workers are joined.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), TaskwardenError> {
        let (tx, rx) = mpsc::channel::<InboundMessage>(self.workers);
        let rx = Arc::new(Mutex::new(rx));

        let mut pool = JoinSet::new();
        for worker in 0..self.workers {
            pool.spawn(worker_loop(
                worker,
                rx.clone(),
                self.bot.clone(),
                self.storage.clone(),
                self.locks.clone(),
            ));
        }
        info!(workers = self.workers, "dispatcher running");

        loop {
            let msg = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping dispatcher");
                    break;
                }
                received = self.channel.receive() => match received {
                    Ok(msg) => msg,
                    Err(e) => {
                        error!(error = %e, "channel receive error, stopping dispatcher");
                        break;
                    }
                },
            };

            let chat_id = msg.chat_id;

            // Blocks while all workers are busy and the queue is full.
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(%chat_id, "shutdown while queue full, dropping update");
                    break;
                }
                sent = tx.send(msg) => {
                    if sent.is_err() {
                        error!("worker queue closed unexpectedly");
                        break;
                    }
                }
            }
        }

        drop(tx);
        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "dispatcher worker panicked");
            }
        }
        info!("dispatcher stopped");
        Ok(())
    }
}

async fn worker_loop(
    worker: usize,
    rx: Arc<Mutex<mpsc::Receiver<InboundMessage>>>,
    bot: Arc<TaskBot>,
    storage: Arc<dyn StorageAdapter>,
    locks: Arc<ChatLocks>,
) {
    loop {
        let Some((msg, guard)) = next_update(&rx, &locks).await else {
            break;
        };
        let chat_id = msg.chat_id;
        record(storage.as_ref(), &msg).await;
        bot.handle(msg).await;
        drop(guard);
        locks.remove_if(&chat_id, |_, lock| Arc::strong_count(lock) == 1);
    }
    debug!(worker, "dispatcher worker stopped");
}

/// Appends the update to the mailbox drained by the reconciler.
///
/// Must run under the chat lock: free text sent while the chat waits for a
/// role password is stored as [`REDACTED_TEXT`].
async fn record(storage: &dyn StorageAdapter, msg: &InboundMessage) {
    let text = match &msg.content {
        MessageContent::Command { name, args } if args.is_empty() => format!("/{name}"),
        MessageContent::Command { name, args } => format!("/{name} {args}"),
        MessageContent::Text(text) => match storage.get_stage(msg.chat_id).await {
            Ok(Some(stage)) if stage.target_role().is_some() => REDACTED_TEXT.to_string(),
            Ok(_) => text.clone(),
            Err(e) => {
                warn!(chat_id = %msg.chat_id, error = %e, "failed to read stage, redacting update");
                REDACTED_TEXT.to_string()
            }
        },
    };
    if let Err(e) = storage.add_message(msg.chat_id, &text).await {
        warn!(chat_id = %msg.chat_id, error = %e, "failed to record inbound message");
    }
}

/// Takes the next update and its chat lock.
///
/// The lock request is queued while the receiver is still held, so two
/// updates of one chat acquire the lock in the order they were dequeued.
async fn next_update(
    rx: &Mutex<mpsc::Receiver<InboundMessage>>,
    locks: &ChatLocks,
) -> Option<(InboundMessage, OwnedMutexGuard<()>)> {
    let mut receiver = rx.lock().await;
    let msg = receiver.recv().await?;
    let lock = locks.entry(msg.chat_id).or_default().clone();

    let mut acquire = Box::pin(lock.lock_owned());
    let guard = match futures::poll!(acquire.as_mut()) {
        Poll::Ready(guard) => {
            drop(receiver);
            guard
        }
        Poll::Pending => {
            drop(receiver);
            acquire.await
        }
    };
    Some((msg, guard))
}
