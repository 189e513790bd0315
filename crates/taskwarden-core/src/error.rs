// SPDX-FileCopyrightText: 2026 Taskwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Taskwarden bot.

use thiserror::Error;

use crate::types::{ChatId, TaskId};

/// The primary error type used across all Taskwarden adapter traits and core operations.
#[derive(Debug, Error)]
pub enum TaskwardenError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, corrupt rows).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Channel adapter errors (connection failure, rejected request, rate limiting).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A task-id lookup found nothing.
    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    /// A chat-id lookup found nothing.
    #[error("chat {0} not found")]
    ChatNotFound(ChatId),

    /// The storage backend does not implement this operation.
    #[error("operation `{operation}` is not supported by the {backend} backend")]
    Unsupported {
        backend: &'static str,
        operation: &'static str,
    },

    /// Malformed user input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Password hashing or verification infrastructure failed.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Adapter health check failed.
    #[error("health check failed for {name}: {source}")]
    HealthCheckFailed {
        name: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TaskwardenError {
    /// Returns `true` for absence conditions, which callers treat as soft failures.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::TaskNotFound(_) | Self::ChatNotFound(_))
    }
}
