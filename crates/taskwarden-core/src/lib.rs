// SPDX-FileCopyrightText: 2026 Taskwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Taskwarden bot.
//!
//! Defines the domain model (chats, roles, stages, tasks), the error type,
//! and the adapter traits implemented by the storage backends and the
//! messaging gateway.

pub mod clock;
pub mod domain;
pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use clock::{Clock, SystemClock};
pub use domain::{Chat, NewTask, QueuedMessage, Role, Stage, Task, TaskDraft, TaskStatus};
pub use error::TaskwardenError;
pub use types::{AdapterType, ChatId, HealthStatus, MessageId, TaskId};

pub use traits::{ChannelAdapter, PluginAdapter, StorageAdapter};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_variants_are_soft() {
        assert!(TaskwardenError::TaskNotFound(TaskId(7)).is_not_found());
        assert!(TaskwardenError::ChatNotFound(ChatId(1)).is_not_found());
        assert!(!TaskwardenError::Internal("x".into()).is_not_found());
        assert!(
            !TaskwardenError::Unsupported {
                backend: "memory",
                operation: "delete_task",
            }
            .is_not_found()
        );
    }

    #[test]
    fn adapter_type_round_trips_through_strings() {
        use std::str::FromStr;

        for variant in [AdapterType::Channel, AdapterType::Storage] {
            let parsed = AdapterType::from_str(&variant.to_string()).expect("should parse back");
            assert_eq!(variant, parsed);
        }
    }

    #[test]
    fn task_not_found_message_names_the_id() {
        assert_eq!(TaskwardenError::TaskNotFound(TaskId(7)).to_string(), "task 7 not found");
    }
}
