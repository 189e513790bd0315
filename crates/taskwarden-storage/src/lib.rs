// SPDX-FileCopyrightText: 2026 Taskwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage backends for the Taskwarden bot.
//!
//! [`SqliteStorage`] persists chats, tasks, drafts and the mailbox in a single
//! SQLite file with embedded migrations. [`MemoryStorage`] keeps the same data
//! in process memory and does not support task deletion.

pub mod adapter;
pub mod database;
pub mod memory;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
pub use memory::MemoryStorage;
