// SPDX-FileCopyrightText: 2026 Taskwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Taskwarden integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic tests without a Telegram connection.
//!
//! # Components
//!
//! - [`MockChannel`] - Mock messaging channel with message injection and capture
//! - [`ManualClock`] - Clock advanced explicitly by the test
//! - [`TestBot`] - Bot assembled over mock adapters

pub mod clock;
pub mod harness;
pub mod inbound;
pub mod mock_channel;

pub use clock::ManualClock;
pub use harness::{CHEAP_KDF, TestBot, TestBotBuilder, password_for};
pub use mock_channel::MockChannel;
