// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Warden integration tests.
//!
//! Provides a recording transport and a harness that wires the real
//! dispatcher to in-memory (or temporary SQLite) stores, so tests run
//! without a Telegram connection.
//!
//! # Components
//!
//! - [`MockTransport`] - captures every outbound effect, can fail chosen chats
//! - [`TestHarness`] - full pipeline with synchronous notification draining

pub mod harness;
pub mod mock_transport;

pub use harness::{TestHarness, TestHarnessBuilder, profile};
pub use mock_transport::MockTransport;
