// SPDX-FileCopyrightText: 2026 Colloquy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Colloquy integration tests.
//!
//! Provides a mock transport and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without a chat platform connection.
//!
//! # Components
//!
//! - [`MockTransport`] - Mock chat transport with event injection and traffic capture
//! - [`TestHarness`] - A complete engine stack over a mock transport

pub mod harness;
pub mod mock_transport;

pub use harness::{channel_message, direct_message, interaction, RunningHarness, TestHarness};
pub use mock_transport::MockTransport;
