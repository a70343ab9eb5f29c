// SPDX-FileCopyrightText: 2026 Colloquy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP callback gateway for interactive chat elements.
//!
//! The chat platform delivers button clicks and dropdown selections as HTTP
//! webhooks, not over the event stream. The gateway receives them, verifies
//! the shared secret, extracts the answer value, and hands the result to the
//! engine as an ordinary [`ChatEvent::Interactive`] event.
//!
//! [`ChatEvent::Interactive`]: colloquy_core::ChatEvent::Interactive

pub mod payload;
pub mod server;

pub use payload::{InteractionForm, InteractivePayload, PayloadAction, SelectedOption};
pub use server::{router, start_server, GatewayState, ServerConfig};
