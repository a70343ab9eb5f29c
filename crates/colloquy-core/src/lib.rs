// SPDX-FileCopyrightText: 2026 Colloquy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Colloquy conversation engine.
//!
//! This crate provides the error type, the inbound event model, the outbound
//! message model, and the transport trait shared by every Colloquy crate.
//! The engine, the gateway, and each transport implementation all speak the
//! types defined here.

pub mod error;
pub mod transport;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::ColloquyError;
pub use transport::ChatTransport;
pub use types::{
    ChannelId, ChannelInfo, ChannelKind, ChatEvent, DirectorySnapshot, DmEntry, Element,
    InteractiveAction, MessageEvent, MessageHandle, OutboundMessage, SelectOptionDef, Severity,
    User, UserId,
};
