// SPDX-FileCopyrightText: 2026 Colloquy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport trait for chat platform integrations.

use async_trait::async_trait;

use crate::error::ColloquyError;
use crate::types::{ChannelId, ChatEvent, DirectorySnapshot, MessageHandle, OutboundMessage};

/// A bidirectional connection to a chat platform.
///
/// The engine drives exactly one transport: it pulls inbound events with
/// [`receive`](ChatTransport::receive) and pushes replies with
/// [`post`](ChatTransport::post) and [`update`](ChatTransport::update).
/// Implementations are expected to be connected before the engine starts.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Posts a new message and returns a handle usable for later edits.
    async fn post(&self, msg: OutboundMessage) -> Result<MessageHandle, ColloquyError>;

    /// Edits a previously posted message in place.
    ///
    /// Returns the (possibly refreshed) handle of the edited message.
    async fn update(
        &self,
        handle: &MessageHandle,
        msg: OutboundMessage,
    ) -> Result<MessageHandle, ColloquyError>;

    /// Waits for the next inbound event.
    ///
    /// An `Err` here means the event stream is broken and the engine
    /// should shut down.
    async fn receive(&self) -> Result<ChatEvent, ColloquyError>;

    /// Fetches the current workspace membership.
    async fn directory(&self) -> Result<DirectorySnapshot, ColloquyError>;

    /// Attaches an emoji reaction to an existing message.
    async fn add_reaction(
        &self,
        channel: &ChannelId,
        timestamp: &str,
        name: &str,
    ) -> Result<(), ColloquyError>;
}
