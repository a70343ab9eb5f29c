// SPDX-FileCopyrightText: 2026 Colloquy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared between the engine, the gateway, and transports.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for a chat user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for a channel or direct-message conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub String);

impl ChannelId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Classify the channel by its identifier prefix.
    ///
    /// The chat platform encodes the conversation type in the first byte of
    /// the identifier: `D` for direct messages, `C` for shared channels.
    pub fn kind(&self) -> ChannelKind {
        match self.0.as_bytes().first() {
            Some(b'D') => ChannelKind::Direct,
            Some(b'C') => ChannelKind::Channel,
            _ => ChannelKind::Other,
        }
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The conversation type a [`ChannelId`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// A one-on-one direct-message conversation.
    Direct,
    /// A shared channel with multiple members.
    Channel,
    /// Group DMs and anything else the engine does not route.
    Other,
}

/// Opaque handle to a message the bot has posted, used for later in-place edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHandle(pub String);

impl MessageHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// --- Directory types ---

/// A user known to the chat workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
}

/// A channel known to the chat workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub id: ChannelId,
    pub name: String,
}

/// A direct-message conversation and the user on its far end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DmEntry {
    pub channel: ChannelId,
    pub user: UserId,
}

/// A point-in-time snapshot of workspace membership, as reported by a transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectorySnapshot {
    /// The bot's own user identity, if the transport knows it.
    pub bot: Option<UserId>,
    pub users: Vec<User>,
    pub channels: Vec<ChannelInfo>,
    pub dms: Vec<DmEntry>,
}

// --- Inbound event types ---

/// A plain text message observed on a channel or DM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    pub channel: ChannelId,
    pub user: UserId,
    pub text: String,
    /// Platform timestamp of the message, used for reactions.
    pub timestamp: String,
    /// Set when the message was posted inside a thread.
    pub thread: Option<String>,
}

/// A user's answer to an interactive prompt, already reduced to its
/// correlation token and chosen value by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractiveAction {
    pub callback_token: String,
    pub value: String,
}

/// Everything a transport can surface to the engine's event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// The transport has opened its connection.
    Hello,
    /// The transport has finished its handshake and is ready.
    Connected,
    /// A message arrived on a channel or DM.
    Message(MessageEvent),
    /// The bot was added to a channel.
    ChannelJoined(ChannelId),
    /// A new direct-message conversation was opened.
    DmCreated(ChannelId),
    /// A user interacted with a button or dropdown.
    Interactive(InteractiveAction),
    /// The platform rejected the transport's credentials.
    AuthInvalid,
    /// A recoverable transport-level failure.
    TransportError(String),
}

// --- Outbound message types ---

/// Visual severity accent applied to an outbound message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Good,
    Warning,
    Danger,
}

/// One selectable entry in a dropdown element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOptionDef {
    /// Stable element identifier reported back on selection.
    pub id: String,
    /// Text shown to the user.
    pub label: String,
}

/// An interactive element attached to an outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Element {
    Button {
        id: String,
        label: String,
    },
    Dropdown {
        label: String,
        options: Vec<SelectOptionDef>,
    },
}

/// A fully assembled message ready for a transport to post or edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub channel: ChannelId,
    pub text: String,
    /// Correlation token routing interactive answers back to the waiting
    /// conversation. Present only when `elements` is non-empty.
    pub callback_token: Option<String>,
    pub elements: Vec<Element>,
    pub severity: Option<Severity>,
}
