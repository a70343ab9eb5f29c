// SPDX-FileCopyrightText: 2026 Colloquy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Correlation token registry routing interactive answers back to conversations.

use std::collections::HashMap;

use dashmap::DashMap;
use tracing::{debug, warn};

use colloquy_core::{ChannelId, ColloquyError};

use crate::mailbox::MailboxSender;

/// A conversation waiting on an interactive prompt.
#[derive(Debug, Clone)]
pub struct Waiter {
    /// Element and option identifiers mapped to their display labels.
    labels: HashMap<String, String>,
    mailbox: MailboxSender,
    channel: ChannelId,
}

impl Waiter {
    pub fn new(labels: HashMap<String, String>, mailbox: MailboxSender, channel: ChannelId) -> Self {
        Self {
            labels,
            mailbox,
            channel,
        }
    }
}

/// Maps live correlation tokens to the conversations that issued them.
///
/// Each interactive prompt registers exactly one token. When the gateway
/// reports a click, [`resolve`](CallbackRegistry::resolve) consumes the
/// registration, translates the clicked element's identifier to its label,
/// and deposits the label in the waiting conversation's mailbox.
#[derive(Debug, Default)]
pub struct CallbackRegistry {
    waiters: DashMap<String, Waiter>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self {
            waiters: DashMap::new(),
        }
    }

    /// Register a waiter under its correlation token.
    ///
    /// Tokens are unique by construction; a collision means correlation
    /// state is corrupt and the process must not keep routing on top of it.
    pub fn register(&self, token: String, waiter: Waiter) -> Result<(), ColloquyError> {
        use dashmap::mapref::entry::Entry;

        match self.waiters.entry(token) {
            Entry::Occupied(entry) => Err(ColloquyError::Registry(format!(
                "correlation token `{}` already registered",
                entry.key()
            ))),
            Entry::Vacant(entry) => {
                entry.insert(waiter);
                Ok(())
            }
        }
    }

    /// Remove a registration. Removing an absent token is a no-op.
    pub fn unregister(&self, token: &str) {
        if self.waiters.remove(token).is_some() {
            debug!(token, "unregistered callback token");
        }
    }

    /// Consume the registration for `token` and deliver the label of the
    /// clicked element to the waiting conversation.
    ///
    /// Unknown tokens are routine: users click buttons on prompts that have
    /// already been superseded or answered. Those clicks are logged and
    /// dropped, never surfaced as errors.
    pub fn resolve(&self, token: &str, element_id: &str) {
        let Some((_, waiter)) = self.waiters.remove(token) else {
            warn!(token, "callback for unregistered token dropped");
            return;
        };

        let Some(label) = waiter.labels.get(element_id) else {
            warn!(
                token,
                element_id,
                channel = %waiter.channel,
                "callback names an element the prompt never offered"
            );
            return;
        };

        if !waiter.mailbox.deliver(label.clone()) {
            debug!(token, channel = %waiter.channel, "answer dropped, mailbox occupied");
        }
    }

    /// Whether `token` currently has a waiter.
    pub fn is_registered(&self, token: &str) -> bool {
        self.waiters.contains_key(token)
    }

    /// Number of live registrations.
    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }
}
