// SPDX-FileCopyrightText: 2026 Colloquy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation-scoped messaging: compose prompts, await answers, edit in place.
//!
//! A [`Messenger`] is bound to one channel for the lifetime of one
//! conversation (or one plugin invocation). It owns the conversation's
//! response mailbox and tracks the last message it sent so a later
//! [`update_last_message`](Messenger::update_last_message) can replace the
//! prompt with its outcome.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::distributions::Alphanumeric;
use rand::Rng;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use colloquy_core::{
    ChannelId, ChatTransport, ColloquyError, Element, MessageHandle, OutboundMessage,
    SelectOptionDef, Severity,
};

use crate::mailbox::{Reply, ResponseMailbox};
use crate::registry::{CallbackRegistry, Waiter};

/// Length of generated element and option identifiers.
const ELEMENT_ID_LEN: usize = 8;

/// Record of the most recent message posted in this scope.
#[derive(Debug)]
struct SentMessage {
    /// Correlation token, present while the message's elements are live.
    token: Option<String>,
    handle: MessageHandle,
}

struct MessengerInner {
    channel: ChannelId,
    transport: Arc<dyn ChatTransport>,
    registry: Arc<CallbackRegistry>,
    mailbox: ResponseMailbox,
    /// `None` until a message is successfully posted in this scope, and
    /// again after `new_message` supersedes the previous one.
    last: Mutex<Option<SentMessage>>,
    timeout: Duration,
}

/// Messaging handle scoped to a single conversation.
///
/// Cloning is cheap and clones share the same scope: the same mailbox, the
/// same last-message record.
#[derive(Clone)]
pub struct Messenger {
    inner: Arc<MessengerInner>,
}

impl Messenger {
    pub fn new(
        channel: ChannelId,
        transport: Arc<dyn ChatTransport>,
        registry: Arc<CallbackRegistry>,
        timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(MessengerInner {
                channel,
                transport,
                registry,
                mailbox: ResponseMailbox::new(),
                last: Mutex::new(None),
                timeout,
            }),
        }
    }

    /// The channel this messenger posts to.
    pub fn channel(&self) -> &ChannelId {
        &self.inner.channel
    }

    /// Begin composing a new message, superseding the previous one.
    ///
    /// The previous message's correlation token is unregistered here, so a
    /// click on its now-stale elements resolves to nothing. Until the new
    /// message is sent, the scope has no last message to update.
    pub async fn new_message(&self, text: impl Into<String>) -> OutgoingMessage {
        let mut last = self.inner.last.lock().await;
        if let Some(prev) = last.take()
            && let Some(token) = prev.token
        {
            self.inner.registry.unregister(&token);
        }

        OutgoingMessage {
            messenger: self.clone(),
            text: text.into(),
            elements: Vec::new(),
            labels: HashMap::new(),
            severity: None,
        }
    }

    /// Wait for the user's answer using the scope's default timeout.
    pub async fn await_response(&self) -> Reply {
        self.inner.mailbox.await_reply(self.inner.timeout).await
    }

    /// Wait for the user's answer with an explicit timeout.
    pub async fn await_response_for(&self, timeout: Duration) -> Reply {
        self.inner.mailbox.await_reply(timeout).await
    }

    /// Replace the last sent message with a plain text summary.
    ///
    /// Strips the interactive elements and their registration so an answered
    /// prompt stops offering buttons. A no-op when nothing was sent yet.
    pub async fn update_last_message(
        &self,
        text: impl Into<String>,
        severity: Option<Severity>,
    ) -> Result<(), ColloquyError> {
        let mut last = self.inner.last.lock().await;
        let Some(sent) = last.as_mut() else {
            debug!(channel = %self.inner.channel, "no sent message to update");
            return Ok(());
        };

        if let Some(token) = sent.token.take() {
            self.inner.registry.unregister(&token);
        }

        let msg = OutboundMessage {
            channel: self.inner.channel.clone(),
            text: text.into(),
            callback_token: None,
            elements: Vec::new(),
            severity,
        };
        sent.handle = self.inner.transport.update(&sent.handle, msg).await?;
        Ok(())
    }

    /// Deliver a raw direct-message text as the answer to whatever this
    /// scope is waiting on.
    pub(crate) fn respond(&self, text: String) -> bool {
        self.inner.mailbox.sender().deliver(text)
    }

    /// Drop the scope's registration state when its conversation ends.
    pub(crate) async fn retire(&self) {
        let mut last = self.inner.last.lock().await;
        if let Some(prev) = last.take()
            && let Some(token) = prev.token
        {
            self.inner.registry.unregister(&token);
        }
    }

    async fn dispatch(
        &self,
        text: String,
        elements: Vec<Element>,
        labels: HashMap<String, String>,
        severity: Option<Severity>,
    ) -> Result<MessageHandle, ColloquyError> {
        let inner = &self.inner;
        let mut last = inner.last.lock().await;

        // Interactive prompts get a correlation token; plain text does not.
        let token = if elements.is_empty() {
            None
        } else {
            Some(Uuid::new_v4().to_string())
        };

        // Register before posting: the platform may deliver the click before
        // post() even returns, and a callback must never race its registrant.
        if let Some(token) = &token {
            inner.registry.register(
                token.clone(),
                Waiter::new(labels, inner.mailbox.sender(), inner.channel.clone()),
            )?;
        }

        let msg = OutboundMessage {
            channel: inner.channel.clone(),
            text,
            callback_token: token.clone(),
            elements,
            severity,
        };

        match inner.transport.post(msg).await {
            Ok(handle) => {
                *last = Some(SentMessage {
                    token,
                    handle: handle.clone(),
                });
                Ok(handle)
            }
            Err(err) => {
                // The prompt never reached the platform; its token must not
                // linger in the registry.
                if let Some(token) = &token {
                    inner.registry.unregister(token);
                }
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for Messenger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Messenger")
            .field("channel", &self.inner.channel)
            .field("timeout", &self.inner.timeout)
            .finish_non_exhaustive()
    }
}

/// A message under construction.
///
/// Built from [`Messenger::new_message`], decorated with elements, then sent
/// exactly once. Element and option identifiers are short random strings kept
/// distinct from their display labels; the registry maps them back when the
/// platform reports a click.
#[derive(Debug)]
pub struct OutgoingMessage {
    messenger: Messenger,
    text: String,
    elements: Vec<Element>,
    labels: HashMap<String, String>,
    severity: Option<Severity>,
}

impl OutgoingMessage {
    /// Append a button.
    pub fn add_button(mut self, label: impl Into<String>) -> Self {
        let label = label.into();
        let id = element_id();
        self.labels.insert(id.clone(), label.clone());
        self.elements.push(Element::Button { id, label });
        self
    }

    /// Append a dropdown with one entry per option label.
    pub fn add_dropdown(
        mut self,
        label: impl Into<String>,
        options: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let options = options
            .into_iter()
            .map(|option| {
                let option = option.into();
                let id = element_id();
                self.labels.insert(id.clone(), option.clone());
                SelectOptionDef { id, label: option }
            })
            .collect();
        self.elements.push(Element::Dropdown {
            label: label.into(),
            options,
        });
        self
    }

    /// Set the message's severity accent.
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Post the message, registering its correlation token first when it
    /// carries interactive elements.
    pub async fn send(self) -> Result<MessageHandle, ColloquyError> {
        let OutgoingMessage {
            messenger,
            text,
            elements,
            labels,
            severity,
        } = self;
        messenger.dispatch(text, elements, labels, severity).await
    }
}

/// Generate a short opaque identifier for an element or option.
fn element_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ELEMENT_ID_LEN)
        .map(char::from)
        .collect()
}
