// SPDX-FileCopyrightText: 2026 Colloquy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-slot mailbox connecting interactive answers to waiting conversations.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

/// The outcome of waiting for an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// The user answered within the window.
    Message(String),
    /// The window elapsed without an answer.
    Timeout,
}

/// Delivery handle for a [`ResponseMailbox`].
///
/// Held by the callback registry and the conversation pool so answers can be
/// deposited without touching the conversation that owns the mailbox.
#[derive(Debug, Clone)]
pub struct MailboxSender {
    tx: mpsc::Sender<String>,
}

impl MailboxSender {
    /// Deposit an answer into the mailbox.
    ///
    /// Returns `false` when the slot is already occupied (first writer wins,
    /// the new answer is dropped) or the conversation is gone.
    pub fn deliver(&self, value: String) -> bool {
        match self.tx.try_send(value) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                debug!(dropped = %dropped, "mailbox occupied, dropping answer");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("mailbox closed, dropping answer");
                false
            }
        }
    }
}

/// A single-slot mailbox owned by one conversation.
///
/// Holds at most one undelivered answer. A conversation that begins waiting
/// discards any answer left over from a prompt it never awaited, so stale
/// replies cannot satisfy a later question.
#[derive(Debug)]
pub struct ResponseMailbox {
    tx: mpsc::Sender<String>,
    rx: tokio::sync::Mutex<mpsc::Receiver<String>>,
}

impl ResponseMailbox {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(1);
        Self {
            tx,
            rx: tokio::sync::Mutex::new(rx),
        }
    }

    /// A cloneable handle for delivering answers into this mailbox.
    pub fn sender(&self) -> MailboxSender {
        MailboxSender {
            tx: self.tx.clone(),
        }
    }

    /// Wait up to `timeout` for the next answer delivered from now on.
    ///
    /// Any answer already sitting in the slot is stale and discarded before
    /// waiting begins. An answer arriving after the timeout fires stays in
    /// the slot and is discarded by the next wait.
    pub async fn await_reply(&self, timeout: Duration) -> Reply {
        let mut rx = self.rx.lock().await;
        while rx.try_recv().is_ok() {
            debug!("discarding stale mailbox entry");
        }
        match tokio::time::timeout(timeout, rx.recv()).await {
            Ok(Some(value)) => Reply::Message(value),
            Ok(None) | Err(_) => Reply::Timeout,
        }
    }
}

impl Default for ResponseMailbox {
    fn default() -> Self {
        Self::new()
    }
}
