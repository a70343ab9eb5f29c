// SPDX-FileCopyrightText: 2026 Colloquy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A [`ChatTransport`] backed by the local terminal.
//!
//! The console stands in for a real chat workspace with a fixed roster: one
//! human (`local`), one shared channel (`#general`), and the bot itself.
//! Outbound messages are printed to stdout; interactive elements are printed
//! as a numbered list, and [`click`](ConsoleTransport::click) turns a number
//! back into the platform-style callback the engine expects.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use colored::Colorize;
use tokio::sync::{Mutex, Notify};

use colloquy_core::{
    ChannelId, ChannelInfo, ChatEvent, ChatTransport, ColloquyError, DirectorySnapshot, DmEntry,
    Element, InteractiveAction, MessageEvent, MessageHandle, OutboundMessage, Severity, User,
    UserId,
};

/// The bot's own user id in the console roster.
pub const BOT_ID: &str = "UCLIPPY";
/// User id of the person at the keyboard.
pub const LOCAL_USER_ID: &str = "ULOCAL";
/// Display name of the person at the keyboard.
pub const LOCAL_USER_NAME: &str = "local";
/// The direct-message conversation between the bot and the local user.
pub const DM_ID: &str = "DCONSOLE";
/// The one shared channel the console workspace has.
pub const CHANNEL_ID: &str = "CGENERAL";
/// Display name of the shared channel.
pub const CHANNEL_NAME: &str = "general";

/// One numbered answer on the most recent interactive prompt.
struct Choice {
    token: String,
    value: String,
    label: String,
}

/// Terminal-backed chat transport.
pub struct ConsoleTransport {
    events: Mutex<VecDeque<ChatEvent>>,
    notify: Notify,
    choices: Mutex<Vec<Choice>>,
    next_handle: AtomicU64,
    event_seq: AtomicU64,
}

impl ConsoleTransport {
    pub fn new() -> Self {
        // A real transport connects before the engine starts; the console is
        // always connected, so the handshake events are queued up front.
        let mut events = VecDeque::new();
        events.push_back(ChatEvent::Hello);
        events.push_back(ChatEvent::Connected);

        Self {
            events: Mutex::new(events),
            notify: Notify::new(),
            choices: Mutex::new(Vec::new()),
            next_handle: AtomicU64::new(1),
            event_seq: AtomicU64::new(1),
        }
    }

    /// Deliver a typed line as a direct message from the local user.
    pub async fn send_direct_message(&self, text: &str) {
        let event = ChatEvent::Message(MessageEvent {
            channel: ChannelId(DM_ID.to_string()),
            user: UserId(LOCAL_USER_ID.to_string()),
            text: text.to_string(),
            timestamp: self.next_timestamp(),
            thread: None,
        });
        self.push_event(event).await;
    }

    /// Deliver a typed line as a message on the shared channel.
    pub async fn send_channel_message(&self, text: &str) {
        let event = ChatEvent::Message(MessageEvent {
            channel: ChannelId(CHANNEL_ID.to_string()),
            user: UserId(LOCAL_USER_ID.to_string()),
            text: text.to_string(),
            timestamp: self.next_timestamp(),
            thread: None,
        });
        self.push_event(event).await;
    }

    /// Activate the `n`th choice (1-based) of the last interactive prompt.
    ///
    /// Returns `false` when no prompt is pending or the number is out of
    /// range.
    pub async fn click(&self, n: usize) -> bool {
        let event = {
            let choices = self.choices.lock().await;
            match n.checked_sub(1).and_then(|i| choices.get(i)) {
                Some(choice) => ChatEvent::Interactive(InteractiveAction {
                    callback_token: choice.token.clone(),
                    value: choice.value.clone(),
                }),
                None => return false,
            }
        };
        self.push_event(event).await;
        true
    }

    async fn push_event(&self, event: ChatEvent) {
        self.events.lock().await.push_back(event);
        self.notify.notify_one();
    }

    fn next_timestamp(&self) -> String {
        let seq = self.event_seq.fetch_add(1, Ordering::Relaxed);
        format!("{}.{:06}", chrono::Utc::now().timestamp(), seq % 1_000_000)
    }

    /// Print a message and, for prompts, renumber the clickable choices.
    async fn render(&self, msg: &OutboundMessage, edited: bool) {
        let speaker = if edited {
            format!("{} {}", "clippy".cyan().bold(), "(edited)".dimmed())
        } else {
            "clippy".cyan().bold().to_string()
        };
        println!("{speaker} {}", paint(&msg.text, msg.severity));

        if let Some(token) = &msg.callback_token {
            let mut choices = self.choices.lock().await;
            choices.clear();
            for element in &msg.elements {
                match element {
                    Element::Button { id, label } => choices.push(Choice {
                        token: token.clone(),
                        value: id.clone(),
                        label: label.clone(),
                    }),
                    Element::Dropdown { label: menu, options } => {
                        for option in options {
                            choices.push(Choice {
                                token: token.clone(),
                                value: option.id.clone(),
                                label: format!("{menu}: {}", option.label),
                            });
                        }
                    }
                }
            }
            for (i, choice) in choices.iter().enumerate() {
                println!("  {} {}", format!("[{}]", i + 1).cyan(), choice.label);
            }
        }
    }
}

impl Default for ConsoleTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn paint(text: &str, severity: Option<Severity>) -> String {
    match severity {
        Some(Severity::Good) => text.green().to_string(),
        Some(Severity::Warning) => text.yellow().to_string(),
        Some(Severity::Danger) => text.red().to_string(),
        None => text.to_string(),
    }
}

#[async_trait]
impl ChatTransport for ConsoleTransport {
    async fn post(&self, msg: OutboundMessage) -> Result<MessageHandle, ColloquyError> {
        self.render(&msg, false).await;
        let n = self.next_handle.fetch_add(1, Ordering::Relaxed);
        Ok(MessageHandle(format!("console-{n}")))
    }

    async fn update(
        &self,
        handle: &MessageHandle,
        msg: OutboundMessage,
    ) -> Result<MessageHandle, ColloquyError> {
        self.render(&msg, true).await;
        Ok(handle.clone())
    }

    async fn receive(&self) -> Result<ChatEvent, ColloquyError> {
        loop {
            if let Some(event) = self.events.lock().await.pop_front() {
                return Ok(event);
            }
            self.notify.notified().await;
        }
    }

    async fn directory(&self) -> Result<DirectorySnapshot, ColloquyError> {
        Ok(DirectorySnapshot {
            bot: Some(UserId(BOT_ID.to_string())),
            users: vec![User {
                id: UserId(LOCAL_USER_ID.to_string()),
                name: LOCAL_USER_NAME.to_string(),
            }],
            channels: vec![ChannelInfo {
                id: ChannelId(CHANNEL_ID.to_string()),
                name: CHANNEL_NAME.to_string(),
            }],
            dms: vec![DmEntry {
                channel: ChannelId(DM_ID.to_string()),
                user: UserId(LOCAL_USER_ID.to_string()),
            }],
        })
    }

    async fn add_reaction(
        &self,
        _channel: &ChannelId,
        _timestamp: &str,
        name: &str,
    ) -> Result<(), ColloquyError> {
        println!("{}", format!("clippy reacted with :{name}:").dimmed());
        Ok(())
    }
}
