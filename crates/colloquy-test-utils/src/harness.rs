// SPDX-FileCopyrightText: 2026 Colloquy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a complete engine stack over a mock transport,
//! with a pre-seeded directory roster. `start()` spawns the engine loop and
//! hands back a [`RunningHarness`] for injecting events and asserting on
//! captured traffic.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use colloquy_config::EngineConfig;
use colloquy_core::{
    ChannelId, ChannelInfo, ChatEvent, ChatTransport, ColloquyError, DirectorySnapshot, DmEntry,
    InteractiveAction, MessageEvent, User, UserId,
};
use colloquy_engine::{ChatPlugin, Engine};

use crate::mock_transport::MockTransport;

static EVENT_SEQ: AtomicU64 = AtomicU64::new(1);

fn next_timestamp() -> String {
    let seq = EVENT_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{}.{:06}", chrono::Utc::now().timestamp(), seq % 1_000_000)
}

/// Build a direct-message event with a fresh timestamp.
pub fn direct_message(channel: &str, user: &str, text: &str) -> ChatEvent {
    ChatEvent::Message(MessageEvent {
        channel: ChannelId(channel.to_string()),
        user: UserId(user.to_string()),
        text: text.to_string(),
        timestamp: next_timestamp(),
        thread: None,
    })
}

/// Build a channel-message event with a fresh timestamp.
pub fn channel_message(channel: &str, user: &str, text: &str) -> ChatEvent {
    ChatEvent::Message(MessageEvent {
        channel: ChannelId(channel.to_string()),
        user: UserId(user.to_string()),
        text: text.to_string(),
        timestamp: next_timestamp(),
        thread: None,
    })
}

/// Build an interactive-callback event.
pub fn interaction(token: &str, value: &str) -> ChatEvent {
    ChatEvent::Interactive(InteractiveAction {
        callback_token: token.to_string(),
        value: value.to_string(),
    })
}

/// Builder for creating test environments with configurable options.
///
/// Starts from a default roster: bot `UBOT`, user `alice` (`U1`, dm `D1`),
/// and channel `general` (`C1`).
pub struct TestHarnessBuilder {
    bot: String,
    users: Vec<User>,
    channels: Vec<ChannelInfo>,
    dms: Vec<DmEntry>,
    response_timeout_secs: u64,
    convo_queue_size: usize,
    greeting: Option<String>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            bot: "UBOT".to_string(),
            users: vec![User {
                id: UserId("U1".to_string()),
                name: "alice".to_string(),
            }],
            channels: vec![ChannelInfo {
                id: ChannelId("C1".to_string()),
                name: "general".to_string(),
            }],
            dms: vec![DmEntry {
                channel: ChannelId("D1".to_string()),
                user: UserId("U1".to_string()),
            }],
            response_timeout_secs: 2,
            convo_queue_size: 8,
            greeting: None,
        }
    }

    /// Add a user and their direct-message conversation to the roster.
    pub fn with_user(mut self, id: &str, name: &str, dm: &str) -> Self {
        self.users.push(User {
            id: UserId(id.to_string()),
            name: name.to_string(),
        });
        self.dms.push(DmEntry {
            channel: ChannelId(dm.to_string()),
            user: UserId(id.to_string()),
        });
        self
    }

    /// Add a channel to the roster.
    pub fn with_channel(mut self, id: &str, name: &str) -> Self {
        self.channels.push(ChannelInfo {
            id: ChannelId(id.to_string()),
            name: name.to_string(),
        });
        self
    }

    /// Override the bot's own user id.
    pub fn with_bot(mut self, id: &str) -> Self {
        self.bot = id.to_string();
        self
    }

    /// Override the answer timeout (defaults to 2 seconds in tests).
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.response_timeout_secs = secs;
        self
    }

    /// Override the per-user conversation queue size.
    pub fn with_queue_size(mut self, size: usize) -> Self {
        self.convo_queue_size = size;
        self
    }

    /// Override the topic-selection greeting.
    pub fn with_greeting(mut self, greeting: &str) -> Self {
        self.greeting = Some(greeting.to_string());
        self
    }

    /// Build the test harness: mock transport, seeded directory, engine.
    pub async fn build(self) -> TestHarness {
        let transport = Arc::new(MockTransport::new());
        transport
            .set_directory(DirectorySnapshot {
                bot: Some(UserId(self.bot)),
                users: self.users,
                channels: self.channels,
                dms: self.dms,
            })
            .await;

        let mut config = EngineConfig {
            response_timeout_secs: self.response_timeout_secs,
            convo_queue_size: self.convo_queue_size,
            ..EngineConfig::default()
        };
        if let Some(greeting) = self.greeting {
            config.greeting = greeting;
        }

        let engine = Engine::new(transport.clone() as Arc<dyn ChatTransport>, &config);
        TestHarness {
            transport,
            engine,
            config,
        }
    }
}

/// A complete test environment: engine over a mock transport.
///
/// Register plugins through [`register`](TestHarness::register), then call
/// [`start`](TestHarness::start) to spawn the event loop.
pub struct TestHarness {
    /// The mock transport, for traffic assertions.
    pub transport: Arc<MockTransport>,
    /// The engine, pre-start.
    pub engine: Engine,
    /// The engine configuration in effect.
    pub config: EngineConfig,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Register a plugin with the not-yet-started engine.
    pub fn register(&mut self, plugin: impl ChatPlugin + 'static) -> Result<(), ColloquyError> {
        self.engine.register_plugin(plugin)
    }

    /// Spawn the engine loop and return a handle for driving it.
    pub fn start(self) -> RunningHarness {
        let events = self.engine.event_sender();
        let cancel = CancellationToken::new();
        let task = {
            let cancel = cancel.clone();
            let engine = self.engine;
            tokio::spawn(async move { engine.run(cancel).await })
        };
        RunningHarness {
            transport: self.transport,
            events,
            cancel,
            task,
        }
    }
}

/// A started test environment.
pub struct RunningHarness {
    /// The mock transport, for traffic assertions.
    pub transport: Arc<MockTransport>,
    events: mpsc::Sender<ChatEvent>,
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<Result<(), ColloquyError>>,
}

impl RunningHarness {
    /// Inject an event into the running engine.
    pub async fn inject(&self, event: ChatEvent) -> Result<(), ColloquyError> {
        self.events
            .send(event)
            .await
            .map_err(|_| ColloquyError::Internal("engine event queue closed".to_string()))
    }

    /// Inject a direct message.
    pub async fn dm(&self, channel: &str, user: &str, text: &str) -> Result<(), ColloquyError> {
        self.inject(direct_message(channel, user, text)).await
    }

    /// Inject an interactive callback.
    pub async fn click(&self, token: &str, value: &str) -> Result<(), ColloquyError> {
        self.inject(interaction(token, value)).await
    }

    /// Give the engine a beat to drain in-flight work.
    pub async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    /// Stop the engine and wait for the loop to wind down.
    pub async fn shutdown(self) -> Result<(), ColloquyError> {
        tracing::debug!("harness shutdown requested");
        self.cancel.cancel();
        self.task
            .await
            .map_err(|e| ColloquyError::Internal(format!("engine task failed: {e}")))?
    }
}
