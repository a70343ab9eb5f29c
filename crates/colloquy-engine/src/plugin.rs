// SPDX-FileCopyrightText: 2026 Colloquy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The plugin contract: manifests, topics, scheduled jobs, and the
//! per-message hook.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use colloquy_core::{ChannelId, ChatTransport, ColloquyError, UserId};

use crate::convo::{ConvoAction, GlobalMessenger};
use crate::messenger::Messenger;

/// What a plugin declares about itself at registration time.
///
/// Topic labels and job identifiers must be unique across all registered
/// plugins; the engine refuses to start on a collision.
pub struct PluginManifest {
    pub name: String,
    pub description: String,
    pub version: semver::Version,
    pub topics: Vec<Topic>,
    pub jobs: Vec<Job>,
}

impl PluginManifest {
    pub fn new(name: impl Into<String>, description: impl Into<String>, version: semver::Version) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            version,
            topics: Vec::new(),
            jobs: Vec::new(),
        }
    }

    pub fn with_topic(mut self, topic: Topic) -> Self {
        self.topics.push(topic);
        self
    }

    pub fn with_job(mut self, job: Job) -> Self {
        self.jobs.push(job);
        self
    }
}

/// A named, user-selectable entry point into a conversation.
#[derive(Clone)]
pub struct Topic {
    pub label: String,
    pub action: ConvoAction,
}

impl Topic {
    pub fn new<F, Fut>(label: impl Into<String>, action: F) -> Self
    where
        F: Fn(Messenger) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), ColloquyError>> + Send + 'static,
    {
        Self {
            label: label.into(),
            action: Arc::new(move |messenger| Box::pin(action(messenger))),
        }
    }
}

impl std::fmt::Debug for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Topic").field("label", &self.label).finish_non_exhaustive()
    }
}

/// Action signature for scheduled jobs.
pub type JobAction =
    Arc<dyn Fn(GlobalMessenger) -> BoxFuture<'static, Result<(), ColloquyError>> + Send + Sync>;

/// A timed action declared by a plugin.
///
/// The schedule is a standard five-field cron expression. Jobs run against
/// the shared [`GlobalMessenger`]; to talk to a specific user they enqueue a
/// conversation like any other entry point.
#[derive(Clone)]
pub struct Job {
    pub id: String,
    pub schedule: String,
    pub action: JobAction,
}

impl Job {
    pub fn new<F, Fut>(id: impl Into<String>, schedule: impl Into<String>, action: F) -> Self
    where
        F: Fn(GlobalMessenger) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), ColloquyError>> + Send + 'static,
    {
        Self {
            id: id.into(),
            schedule: schedule.into(),
            action: Arc::new(move |messenger| Box::pin(action(messenger))),
        }
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("schedule", &self.schedule)
            .finish_non_exhaustive()
    }
}

/// A channel message as seen by a plugin's message hook.
#[derive(Clone)]
pub struct IncomingMessage {
    pub text: String,
    pub user: UserId,
    pub channel: ChannelId,
    pub timestamp: String,
    transport: Arc<dyn ChatTransport>,
}

impl IncomingMessage {
    pub fn new(
        text: impl Into<String>,
        user: UserId,
        channel: ChannelId,
        timestamp: impl Into<String>,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        Self {
            text: text.into(),
            user,
            channel,
            timestamp: timestamp.into(),
            transport,
        }
    }

    /// Attach an emoji reaction to this message.
    pub async fn add_reaction(&self, name: &str) -> Result<(), ColloquyError> {
        self.transport
            .add_reaction(&self.channel, &self.timestamp, name)
            .await
    }
}

impl std::fmt::Debug for IncomingMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncomingMessage")
            .field("text", &self.text)
            .field("user", &self.user)
            .field("channel", &self.channel)
            .field("timestamp", &self.timestamp)
            .finish_non_exhaustive()
    }
}

/// The contract every Colloquy plugin implements.
#[async_trait]
pub trait ChatPlugin: Send + Sync {
    /// Declare this plugin's identity, topics, and scheduled jobs.
    ///
    /// Called exactly once, at registration.
    fn init(&self) -> PluginManifest;

    /// React to a message posted on a shared channel.
    ///
    /// The messenger is scoped to the message's channel and lives for this
    /// invocation only. Errors are logged by the engine and do not stop
    /// delivery to other plugins.
    async fn parse_message(
        &self,
        msg: &IncomingMessage,
        messenger: &Messenger,
    ) -> Result<(), ColloquyError>;

    /// Release plugin resources when the engine shuts down.
    async fn teardown(&self) {}
}
