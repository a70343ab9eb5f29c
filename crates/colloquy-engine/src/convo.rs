// SPDX-FileCopyrightText: 2026 Colloquy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user conversation serialization.
//!
//! Every user gets one lane: a bounded queue of pending conversations
//! drained by a dedicated worker task. The worker runs one conversation to
//! completion before dequeuing the next, so all interaction with a single
//! user is strictly sequential while different users proceed independently.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use colloquy_core::{ChannelId, ChatTransport, ColloquyError};

use crate::directory::DirectoryHandle;
use crate::messenger::Messenger;
use crate::registry::CallbackRegistry;

/// Entry-point action of a conversation.
pub type ConvoAction =
    Arc<dyn Fn(Messenger) -> BoxFuture<'static, Result<(), ColloquyError>> + Send + Sync>;

/// One scripted interaction with one user, consumed exactly once.
#[derive(Clone)]
pub struct Conversation {
    action: ConvoAction,
}

impl Conversation {
    pub fn new<F, Fut>(action: F) -> Self
    where
        F: Fn(Messenger) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), ColloquyError>> + Send + 'static,
    {
        Self {
            action: Arc::new(move |messenger| Box::pin(action(messenger))),
        }
    }

    pub fn from_action(action: ConvoAction) -> Self {
        Self { action }
    }
}

impl std::fmt::Debug for Conversation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conversation").finish_non_exhaustive()
    }
}

struct Lane {
    tx: mpsc::Sender<Conversation>,
}

/// Serializes conversations per user and tracks which one is current.
///
/// Lanes are created lazily on first contact and pruned when a user leaves
/// the directory; pruning closes the lane's queue, letting its worker finish
/// the conversation in flight and exit.
pub struct ConversationPool {
    lanes: DashMap<String, Lane>,
    current: Arc<DashMap<String, Messenger>>,
    transport: Arc<dyn ChatTransport>,
    registry: Arc<CallbackRegistry>,
    directory: Arc<DirectoryHandle>,
    timeout: Duration,
    queue_size: usize,
}

impl ConversationPool {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        registry: Arc<CallbackRegistry>,
        directory: Arc<DirectoryHandle>,
        timeout: Duration,
        queue_size: usize,
    ) -> Self {
        Self {
            lanes: DashMap::new(),
            current: Arc::new(DashMap::new()),
            transport,
            registry,
            directory,
            timeout,
            queue_size,
        }
    }

    /// Queue a conversation for `user` (addressed by display name).
    ///
    /// Fails when the user is absent from the directory or their queue is at
    /// capacity. Never pre-empts a running conversation.
    pub fn enqueue(&self, user: &str, convo: Conversation) -> Result<(), ColloquyError> {
        if self.directory.user_id(user).is_none() {
            return Err(ColloquyError::UnknownUser {
                user: user.to_string(),
            });
        }

        let lane = self
            .lanes
            .entry(user.to_string())
            .or_insert_with(|| self.spawn_lane(user.to_string()));

        lane.tx.try_send(convo).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => ColloquyError::QueueFull {
                user: user.to_string(),
            },
            mpsc::error::TrySendError::Closed(_) => {
                ColloquyError::Internal(format!("conversation lane for {user} is gone"))
            }
        })
    }

    /// Deliver a raw direct-message text to the user's current conversation.
    ///
    /// Returns `false` when no conversation is running for the user, in
    /// which case the caller decides what the message starts. A running
    /// conversation that is not waiting simply loses the text.
    pub fn respond_to_current(&self, user: &str, text: &str) -> bool {
        let Some(messenger) = self.current.get(user) else {
            return false;
        };
        if !messenger.respond(text.to_string()) {
            debug!(user, "current conversation not waiting, text dropped");
        }
        true
    }

    /// Whether a conversation is currently running for `user`.
    pub fn is_running(&self, user: &str) -> bool {
        self.current.contains_key(user)
    }

    /// Close the lanes of users no longer present in the directory.
    pub fn prune_unknown(&self) {
        self.lanes
            .retain(|user, _| self.directory.user_id(user).is_some());
    }

    fn spawn_lane(&self, user: String) -> Lane {
        let (tx, mut rx) = mpsc::channel::<Conversation>(self.queue_size);
        let transport = self.transport.clone();
        let registry = self.registry.clone();
        let directory = self.directory.clone();
        let current = self.current.clone();
        let timeout = self.timeout;

        tokio::spawn(async move {
            debug!(user, "conversation lane started");
            while let Some(convo) = rx.recv().await {
                let Some(channel) = directory.dm_for_name(&user) else {
                    warn!(user, "no dm conversation on record, dropping conversation");
                    continue;
                };

                let messenger =
                    Messenger::new(channel, transport.clone(), registry.clone(), timeout);
                current.insert(user.clone(), messenger.clone());

                if let Err(err) = (convo.action)(messenger.clone()).await {
                    if err.is_fatal() {
                        error!(user, error = %err, "conversation broke a routing invariant");
                        std::process::exit(1);
                    }
                    warn!(user, error = %err, "conversation ended with error");
                }

                messenger.retire().await;
                current.remove(&user);
            }
            debug!(user, "conversation lane closed");
        });

        Lane { tx }
    }
}

impl std::fmt::Debug for ConversationPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationPool")
            .field("lanes", &self.lanes.len())
            .field("running", &self.current.len())
            .finish_non_exhaustive()
    }
}

/// Unscoped messaging handle shared by scheduled jobs.
///
/// Jobs never touch a user's conversation state directly; they either post
/// to a channel through a scoped [`Messenger`] or enqueue a conversation
/// that goes through the same per-user lane as every other entry point.
#[derive(Clone)]
pub struct GlobalMessenger {
    transport: Arc<dyn ChatTransport>,
    registry: Arc<CallbackRegistry>,
    directory: Arc<DirectoryHandle>,
    pool: Arc<ConversationPool>,
    timeout: Duration,
}

impl GlobalMessenger {
    pub(crate) fn new(
        transport: Arc<dyn ChatTransport>,
        registry: Arc<CallbackRegistry>,
        directory: Arc<DirectoryHandle>,
        pool: Arc<ConversationPool>,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            registry,
            directory,
            pool,
            timeout,
        }
    }

    /// A messenger scoped to one channel.
    pub fn scope(&self, channel: ChannelId) -> Messenger {
        Messenger::new(
            channel,
            self.transport.clone(),
            self.registry.clone(),
            self.timeout,
        )
    }

    /// The shared workspace directory.
    pub fn directory(&self) -> &DirectoryHandle {
        &self.directory
    }

    /// Queue a conversation with `user`, serialized behind whatever they
    /// already have running or pending.
    pub fn start_conversation<F, Fut>(&self, user: &str, action: F) -> Result<(), ColloquyError>
    where
        F: Fn(Messenger) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), ColloquyError>> + Send + 'static,
    {
        self.pool.enqueue(user, Conversation::new(action))
    }
}

impl std::fmt::Debug for GlobalMessenger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalMessenger").finish_non_exhaustive()
    }
}
