// SPDX-FileCopyrightText: 2026 Colloquy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock chat transport for deterministic testing.
//!
//! `MockTransport` implements `ChatTransport` with injectable inbound events
//! and captured outbound traffic for assertion in tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use colloquy_core::{
    ChannelId, ChatEvent, ChatTransport, ColloquyError, DirectorySnapshot, MessageHandle,
    OutboundMessage,
};

/// A mock chat transport for testing.
///
/// Provides two sides:
/// - **inbound**: Events injected via `inject_event()` are returned by `receive()`
/// - **outbound**: Posts, updates, and reactions are captured and retrievable
///   via `posted()`, `updated()`, and `reactions()`
pub struct MockTransport {
    inbound: Arc<Mutex<VecDeque<Result<ChatEvent, ColloquyError>>>>,
    posts: Arc<Mutex<Vec<OutboundMessage>>>,
    updates: Arc<Mutex<Vec<(MessageHandle, OutboundMessage)>>>,
    reactions: Arc<Mutex<Vec<(ChannelId, String, String)>>>,
    directory: Arc<Mutex<DirectorySnapshot>>,
    fail_next_post: Arc<Mutex<Option<String>>>,
    notify: Arc<Notify>,
    next_handle: AtomicU64,
}

impl MockTransport {
    /// Create a new mock transport with empty queues and an empty directory.
    pub fn new() -> Self {
        Self {
            inbound: Arc::new(Mutex::new(VecDeque::new())),
            posts: Arc::new(Mutex::new(Vec::new())),
            updates: Arc::new(Mutex::new(Vec::new())),
            reactions: Arc::new(Mutex::new(Vec::new())),
            directory: Arc::new(Mutex::new(DirectorySnapshot::default())),
            fail_next_post: Arc::new(Mutex::new(None)),
            notify: Arc::new(Notify::new()),
            next_handle: AtomicU64::new(1),
        }
    }

    /// Inject an inbound event into the receive queue.
    ///
    /// The next call to `receive()` will return this event.
    pub async fn inject_event(&self, event: ChatEvent) {
        self.inbound.lock().await.push_back(Ok(event));
        self.notify.notify_one();
    }

    /// Inject a transport failure; the next call to `receive()` returns it.
    pub async fn inject_error(&self, err: ColloquyError) {
        self.inbound.lock().await.push_back(Err(err));
        self.notify.notify_one();
    }

    /// Replace the directory snapshot served by `directory()`.
    pub async fn set_directory(&self, snapshot: DirectorySnapshot) {
        *self.directory.lock().await = snapshot;
    }

    /// All messages captured by `post()`, in order.
    pub async fn posted(&self) -> Vec<OutboundMessage> {
        self.posts.lock().await.clone()
    }

    /// The most recently posted message, if any.
    pub async fn last_post(&self) -> Option<OutboundMessage> {
        self.posts.lock().await.last().cloned()
    }

    /// Count of messages captured by `post()`.
    pub async fn post_count(&self) -> usize {
        self.posts.lock().await.len()
    }

    /// Clear captured posts.
    pub async fn clear_posts(&self) {
        self.posts.lock().await.clear();
    }

    /// All edits captured by `update()`, with the handle each targeted.
    pub async fn updated(&self) -> Vec<(MessageHandle, OutboundMessage)> {
        self.updates.lock().await.clone()
    }

    /// All reactions captured by `add_reaction()`.
    pub async fn reactions(&self) -> Vec<(ChannelId, String, String)> {
        self.reactions.lock().await.clone()
    }

    /// Make the next call to `post()` fail with the given message.
    pub async fn fail_next_post(&self, message: &str) {
        *self.fail_next_post.lock().await = Some(message.to_string());
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn post(&self, msg: OutboundMessage) -> Result<MessageHandle, ColloquyError> {
        if let Some(message) = self.fail_next_post.lock().await.take() {
            return Err(ColloquyError::Transport {
                message,
                source: None,
            });
        }
        let n = self.next_handle.fetch_add(1, Ordering::SeqCst);
        self.posts.lock().await.push(msg);
        Ok(MessageHandle(format!("mock-ts-{n}")))
    }

    async fn update(
        &self,
        handle: &MessageHandle,
        msg: OutboundMessage,
    ) -> Result<MessageHandle, ColloquyError> {
        self.updates.lock().await.push((handle.clone(), msg));
        Ok(handle.clone())
    }

    async fn receive(&self) -> Result<ChatEvent, ColloquyError> {
        loop {
            {
                let mut queue = self.inbound.lock().await;
                if let Some(item) = queue.pop_front() {
                    return item;
                }
            }
            // Wait for notification that a new event was injected
            self.notify.notified().await;
        }
    }

    async fn directory(&self) -> Result<DirectorySnapshot, ColloquyError> {
        Ok(self.directory.lock().await.clone())
    }

    async fn add_reaction(
        &self,
        channel: &ChannelId,
        timestamp: &str,
        name: &str,
    ) -> Result<(), ColloquyError> {
        self.reactions
            .lock()
            .await
            .push((channel.clone(), timestamp.to_string(), name.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colloquy_core::{MessageEvent, UserId};

    fn make_dm(text: &str) -> ChatEvent {
        ChatEvent::Message(MessageEvent {
            channel: ChannelId("D1".to_string()),
            user: UserId("U1".to_string()),
            text: text.to_string(),
            timestamp: "1724500000.000001".to_string(),
            thread: None,
        })
    }

    #[tokio::test]
    async fn receive_returns_injected_events() {
        let transport = MockTransport::new();
        transport.inject_event(make_dm("hello")).await;

        let event = transport.receive().await.unwrap();
        match event {
            ChatEvent::Message(msg) => assert_eq!(msg.text, "hello"),
            other => panic!("expected message event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn post_captures_and_hands_back_ordered_handles() {
        let transport = MockTransport::new();
        let msg = OutboundMessage {
            channel: ChannelId("D1".to_string()),
            text: "first".to_string(),
            callback_token: None,
            elements: Vec::new(),
            severity: None,
        };

        let h1 = transport.post(msg.clone()).await.unwrap();
        let h2 = transport.post(msg).await.unwrap();
        assert_eq!(h1.as_str(), "mock-ts-1");
        assert_eq!(h2.as_str(), "mock-ts-2");
        assert_eq!(transport.post_count().await, 2);
    }

    #[tokio::test]
    async fn fail_next_post_fails_exactly_once() {
        let transport = MockTransport::new();
        transport.fail_next_post("channel archived").await;

        let msg = OutboundMessage {
            channel: ChannelId("C1".to_string()),
            text: "doomed".to_string(),
            callback_token: None,
            elements: Vec::new(),
            severity: None,
        };

        let err = transport.post(msg.clone()).await.unwrap_err();
        assert!(err.to_string().contains("channel archived"));
        assert_eq!(transport.post_count().await, 0);

        // Next post goes through.
        transport.post(msg).await.unwrap();
        assert_eq!(transport.post_count().await, 1);
    }

    #[tokio::test]
    async fn update_keeps_the_original_handle() {
        let transport = MockTransport::new();
        let msg = OutboundMessage {
            channel: ChannelId("D1".to_string()),
            text: "initial".to_string(),
            callback_token: None,
            elements: Vec::new(),
            severity: None,
        };
        let handle = transport.post(msg.clone()).await.unwrap();

        let mut edited = msg;
        edited.text = "edited".to_string();
        let returned = transport.update(&handle, edited).await.unwrap();
        assert_eq!(returned, handle);

        let updates = transport.updated().await;
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, handle);
        assert_eq!(updates[0].1.text, "edited");
    }

    #[tokio::test]
    async fn receive_waits_for_injection() {
        let transport = Arc::new(MockTransport::new());
        let injector = transport.clone();

        tokio::spawn(async move {
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
            injector.inject_event(make_dm("delayed")).await;
        });

        let event = tokio::time::timeout(
            tokio::time::Duration::from_secs(2),
            transport.receive(),
        )
        .await
        .expect("receive timed out")
        .unwrap();

        match event {
            ChatEvent::Message(msg) => assert_eq!(msg.text, "delayed"),
            other => panic!("expected message event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn injected_error_surfaces_through_receive() {
        let transport = MockTransport::new();
        transport.inject_event(make_dm("fine")).await;
        transport
            .inject_error(ColloquyError::Transport {
                message: "socket reset".to_string(),
                source: None,
            })
            .await;

        assert!(transport.receive().await.is_ok());
        let err = transport.receive().await.unwrap_err();
        assert!(err.to_string().contains("socket reset"));
    }

    #[tokio::test]
    async fn directory_serves_the_configured_snapshot() {
        let transport = MockTransport::new();
        assert!(transport.directory().await.unwrap().users.is_empty());

        let snapshot = DirectorySnapshot {
            bot: Some(UserId("UBOT".to_string())),
            users: vec![colloquy_core::User {
                id: UserId("U1".to_string()),
                name: "alice".to_string(),
            }],
            channels: Vec::new(),
            dms: Vec::new(),
        };
        transport.set_directory(snapshot.clone()).await;
        assert_eq!(transport.directory().await.unwrap(), snapshot);
    }

    #[tokio::test]
    async fn reactions_are_captured() {
        let transport = MockTransport::new();
        transport
            .add_reaction(&ChannelId("C1".to_string()), "1724500000.000001", "hmm")
            .await
            .unwrap();

        let reactions = transport.reactions().await;
        assert_eq!(reactions.len(), 1);
        assert_eq!(reactions[0].2, "hmm");
    }
}
