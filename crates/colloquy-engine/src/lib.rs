// SPDX-FileCopyrightText: 2026 Colloquy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation engine for the Colloquy chat framework.
//!
//! The [`Engine`] is the central coordinator that:
//! - Receives events from a chat transport and from the HTTP gateway
//! - Fans channel messages out to every registered plugin
//! - Serializes direct-message conversations per user
//! - Resolves interactive callbacks into waiting conversations
//! - Handles graceful shutdown
//!
//! Both event sources converge on the same dispatch path.

pub mod convo;
pub mod directory;
pub mod mailbox;
pub mod messenger;
pub mod plugin;
pub mod registry;
pub mod shutdown;

pub use convo::{Conversation, ConversationPool, ConvoAction, GlobalMessenger};
pub use directory::DirectoryHandle;
pub use mailbox::{MailboxSender, Reply, ResponseMailbox};
pub use messenger::{Messenger, OutgoingMessage};
pub use plugin::{ChatPlugin, IncomingMessage, Job, JobAction, PluginManifest, Topic};
pub use registry::{CallbackRegistry, Waiter};

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use colloquy_config::EngineConfig;
use colloquy_core::{
    ChannelKind, ChatEvent, ChatTransport, ColloquyError, MessageEvent, Severity,
};

/// Capacity of the injection queue shared with the gateway.
const INJECTED_EVENT_CAPACITY: usize = 256;

struct RegisteredPlugin {
    name: String,
    plugin: Arc<dyn ChatPlugin>,
}

/// The conversation engine.
///
/// Owns the callback registry, the directory cache, and the per-user
/// conversation pool. Plugins are registered up front; once
/// [`run`](Engine::run) starts, registration is refused.
pub struct Engine {
    transport: Arc<dyn ChatTransport>,
    registry: Arc<CallbackRegistry>,
    directory: Arc<DirectoryHandle>,
    pool: Arc<ConversationPool>,
    plugins: Vec<RegisteredPlugin>,
    topics: BTreeMap<String, Topic>,
    jobs: Vec<Job>,
    greeting: String,
    timeout: Duration,
    running: AtomicBool,
    injected_tx: mpsc::Sender<ChatEvent>,
    injected_rx: Mutex<mpsc::Receiver<ChatEvent>>,
}

impl Engine {
    pub fn new(transport: Arc<dyn ChatTransport>, config: &EngineConfig) -> Self {
        let registry = Arc::new(CallbackRegistry::new());
        let directory = Arc::new(DirectoryHandle::new());
        let timeout = Duration::from_secs(config.response_timeout_secs);
        let pool = Arc::new(ConversationPool::new(
            transport.clone(),
            registry.clone(),
            directory.clone(),
            timeout,
            config.convo_queue_size,
        ));
        let (injected_tx, injected_rx) = mpsc::channel(INJECTED_EVENT_CAPACITY);

        Self {
            transport,
            registry,
            directory,
            pool,
            plugins: Vec::new(),
            topics: BTreeMap::new(),
            jobs: Vec::new(),
            greeting: config.greeting.clone(),
            timeout,
            running: AtomicBool::new(false),
            injected_tx,
            injected_rx: Mutex::new(injected_rx),
        }
    }

    /// Register a plugin, collecting its topics and jobs.
    ///
    /// Label and job-id collisions across plugins corrupt routing and are
    /// refused outright, as is registration after the engine has started.
    pub fn register_plugin(
        &mut self,
        plugin: impl ChatPlugin + 'static,
    ) -> Result<(), ColloquyError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(ColloquyError::Registration(
                "plugins must be registered before the engine starts".to_string(),
            ));
        }

        let manifest = plugin.init();
        for topic in &manifest.topics {
            if self.topics.contains_key(&topic.label) {
                return Err(ColloquyError::Registration(format!(
                    "duplicate conversation topic label `{}`",
                    topic.label
                )));
            }
        }
        for job in &manifest.jobs {
            if self.jobs.iter().any(|existing| existing.id == job.id) {
                return Err(ColloquyError::Registration(format!(
                    "duplicate scheduled job id `{}`",
                    job.id
                )));
            }
        }

        info!(
            plugin = %manifest.name,
            version = %manifest.version,
            topics = manifest.topics.len(),
            jobs = manifest.jobs.len(),
            "plugin registered"
        );

        for topic in manifest.topics {
            self.topics.insert(topic.label.clone(), topic);
        }
        self.jobs.extend(manifest.jobs);
        self.plugins.push(RegisteredPlugin {
            name: manifest.name,
            plugin: Arc::new(plugin),
        });
        Ok(())
    }

    /// Sender for events arriving outside the transport stream (the gateway).
    pub fn event_sender(&self) -> mpsc::Sender<ChatEvent> {
        self.injected_tx.clone()
    }

    /// The shared messenger handed to scheduled jobs.
    pub fn global_messenger(&self) -> GlobalMessenger {
        GlobalMessenger::new(
            self.transport.clone(),
            self.registry.clone(),
            self.directory.clone(),
            self.pool.clone(),
            self.timeout,
        )
    }

    /// Jobs collected from all registered plugins.
    pub fn jobs(&self) -> Vec<Job> {
        self.jobs.clone()
    }

    /// Labels of all registered topics, sorted.
    pub fn topic_labels(&self) -> Vec<String> {
        self.topics.keys().cloned().collect()
    }

    /// Drive the engine until cancellation or a broken transport.
    ///
    /// Recoverable per-event failures are logged and absorbed; only a dead
    /// event stream or rejected credentials end the loop with an error.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), ColloquyError> {
        self.running.store(true, Ordering::SeqCst);
        self.refresh_directory().await;
        info!("engine serving");

        let mut injected = self.injected_rx.lock().await;
        let result = loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("engine shutdown requested");
                    break Ok(());
                }
                Some(event) = injected.recv() => {
                    if let Err(err) = self.handle_event(event).await {
                        break Err(err);
                    }
                }
                received = self.transport.receive() => {
                    match received {
                        Ok(event) => {
                            if let Err(err) = self.handle_event(event).await {
                                break Err(err);
                            }
                        }
                        Err(err) => {
                            error!(error = %err, "transport event stream broken");
                            break Err(err);
                        }
                    }
                }
            }
        };

        for registered in &self.plugins {
            registered.plugin.teardown().await;
            debug!(plugin = %registered.name, "plugin torn down");
        }
        result
    }

    async fn handle_event(&self, event: ChatEvent) -> Result<(), ColloquyError> {
        match event {
            ChatEvent::Hello => {
                debug!("transport says hello");
            }
            ChatEvent::Connected => {
                info!("transport connected");
                self.refresh_directory().await;
            }
            ChatEvent::ChannelJoined(channel) => {
                info!(%channel, "joined channel");
                self.refresh_directory().await;
            }
            ChatEvent::DmCreated(channel) => {
                debug!(%channel, "dm conversation opened");
                self.refresh_directory().await;
            }
            ChatEvent::Message(msg) => {
                self.route_message(msg).await;
            }
            ChatEvent::Interactive(action) => {
                self.registry.resolve(&action.callback_token, &action.value);
            }
            ChatEvent::AuthInvalid => {
                return Err(ColloquyError::Transport {
                    message: "platform rejected credentials".to_string(),
                    source: None,
                });
            }
            ChatEvent::TransportError(detail) => {
                warn!(detail, "transport reported a recoverable error");
            }
        }
        Ok(())
    }

    async fn refresh_directory(&self) {
        match self.transport.directory().await {
            Ok(snapshot) => {
                debug!(
                    users = snapshot.users.len(),
                    channels = snapshot.channels.len(),
                    dms = snapshot.dms.len(),
                    "directory refreshed"
                );
                self.directory.replace(snapshot);
                self.pool.prune_unknown();
            }
            Err(err) => {
                warn!(error = %err, "directory refresh failed");
            }
        }
    }

    async fn route_message(&self, msg: MessageEvent) {
        // Thread replies and the bot's own messages are not routed.
        if msg.thread.is_some() {
            return;
        }
        if self.directory.is_bot(&msg.user) {
            return;
        }

        match msg.channel.kind() {
            ChannelKind::Channel => self.fan_out(msg).await,
            ChannelKind::Direct => self.dispatch_dm(msg).await,
            ChannelKind::Other => {
                debug!(channel = %msg.channel, "ignoring message on unrouted conversation type");
            }
        }
    }

    /// Deliver a channel message to every plugin, in registration order.
    async fn fan_out(&self, msg: MessageEvent) {
        let incoming = IncomingMessage::new(
            msg.text,
            msg.user,
            msg.channel.clone(),
            msg.timestamp,
            self.transport.clone(),
        );

        for registered in &self.plugins {
            // Each invocation gets its own scope; one plugin's prompt state
            // never bleeds into another's.
            let messenger = Messenger::new(
                msg.channel.clone(),
                self.transport.clone(),
                self.registry.clone(),
                self.timeout,
            );
            if let Err(err) = registered.plugin.parse_message(&incoming, &messenger).await {
                warn!(
                    plugin = %registered.name,
                    error = %err,
                    "plugin failed to handle channel message"
                );
            }
        }
    }

    async fn dispatch_dm(&self, msg: MessageEvent) {
        let Some(user_name) = self.directory.user_name(&msg.user) else {
            debug!(user = %msg.user, "dm sender missing from directory, ignoring");
            return;
        };

        // A running conversation owns the user's raw text; otherwise the
        // text starts the topic-selection flow.
        if self.pool.respond_to_current(&user_name, &msg.text) {
            return;
        }
        self.start_topic_selection(&user_name);
    }

    fn start_topic_selection(&self, user: &str) {
        let greeting = self.greeting.clone();
        let labels: Vec<String> = self.topics.keys().cloned().collect();
        let actions: HashMap<String, ConvoAction> = self
            .topics
            .iter()
            .map(|(label, topic)| (label.clone(), topic.action.clone()))
            .collect();
        let pool = self.pool.clone();
        let user_name = user.to_string();

        let selection = Conversation::new(move |messenger: Messenger| {
            let greeting = greeting.clone();
            let labels = labels.clone();
            let actions = actions.clone();
            let pool = pool.clone();
            let user = user_name.clone();
            async move {
                if labels.is_empty() {
                    messenger
                        .new_message("I don't have any topics to offer yet.")
                        .await
                        .send()
                        .await?;
                    return Ok(());
                }

                messenger
                    .new_message(greeting)
                    .await
                    .add_dropdown("How can I help?", labels)
                    .send()
                    .await?;

                match messenger.await_response().await {
                    Reply::Message(choice) => match actions.get(&choice) {
                        Some(action) => {
                            messenger
                                .update_last_message(
                                    format!("{choice} it is!"),
                                    Some(Severity::Good),
                                )
                                .await?;
                            // Queued behind this conversation; the lane picks
                            // it up as soon as this script returns.
                            if let Err(err) =
                                pool.enqueue(&user, Conversation::from_action(action.clone()))
                            {
                                warn!(user = user.as_str(), error = %err, "could not queue selected topic");
                            }
                        }
                        None => {
                            messenger
                                .update_last_message(
                                    format!("I don't know anything about `{choice}`."),
                                    Some(Severity::Warning),
                                )
                                .await?;
                        }
                    },
                    Reply::Timeout => {
                        messenger
                            .update_last_message("Guess you found what you needed.", None)
                            .await?;
                    }
                }
                Ok(())
            }
        });

        if let Err(err) = self.pool.enqueue(user, selection) {
            warn!(user, error = %err, "could not start topic selection");
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("plugins", &self.plugins.len())
            .field("topics", &self.topics.len())
            .field("jobs", &self.jobs.len())
            .field("running", &self.running.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use colloquy_core::{
        ChannelId, DirectorySnapshot, DmEntry, InteractiveAction, User, UserId,
    };
    use colloquy_test_utils::MockTransport;

    struct NullPlugin {
        name: &'static str,
        manifest_topics: Vec<&'static str>,
        manifest_jobs: Vec<&'static str>,
    }

    #[async_trait]
    impl ChatPlugin for NullPlugin {
        fn init(&self) -> PluginManifest {
            let mut manifest =
                PluginManifest::new(self.name, "test plugin", semver::Version::new(0, 1, 0));
            for label in &self.manifest_topics {
                manifest = manifest.with_topic(Topic::new(*label, |_m| async { Ok(()) }));
            }
            for id in &self.manifest_jobs {
                manifest = manifest.with_job(Job::new(*id, "* * * * *", |_m| async { Ok(()) }));
            }
            manifest
        }

        async fn parse_message(
            &self,
            _msg: &IncomingMessage,
            _messenger: &Messenger,
        ) -> Result<(), ColloquyError> {
            Ok(())
        }
    }

    fn engine_config() -> EngineConfig {
        EngineConfig {
            greeting: "What can I help you with today?".into(),
            response_timeout_secs: 2,
            convo_queue_size: 8,
            log_level: "info".into(),
        }
    }

    fn alice_snapshot() -> DirectorySnapshot {
        DirectorySnapshot {
            bot: Some(UserId("UBOT".into())),
            users: vec![User {
                id: UserId("U1".into()),
                name: "alice".into(),
            }],
            channels: vec![colloquy_core::ChannelInfo {
                id: ChannelId("C1".into()),
                name: "general".into(),
            }],
            dms: vec![DmEntry {
                channel: ChannelId("D1".into()),
                user: UserId("U1".into()),
            }],
        }
    }

    #[tokio::test]
    async fn duplicate_topic_label_is_refused() {
        let transport = Arc::new(MockTransport::new());
        let mut engine = Engine::new(transport, &engine_config());

        engine
            .register_plugin(NullPlugin {
                name: "one",
                manifest_topics: vec!["FAQ"],
                manifest_jobs: vec![],
            })
            .unwrap();
        let err = engine
            .register_plugin(NullPlugin {
                name: "two",
                manifest_topics: vec!["FAQ"],
                manifest_jobs: vec![],
            })
            .unwrap_err();

        assert!(err.is_fatal());
        assert!(err.to_string().contains("FAQ"));
    }

    #[tokio::test]
    async fn duplicate_job_id_is_refused() {
        let transport = Arc::new(MockTransport::new());
        let mut engine = Engine::new(transport, &engine_config());

        engine
            .register_plugin(NullPlugin {
                name: "one",
                manifest_topics: vec![],
                manifest_jobs: vec!["nag"],
            })
            .unwrap();
        let err = engine
            .register_plugin(NullPlugin {
                name: "two",
                manifest_topics: vec![],
                manifest_jobs: vec!["nag"],
            })
            .unwrap_err();

        assert!(err.is_fatal());
        assert!(err.to_string().contains("nag"));
    }

    #[tokio::test]
    async fn registration_after_start_is_refused() {
        let transport = Arc::new(MockTransport::new());
        let mut engine = Engine::new(transport.clone(), &engine_config());
        engine.running.store(true, Ordering::SeqCst);

        let err = engine
            .register_plugin(NullPlugin {
                name: "late",
                manifest_topics: vec![],
                manifest_jobs: vec![],
            })
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn topic_labels_are_sorted() {
        let transport = Arc::new(MockTransport::new());
        let mut engine = Engine::new(transport, &engine_config());
        engine
            .register_plugin(NullPlugin {
                name: "one",
                manifest_topics: vec!["debug"],
                manifest_jobs: vec![],
            })
            .unwrap();
        engine
            .register_plugin(NullPlugin {
                name: "two",
                manifest_topics: vec!["FAQ"],
                manifest_jobs: vec![],
            })
            .unwrap();

        // BTreeMap ordering: uppercase sorts before lowercase.
        assert_eq!(engine.topic_labels(), vec!["FAQ", "debug"]);
    }

    #[tokio::test]
    async fn dm_without_running_conversation_starts_topic_selection() {
        let transport = Arc::new(MockTransport::new());
        transport.set_directory(alice_snapshot()).await;

        let mut engine = Engine::new(transport.clone(), &engine_config());
        engine
            .register_plugin(NullPlugin {
                name: "topics",
                manifest_topics: vec!["debug", "FAQ"],
                manifest_jobs: vec![],
            })
            .unwrap();

        let cancel = CancellationToken::new();
        let sender = engine.event_sender();
        let runner = {
            let cancel = cancel.clone();
            tokio::spawn(async move { engine.run(cancel).await })
        };

        sender
            .send(ChatEvent::Message(MessageEvent {
                channel: ChannelId("D1".into()),
                user: UserId("U1".into()),
                text: "hello?".into(),
                timestamp: "1724500000.000100".into(),
                thread: None,
            }))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        let post = transport.last_post().await.expect("greeting posted");
        assert!(post.text.contains("What can I help you with"));
        assert_eq!(post.channel, ChannelId("D1".into()));
        assert!(post.callback_token.is_some());

        // Dropdown offers the registered topics, sorted.
        let colloquy_core::Element::Dropdown { options, .. } = &post.elements[0] else {
            panic!("expected dropdown");
        };
        let labels: Vec<&str> = options.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, vec!["FAQ", "debug"]);

        cancel.cancel();
        runner.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn interactive_event_resolves_selection_and_queues_topic() {
        let transport = Arc::new(MockTransport::new());
        transport.set_directory(alice_snapshot()).await;

        let ran = Arc::new(tokio::sync::Mutex::new(false));
        let ran_flag = ran.clone();

        let mut engine = Engine::new(transport.clone(), &engine_config());

        // Hand-built plugin whose FAQ topic records its execution.
        struct FaqPlugin {
            ran: Arc<tokio::sync::Mutex<bool>>,
        }
        #[async_trait]
        impl ChatPlugin for FaqPlugin {
            fn init(&self) -> PluginManifest {
                let ran = self.ran.clone();
                PluginManifest::new("faq", "answers questions", semver::Version::new(0, 1, 0))
                    .with_topic(Topic::new("FAQ", move |_messenger| {
                        let ran = ran.clone();
                        async move {
                            *ran.lock().await = true;
                            Ok(())
                        }
                    }))
            }
            async fn parse_message(
                &self,
                _msg: &IncomingMessage,
                _messenger: &Messenger,
            ) -> Result<(), ColloquyError> {
                Ok(())
            }
        }
        engine.register_plugin(FaqPlugin { ran: ran_flag }).unwrap();

        let cancel = CancellationToken::new();
        let sender = engine.event_sender();
        let runner = {
            let cancel = cancel.clone();
            tokio::spawn(async move { engine.run(cancel).await })
        };

        sender
            .send(ChatEvent::Message(MessageEvent {
                channel: ChannelId("D1".into()),
                user: UserId("U1".into()),
                text: "hi".into(),
                timestamp: "1724500000.000200".into(),
                thread: None,
            }))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let post = transport.last_post().await.expect("selection prompt");
        let token = post.callback_token.clone().unwrap();
        let colloquy_core::Element::Dropdown { options, .. } = &post.elements[0] else {
            panic!("expected dropdown");
        };
        let faq_id = options
            .iter()
            .find(|o| o.label == "FAQ")
            .map(|o| o.id.clone())
            .unwrap();

        sender
            .send(ChatEvent::Interactive(InteractiveAction {
                callback_token: token,
                value: faq_id,
            }))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(*ran.lock().await, "FAQ topic action should have run");

        // The prompt was replaced by a confirmation.
        let updates = transport.updated().await;
        assert_eq!(updates.len(), 1);
        assert!(updates[0].1.text.contains("FAQ"));

        cancel.cancel();
        runner.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn bot_and_thread_messages_are_ignored() {
        let transport = Arc::new(MockTransport::new());
        transport.set_directory(alice_snapshot()).await;

        let engine = Engine::new(transport.clone(), &engine_config());
        let cancel = CancellationToken::new();
        let sender = engine.event_sender();
        let runner = {
            let cancel = cancel.clone();
            tokio::spawn(async move { engine.run(cancel).await })
        };

        // Bot's own DM echo.
        sender
            .send(ChatEvent::Message(MessageEvent {
                channel: ChannelId("D1".into()),
                user: UserId("UBOT".into()),
                text: "greeting echo".into(),
                timestamp: "1".into(),
                thread: None,
            }))
            .await
            .unwrap();
        // Thread reply from alice.
        sender
            .send(ChatEvent::Message(MessageEvent {
                channel: ChannelId("D1".into()),
                user: UserId("U1".into()),
                text: "in a thread".into(),
                timestamp: "2".into(),
                thread: Some("1".into()),
            }))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(transport.post_count().await, 0);

        cancel.cancel();
        runner.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn auth_invalid_stops_the_engine() {
        let transport = Arc::new(MockTransport::new());
        let engine = Engine::new(transport.clone(), &engine_config());
        let cancel = CancellationToken::new();

        transport.inject_event(ChatEvent::AuthInvalid).await;
        let err = engine.run(cancel).await.unwrap_err();
        assert!(matches!(err, ColloquyError::Transport { .. }));
    }
}
