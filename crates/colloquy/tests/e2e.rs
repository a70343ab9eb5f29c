// SPDX-FileCopyrightText: 2026 Colloquy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the assembled Colloquy stack.
//!
//! Each test builds an isolated engine over a mock transport, drives it with
//! injected platform events, and asserts on the traffic the transport
//! captured. The gateway tests go one step further and push callbacks through
//! the real axum router.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use colloquy_core::{ColloquyError, Element, OutboundMessage, Severity};
use colloquy_cron::Scheduler;
use colloquy_engine::{
    ChatPlugin, IncomingMessage, Job, Messenger, PluginManifest, Reply, Topic,
};
use colloquy_gateway::{router, GatewayState};
use colloquy_plugins::{ReactionsPlugin, SysadminPlugin};
use colloquy_test_utils::{channel_message, TestHarness};

/// Find the answer named `label` on a prompt: the prompt's correlation token
/// plus the opaque element (or option) id a click would report.
fn choice(post: &OutboundMessage, label: &str) -> (String, String) {
    let token = post
        .callback_token
        .clone()
        .expect("prompt carries a callback token");
    let id = post
        .elements
        .iter()
        .find_map(|element| match element {
            Element::Button { id, label: l } if l == label => Some(id.clone()),
            Element::Dropdown { options, .. } => options
                .iter()
                .find(|option| option.label == label)
                .map(|option| option.id.clone()),
            _ => None,
        })
        .unwrap_or_else(|| panic!("no choice labeled `{label}`"));
    (token, id)
}

/// Topic that posts a single line when chosen.
struct EchoTopic;

#[async_trait]
impl ChatPlugin for EchoTopic {
    fn init(&self) -> PluginManifest {
        PluginManifest::new("echo", "posts a line when chosen", semver::Version::new(0, 1, 0))
            .with_topic(Topic::new("Echo", |messenger| async move {
                messenger
                    .new_message("echo topic speaking")
                    .await
                    .send()
                    .await?;
                Ok(())
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

/// Topic that asks two questions back to back; only the second one is live
/// by the time anyone can answer.
struct TwoPrompts;

#[async_trait]
impl ChatPlugin for TwoPrompts {
    fn init(&self) -> PluginManifest {
        PluginManifest::new("quiz", "asks two questions in a row", semver::Version::new(0, 1, 0))
            .with_topic(Topic::new("Quiz", |messenger| async move {
                messenger
                    .new_message("first question")
                    .await
                    .add_button("A")
                    .send()
                    .await?;
                messenger
                    .new_message("second question")
                    .await
                    .add_button("B")
                    .send()
                    .await?;
                match messenger.await_response().await {
                    Reply::Message(answer) => {
                        messenger
                            .new_message(format!("heard {answer}"))
                            .await
                            .send()
                            .await?;
                    }
                    Reply::Timeout => {
                        messenger.new_message("heard nothing").await.send().await?;
                    }
                }
                Ok(())
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

// ---- Test 1: choosing a topic runs it ----

#[tokio::test]
async fn test_dm_selection_runs_the_chosen_topic() {
    let mut harness = TestHarness::builder().build().await;
    harness.register(EchoTopic).unwrap();
    let running = harness.start();

    running.dm("D1", "U1", "hi there").await.unwrap();
    running.settle().await;

    let prompt = running.transport.last_post().await.expect("a selection prompt");
    let (token, echo_id) = choice(&prompt, "Echo");
    running.click(&token, &echo_id).await.unwrap();
    running.settle().await;

    let updates = running.transport.updated().await;
    let confirmation = &updates.last().expect("a confirmation").1;
    assert_eq!(confirmation.text, "Echo it is!");
    assert_eq!(confirmation.severity, Some(Severity::Good));

    let posts = running.transport.posted().await;
    assert!(posts.iter().any(|p| p.text == "echo topic speaking"));
    running.shutdown().await.unwrap();
}

// ---- Test 2: a typed answer that matches nothing ----

#[tokio::test]
async fn test_unmatched_text_answer_updates_with_warning() {
    let mut harness = TestHarness::builder().build().await;
    harness.register(EchoTopic).unwrap();
    let running = harness.start();

    running.dm("D1", "U1", "hello").await.unwrap();
    running.settle().await;

    // The selection is waiting; free text is its answer.
    running.dm("D1", "U1", "blorp").await.unwrap();
    running.settle().await;

    let updates = running.transport.updated().await;
    let outcome = &updates.last().expect("an update").1;
    assert_eq!(outcome.text, "I don't know anything about `blorp`.");
    assert_eq!(outcome.severity, Some(Severity::Warning));
    running.shutdown().await.unwrap();
}

// ---- Test 3: an ignored prompt winds down on its own ----

#[tokio::test]
async fn test_ignored_prompt_times_out_gracefully() {
    let mut harness = TestHarness::builder().with_timeout_secs(1).build().await;
    harness.register(EchoTopic).unwrap();
    let running = harness.start();

    running.dm("D1", "U1", "hello?").await.unwrap();
    running.settle().await;
    tokio::time::sleep(Duration::from_millis(1200)).await;

    let updates = running.transport.updated().await;
    let outcome = &updates.last().expect("an update").1;
    assert_eq!(outcome.text, "Guess you found what you needed.");
    assert_eq!(outcome.severity, None);
    running.shutdown().await.unwrap();
}

// ---- Test 4: a superseded prompt's token is dead ----

#[tokio::test]
async fn test_superseded_prompt_token_is_dead() {
    let mut harness = TestHarness::builder().build().await;
    harness.register(TwoPrompts).unwrap();
    let running = harness.start();

    running.dm("D1", "U1", "quiz me").await.unwrap();
    running.settle().await;
    let selection = running.transport.last_post().await.expect("selection");
    let (token, quiz_id) = choice(&selection, "Quiz");
    running.click(&token, &quiz_id).await.unwrap();
    running.settle().await;

    let posts = running.transport.posted().await;
    let first = posts
        .iter()
        .find(|p| p.text == "first question")
        .expect("first prompt");
    let second = posts
        .iter()
        .find(|p| p.text == "second question")
        .expect("second prompt");
    let (stale_token, stale_id) = choice(first, "A");
    let (live_token, live_id) = choice(second, "B");

    // The stale click resolves to nothing.
    running.click(&stale_token, &stale_id).await.unwrap();
    running.settle().await;
    let posts = running.transport.posted().await;
    assert!(
        !posts.iter().any(|p| p.text.starts_with("heard")),
        "a superseded prompt must not deliver an answer"
    );

    running.click(&live_token, &live_id).await.unwrap();
    running.settle().await;
    let posts = running.transport.posted().await;
    assert!(posts.iter().any(|p| p.text == "heard B"));
    running.shutdown().await.unwrap();
}

// ---- Test 5: one user's conversations stay in order ----

#[tokio::test]
async fn test_conversations_for_one_user_run_in_order() {
    let harness = TestHarness::builder().build().await;
    let messenger = harness.engine.global_messenger();
    let running = harness.start();
    running.settle().await;

    for text in ["one", "two", "three"] {
        messenger
            .start_conversation("alice", move |m| async move {
                m.new_message(text).await.send().await?;
                Ok(())
            })
            .unwrap();
    }
    tokio::time::sleep(Duration::from_millis(300)).await;

    let texts: Vec<String> = running
        .transport
        .posted()
        .await
        .iter()
        .map(|p| p.text.clone())
        .collect();
    assert_eq!(texts, vec!["one", "two", "three"]);
    running.shutdown().await.unwrap();
}

// ---- Test 6: overflowing a user's queue is rejected ----

#[tokio::test]
async fn test_overflowing_a_users_queue_is_rejected() {
    let harness = TestHarness::builder().with_queue_size(1).build().await;
    let messenger = harness.engine.global_messenger();
    let running = harness.start();
    running.settle().await;

    // The first conversation parks on the gate and holds the lane.
    let gate = Arc::new(Notify::new());
    let held = gate.clone();
    messenger
        .start_conversation("alice", move |m| {
            let gate = held.clone();
            async move {
                gate.notified().await;
                m.new_message("released").await.send().await?;
                Ok(())
            }
        })
        .unwrap();
    running.settle().await;

    // One pending slot, then overflow.
    messenger
        .start_conversation("alice", |m| async move {
            m.new_message("queued").await.send().await?;
            Ok(())
        })
        .unwrap();
    let err = messenger
        .start_conversation("alice", |_m| async { Ok(()) })
        .unwrap_err();
    assert!(matches!(err, ColloquyError::QueueFull { user } if user == "alice"));

    gate.notify_one();
    tokio::time::sleep(Duration::from_millis(300)).await;
    let texts: Vec<String> = running
        .transport
        .posted()
        .await
        .iter()
        .map(|p| p.text.clone())
        .collect();
    assert_eq!(texts, vec!["released", "queued"]);
    running.shutdown().await.unwrap();
}

// ---- Test 7: channel traffic fans out to every plugin ----

#[tokio::test]
async fn test_channel_message_reaches_all_plugins() {
    let mut harness = TestHarness::builder().build().await;
    harness.register(SysadminPlugin::new("alice")).unwrap();
    harness.register(ReactionsPlugin).unwrap();
    let running = harness.start();

    running
        .inject(channel_message("C1", "U1", "ping"))
        .await
        .unwrap();
    running.settle().await;
    let post = running.transport.last_post().await.expect("a pong");
    assert_eq!(post.text, "pong");

    running
        .inject(channel_message("C1", "U1", "hmmm, not sure"))
        .await
        .unwrap();
    running.settle().await;
    let reactions = running.transport.reactions().await;
    assert_eq!(reactions.len(), 1);
    assert_eq!(reactions[0].0.as_str(), "C1");
    assert_eq!(reactions[0].2, "hmm");
    running.shutdown().await.unwrap();
}

// ---- Test 8: a gateway callback answers the waiting conversation ----

#[tokio::test]
async fn test_gateway_callback_drives_the_waiting_conversation() {
    let mut harness = TestHarness::builder().build().await;
    harness.register(EchoTopic).unwrap();
    let events = harness.engine.event_sender();
    let running = harness.start();

    running.dm("D1", "U1", "hi").await.unwrap();
    running.settle().await;
    let prompt = running.transport.last_post().await.expect("a selection prompt");
    let (token, echo_id) = choice(&prompt, "Echo");

    // The platform answers over HTTP, through the real router.
    let app = router(GatewayState {
        events,
        verification_token: None,
    });
    let payload = serde_json::json!({
        "callback_id": token,
        "actions": [{"type": "select", "selected_options": [{"value": echo_id}]}],
    });
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("payload={payload}")))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    running.settle().await;

    let updates = running.transport.updated().await;
    assert_eq!(updates.last().expect("a confirmation").1.text, "Echo it is!");
    let posts = running.transport.posted().await;
    assert!(posts.iter().any(|p| p.text == "echo topic speaking"));
    running.shutdown().await.unwrap();
}

// ---- Test 9: the gateway health probe ----

#[tokio::test]
async fn test_gateway_health_endpoint_reports_ok() {
    let (events, _rx) = tokio::sync::mpsc::channel(8);
    let app = router(GatewayState {
        events,
        verification_token: None,
    });

    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = String::from_utf8(body.to_vec()).unwrap();
    assert!(body.contains("\"status\":\"ok\""));
}

// ---- Test 10: a dm from a stranger is ignored ----

#[tokio::test]
async fn test_dm_from_unknown_user_is_ignored() {
    let mut harness = TestHarness::builder().build().await;
    harness.register(EchoTopic).unwrap();
    let running = harness.start();

    running.dm("D9", "U9", "hello?").await.unwrap();
    running.settle().await;

    assert_eq!(running.transport.post_count().await, 0);
    running.shutdown().await.unwrap();
}

// ---- Test 11: a scheduled job opens a conversation ----

#[tokio::test]
async fn test_scheduled_job_opens_a_conversation() {
    let harness = TestHarness::builder().build().await;
    let messenger = harness.engine.global_messenger();
    let running = harness.start();
    running.settle().await;

    let job = Job::new("nudge", "* * * * * *", |gm| async move {
        gm.start_conversation("alice", |m| async move {
            m.new_message("time for standup").await.send().await?;
            Ok(())
        })
    });
    let cancel = CancellationToken::new();
    Scheduler::new(vec![job])
        .unwrap()
        .start(messenger, cancel.clone());

    let mut fired = false;
    for _ in 0..30 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let posted = running.transport.posted().await;
        if posted.iter().any(|p| p.text == "time for standup") {
            fired = true;
            break;
        }
    }
    assert!(fired, "scheduled job never opened the conversation");

    cancel.cancel();
    running.shutdown().await.unwrap();
}
