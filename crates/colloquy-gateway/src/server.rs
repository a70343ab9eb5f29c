// SPDX-FileCopyrightText: 2026 Colloquy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the callback listener.
//! Every interactive response is answered `200 OK` no matter what: the
//! platform retries non-200 responses, and a dropped callback must not be
//! distinguishable from an accepted one by the caller.

use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::Serialize;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tracing::{debug, warn};

use colloquy_core::{ChatEvent, ColloquyError, InteractiveAction};

use crate::payload::{InteractionForm, InteractivePayload};

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Channel for handing interactive events to the engine.
    pub events: mpsc::Sender<ChatEvent>,
    /// Shared secret expected in every callback payload (None = not checked).
    pub verification_token: Option<String>,
}

/// Gateway server configuration.
///
/// Mirrors `GatewayConfig` from `colloquy-config` to avoid a dependency on
/// the config crate from the gateway crate.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Shared secret for callback verification (None = verification disabled).
    pub verification_token: Option<String>,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// POST /
///
/// The platform's interactive-callback webhook. Failures never surface to the
/// caller; they are logged and the request is answered `200 OK`.
pub async fn post_interactive(
    State(state): State<GatewayState>,
    form: Result<Form<InteractionForm>, FormRejection>,
) -> StatusCode {
    let Ok(Form(form)) = form else {
        warn!("interactive callback with unreadable body dropped");
        return StatusCode::OK;
    };

    let payload: InteractivePayload = match serde_json::from_str(&form.payload) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "interactive callback with malformed payload dropped");
            return StatusCode::OK;
        }
    };

    // Wrong shared secret: drop before touching the engine at all.
    if let Some(expected) = &state.verification_token
        && payload.token != *expected
    {
        warn!(
            callback_id = payload.callback_id.as_str(),
            "interactive callback with wrong verification token dropped"
        );
        return StatusCode::OK;
    }

    let Some(value) = payload.first_answer() else {
        warn!(
            callback_id = payload.callback_id.as_str(),
            "interactive callback without a usable action dropped"
        );
        return StatusCode::OK;
    };

    debug!(
        callback_id = payload.callback_id.as_str(),
        "interactive callback accepted"
    );
    let event = ChatEvent::Interactive(InteractiveAction {
        callback_token: payload.callback_id.clone(),
        value: value.to_string(),
    });
    if let Err(e) = state.events.try_send(event) {
        warn!(error = %e, "engine event queue rejected interactive callback");
    }
    StatusCode::OK
}

/// GET /health
///
/// Liveness probe for systemd and load balancers.
pub async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Build the gateway router over the given state.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", post(post_interactive))
        .route("/health", get(get_health))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Start the gateway HTTP server.
///
/// Binds to the configured host:port and serves:
/// - POST / (interactive callbacks)
/// - GET /health (liveness)
///
/// Accepted callbacks are handed to the engine through `events`.
pub async fn start_server(
    config: &ServerConfig,
    events: mpsc::Sender<ChatEvent>,
) -> Result<(), ColloquyError> {
    let state = GatewayState {
        events,
        verification_token: config.verification_token.clone(),
    };
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener =
        tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| ColloquyError::Transport {
                message: format!("failed to bind gateway to {addr}: {e}"),
                source: Some(Box::new(e)),
            })?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| ColloquyError::Transport {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::error::TryRecvError;

    fn state_with_secret(
        secret: Option<&str>,
    ) -> (GatewayState, mpsc::Receiver<ChatEvent>) {
        let (tx, rx) = mpsc::channel(8);
        (
            GatewayState {
                events: tx,
                verification_token: secret.map(String::from),
            },
            rx,
        )
    }

    fn form(payload: &str) -> Result<Form<InteractionForm>, FormRejection> {
        Ok(Form(InteractionForm {
            payload: payload.to_string(),
        }))
    }

    #[tokio::test]
    async fn button_callback_becomes_an_interactive_event() {
        let (state, mut rx) = state_with_secret(Some("shhh"));
        let payload = r#"{
            "token": "shhh",
            "callback_id": "cb-1",
            "actions": [{"type": "button", "value": "el-yes"}]
        }"#;

        let status = post_interactive(State(state), form(payload)).await;
        assert_eq!(status, StatusCode::OK);

        let event = rx.try_recv().unwrap();
        let ChatEvent::Interactive(action) = event else {
            panic!("expected interactive event");
        };
        assert_eq!(action.callback_token, "cb-1");
        assert_eq!(action.value, "el-yes");
    }

    #[tokio::test]
    async fn select_callback_carries_the_selected_option() {
        let (state, mut rx) = state_with_secret(None);
        let payload = r#"{
            "callback_id": "cb-2",
            "actions": [{"type": "select", "selected_options": [{"value": "el-faq"}]}]
        }"#;

        assert_eq!(
            post_interactive(State(state), form(payload)).await,
            StatusCode::OK
        );
        let ChatEvent::Interactive(action) = rx.try_recv().unwrap() else {
            panic!("expected interactive event");
        };
        assert_eq!(action.value, "el-faq");
    }

    #[tokio::test]
    async fn wrong_secret_never_reaches_the_engine() {
        let (state, mut rx) = state_with_secret(Some("right"));
        let payload = r#"{
            "token": "wrong",
            "callback_id": "cb-3",
            "actions": [{"type": "button", "value": "el"}]
        }"#;

        // Still 200: the caller must not learn the secret was wrong.
        assert_eq!(
            post_interactive(State(state.clone()), form(payload)).await,
            StatusCode::OK
        );
        assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
    }

    #[tokio::test]
    async fn malformed_payload_is_dropped_with_ok() {
        let (state, mut rx) = state_with_secret(None);
        assert_eq!(
            post_interactive(State(state.clone()), form("this is not json")).await,
            StatusCode::OK
        );
        assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
    }

    #[tokio::test]
    async fn callback_without_usable_action_is_dropped() {
        let (state, mut rx) = state_with_secret(None);
        let payload = r#"{"callback_id": "cb-4", "actions": []}"#;
        assert_eq!(
            post_interactive(State(state.clone()), form(payload)).await,
            StatusCode::OK
        );
        assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
    }

    #[test]
    fn gateway_state_is_clone() {
        let (tx, _rx) = mpsc::channel(1);
        let state = GatewayState {
            events: tx,
            verification_token: Some("secret".to_string()),
        };
        let _cloned = state.clone();
    }

    #[test]
    fn server_config_debug() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            verification_token: None,
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("127.0.0.1"));
    }

    #[test]
    fn health_response_serializes() {
        let resp = HealthResponse {
            status: "ok".to_string(),
            version: "0.1.0".to_string(),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(json.contains("\"version\":\"0.1.0\""));
    }
}
