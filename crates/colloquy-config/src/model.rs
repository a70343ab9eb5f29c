// SPDX-FileCopyrightText: 2026 Colloquy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Colloquy conversation engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Colloquy configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ColloquyConfig {
    /// Conversation engine settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Interactive callback gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Conversation engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Greeting posted at the start of a topic-selection conversation.
    #[serde(default = "default_greeting")]
    pub greeting: String,

    /// Seconds a conversation waits for an interactive answer before
    /// giving up with a timeout.
    #[serde(default = "default_response_timeout_secs")]
    pub response_timeout_secs: u64,

    /// Maximum number of conversations queued per user.
    #[serde(default = "default_convo_queue_size")]
    pub convo_queue_size: usize,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            greeting: default_greeting(),
            response_timeout_secs: default_response_timeout_secs(),
            convo_queue_size: default_convo_queue_size(),
            log_level: default_log_level(),
        }
    }
}

fn default_greeting() -> String {
    "Hi, I'm Clippy, your Solar Racing Assistant! What can I help you with today?".to_string()
}

fn default_response_timeout_secs() -> u64 {
    900
}

fn default_convo_queue_size() -> usize {
    32
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Interactive callback gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Address the gateway HTTP listener binds to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port the gateway HTTP listener binds to.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Shared secret the chat platform includes with every interactive
    /// callback. `None` disables verification (local development only).
    #[serde(default)]
    pub verification_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            verification_token: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}
