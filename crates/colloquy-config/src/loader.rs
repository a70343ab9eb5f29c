// SPDX-FileCopyrightText: 2026 Colloquy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./colloquy.toml` > `~/.config/colloquy/colloquy.toml` > `/etc/colloquy/colloquy.toml`
//! with environment variable overrides via `COLLOQUY_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::ColloquyConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/colloquy/colloquy.toml` (system-wide)
/// 3. `~/.config/colloquy/colloquy.toml` (user XDG config)
/// 4. `./colloquy.toml` (local directory)
/// 5. `COLLOQUY_*` environment variables
pub fn load_config() -> Result<ColloquyConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and for callers that assemble config inline.
pub fn load_config_from_str(toml_content: &str) -> Result<ColloquyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ColloquyConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ColloquyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ColloquyConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ColloquyConfig::default()))
        .merge(Toml::file("/etc/colloquy/colloquy.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("colloquy/colloquy.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("colloquy.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// CRITICAL: Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names. For example, `COLLOQUY_GATEWAY_VERIFICATION_TOKEN`
/// must map to `gateway.verification_token`, not `gateway.verification.token`.
fn env_provider() -> Env {
    Env::prefixed("COLLOQUY_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: COLLOQUY_ENGINE_RESPONSE_TIMEOUT_SECS -> "engine_response_timeout_secs"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("engine_", "engine.", 1)
            .replacen("gateway_", "gateway.", 1);
        mapped.into()
    })
}
