// SPDX-FileCopyrightText: 2026 Colloquy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as valid bind addresses and non-zero timeouts.

use crate::diagnostic::ConfigError;
use crate::model::ColloquyConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ColloquyConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    // Validate greeting is not empty
    if config.engine.greeting.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "engine.greeting must not be empty".to_string(),
        });
    }

    // Validate response timeout is non-zero
    if config.engine.response_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "engine.response_timeout_secs must be at least 1".to_string(),
        });
    }

    // Validate conversation queue has room for at least one entry
    if config.engine.convo_queue_size == 0 {
        errors.push(ConfigError::Validation {
            message: "engine.convo_queue_size must be at least 1".to_string(),
        });
    }

    // Validate log level names a tracing level
    let level = config.engine.log_level.trim();
    if !matches!(level, "trace" | "debug" | "info" | "warn" | "error") {
        errors.push(ConfigError::Validation {
            message: format!(
                "engine.log_level `{level}` is not one of trace, debug, info, warn, error"
            ),
        });
    }

    // Validate gateway host is not empty
    if config.gateway.host.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "gateway.host must not be empty".to_string(),
        });
    }

    // Validate gateway host looks like a valid IP or hostname
    if !config.gateway.host.trim().is_empty() {
        let addr = config.gateway.host.trim();
        // Accept valid IPv4, IPv6, or hostname patterns
        let is_valid_ip = addr.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = addr
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("gateway.host `{addr}` is not a valid IP address or hostname"),
            });
        }
    }

    // Validate a configured verification token is not blank
    if let Some(token) = &config.gateway.verification_token
        && token.trim().is_empty()
    {
        errors.push(ConfigError::Validation {
            message: "gateway.verification_token must not be blank when set".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
