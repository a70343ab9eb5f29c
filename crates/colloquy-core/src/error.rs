// SPDX-FileCopyrightText: 2026 Colloquy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Colloquy conversation engine.

use thiserror::Error;

/// The primary error type used across all Colloquy crates.
#[derive(Debug, Error)]
pub enum ColloquyError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport errors (send failure, connection loss, platform rejection).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Callback registry invariant violations (duplicate correlation token).
    #[error("callback registry error: {0}")]
    Registry(String),

    /// Plugin registration errors (duplicate topic labels or job IDs,
    /// registration after the serve loop has started).
    #[error("plugin registration error: {0}")]
    Registration(String),

    /// A cron schedule string that could not be parsed.
    #[error("invalid schedule `{spec}`: {detail}")]
    Schedule { spec: String, detail: String },

    /// Conversation targeted at a user absent from the directory.
    #[error("unknown user: {user}")]
    UnknownUser { user: String },

    /// Conversation queue for a user is at capacity.
    #[error("conversation queue full for user {user}")]
    QueueFull { user: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ColloquyError {
    /// Whether this error indicates a broken routing invariant.
    ///
    /// Fatal errors mean a programming mistake (duplicate tokens, duplicate
    /// plugin identifiers, bad schedules, registration after startup) and
    /// must stop the process rather than be swallowed per-event.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ColloquyError::Config(_)
                | ColloquyError::Registry(_)
                | ColloquyError::Registration(_)
                | ColloquyError::Schedule { .. }
        )
    }
}
