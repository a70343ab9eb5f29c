// SPDX-FileCopyrightText: 2026 Colloquy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reacts to messages instead of replying to them.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use colloquy_core::ColloquyError;
use colloquy_engine::{ChatPlugin, IncomingMessage, Messenger, PluginManifest};

static HMM_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([Hh])+([Mm])+").unwrap());

/// Adds a `hmm` reaction to anything that sounds pensive.
pub struct ReactionsPlugin;

#[async_trait]
impl ChatPlugin for ReactionsPlugin {
    fn init(&self) -> PluginManifest {
        PluginManifest::new(
            "reactions",
            "Reacts to pensive messages with a matching emoji",
            semver::Version::new(1, 0, 0),
        )
    }

    async fn parse_message(
        &self,
        msg: &IncomingMessage,
        _messenger: &Messenger,
    ) -> Result<(), ColloquyError> {
        if HMM_PATTERN.is_match(&msg.text) {
            msg.add_reaction("hmm").await?;
        }
        Ok(())
    }
}
