// SPDX-FileCopyrightText: 2026 Colloquy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Developer-facing plugin: a debugger conversation, a nag job, and a
//! ping responder.

use async_trait::async_trait;
use tracing::info;

use colloquy_core::{ColloquyError, Severity};
use colloquy_engine::{
    ChatPlugin, IncomingMessage, Job, Messenger, PluginManifest, Reply, Topic,
};

/// Exercises every messenger primitive so plugin developers can watch the
/// machinery from inside a chat window.
pub struct SysadminPlugin {
    developer: String,
}

impl SysadminPlugin {
    /// `developer` is the directory name of whoever gets poked by the cron job.
    pub fn new(developer: impl Into<String>) -> Self {
        Self {
            developer: developer.into(),
        }
    }
}

#[async_trait]
impl ChatPlugin for SysadminPlugin {
    fn init(&self) -> PluginManifest {
        let developer = self.developer.clone();
        let poker = Job::new("poker", "*/15 * * * *", move |gm| {
            let developer = developer.clone();
            async move {
                info!(developer = developer.as_str(), "poking the developer");
                gm.start_conversation(&developer, |messenger| async move {
                    messenger.new_message("CODE FASTER!").await.send().await?;
                    Ok(())
                })
            }
        });

        PluginManifest::new(
            "sysadmin",
            "Helps plugin developers see what is going on inside the bot",
            semver::Version::new(1, 0, 0),
        )
        .with_topic(Topic::new("Debugger", debugger))
        .with_job(poker)
    }

    async fn parse_message(
        &self,
        msg: &IncomingMessage,
        messenger: &Messenger,
    ) -> Result<(), ColloquyError> {
        if is_ping(&msg.text) {
            messenger.new_message("pong").await.send().await?;
        }
        Ok(())
    }
}

async fn debugger(messenger: Messenger) -> Result<(), ColloquyError> {
    messenger
        .new_message("What's up hackerman?")
        .await
        .add_button("Ping")
        .add_button("Pong")
        .add_dropdown("Foobar", ["bar", "foo"])
        .send()
        .await?;

    match messenger.await_response().await {
        Reply::Timeout => {
            messenger
                .new_message("Really? You ignoring me?")
                .await
                .send()
                .await?;
        }
        Reply::Message(rsp) => {
            messenger
                .update_last_message(format!("{rsp}, really?"), Some(Severity::Good))
                .await?;
            messenger
                .new_message(
                    "See? Now I can do stuff with your response, including ask another question",
                )
                .await
                .send()
                .await?;
        }
    }
    Ok(())
}

fn is_ping(text: &str) -> bool {
    text.eq_ignore_ascii_case("ping")
}
