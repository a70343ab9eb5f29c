// SPDX-FileCopyrightText: 2026 Colloquy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Answers the questions people would otherwise ask a human.

use async_trait::async_trait;

use colloquy_core::ColloquyError;
use colloquy_engine::{ChatPlugin, IncomingMessage, Messenger, PluginManifest, Topic};

const NETWORK_DRIVE_TEXT: &str = "*On Windows*: \n\
    • Open a File Explorer window. \n\
    • Right-click on 'This PC' and then select 'Map Network Drive...'.  \n\
    • Enter '\\\\mefile4.me.gatech.edu\\Research\\GTSR' into the 'Folder:' field and then click 'Finish' (or hit Enter). \n\
    • Enter your GT Prism ID as 'AD\\<username>' (e.g. 'AD\\gburdell3') and your password. \n\n\
    *On OSX*:  \n\
    • From the desktop, click 'Go' in the menu bar above all and then 'Connect to Server'. \n\
    • Enter 'cifs://mefile4.me.gatech.edu/Research/GTSR' into the 'Server Address:' field and then click 'Connect' (or hit Enter). \n\
    • Enter your GT Prism ID (e.g. 'gburdell3') and your password.";

/// Lets users get basic help information without bothering people.
pub struct HelptextPlugin;

#[async_trait]
impl ChatPlugin for HelptextPlugin {
    fn init(&self) -> PluginManifest {
        PluginManifest::new(
            "helptext",
            "Lets users get basic help information without bothering people",
            semver::Version::new(1, 0, 0),
        )
        .with_topic(Topic::new("FAQ", faq))
    }

    async fn parse_message(
        &self,
        msg: &IncomingMessage,
        messenger: &Messenger,
    ) -> Result<(), ColloquyError> {
        if mentions_network_drive(&msg.text) {
            messenger.new_message(NETWORK_DRIVE_TEXT).await.send().await?;
        }
        Ok(())
    }
}

async fn faq(messenger: Messenger) -> Result<(), ColloquyError> {
    messenger
        .new_message(
            "Ask me about the network drive in any channel and I'll walk you through mounting it.",
        )
        .await
        .send()
        .await?;
    Ok(())
}

fn mentions_network_drive(text: &str) -> bool {
    text.to_lowercase().contains("network drive")
}
