// SPDX-FileCopyrightText: 2026 Colloquy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `colloquy shell` command implementation.
//!
//! Launches an interactive console session against a local engine. Plain
//! lines become direct messages from the `local` user, lines starting with
//! `#` are posted to the shared channel, and a bare number activates that
//! choice on the most recent interactive prompt.

use std::sync::Arc;
use std::time::Duration;

use colloquy_config::ColloquyConfig;
use colloquy_core::{ChatTransport, ColloquyError};
use colloquy_engine::Engine;
use colloquy_plugins::{HelptextPlugin, ReactionsPlugin, SysadminPlugin};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio_util::sync::CancellationToken;

use crate::console::{ConsoleTransport, CHANNEL_NAME, LOCAL_USER_NAME};

/// Runs the `colloquy shell` interactive session.
///
/// The engine runs on a background task over the console transport; the
/// foreground loop reads lines and turns them into transport events.
pub async fn run_shell(config: ColloquyConfig) -> Result<(), ColloquyError> {
    let transport = Arc::new(ConsoleTransport::new());
    let mut engine = Engine::new(transport.clone() as Arc<dyn ChatTransport>, &config.engine);
    engine.register_plugin(SysadminPlugin::new(LOCAL_USER_NAME))?;
    engine.register_plugin(HelptextPlugin)?;
    engine.register_plugin(ReactionsPlugin)?;

    let cancel = CancellationToken::new();
    let engine_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { engine.run(cancel).await })
    };

    // Set up readline editor.
    let mut rl = DefaultEditor::new()
        .map_err(|e| ColloquyError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", "colloquy shell".bold().green());
    println!(
        "You are {}. Plain text opens a DM, {} posts to {}, a number picks a prompt choice.",
        LOCAL_USER_NAME.cyan(),
        "#<text>".yellow(),
        format!("#{CHANNEL_NAME}").cyan(),
    );
    println!("Type {} to exit.\n", "/quit".yellow());

    let prompt = format!("{}> ", LOCAL_USER_NAME.green());
    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed == "/quit" || trimmed == "/exit" {
                    break;
                }
                if trimmed.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(&line);

                if let Some(rest) = trimmed.strip_prefix('#') {
                    transport.send_channel_message(rest.trim()).await;
                } else if let Ok(n) = trimmed.parse::<usize>() {
                    if !transport.click(n).await {
                        eprintln!(
                            "{}: no choice numbered {n} on the last prompt",
                            "error".red()
                        );
                    }
                } else {
                    transport.send_direct_message(trimmed).await;
                }

                // Give the engine a beat to answer before the prompt redraws.
                tokio::time::sleep(Duration::from_millis(150)).await;
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C
                break;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D
                break;
            }
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    cancel.cancel();
    match engine_task.await {
        Ok(result) => result?,
        Err(e) => {
            return Err(ColloquyError::Internal(format!(
                "engine task failed: {e}"
            )));
        }
    }

    println!("{}", "goodbye".dimmed());
    Ok(())
}
