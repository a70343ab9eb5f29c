// SPDX-FileCopyrightText: 2026 Colloquy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Colloquy - a conversational chat bot with interactive prompts.
//!
//! This is the binary entry point for the Colloquy bot.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod console;
mod doctor;
mod serve;
mod shell;

use clap::{Parser, Subcommand};

/// Colloquy - a conversational chat bot with interactive prompts.
#[derive(Parser, Debug)]
#[command(name = "colloquy", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the bot with the callback gateway and job scheduler.
    Serve,
    /// Talk to the bot in an interactive console session.
    Shell,
    /// Run diagnostic checks against the environment.
    Doctor {
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup.
    let config = match colloquy_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            colloquy_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let outcome = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Shell) => shell::run_shell(config).await,
        Some(Commands::Doctor { plain }) => doctor::run_doctor(&config, plain).await,
        None => {
            println!("colloquy: use --help for available commands");
            Ok(())
        }
    };

    if let Err(err) = outcome {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
