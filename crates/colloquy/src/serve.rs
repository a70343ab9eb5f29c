// SPDX-FileCopyrightText: 2026 Colloquy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `colloquy serve` command implementation.
//!
//! Runs the full bot: the engine over the console transport, the built-in
//! plugins, the cron scheduler, and the HTTP gateway for interactive
//! callbacks. Supports graceful shutdown via signal handlers.

use std::sync::Arc;

use colloquy_config::ColloquyConfig;
use colloquy_core::{ChatTransport, ColloquyError};
use colloquy_cron::Scheduler;
use colloquy_engine::shutdown;
use colloquy_engine::Engine;
use colloquy_gateway::{start_server, ServerConfig};
use colloquy_plugins::{HelptextPlugin, ReactionsPlugin, SysadminPlugin};
use tracing::{error, info};

use crate::console::{ConsoleTransport, LOCAL_USER_NAME};

/// Runs the `colloquy serve` command.
///
/// Registers the built-in plugins, validates their job schedules, starts the
/// gateway and the scheduler, and drives the engine loop until a shutdown
/// signal arrives.
pub async fn run_serve(config: ColloquyConfig) -> Result<(), ColloquyError> {
    // Initialize tracing subscriber.
    init_tracing(&config.engine.log_level);

    info!("starting colloquy serve");

    let transport: Arc<dyn ChatTransport> = Arc::new(ConsoleTransport::new());
    let mut engine = Engine::new(transport, &config.engine);

    engine.register_plugin(SysadminPlugin::new(LOCAL_USER_NAME))?;
    engine.register_plugin(HelptextPlugin)?;
    engine.register_plugin(ReactionsPlugin)?;

    // Every job schedule is parsed before anything starts; a malformed cron
    // pattern aborts startup.
    let scheduler = Scheduler::new(engine.jobs())?;
    info!(
        topics = engine.topic_labels().len(),
        jobs = scheduler.len(),
        "engine assembled"
    );

    let cancel = shutdown::install_signal_handler();

    // The gateway feeds interactive callbacks into the same event queue the
    // transport uses.
    let server_config = ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
        verification_token: config.gateway.verification_token.clone(),
    };
    let events = engine.event_sender();
    let gateway_cancel = cancel.clone();
    let gateway = tokio::spawn(async move {
        if let Err(err) = start_server(&server_config, events).await {
            error!(error = %err, "gateway server failed");
            gateway_cancel.cancel();
        }
    });

    scheduler.start(engine.global_messenger(), cancel.clone());

    let result = engine.run(cancel.clone()).await;
    cancel.cancel();
    gateway.abort();

    info!("colloquy serve shutdown complete");
    result
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "colloquy={log_level},colloquy_engine={log_level},colloquy_cron={log_level},\
             colloquy_gateway={log_level},colloquy_plugins={log_level},warn"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
