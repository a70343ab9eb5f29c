// SPDX-FileCopyrightText: 2026 Colloquy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `colloquy doctor` command implementation.
//!
//! Runs diagnostic checks against the Colloquy environment to identify
//! configuration issues, malformed job schedules, and gateway connectivity
//! problems.

use std::io::IsTerminal;
use std::time::{Duration, Instant};

use colloquy_config::ColloquyConfig;
use colloquy_core::ColloquyError;
use colloquy_cron::Scheduler;
use colloquy_engine::ChatPlugin;
use colloquy_plugins::{HelptextPlugin, ReactionsPlugin, SysadminPlugin};

use crate::console::LOCAL_USER_NAME;

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    /// Check passed successfully.
    Pass,
    /// Check passed with a warning.
    Warn,
    /// Check failed.
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Name of the check.
    pub name: String,
    /// Check status.
    pub status: CheckStatus,
    /// Human-readable message.
    pub message: String,
    /// Duration the check took.
    pub duration: Duration,
}

/// Run the `colloquy doctor` command.
///
/// With `--plain`, disables colored output.
pub async fn run_doctor(config: &ColloquyConfig, plain: bool) -> Result<(), ColloquyError> {
    let use_color = !plain && std::io::stdout().is_terminal();
    let mut results = Vec::new();

    results.push(check_config().await);
    results.push(check_schedules().await);
    results.push(check_gateway(config).await);

    // Print results
    println!();
    println!("  colloquy doctor");
    println!("  {}", "-".repeat(50));

    let mut fail_count = 0;
    let mut warn_count = 0;

    for result in &results {
        let duration_ms = result.duration.as_millis();
        let status_symbol;
        let line;

        match result.status {
            CheckStatus::Pass => {
                if use_color {
                    use colored::Colorize;
                    status_symbol = "✓".green().to_string();
                    line = format!(
                        "    {status_symbol} {:<20} {} ({duration_ms}ms)",
                        result.name, result.message
                    );
                } else {
                    line = format!(
                        "    [OK]   {:<20} {} ({duration_ms}ms)",
                        result.name, result.message
                    );
                }
            }
            CheckStatus::Warn => {
                warn_count += 1;
                if use_color {
                    use colored::Colorize;
                    status_symbol = "!".yellow().to_string();
                    line = format!(
                        "    {status_symbol} {:<20} {} ({duration_ms}ms)",
                        result.name,
                        result.message.yellow()
                    );
                } else {
                    line = format!(
                        "    [WARN] {:<20} {} ({duration_ms}ms)",
                        result.name, result.message
                    );
                }
            }
            CheckStatus::Fail => {
                fail_count += 1;
                if use_color {
                    use colored::Colorize;
                    status_symbol = "✗".red().to_string();
                    line = format!(
                        "    {status_symbol} {:<20} {} ({duration_ms}ms)",
                        result.name,
                        result.message.red()
                    );
                } else {
                    line = format!(
                        "    [FAIL] {:<20} {} ({duration_ms}ms)",
                        result.name, result.message
                    );
                }
            }
        }

        println!("{line}");
    }

    println!();

    if fail_count > 0 || warn_count > 0 {
        let issues = fail_count + warn_count;
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
    } else {
        println!("  All checks passed.");
    }

    println!();

    Ok(())
}

/// Check configuration loads without errors.
async fn check_config() -> CheckResult {
    let start = Instant::now();
    match colloquy_config::load_and_validate() {
        Ok(_) => CheckResult {
            name: "Configuration".to_string(),
            status: CheckStatus::Pass,
            message: "valid".to_string(),
            duration: start.elapsed(),
        },
        Err(errors) => CheckResult {
            name: "Configuration".to_string(),
            status: CheckStatus::Fail,
            message: format!("{} error(s)", errors.len()),
            duration: start.elapsed(),
        },
    }
}

/// Check that every built-in job schedule parses.
async fn check_schedules() -> CheckResult {
    let start = Instant::now();

    let mut jobs = Vec::new();
    jobs.extend(SysadminPlugin::new(LOCAL_USER_NAME).init().jobs);
    jobs.extend(HelptextPlugin.init().jobs);
    jobs.extend(ReactionsPlugin.init().jobs);
    let count = jobs.len();

    match Scheduler::new(jobs) {
        Ok(_) => CheckResult {
            name: "Job schedules".to_string(),
            status: CheckStatus::Pass,
            message: format!("{count} schedule(s) valid"),
            duration: start.elapsed(),
        },
        Err(e) => CheckResult {
            name: "Job schedules".to_string(),
            status: CheckStatus::Fail,
            message: e.to_string(),
            duration: start.elapsed(),
        },
    }
}

/// Check the gateway endpoint is reachable.
async fn check_gateway(config: &ColloquyConfig) -> CheckResult {
    let start = Instant::now();

    // Connecting to the wildcard address is not portable; probe loopback.
    let host = if config.gateway.host == "0.0.0.0" {
        "127.0.0.1"
    } else {
        config.gateway.host.as_str()
    };
    let addr = format!("{host}:{}", config.gateway.port);

    let connect = tokio::net::TcpStream::connect(&addr);
    match tokio::time::timeout(Duration::from_secs(3), connect).await {
        Ok(Ok(_)) => CheckResult {
            name: "Gateway".to_string(),
            status: CheckStatus::Pass,
            message: format!("reachable at {addr}"),
            duration: start.elapsed(),
        },
        Ok(Err(_)) | Err(_) => CheckResult {
            name: "Gateway".to_string(),
            status: CheckStatus::Warn,
            message: format!("not reachable at {addr} (colloquy may not be running)"),
            duration: start.elapsed(),
        },
    }
}
