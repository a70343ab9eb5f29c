// SPDX-FileCopyrightText: 2026 Colloquy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cron scheduler for plugin jobs.
//!
//! Plugins declare jobs as cron patterns in their manifests; the [`Scheduler`]
//! validates every pattern up front and then runs one ticking task per job.
//! Jobs get the shared [`GlobalMessenger`], so a firing job can post to any
//! conversation or queue a conversation with a specific user.

use std::time::Duration;

use chrono::Utc;
use croner::Cron;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use colloquy_core::ColloquyError;
use colloquy_engine::{GlobalMessenger, Job};

#[derive(Debug)]
struct ScheduledJob {
    job: Job,
    cron: Cron,
}

/// Runs plugin jobs on their cron schedules.
#[derive(Debug)]
pub struct Scheduler {
    jobs: Vec<ScheduledJob>,
}

impl Scheduler {
    /// Parse and validate every job's schedule.
    ///
    /// A malformed pattern is a wiring mistake in the plugin manifest and
    /// comes back as a fatal [`ColloquyError::Schedule`].
    pub fn new(jobs: Vec<Job>) -> Result<Self, ColloquyError> {
        let mut scheduled = Vec::with_capacity(jobs.len());
        for job in jobs {
            let cron = job
                .schedule
                .parse::<Cron>()
                .map_err(|e| ColloquyError::Schedule {
                    spec: job.schedule.clone(),
                    detail: e.to_string(),
                })?;
            scheduled.push(ScheduledJob { job, cron });
        }
        Ok(Self { jobs: scheduled })
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Spawn one ticking task per job. Tasks stop on cancellation.
    pub fn start(self, messenger: GlobalMessenger, cancel: CancellationToken) {
        for entry in self.jobs {
            let messenger = messenger.clone();
            let cancel = cancel.clone();
            tokio::spawn(run_job(entry, messenger, cancel));
        }
    }
}

async fn run_job(entry: ScheduledJob, messenger: GlobalMessenger, cancel: CancellationToken) {
    let ScheduledJob { job, cron } = entry;
    info!(
        job = job.id.as_str(),
        schedule = job.schedule.as_str(),
        "job scheduled"
    );

    loop {
        let now = Utc::now();
        let next = match cron.find_next_occurrence(&now, false) {
            Ok(next) => next,
            Err(e) => {
                // Parsed fine but can never fire again (e.g. a fixed date in
                // the past). Nothing left to do for this job.
                error!(job = job.id.as_str(), error = %e, "schedule yields no next run, job stopped");
                return;
            }
        };
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        debug!(job = job.id.as_str(), next = %next, "job sleeping until next run");

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(job = job.id.as_str(), "job cancelled");
                return;
            }
            _ = tokio::time::sleep(wait) => {}
        }

        info!(job = job.id.as_str(), "job firing");
        if let Err(e) = (job.action)(messenger.clone()).await {
            warn!(job = job.id.as_str(), error = %e, "job run failed");
        }
    }
}
