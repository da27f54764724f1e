//! Scheduled and manual triggers for the lock-guarded jobs.

use super::autopilot::{AutoPilot, AutoPilotSummary};
use super::job_lock::{JobLock, JobOutcome, AUTOPILOT_JOB, POLLING_JOB};
use super::poller::{PollSummary, Poller};
use crate::domain::TimeMs;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trigger {
    Scheduled,
    Manual,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::Scheduled => "SCHEDULED",
            Trigger::Manual => "MANUAL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledJob {
    AutoPilot,
    Polling,
}

impl ScheduledJob {
    pub fn name(&self) -> &'static str {
        match self {
            ScheduledJob::AutoPilot => AUTOPILOT_JOB,
            ScheduledJob::Polling => POLLING_JOB,
        }
    }
}

#[derive(Clone)]
pub struct JobRunner {
    lock: JobLock,
    autopilot: AutoPilot,
    poller: Poller,
}

impl JobRunner {
    pub fn new(lock: JobLock, autopilot: AutoPilot, poller: Poller) -> Self {
        Self {
            lock,
            autopilot,
            poller,
        }
    }

    pub async fn run_autopilot(
        &self,
        trigger: Trigger,
    ) -> Result<JobOutcome<AutoPilotSummary>, sqlx::Error> {
        info!(job = AUTOPILOT_JOB, trigger = trigger.as_str(), "Job triggered");
        self.lock
            .run_exclusive(AUTOPILOT_JOB, || self.autopilot.run(TimeMs::now()))
            .await
    }

    pub async fn run_polling(
        &self,
        trigger: Trigger,
    ) -> Result<JobOutcome<PollSummary>, sqlx::Error> {
        info!(job = POLLING_JOB, trigger = trigger.as_str(), "Job triggered");
        self.lock
            .run_exclusive(POLLING_JOB, || self.poller.run(TimeMs::now()))
            .await
    }

    /// Run `job` every `every`, forever. The first run happens after one
    /// full interval. Failures are logged and the loop keeps going.
    pub async fn schedule(self: Arc<Self>, job: ScheduledJob, every: Duration) {
        info!(job = job.name(), every_secs = every.as_secs(), "Scheduler started");
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let result = match job {
                ScheduledJob::AutoPilot => {
                    self.run_autopilot(Trigger::Scheduled).await.map(|_| ())
                }
                ScheduledJob::Polling => self.run_polling(Trigger::Scheduled).await.map(|_| ()),
            };
            if let Err(e) = result {
                error!(job = job.name(), error = %e, "Scheduled job failed");
            }
        }
    }
}
