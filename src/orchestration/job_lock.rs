//! Named job mutex over the shared store with TTL expiry.

use crate::db::Repository;
use crate::domain::TimeMs;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub const AUTOPILOT_JOB: &str = "auto-pilot";
pub const POLLING_JOB: &str = "price-polling";

/// Result of trying to run a job under its lock. Contention is an outcome,
/// not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome<T> {
    Completed(T),
    AlreadyRunning,
}

#[derive(Clone)]
pub struct JobLock {
    repo: Arc<Repository>,
    ttl_secs: i64,
}

impl JobLock {
    pub fn new(repo: Arc<Repository>, ttl_secs: i64) -> Self {
        Self { repo, ttl_secs }
    }

    pub async fn acquire(&self, name: &str, owner: &str) -> Result<bool, sqlx::Error> {
        self.repo
            .try_acquire_job_lock(name, owner, TimeMs::now(), self.ttl_secs)
            .await
    }

    pub async fn release(&self, name: &str, owner: &str) -> Result<bool, sqlx::Error> {
        self.repo.release_job_lock(name, owner, TimeMs::now()).await
    }

    /// Run `job` while holding `name` under a fresh owner token.
    ///
    /// The lock is released after the job returns, whether it succeeded or
    /// failed. A release failure is logged; the TTL recovers the lock.
    pub async fn run_exclusive<T, E, F, Fut>(&self, name: &str, job: F) -> Result<JobOutcome<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<sqlx::Error>,
    {
        let owner = Uuid::new_v4().to_string();
        if !self.acquire(name, &owner).await? {
            info!(job = %name, "Job already running, skipping");
            return Ok(JobOutcome::AlreadyRunning);
        }
        info!(job = %name, owner = %owner, ttl_secs = self.ttl_secs, "Job lock acquired");

        let result = job().await;

        match self.release(name, &owner).await {
            Ok(true) => info!(job = %name, owner = %owner, "Job lock released"),
            Ok(false) => warn!(job = %name, owner = %owner, "Job lock was taken over before release"),
            Err(e) => warn!(job = %name, owner = %owner, error = %e, "Failed to release job lock"),
        }

        result.map(JobOutcome::Completed)
    }
}
