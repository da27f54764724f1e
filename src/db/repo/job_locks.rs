//! Job lock compare-and-swap for the repository.
//!
//! A lock is held iff `locked_until > now`. Acquisition is one conditional
//! upsert, so two racing callers can never both see the row as free.

use crate::domain::TimeMs;
use sqlx::Row;

use super::{JobLockRow, Repository};

impl Repository {
    /// Take the lock for `owner` if it is absent or expired.
    ///
    /// Returns true iff this call wrote the row.
    pub async fn try_acquire_job_lock(
        &self,
        name: &str,
        owner: &str,
        now: TimeMs,
        ttl_secs: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO job_locks (name, owner, locked_until)
            VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                owner = excluded.owner,
                locked_until = excluded.locked_until
            WHERE job_locks.locked_until <= ?
            "#,
        )
        .bind(name)
        .bind(owner)
        .bind(now.plus_secs(ttl_secs).as_ms())
        .bind(now.as_ms())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Expire the lock, but only for its current owner.
    ///
    /// Returns false when `owner` does not hold the row (a newer holder took
    /// over after expiry, or it was never ours).
    pub async fn release_job_lock(
        &self,
        name: &str,
        owner: &str,
        now: TimeMs,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE job_locks SET locked_until = ? WHERE name = ? AND owner = ?",
        )
        .bind(now.as_ms().saturating_sub(1))
        .bind(name)
        .bind(owner)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get_job_lock(&self, name: &str) -> Result<Option<JobLockRow>, sqlx::Error> {
        let row = sqlx::query("SELECT name, owner, locked_until FROM job_locks WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| JobLockRow {
            name: r.get("name"),
            owner: r.get("owner"),
            locked_until: TimeMs::new(r.get("locked_until")),
        }))
    }
}
