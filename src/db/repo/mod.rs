//! Repository layer for database operations.
//!
//! This module provides the `Repository` struct for all database operations.
//! Methods are organized across submodules by store role:
//! - `products.rs` - Product catalog records
//! - `settings.rs` - Global settings and per-product overrides
//! - `snapshots.rs` - Price snapshots (newest-first)
//! - `price_changes.rs` - Append-only price change log
//! - `alerts.rs` - Alert sink with read/unread state
//! - `job_locks.rs` - Job lock compare-and-swap

mod alerts;
mod job_locks;
mod price_changes;
mod products;
mod settings;
mod snapshots;

use crate::domain::{AlertType, Decimal, ProductId, Severity, TimeMs};
use serde::Serialize;
use sqlx::sqlite::SqlitePool;
use std::str::FromStr;
use tracing::warn;

/// Persisted alert with sink-owned read state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    pub id: i64,
    pub product_id: ProductId,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: Severity,
    pub message: String,
    pub metadata: serde_json::Value,
    pub read: bool,
    pub created_at: TimeMs,
}

/// Current holder of a job lock row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobLockRow {
    pub name: String,
    pub owner: String,
    pub locked_until: TimeMs,
}

/// Repository for database operations.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Round-trip to the database for readiness checks.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn decode_error(column: &str, raw: &str, reason: impl std::fmt::Display) -> sqlx::Error {
    warn!(column = %column, value = %raw, error = %reason, "Failed to decode stored value");
    sqlx::Error::Decode(format!("column {}: cannot decode {:?}: {}", column, raw, reason).into())
}

/// Decimals are stored as canonical TEXT; a malformed value is a decode error,
/// never a silent zero.
pub(crate) fn parse_decimal(column: &str, raw: &str) -> Result<Decimal, sqlx::Error> {
    Decimal::from_str_canonical(raw).map_err(|e| decode_error(column, raw, e))
}

pub(crate) fn parse_opt_decimal(
    column: &str,
    raw: Option<String>,
) -> Result<Option<Decimal>, sqlx::Error> {
    raw.map(|r| parse_decimal(column, &r)).transpose()
}

pub(crate) fn parse_enum<T>(column: &str, raw: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = String>,
{
    T::from_str(raw).map_err(|e| decode_error(column, raw, e))
}

pub(crate) fn opt_canonical(value: Option<Decimal>) -> Option<String> {
    value.map(|d| d.to_canonical_string())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal_rejects_garbage() {
        assert_eq!(
            parse_decimal("price", "12.50").unwrap(),
            Decimal::from_str_canonical("12.5").unwrap()
        );
        assert!(matches!(
            parse_decimal("price", "twelve"),
            Err(sqlx::Error::Decode(_))
        ));
    }

    #[test]
    fn test_parse_enum() {
        let status: crate::domain::BuyboxStatus = parse_enum("buybox_status", "LOSE").unwrap();
        assert_eq!(status, crate::domain::BuyboxStatus::Lose);
        assert!(parse_enum::<crate::domain::BuyboxStatus>("buybox_status", "??").is_err());
    }

    #[tokio::test]
    async fn test_ping() {
        let (_dir, repo) = test_support::temp_repo().await;
        repo.ping().await.unwrap();
    }
}
