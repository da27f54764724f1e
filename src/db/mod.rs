//! Database module for SQLite operations.
//!
//! This module provides:
//! - Database initialization and migrations
//! - Connection options (WAL, foreign keys, busy timeout)
//! - Repository layer backing the settings, snapshot, price change, alert
//!   and job lock stores

pub mod migrations;
pub mod repo;

pub use migrations::init_db;
pub use repo::{AlertRecord, JobLockRow, Repository};
