// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::{
	SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::str::FromStr;
use std::time::Duration;

use crate::error::DbError;

/// Pool sizing and lock handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOptions {
	pub max_connections: u32,
	pub busy_timeout: Duration,
}

impl Default for PoolOptions {
	fn default() -> Self {
		Self {
			max_connections: 5,
			busy_timeout: Duration::from_secs(5),
		}
	}
}

/// Create a SqlitePool with default [`PoolOptions`].
///
/// # Arguments
/// * `database_url` - SQLite connection string (e.g., "sqlite:./edd.db")
///
/// # Errors
/// Returns `DbError::Internal` if the URL is invalid or connection fails.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, DbError> {
	create_pool_with(database_url, &PoolOptions::default()).await
}

/// Create a SqlitePool with WAL mode and the `REGEXP` operator registered.
/// The `REGEXP` function is always installed; text filters depend on it.
#[tracing::instrument(skip(database_url))]
pub async fn create_pool_with(
	database_url: &str,
	pool_options: &PoolOptions,
) -> Result<SqlitePool, DbError> {
	let options = SqliteConnectOptions::from_str(database_url)
		.map_err(|e| DbError::Internal(format!("Invalid database URL: {e}")))?
		.journal_mode(SqliteJournalMode::Wal)
		.synchronous(SqliteSynchronous::Normal)
		.foreign_keys(true)
		.busy_timeout(pool_options.busy_timeout)
		.with_regexp()
		.create_if_missing(true);

	let pool = SqlitePoolOptions::new()
		.max_connections(pool_options.max_connections)
		.connect_with(options)
		.await?;

	tracing::debug!("database pool created");
	Ok(pool)
}
