// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Table definitions.
//!
//! Timestamps are stored as RFC 3339 text in UTC with microsecond precision
//! and a `Z` suffix, so string comparison orders them correctly. Metadata is
//! a JSON object of strings in `meta_store`.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqlitePool;

use crate::error::DbError;

const STATEMENTS: &[&str] = &[
	r#"
	CREATE TABLE IF NOT EXISTS app_user (
		id INTEGER PRIMARY KEY,
		username TEXT UNIQUE NOT NULL,
		is_superuser INTEGER NOT NULL DEFAULT 0,
		is_elevated INTEGER NOT NULL DEFAULT 0
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS user_group (
		id INTEGER PRIMARY KEY,
		name TEXT UNIQUE NOT NULL
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS group_member (
		group_id INTEGER NOT NULL REFERENCES user_group(id) ON DELETE CASCADE,
		user_id INTEGER NOT NULL REFERENCES app_user(id) ON DELETE CASCADE,
		PRIMARY KEY (group_id, user_id)
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS user_capability (
		user_id INTEGER NOT NULL REFERENCES app_user(id) ON DELETE CASCADE,
		resource_type TEXT NOT NULL,
		operation TEXT NOT NULL,
		PRIMARY KEY (user_id, resource_type, operation)
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS study (
		id INTEGER PRIMARY KEY,
		uuid TEXT UNIQUE NOT NULL,
		slug TEXT UNIQUE NOT NULL,
		name TEXT NOT NULL,
		description TEXT,
		active INTEGER NOT NULL DEFAULT 1,
		created_at TEXT NOT NULL,
		updated_at TEXT NOT NULL,
		meta_store TEXT NOT NULL DEFAULT '{}'
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS line (
		id INTEGER PRIMARY KEY,
		uuid TEXT UNIQUE NOT NULL,
		study_id INTEGER NOT NULL REFERENCES study(id) ON DELETE CASCADE,
		name TEXT NOT NULL,
		description TEXT,
		active INTEGER NOT NULL DEFAULT 1,
		created_at TEXT NOT NULL,
		updated_at TEXT NOT NULL,
		meta_store TEXT NOT NULL DEFAULT '{}'
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS assay (
		id INTEGER PRIMARY KEY,
		uuid TEXT UNIQUE NOT NULL,
		line_id INTEGER NOT NULL REFERENCES line(id) ON DELETE CASCADE,
		name TEXT NOT NULL,
		description TEXT,
		active INTEGER NOT NULL DEFAULT 1,
		created_at TEXT NOT NULL,
		updated_at TEXT NOT NULL,
		meta_store TEXT NOT NULL DEFAULT '{}'
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS measurement (
		id INTEGER PRIMARY KEY,
		assay_id INTEGER NOT NULL REFERENCES assay(id) ON DELETE CASCADE,
		name TEXT NOT NULL,
		description TEXT,
		active INTEGER NOT NULL DEFAULT 1,
		created_at TEXT NOT NULL,
		updated_at TEXT NOT NULL,
		meta_store TEXT NOT NULL DEFAULT '{}'
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS strain (
		id INTEGER PRIMARY KEY,
		registry_id TEXT UNIQUE,
		registry_url TEXT,
		name TEXT NOT NULL,
		description TEXT,
		active INTEGER NOT NULL DEFAULT 1,
		created_at TEXT NOT NULL,
		updated_at TEXT NOT NULL,
		meta_store TEXT NOT NULL DEFAULT '{}'
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS line_strain (
		line_id INTEGER NOT NULL REFERENCES line(id) ON DELETE CASCADE,
		strain_id INTEGER NOT NULL REFERENCES strain(id) ON DELETE CASCADE,
		PRIMARY KEY (line_id, strain_id)
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS scope_grant (
		id INTEGER PRIMARY KEY,
		study_id INTEGER NOT NULL REFERENCES study(id) ON DELETE CASCADE,
		grantee TEXT NOT NULL CHECK (grantee IN ('user', 'group', 'everyone')),
		grantee_id INTEGER,
		level INTEGER NOT NULL CHECK (level IN (0, 1, 2)),
		CHECK ((grantee = 'everyone') = (grantee_id IS NULL))
	)
	"#,
	"CREATE INDEX IF NOT EXISTS idx_scope_grant_study ON scope_grant(study_id)",
	"CREATE INDEX IF NOT EXISTS idx_line_study ON line(study_id)",
	"CREATE INDEX IF NOT EXISTS idx_assay_line ON assay(line_id)",
	"CREATE INDEX IF NOT EXISTS idx_measurement_assay ON measurement(assay_id)",
	"CREATE INDEX IF NOT EXISTS idx_line_strain_strain ON line_strain(strain_id)",
];

/// Creates every table and index that does not exist yet.
#[tracing::instrument(skip(pool))]
pub async fn apply(pool: &SqlitePool) -> Result<(), DbError> {
	for statement in STATEMENTS {
		sqlx::query(statement).execute(pool).await?;
	}
	tracing::debug!(statements = STATEMENTS.len(), "schema applied");
	Ok(())
}

/// Renders a timestamp in the stored form.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
	at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DbError> {
	DateTime::parse_from_rfc3339(raw)
		.map(|at| at.with_timezone(&Utc))
		.map_err(|e| DbError::Internal(format!("Invalid stored timestamp '{raw}': {e}")))
}
