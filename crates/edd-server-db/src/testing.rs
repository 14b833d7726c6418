// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Fixtures for tests against an in-memory database.

use chrono::{DateTime, Utc};
use edd_server_authz::ResourceType;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use uuid::Uuid;

use crate::schema::{self, format_timestamp};

pub async fn create_test_pool() -> SqlitePool {
	let options = SqliteConnectOptions::from_str(":memory:")
		.unwrap()
		.foreign_keys(true)
		.with_regexp();

	SqlitePoolOptions::new()
		.max_connections(1)
		.connect_with(options)
		.await
		.expect("Failed to create test pool")
}

pub async fn create_schema_pool() -> SqlitePool {
	let pool = create_test_pool().await;
	schema::apply(&pool).await.unwrap();
	pool
}

/// Deterministic UUID for a seeded record, so tests can look it up by UUID.
pub fn uuid_for(rt: ResourceType, key: i64) -> Uuid {
	let tag = ResourceType::ALL
		.iter()
		.position(|t| *t == rt)
		.unwrap_or_default() as u128;
	Uuid::from_u128(((tag + 1) << 64) | key as u128)
}

/// Chained inserts of studies, lines, assays, measurements and strains.
///
/// Every record is created active, with empty metadata and both timestamps
/// set to 2020-01-01.
pub struct Seed<'a> {
	pool: &'a SqlitePool,
}

impl<'a> Seed<'a> {
	pub fn new(pool: &'a SqlitePool) -> Self {
		Self { pool }
	}

	fn epoch() -> String {
		"2020-01-01T00:00:00.000000Z".to_string()
	}

	pub async fn study(self, key: i64, slug: &str, name: &str) -> Self {
		sqlx::query(
			r#"
			INSERT INTO study (id, uuid, slug, name, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(key)
		.bind(uuid_for(ResourceType::Study, key).to_string())
		.bind(slug)
		.bind(name)
		.bind(Self::epoch())
		.bind(Self::epoch())
		.execute(self.pool)
		.await
		.unwrap();
		self
	}

	pub async fn line(self, key: i64, study: i64, name: &str) -> Self {
		sqlx::query(
			r#"
			INSERT INTO line (id, uuid, study_id, name, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(key)
		.bind(uuid_for(ResourceType::Line, key).to_string())
		.bind(study)
		.bind(name)
		.bind(Self::epoch())
		.bind(Self::epoch())
		.execute(self.pool)
		.await
		.unwrap();
		self
	}

	pub async fn assay(self, key: i64, line: i64, name: &str) -> Self {
		sqlx::query(
			r#"
			INSERT INTO assay (id, uuid, line_id, name, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(key)
		.bind(uuid_for(ResourceType::Assay, key).to_string())
		.bind(line)
		.bind(name)
		.bind(Self::epoch())
		.bind(Self::epoch())
		.execute(self.pool)
		.await
		.unwrap();
		self
	}

	pub async fn measurement(self, key: i64, assay: i64, name: &str) -> Self {
		sqlx::query(
			r#"
			INSERT INTO measurement (id, assay_id, name, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?)
			"#,
		)
		.bind(key)
		.bind(assay)
		.bind(name)
		.bind(Self::epoch())
		.bind(Self::epoch())
		.execute(self.pool)
		.await
		.unwrap();
		self
	}

	pub async fn strain(self, key: i64, name: &str) -> Self {
		sqlx::query(
			r#"
			INSERT INTO strain (id, registry_id, name, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?)
			"#,
		)
		.bind(key)
		.bind(uuid_for(ResourceType::Strain, key).to_string())
		.bind(name)
		.bind(Self::epoch())
		.bind(Self::epoch())
		.execute(self.pool)
		.await
		.unwrap();
		self
	}

	pub async fn link(self, line: i64, strain: i64) -> Self {
		sqlx::query("INSERT INTO line_strain (line_id, strain_id) VALUES (?, ?)")
			.bind(line)
			.bind(strain)
			.execute(self.pool)
			.await
			.unwrap();
		self
	}

	pub async fn inactive(self, rt: ResourceType, key: i64) -> Self {
		sqlx::query(&format!("UPDATE {} SET active = 0 WHERE id = ?", rt.as_str()))
			.bind(key)
			.execute(self.pool)
			.await
			.unwrap();
		self
	}

	pub async fn meta(self, rt: ResourceType, key: i64, meta: serde_json::Value) -> Self {
		sqlx::query(&format!("UPDATE {} SET meta_store = ? WHERE id = ?", rt.as_str()))
			.bind(meta.to_string())
			.bind(key)
			.execute(self.pool)
			.await
			.unwrap();
		self
	}

	pub async fn created(self, rt: ResourceType, key: i64, at: DateTime<Utc>) -> Self {
		sqlx::query(&format!(
			"UPDATE {} SET created_at = ?, updated_at = ? WHERE id = ?",
			rt.as_str()
		))
		.bind(format_timestamp(at))
		.bind(format_timestamp(at))
		.bind(key)
		.execute(self.pool)
		.await
		.unwrap();
		self
	}
}
