// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use edd_server_authz::{AuthzError, QueryPlan, Record, RecordStore};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::DbError;
use crate::schema::parse_timestamp;
use crate::sql;

/// [`RecordStore`] over the SQLite schema in [`crate::schema`].
///
/// Each plan runs as a single statement, so it sees one consistent snapshot.
#[derive(Clone)]
pub struct SqliteRecordStore {
	pool: SqlitePool,
}

impl SqliteRecordStore {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(
		skip(self, plan),
		fields(resource_type = %plan.resource_type, distinct = plan.distinct)
	)]
	pub async fn fetch_records(&self, plan: &QueryPlan) -> Result<Vec<Record>, DbError> {
		let mut qb = sql::select(plan)?;
		let rows = qb.build().fetch_all(&self.pool).await?;

		let records = rows
			.iter()
			.map(row_to_record)
			.collect::<Result<Vec<_>, _>>()?;
		tracing::debug!(rows = records.len(), "records fetched");
		Ok(records)
	}
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
	async fn fetch(&self, plan: &QueryPlan) -> Result<Vec<Record>, AuthzError> {
		Ok(self.fetch_records(plan).await?)
	}
}

fn row_to_record(row: &SqliteRow) -> Result<Record, DbError> {
	let uuid = row
		.try_get::<Option<String>, _>("uuid")?
		.map(|raw| {
			Uuid::parse_str(&raw)
				.map_err(|e| DbError::Internal(format!("Invalid stored uuid '{raw}': {e}")))
		})
		.transpose()?;
	let meta: BTreeMap<String, String> =
		serde_json::from_str(&row.try_get::<String, _>("meta_store")?)?;

	Ok(Record {
		key: row.try_get("id")?,
		uuid,
		slug: row.try_get("slug")?,
		name: row.try_get("name")?,
		description: row.try_get("description")?,
		active: row.try_get("active")?,
		created_at: parse_timestamp(&row.try_get::<String, _>("created_at")?)?,
		updated_at: parse_timestamp(&row.try_get::<String, _>("updated_at")?)?,
		meta,
	})
}
