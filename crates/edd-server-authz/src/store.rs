// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

use crate::error::AuthzError;
use crate::query::QueryPlan;

/// Columns shared by every resource type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
	pub key: i64,
	pub uuid: Option<Uuid>,
	pub slug: Option<String>,
	pub name: String,
	pub description: Option<String>,
	pub active: bool,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	pub meta: BTreeMap<String, String>,
}

/// Executes query plans against a backing store.
///
/// Implementations evaluate the plan's predicate set-at-a-time, in a single
/// statement against a consistent snapshot, and return rows in the plan's
/// order. The engine never calls `fetch` for plans whose predicate is
/// [`Predicate::Never`](crate::predicate::Predicate::Never).
#[async_trait]
pub trait RecordStore: Send + Sync {
	async fn fetch(&self, plan: &QueryPlan) -> Result<Vec<Record>, AuthzError>;
}

/// Keeps the first occurrence of each key, preserving order.
pub fn dedupe_by_key(rows: Vec<Record>) -> Vec<Record> {
	let mut seen = HashSet::with_capacity(rows.len());
	rows.into_iter().filter(|r| seen.insert(r.key)).collect()
}
