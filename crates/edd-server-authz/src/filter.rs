// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Caller-supplied search constraints.
//!
//! Attribute filters are independent of authorization. Everything is parsed
//! and validated here, at plan time, so bad input surfaces as an
//! [`InputError`] and never as a storage failure.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::InputError;
use crate::metadata::MetaFilters;
use crate::predicate::{Column, Literal, Predicate, TextMatch, TimeBound};

/// Raw filter parameters as the calling layer received them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSet {
	pub name_regex: Option<String>,
	pub description_regex: Option<String>,
	pub name_contains: Option<String>,
	pub case_sensitive: bool,
	/// `active`, `inactive` or `all`.
	pub active: Option<String>,
	/// Status of the lines linking strains to a study, for nested strain lookups.
	pub line_active: Option<String>,
	pub created_after: Option<String>,
	pub created_before: Option<String>,
	pub updated_after: Option<String>,
	pub updated_before: Option<String>,
	pub meta: Option<MetaFilters>,
	/// `ascending` or `descending` by name.
	pub sort_order: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActiveStatus {
	Active,
	Inactive,
	Any,
}

impl ActiveStatus {
	/// Parses a status parameter. Unrecognised values fall back to active-only.
	pub fn parse(raw: &str) -> ActiveStatus {
		match raw.to_ascii_lowercase().as_str() {
			"inactive" => ActiveStatus::Inactive,
			"all" => ActiveStatus::Any,
			"active" => ActiveStatus::Active,
			other => {
				tracing::debug!(value = other, "unrecognised active status, using active-only");
				ActiveStatus::Active
			}
		}
	}

	fn required(self) -> Option<bool> {
		match self {
			ActiveStatus::Active => Some(true),
			ActiveStatus::Inactive => Some(false),
			ActiveStatus::Any => None,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
	#[default]
	Key,
	NameAscending,
	NameDescending,
}

/// Attribute constraints compiled for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeFilters {
	pub predicate: Predicate,
	/// Applies only where the ownership chain passes through lines.
	pub line_active: Option<Predicate>,
	pub order: SortOrder,
}

/// Compiles `filters`. `default_status` applies when no `active` parameter was sent.
pub fn build(filters: &FilterSet, default_status: ActiveStatus) -> Result<AttributeFilters, InputError> {
	let mut parts = Vec::new();

	for (param, column, pattern) in [
		("name_regex", Column::Name, &filters.name_regex),
		("description_regex", Column::Description, &filters.description_regex),
	] {
		if let Some(pattern) = pattern.as_deref().filter(|p| !p.is_empty()) {
			regex::Regex::new(pattern).map_err(|e| InputError::Pattern {
				param: param.to_string(),
				message: e.to_string(),
			})?;
			parts.push(Predicate::Text {
				column,
				pattern: pattern.to_string(),
				mode: TextMatch::Regex,
				case_sensitive: filters.case_sensitive,
			});
		}
	}

	if let Some(fragment) = filters.name_contains.as_deref().filter(|p| !p.is_empty()) {
		parts.push(Predicate::Text {
			column: Column::Name,
			pattern: fragment.to_string(),
			mode: TextMatch::Contains,
			case_sensitive: filters.case_sensitive,
		});
	}

	let status = filters
		.active
		.as_deref()
		.map(ActiveStatus::parse)
		.unwrap_or(default_status);
	if let Some(active) = status.required() {
		parts.push(Predicate::Equals {
			column: Column::Active,
			value: Literal::Bool(active),
		});
	}

	for (param, column, bound, raw) in [
		("created_after", Column::CreatedAt, TimeBound::AtOrAfter, &filters.created_after),
		("created_before", Column::CreatedAt, TimeBound::Before, &filters.created_before),
		("updated_after", Column::UpdatedAt, TimeBound::AtOrAfter, &filters.updated_after),
		("updated_before", Column::UpdatedAt, TimeBound::Before, &filters.updated_before),
	] {
		if let Some(raw) = raw.as_deref().filter(|r| !r.is_empty()) {
			parts.push(Predicate::Time {
				column,
				bound,
				at: parse_timestamp(param, raw)?,
			});
		}
	}

	if let Some(meta) = &filters.meta {
		for test in meta.compile()? {
			parts.push(Predicate::Meta { test });
		}
	}

	let line_active = filters
		.line_active
		.as_deref()
		.map(ActiveStatus::parse)
		.unwrap_or(ActiveStatus::Active)
		.required()
		.map(|active| Predicate::LineActive { active });

	let order = match filters.sort_order.as_deref() {
		Some("ascending") => SortOrder::NameAscending,
		Some("descending") => SortOrder::NameDescending,
		_ => SortOrder::Key,
	};

	Ok(AttributeFilters {
		predicate: Predicate::all(parts),
		line_active,
		order,
	})
}

/// Parses RFC 3339, a naive date-time (taken as UTC) or a bare date (midnight UTC).
pub fn parse_timestamp(param: &'static str, raw: &str) -> Result<DateTime<Utc>, InputError> {
	if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
		return Ok(at.with_timezone(&Utc));
	}

	for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
		if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
			return Ok(naive.and_utc());
		}
	}

	if let Some(midnight) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
		.ok()
		.and_then(|date| date.and_hms_opt(0, 0, 0))
	{
		return Ok(midnight.and_utc());
	}

	Err(InputError::Timestamp {
		param,
		value: raw.to_string(),
	})
}
