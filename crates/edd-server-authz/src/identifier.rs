// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Resolution of caller-supplied identifier strings.
//!
//! Shapes are tried in a fixed order: numeric key, then UUID, then slug where
//! the resource type has slugs. The first shape that parses wins, so a
//! numeric-looking slug can never be addressed by slug.

use serde::Serialize;
use uuid::Uuid;

use crate::error::InputError;
use crate::predicate::{Column, Literal, Predicate};
use crate::types::ResourceType;

/// An identifier tagged with the shape it resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "shape", content = "value", rename_all = "lowercase")]
pub enum Identifier {
	Key(i64),
	Uuid(Uuid),
	Slug(String),
}

impl Identifier {
	/// Parses `raw` into the first identifier shape `resource_type` accepts.
	pub fn resolve(raw: &str, resource_type: ResourceType) -> Result<Identifier, InputError> {
		let policy = resource_type.policy();

		if let Ok(key) = raw.parse::<i64>() {
			return Ok(Identifier::Key(key));
		}

		if policy.uuid {
			if let Ok(uuid) = Uuid::parse_str(raw) {
				return Ok(Identifier::Uuid(uuid));
			}
		}

		if policy.slug && !raw.is_empty() {
			return Ok(Identifier::Slug(raw.to_string()));
		}

		Err(InputError::Identifier {
			resource_type,
			value: raw.to_string(),
			expected: expected_shapes(resource_type),
		})
	}

	/// Equality predicate against the attribute this shape addresses.
	pub fn predicate(&self) -> Predicate {
		match self {
			Identifier::Key(key) => Predicate::Equals {
				column: Column::Key,
				value: Literal::Int(*key),
			},
			Identifier::Uuid(uuid) => Predicate::Equals {
				column: Column::Uuid,
				value: Literal::Uuid(*uuid),
			},
			Identifier::Slug(slug) => Predicate::Equals {
				column: Column::Slug,
				value: Literal::Text(slug.clone()),
			},
		}
	}
}

fn expected_shapes(resource_type: ResourceType) -> &'static str {
	let policy = resource_type.policy();
	match (policy.uuid, policy.slug) {
		(true, true) => "a numeric key, a UUID or a slug",
		(true, false) => "a numeric key or a UUID",
		(false, true) => "a numeric key or a slug",
		(false, false) => "a numeric key",
	}
}
