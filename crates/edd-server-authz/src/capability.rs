// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Capability evaluation.
//!
//! Decides, from the caller alone, whether a request needs row-level
//! filtering at all. The checks run in a fixed order:
//!
//! 1. **Anonymous**: fails closed, before anything else
//! 2. **Superuser**: unrestricted reads, and writes where the type allows them
//! 3. **Elevated role**: unrestricted reads of role-readable types
//! 4. **Class-level capability**: unrestricted for covered operations; any
//!    capability on a type implies reading it
//! 5. **Scoped grants**: everything else must be filtered by study grants, or
//!    is denied when the type does not accept scoped writes
//!
//! Capabilities on one type never carry over to another, so a study manager
//! gains nothing on strains.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::types::{GrantLevel, Operation, ResourceType};
use crate::user::Principal;

/// Who may create studies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyCreationPolicy {
	/// Any authenticated user.
	#[default]
	Anyone,
	#[serde(alias = "superuser")]
	SuperuserOnly,
	/// Superusers and holders of the class-level study creation capability.
	Permission,
}

/// Engine-wide switches, normally read from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
	pub study_creation: StudyCreationPolicy,
	/// The elevated role reads every study's own fields.
	pub elevated_role_reads_studies: bool,
}

impl Default for EngineOptions {
	fn default() -> Self {
		Self {
			study_creation: StudyCreationPolicy::Anyone,
			elevated_role_reads_studies: true,
		}
	}
}

/// What the caller is reaching for on a study.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reach {
	/// The record itself.
	Record,
	/// Data nested in the record. Only superuser status and scoped grants
	/// open a study's contents; class capabilities and the elevated role do not.
	Contents,
}

/// Outcome of capability evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "access", content = "level", rename_all = "snake_case")]
pub enum Access {
	/// Unauthenticated caller: no rows, whatever the request.
	Anonymous,
	/// A type-wide grant applies; no row filter is needed.
	Unrestricted,
	/// Rows must be filtered to studies granting at least this level.
	MustScopeFilter(GrantLevel),
	/// Authenticated, but no grant mechanism can authorize the operation.
	Denied,
}

/// Evaluates the caller's type-wide access for `operation` on `resource_type`.
#[instrument(
	level = "debug",
	skip(principal, options),
	fields(user = %principal.log_id())
)]
pub fn evaluate(
	principal: &Principal,
	resource_type: ResourceType,
	operation: Operation,
	reach: Reach,
	options: &EngineOptions,
) -> Access {
	let Some(user) = principal.user() else {
		tracing::debug!("anonymous caller, failing closed");
		return Access::Anonymous;
	};

	let policy = resource_type.policy();

	if resource_type == ResourceType::Study && operation == Operation::Create {
		let allowed = match options.study_creation {
			StudyCreationPolicy::Anyone => true,
			StudyCreationPolicy::SuperuserOnly => user.superuser,
			StudyCreationPolicy::Permission => {
				user.superuser || user.has_capability(ResourceType::Study, Operation::Create)
			}
		};
		tracing::debug!(allowed, policy = ?options.study_creation, "study creation");
		return if allowed {
			Access::Unrestricted
		} else {
			Access::Denied
		};
	}

	if user.superuser && (operation == Operation::Read || policy.superuser_writes) {
		tracing::debug!("superuser");
		return Access::Unrestricted;
	}

	let class_level_applies = !(resource_type == ResourceType::Study && reach == Reach::Contents);

	if class_level_applies
		&& operation == Operation::Read
		&& user.elevated_role
		&& policy.elevated_role_reads
		&& (resource_type != ResourceType::Study || options.elevated_role_reads_studies)
	{
		tracing::debug!("elevated role read");
		return Access::Unrestricted;
	}

	if class_level_applies {
		let covered = user.has_capability(resource_type, operation)
			|| (operation == Operation::Read && user.has_any_capability(resource_type));
		if covered {
			tracing::debug!("class-level capability");
			return Access::Unrestricted;
		}
	}

	if operation == Operation::Read || policy.scoped_writes {
		let level = operation.required_level();
		tracing::debug!(%level, "scoped grants required");
		return Access::MustScopeFilter(level);
	}

	tracing::debug!("no grant mechanism authorizes the operation");
	Access::Denied
}
