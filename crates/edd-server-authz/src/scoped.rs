// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Scoped-access predicates.
//!
//! When no type-wide grant applies, rows are restricted to those whose owning
//! study grants the caller a sufficient level. The owning study is found by
//! walking the resource type's ownership chain ([`TypePolicy::scope_path`]).
//! A resource linked to several studies matches once per granting path, so
//! plans over such types are marked for de-duplication.
//!
//! [`TypePolicy::scope_path`]: crate::types::TypePolicy::scope_path

use crate::capability::Access;
use crate::predicate::{Predicate, ScopedAccess};
use crate::types::{GrantLevel, ResourceType};
use crate::user::{Principal, User};

/// Row filter selecting `resource_type` rows whose owning study grants `user`
/// at least `required`.
pub fn build(user: &User, resource_type: ResourceType, required: GrantLevel) -> Predicate {
	tracing::trace!(
		user = %user.id,
		%resource_type,
		%required,
		hops = resource_type.policy().scope_path.len(),
		"building scoped-access predicate"
	);

	if required == GrantLevel::None {
		return Predicate::Always;
	}

	Predicate::Granted {
		access: ScopedAccess {
			user: user.id,
			groups: user.groups.iter().copied().collect(),
			level: required,
		},
	}
}

/// Authorization predicate for an evaluated [`Access`].
pub fn for_access(principal: &Principal, resource_type: ResourceType, access: Access) -> Predicate {
	match (access, principal.user()) {
		(Access::Unrestricted, _) => Predicate::Always,
		(Access::MustScopeFilter(level), Some(user)) => build(user, resource_type, level),
		(Access::Anonymous | Access::Denied, _) | (Access::MustScopeFilter(_), None) => {
			Predicate::Never
		}
	}
}
