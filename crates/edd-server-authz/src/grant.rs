// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Scoped grants and effective-level computation.
//!
//! A study may carry any number of grants across the three grantee kinds.
//! The effective level of a user on a study is the maximum level reachable
//! through a direct user grant, a grant to any group the user belongs to, or
//! an everyone grant. Anonymous callers reach nothing, not even everyone
//! grants.

use serde::{Deserialize, Serialize};

use crate::types::{GrantLevel, GroupId, StudyKey, UserId};
use crate::user::{Principal, User};

/// A (study, grantee, level) triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "grantee", rename_all = "lowercase")]
pub enum ScopedGrant {
	User {
		scope: StudyKey,
		user: UserId,
		level: GrantLevel,
	},
	Group {
		scope: StudyKey,
		group: GroupId,
		level: GrantLevel,
	},
	Everyone {
		scope: StudyKey,
		level: GrantLevel,
	},
}

impl ScopedGrant {
	pub fn scope(&self) -> StudyKey {
		match *self {
			ScopedGrant::User { scope, .. }
			| ScopedGrant::Group { scope, .. }
			| ScopedGrant::Everyone { scope, .. } => scope,
		}
	}

	pub fn level(&self) -> GrantLevel {
		match *self {
			ScopedGrant::User { level, .. }
			| ScopedGrant::Group { level, .. }
			| ScopedGrant::Everyone { level, .. } => level,
		}
	}

	/// Returns true if the grant reaches `user`, whatever study it is on.
	pub fn applies_to(&self, user: &User) -> bool {
		match *self {
			ScopedGrant::User { user: grantee, .. } => grantee == user.id,
			ScopedGrant::Group { group, .. } => user.is_member_of(group),
			ScopedGrant::Everyone { .. } => true,
		}
	}
}

/// Maximum level `principal` reaches on `scope` through `grants`.
///
/// Grants on other studies are ignored.
pub fn effective_level(principal: &Principal, scope: StudyKey, grants: &[ScopedGrant]) -> GrantLevel {
	let Some(user) = principal.user() else {
		return GrantLevel::None;
	};

	grants
		.iter()
		.filter(|grant| grant.scope() == scope && grant.applies_to(user))
		.map(ScopedGrant::level)
		.max()
		.unwrap_or(GrantLevel::None)
}
