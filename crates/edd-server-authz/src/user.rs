// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Caller identity as seen by the engine.
//!
//! A request is made either by an [`Principal::Anonymous`] caller, who holds
//! no grants of any kind, or by an authenticated [`User`] carrying the flags
//! and class-level capabilities loaded for this request.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::types::{Capability, GroupId, Operation, ResourceType, UserId};

/// An authenticated account and everything the engine reads about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
	pub id: UserId,
	pub username: String,
	/// Bypasses scope checks for reads, and for writes where the type allows it.
	pub superuser: bool,
	/// Reads every study's own fields, but none of the data nested in it.
	pub elevated_role: bool,
	pub capabilities: BTreeSet<Capability>,
	pub groups: BTreeSet<GroupId>,
}

impl User {
	pub fn new(id: UserId, username: impl Into<String>) -> Self {
		Self {
			id,
			username: username.into(),
			superuser: false,
			elevated_role: false,
			capabilities: BTreeSet::new(),
			groups: BTreeSet::new(),
		}
	}

	pub fn with_superuser(mut self) -> Self {
		self.superuser = true;
		self
	}

	pub fn with_elevated_role(mut self) -> Self {
		self.elevated_role = true;
		self
	}

	pub fn with_capability(mut self, resource_type: ResourceType, operation: Operation) -> Self {
		self.capabilities
			.insert(Capability::new(resource_type, operation));
		self
	}

	pub fn with_group(mut self, group: GroupId) -> Self {
		self.groups.insert(group);
		self
	}

	/// Returns true if a class-level capability covers `operation` on `resource_type`.
	pub fn has_capability(&self, resource_type: ResourceType, operation: Operation) -> bool {
		self.capabilities
			.contains(&Capability::new(resource_type, operation))
	}

	/// Returns true if the user holds any class-level capability on `resource_type`.
	pub fn has_any_capability(&self, resource_type: ResourceType) -> bool {
		self.capabilities
			.iter()
			.any(|cap| cap.resource_type == resource_type)
	}

	pub fn is_member_of(&self, group: GroupId) -> bool {
		self.groups.contains(&group)
	}
}

/// The caller of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Principal {
	Anonymous,
	Authenticated(User),
}

impl Principal {
	pub fn user(&self) -> Option<&User> {
		match self {
			Principal::Anonymous => None,
			Principal::Authenticated(user) => Some(user),
		}
	}

	pub fn is_anonymous(&self) -> bool {
		matches!(self, Principal::Anonymous)
	}

	/// Identifier for log fields.
	pub fn log_id(&self) -> String {
		match self {
			Principal::Anonymous => "anonymous".to_string(),
			Principal::Authenticated(user) => user.id.to_string(),
		}
	}
}

impl From<User> for Principal {
	fn from(user: User) -> Self {
		Principal::Authenticated(user)
	}
}
