// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core type definitions for the authorization engine.
//!
//! This module defines the foundational types shared by every stage of a
//! request:
//!
//! - **Key newtypes**: Type-safe wrappers around numeric primary keys
//!   ([`UserId`], [`GroupId`], [`StudyKey`]) preventing accidental mixing
//! - **Grant levels**: The ordered [`GrantLevel`] lattice where WRITE implies READ
//! - **Resource types**: The EDD resources under access control ([`ResourceType`])
//!   and the per-type policy table ([`TypePolicy`])
//! - **Operations**: Read/create/update/delete mapped from transport verbs ([`Operation`])
//! - **Capabilities**: Class-level grants over a whole resource type ([`Capability`])

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Key Newtypes
// =============================================================================

macro_rules! define_key_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(i64);

		impl $name {
			/// Create a key from its numeric value.
			pub const fn new(id: i64) -> Self {
				Self(id)
			}

			/// Get the inner numeric value.
			pub fn into_inner(self) -> i64 {
				self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl From<i64> for $name {
			fn from(id: i64) -> Self {
				Self(id)
			}
		}

		impl From<$name> for i64 {
			fn from(id: $name) -> Self {
				id.0
			}
		}
	};
}

define_key_type!(UserId, "Primary key of a user account.");
define_key_type!(GroupId, "Primary key of a user group.");
define_key_type!(StudyKey, "Primary key of a study, the unit scoped grants attach to.");

// =============================================================================
// Grant Levels
// =============================================================================

/// Level of access a scoped grant confers on a study.
///
/// Levels are totally ordered, so a requirement is satisfied by any level at
/// or above it: `Write` satisfies a `Read` requirement, never the reverse.
#[derive(
	Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum GrantLevel {
	#[default]
	None,
	Read,
	Write,
}

impl GrantLevel {
	/// Returns true if this level meets `required`.
	pub fn satisfies(self, required: GrantLevel) -> bool {
		self >= required
	}

	/// Stored integer form, ordered the same way as the enum.
	pub fn as_i64(self) -> i64 {
		match self {
			GrantLevel::None => 0,
			GrantLevel::Read => 1,
			GrantLevel::Write => 2,
		}
	}

	pub fn from_i64(value: i64) -> Option<Self> {
		match value {
			0 => Some(GrantLevel::None),
			1 => Some(GrantLevel::Read),
			2 => Some(GrantLevel::Write),
			_ => None,
		}
	}
}

impl fmt::Display for GrantLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			GrantLevel::None => write!(f, "none"),
			GrantLevel::Read => write!(f, "read"),
			GrantLevel::Write => write!(f, "write"),
		}
	}
}

// =============================================================================
// Resource Types
// =============================================================================

/// Resources under access control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
	Study,
	Line,
	Assay,
	Measurement,
	Strain,
}

/// One step along a resource's ownership chain towards its study.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hop {
	/// The resource holds a reference to exactly one owner of this type.
	Parent(ResourceType),
	/// The resource is linked to any number of owners of this type.
	Linked(ResourceType),
}

/// Static access policy of a resource type.
#[derive(Debug)]
pub struct TypePolicy {
	/// Identifiers may be UUIDs.
	pub uuid: bool,
	/// Identifiers may be slugs.
	pub slug: bool,
	/// Ownership chain from the resource to its study, nearest owner first.
	pub scope_path: &'static [Hop],
	/// Scoped WRITE grants authorize mutations of this type.
	pub scoped_writes: bool,
	/// Superusers may mutate this type.
	pub superuser_writes: bool,
	/// The elevated role reads every instance of this type.
	pub elevated_role_reads: bool,
	/// Operations the type supports at all, for any caller.
	pub operations: &'static [Operation],
}

static STUDY: TypePolicy = TypePolicy {
	uuid: true,
	slug: true,
	scope_path: &[],
	scoped_writes: true,
	superuser_writes: true,
	elevated_role_reads: true,
	operations: &[Operation::Read, Operation::Create, Operation::Update],
};

static LINE: TypePolicy = TypePolicy {
	uuid: true,
	slug: false,
	scope_path: &[Hop::Parent(ResourceType::Study)],
	scoped_writes: true,
	superuser_writes: true,
	elevated_role_reads: false,
	operations: &[
		Operation::Read,
		Operation::Create,
		Operation::Update,
		Operation::Delete,
	],
};

static ASSAY: TypePolicy = TypePolicy {
	uuid: true,
	slug: false,
	scope_path: &[
		Hop::Parent(ResourceType::Line),
		Hop::Parent(ResourceType::Study),
	],
	scoped_writes: true,
	superuser_writes: true,
	elevated_role_reads: false,
	operations: &[Operation::Read],
};

static MEASUREMENT: TypePolicy = TypePolicy {
	uuid: false,
	slug: false,
	scope_path: &[
		Hop::Parent(ResourceType::Assay),
		Hop::Parent(ResourceType::Line),
		Hop::Parent(ResourceType::Study),
	],
	scoped_writes: true,
	superuser_writes: true,
	elevated_role_reads: false,
	operations: &[Operation::Read],
};

static STRAIN: TypePolicy = TypePolicy {
	uuid: true,
	slug: false,
	scope_path: &[
		Hop::Linked(ResourceType::Line),
		Hop::Parent(ResourceType::Study),
	],
	scoped_writes: false,
	superuser_writes: true,
	elevated_role_reads: false,
	operations: &[Operation::Read, Operation::Create, Operation::Update],
};

impl ResourceType {
	pub const ALL: [ResourceType; 5] = [
		ResourceType::Study,
		ResourceType::Line,
		ResourceType::Assay,
		ResourceType::Measurement,
		ResourceType::Strain,
	];

	pub fn policy(self) -> &'static TypePolicy {
		match self {
			ResourceType::Study => &STUDY,
			ResourceType::Line => &LINE,
			ResourceType::Assay => &ASSAY,
			ResourceType::Measurement => &MEASUREMENT,
			ResourceType::Strain => &STRAIN,
		}
	}

	pub fn supports(self, operation: Operation) -> bool {
		self.policy().operations.contains(&operation)
	}

	/// Returns true if reaching the study multiplies rows, so results need
	/// de-duplication.
	pub fn fans_out(self) -> bool {
		self.policy()
			.scope_path
			.iter()
			.any(|hop| matches!(hop, Hop::Linked(_)))
	}

	/// Returns true if the type reaches its studies through linked lines.
	pub fn linked_through_lines(self) -> bool {
		matches!(
			self.policy().scope_path.first(),
			Some(Hop::Linked(ResourceType::Line))
		)
	}

	/// Returns true if instances are created directly inside a study.
	pub fn created_in_study(self) -> bool {
		self.supports(Operation::Create)
			&& matches!(
				self.policy().scope_path.first(),
				Some(Hop::Parent(ResourceType::Study))
			)
	}

	pub fn as_str(self) -> &'static str {
		match self {
			ResourceType::Study => "study",
			ResourceType::Line => "line",
			ResourceType::Assay => "assay",
			ResourceType::Measurement => "measurement",
			ResourceType::Strain => "strain",
		}
	}
}

impl fmt::Display for ResourceType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for ResourceType {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"study" | "studies" => Ok(ResourceType::Study),
			"line" | "lines" => Ok(ResourceType::Line),
			"assay" | "assays" => Ok(ResourceType::Assay),
			"measurement" | "measurements" => Ok(ResourceType::Measurement),
			"strain" | "strains" => Ok(ResourceType::Strain),
			other => Err(format!("unknown resource type '{other}'")),
		}
	}
}

// =============================================================================
// Operations
// =============================================================================

/// Operation requested against a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
	Read,
	Create,
	Update,
	Delete,
}

impl Operation {
	/// Maps a transport verb to an operation.
	///
	/// Verbs with no counterpart (OPTIONS, TRACE, ...) map to `None`.
	pub fn from_method(method: &http::Method) -> Option<Operation> {
		match *method {
			http::Method::GET | http::Method::HEAD => Some(Operation::Read),
			http::Method::POST => Some(Operation::Create),
			http::Method::PUT | http::Method::PATCH => Some(Operation::Update),
			http::Method::DELETE => Some(Operation::Delete),
			_ => None,
		}
	}

	pub fn is_mutation(self) -> bool {
		!matches!(self, Operation::Read)
	}

	/// Minimum scoped grant level the operation needs.
	pub fn required_level(self) -> GrantLevel {
		match self {
			Operation::Read => GrantLevel::Read,
			Operation::Create | Operation::Update | Operation::Delete => GrantLevel::Write,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Operation::Read => "read",
			Operation::Create => "create",
			Operation::Update => "update",
			Operation::Delete => "delete",
		}
	}
}

impl fmt::Display for Operation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Operation {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"read" => Ok(Operation::Read),
			"create" => Ok(Operation::Create),
			"update" => Ok(Operation::Update),
			"delete" => Ok(Operation::Delete),
			other => Err(format!("unknown operation '{other}'")),
		}
	}
}

// =============================================================================
// Capabilities
// =============================================================================

/// Class-level grant of one operation over every instance of a resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Capability {
	pub resource_type: ResourceType,
	pub operation: Operation,
}

impl Capability {
	pub fn new(resource_type: ResourceType, operation: Operation) -> Self {
		Self {
			resource_type,
			operation,
		}
	}
}

impl fmt::Display for Capability {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}_{}", self.operation, self.resource_type)
	}
}
