// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Storage-agnostic row predicates.
//!
//! The engine never talks to a database. It produces a [`Predicate`] tree
//! that a [`RecordStore`](crate::store::RecordStore) translates into whatever
//! its backend evaluates set-at-a-time. Predicates that reference the owning
//! study ([`Predicate::Granted`], [`Predicate::InScope`],
//! [`Predicate::LineActive`]) are evaluated along the resource type's
//! ownership chain. [`Predicate::UsesStrain`] runs the other way, from a
//! study down through its lines to the strains they use.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::identifier::Identifier;
use crate::metadata::MetaPredicate;
use crate::types::{GrantLevel, GroupId, UserId};

/// Attributes common to every resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
	Key,
	/// The resource's UUID; strains use their registry id.
	Uuid,
	Slug,
	Name,
	Description,
	Active,
	CreatedAt,
	UpdatedAt,
}

impl fmt::Display for Column {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Column::Key => "key",
			Column::Uuid => "uuid",
			Column::Slug => "slug",
			Column::Name => "name",
			Column::Description => "description",
			Column::Active => "active",
			Column::CreatedAt => "created",
			Column::UpdatedAt => "updated",
		};
		f.write_str(name)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Literal {
	Int(i64),
	Uuid(Uuid),
	Text(String),
	Bool(bool),
}

impl fmt::Display for Literal {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Literal::Int(n) => write!(f, "{n}"),
			Literal::Uuid(u) => write!(f, "{u}"),
			Literal::Text(s) => write!(f, "'{s}'"),
			Literal::Bool(b) => write!(f, "{b}"),
		}
	}
}

/// Side of a timestamp range. Lower bounds include the instant, upper bounds exclude it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeBound {
	AtOrAfter,
	Before,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMatch {
	Contains,
	Regex,
}

/// "Some grant on the owning study reaches this user at `level` or above."
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopedAccess {
	pub user: UserId,
	/// Groups the user belongs to; group grants to any of them count.
	pub groups: Vec<GroupId>,
	pub level: GrantLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
	Always,
	Never,
	All {
		parts: Vec<Predicate>,
	},
	Equals {
		column: Column,
		value: Literal,
	},
	Time {
		column: Column,
		bound: TimeBound,
		at: DateTime<Utc>,
	},
	Text {
		column: Column,
		pattern: String,
		mode: TextMatch,
		case_sensitive: bool,
	},
	Meta {
		test: MetaPredicate,
	},
	Granted {
		access: ScopedAccess,
	},
	/// The owning study is the one `scope` identifies.
	InScope {
		scope: Identifier,
	},
	/// The line the ownership chain passes through has this active status.
	LineActive {
		active: bool,
	},
	/// One of the study's lines uses the strain `strain` identifies.
	UsesStrain {
		strain: Identifier,
	},
}

impl Predicate {
	/// Conjunction of `parts`, flattened and simplified.
	pub fn all(parts: impl IntoIterator<Item = Predicate>) -> Predicate {
		let mut flat = Vec::new();
		for part in parts {
			match part {
				Predicate::Always => {}
				Predicate::Never => return Predicate::Never,
				Predicate::All { parts } => flat.extend(parts),
				other => flat.push(other),
			}
		}

		match flat.len() {
			0 => Predicate::Always,
			1 => flat.pop().unwrap_or(Predicate::Always),
			_ => Predicate::All { parts: flat },
		}
	}

	pub fn is_never(&self) -> bool {
		matches!(self, Predicate::Never)
	}

	/// Returns true if evaluating the predicate requires walking to the owning study.
	pub fn touches_scope(&self) -> bool {
		match self {
			Predicate::Granted { .. } | Predicate::InScope { .. } | Predicate::LineActive { .. } => {
				true
			}
			Predicate::All { parts } => parts.iter().any(Predicate::touches_scope),
			_ => false,
		}
	}

	/// Returns true if evaluating the predicate requires walking from a study to its strains.
	pub fn touches_strain_usage(&self) -> bool {
		match self {
			Predicate::UsesStrain { .. } => true,
			Predicate::All { parts } => parts.iter().any(Predicate::touches_strain_usage),
			_ => false,
		}
	}

	/// Returns true if the predicate tests the active status of a line on the chain.
	pub fn touches_line(&self) -> bool {
		match self {
			Predicate::LineActive { .. } => true,
			Predicate::All { parts } => parts.iter().any(Predicate::touches_line),
			_ => false,
		}
	}
}

impl fmt::Display for Predicate {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Predicate::Always => f.write_str("TRUE"),
			Predicate::Never => f.write_str("FALSE"),
			Predicate::All { parts } => {
				for (i, part) in parts.iter().enumerate() {
					if i > 0 {
						f.write_str(" AND ")?;
					}
					write!(f, "({part})")?;
				}
				Ok(())
			}
			Predicate::Equals { column, value } => write!(f, "{column} = {value}"),
			Predicate::Time { column, bound, at } => {
				let op = match bound {
					TimeBound::AtOrAfter => ">=",
					TimeBound::Before => "<",
				};
				write!(
					f,
					"{column} {op} {}",
					at.to_rfc3339_opts(SecondsFormat::Micros, true)
				)
			}
			Predicate::Text {
				column,
				pattern,
				mode,
				case_sensitive,
			} => {
				let op = match (mode, case_sensitive) {
					(TextMatch::Contains, true) => "contains",
					(TextMatch::Contains, false) => "icontains",
					(TextMatch::Regex, true) => "regex",
					(TextMatch::Regex, false) => "iregex",
				};
				write!(f, "{column} {op} '{pattern}'")
			}
			Predicate::Meta { test } => write!(f, "meta {test}"),
			Predicate::Granted { access } => write!(
				f,
				"study grants user {} (groups {:?}) at least {}",
				access.user, access.groups, access.level
			),
			Predicate::InScope { scope } => write!(f, "study is {scope:?}"),
			Predicate::LineActive { active } => write!(f, "line active = {active}"),
			Predicate::UsesStrain { strain } => write!(f, "a line uses strain {strain:?}"),
		}
	}
}
