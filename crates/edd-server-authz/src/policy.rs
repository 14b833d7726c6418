// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Response policy.
//!
//! Maps executed plans to what the caller observes. Existence never leaks:
//! a caller who cannot see a record gets the same answer whether or not it
//! exists. The one exception is an update or delete of an identified record
//! under scoped access, which reports forbidden.

use serde::Serialize;

use crate::capability::Access;
use crate::error::{AuthzError, Result};
use crate::query::{QueryPlan, Target};
use crate::store::Record;
use crate::types::StudyKey;

/// One page of a collection. The engine does not paginate, so the page
/// markers are always empty and the calling layer fills them in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
	pub count: usize,
	pub next: Option<String>,
	pub previous: Option<String>,
	pub results: Vec<T>,
}

impl<T> Page<T> {
	pub fn new(results: Vec<T>) -> Self {
		Self {
			count: results.len(),
			next: None,
			previous: None,
			results,
		}
	}

	pub fn empty() -> Self {
		Self::new(Vec::new())
	}
}

/// Caller-visible success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
	Collection(Page<Record>),
	Detail(Record),
	/// The identified record may be updated or deleted by the caller.
	Mutable(Record),
	/// A new record may be created, attached to `scope` when present.
	Creatable { scope: Option<StudyKey> },
}

/// Translates the rows fetched for `plan` into the caller-visible outcome.
pub fn respond(plan: &QueryPlan, mut rows: Vec<Record>) -> Result<Outcome> {
	match plan.target {
		Target::Collection => Ok(Outcome::Collection(Page::new(rows))),
		Target::Detail => {
			if rows.is_empty() {
				tracing::debug!("detail lookup matched nothing");
				return Err(AuthzError::NotFound);
			}
			Ok(Outcome::Detail(rows.swap_remove(0)))
		}
		Target::Mutation(_) => {
			if rows.is_empty() {
				return Err(empty_mutation(plan.access));
			}
			Ok(Outcome::Mutable(rows.swap_remove(0)))
		}
		Target::Create => match rows.first() {
			Some(study) => Ok(Outcome::Creatable {
				scope: Some(StudyKey::new(study.key)),
			}),
			None => Err(empty_mutation(plan.access)),
		},
	}
}

/// Error for a mutation whose target did not match.
///
/// Under scoped access the caller named a record their grants do not let
/// them write; otherwise nothing by that identifier exists for them.
fn empty_mutation(access: Access) -> AuthzError {
	match access {
		Access::MustScopeFilter(_) | Access::Denied => {
			tracing::debug!(?access, "mutation target not writable");
			AuthzError::Forbidden
		}
		Access::Anonymous | Access::Unrestricted => {
			tracing::debug!(?access, "mutation target not found");
			AuthzError::NotFound
		}
	}
}
