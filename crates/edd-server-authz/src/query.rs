// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Requests and the plans compiled from them.
//!
//! A plan's predicate is always assembled in the same order: identifier,
//! then attribute filters, then the authorization predicate, then the
//! nested-scope restriction. De-duplication is requested whenever the
//! predicate walks an ownership chain that fans out.

use serde::Serialize;
use std::str::FromStr;

use crate::capability::Access;
use crate::error::InputError;
use crate::filter::{AttributeFilters, FilterSet, SortOrder};
use crate::predicate::Predicate;
use crate::types::{Operation, ResourceType};
use crate::user::Principal;

/// One call into the engine.
#[derive(Debug, Clone)]
pub struct Request {
	pub principal: Principal,
	pub resource_type: ResourceType,
	pub operation: Operation,
	/// Targets a single record.
	pub identifier: Option<String>,
	/// Restricts the request to one study ("lines within study X").
	pub scope: Option<String>,
	/// Restricts a study read to studies whose lines use this strain.
	pub strain: Option<String>,
	pub filters: FilterSet,
}

impl Request {
	pub fn new(principal: Principal, resource_type: ResourceType, operation: Operation) -> Self {
		Self {
			principal,
			resource_type,
			operation,
			identifier: None,
			scope: None,
			strain: None,
			filters: FilterSet::default(),
		}
	}

	/// A generic search, always treated as a read whatever verb carried it.
	pub fn search(
		principal: Principal,
		search_type: &str,
		filters: FilterSet,
	) -> Result<Self, InputError> {
		let search_type = SearchType::from_str(search_type)?;
		Ok(Self::new(principal, search_type.0, Operation::Read).with_filters(filters))
	}

	pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
		self.identifier = Some(identifier.into());
		self
	}

	pub fn within_study(mut self, study: impl Into<String>) -> Self {
		self.scope = Some(study.into());
		self
	}

	pub fn within_strain(mut self, strain: impl Into<String>) -> Self {
		self.strain = Some(strain.into());
		self
	}

	pub fn with_filters(mut self, filters: FilterSet) -> Self {
		self.filters = filters;
		self
	}
}

/// Resource type named by a search request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchType(pub ResourceType);

impl FromStr for SearchType {
	type Err = InputError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let rt = match s {
			"studies" => ResourceType::Study,
			"lines" => ResourceType::Line,
			"assays" => ResourceType::Assay,
			"measurements" => ResourceType::Measurement,
			"strains" => ResourceType::Strain,
			other => return Err(InputError::SearchType(other.to_string())),
		};
		Ok(SearchType(rt))
	}
}

/// Call shape of a plan, which decides how an empty result is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "shape", content = "operation", rename_all = "snake_case")]
pub enum Target {
	Collection,
	Detail,
	/// Update or delete of one identified record.
	Mutation(Operation),
	/// Lookup of the study a new record will be attached to.
	Create,
}

/// A ready-to-execute query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryPlan {
	/// Type of the rows fetched.
	pub resource_type: ResourceType,
	pub target: Target,
	pub access: Access,
	pub predicate: Predicate,
	/// Rows may repeat and must be de-duplicated by key.
	pub distinct: bool,
	pub order: SortOrder,
}

/// Result of planning a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "plan", rename_all = "snake_case")]
pub enum Plan {
	Query(QueryPlan),
	/// Creation is permitted and needs no lookup.
	Allowed,
}

/// Parts of a plan's predicate, in assembly order.
#[derive(Debug, Default)]
pub struct Assembly {
	pub identifier: Option<Predicate>,
	pub attributes: Option<AttributeFilters>,
	pub authorization: Option<Predicate>,
	pub scope: Vec<Predicate>,
}

impl Assembly {
	/// Conjunction of all parts and the de-duplication flag for `resource_type`.
	pub fn assemble(
		self,
		resource_type: ResourceType,
		target: Target,
		access: Access,
	) -> QueryPlan {
		let order = self
			.attributes
			.as_ref()
			.map(|a| a.order)
			.unwrap_or_default();

		let mut parts = Vec::new();
		parts.extend(self.identifier);
		parts.extend(self.attributes.map(|a| a.predicate));
		parts.extend(self.authorization);
		parts.extend(self.scope);

		let predicate = Predicate::all(parts);
		let distinct = (resource_type.fans_out() && predicate.touches_scope())
			|| predicate.touches_strain_usage();

		QueryPlan {
			resource_type,
			target,
			access,
			predicate,
			distinct,
			order,
		}
	}
}
