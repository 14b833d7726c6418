// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Request planning and execution.
//!
//! [`Engine::plan`] turns a [`Request`] into either a terminal decision or a
//! [`QueryPlan`]. It runs in two phases:
//!
//! 1. **Input validation**: identifiers, scope and filters are parsed first, so
//!    malformed input is reported the same way whatever the caller may see
//! 2. **Authorization**: capability evaluation, then scoped-access predicates
//!    for anything a type-wide grant does not cover
//!
//! [`Engine::execute`] runs the plan against a [`RecordStore`] and applies
//! the response policy. The engine holds no per-request state, so one
//! instance serves concurrent callers.

use tracing::instrument;

use crate::capability::{self, Access, EngineOptions, Reach};
use crate::error::{AuthzError, InputError, Result};
use crate::filter::{self, ActiveStatus, AttributeFilters};
use crate::identifier::Identifier;
use crate::policy::{self, Outcome};
use crate::predicate::Predicate;
use crate::query::{Assembly, Plan, QueryPlan, Request, Target};
use crate::scoped;
use crate::store::{dedupe_by_key, Record, RecordStore};
use crate::types::{Operation, ResourceType};

#[derive(Debug, Clone, Default)]
pub struct Engine {
	options: EngineOptions,
}

impl Engine {
	pub fn new(options: EngineOptions) -> Self {
		Self { options }
	}

	pub fn options(&self) -> &EngineOptions {
		&self.options
	}

	/// Plans `request`, or returns the terminal decision the caller must surface.
	#[instrument(
		level = "debug",
		skip(self, request),
		fields(
			user = %request.principal.log_id(),
			resource_type = %request.resource_type,
			operation = %request.operation,
		)
	)]
	pub fn plan(&self, request: &Request) -> Result<Plan> {
		let rt = request.resource_type;
		let op = request.operation;

		// Input validation, independent of who is asking.
		let scope = match request.scope.as_deref() {
			Some(_) if rt == ResourceType::Study => {
				return Err(InputError::NotNestable(rt).into());
			}
			Some(raw) => Some(Identifier::resolve(raw, ResourceType::Study)?),
			None => None,
		};

		let strain = match request.strain.as_deref() {
			Some(_) if rt != ResourceType::Study => {
				return Err(InputError::NotStrainNestable(rt).into());
			}
			Some(raw) => Some(Identifier::resolve(raw, ResourceType::Strain)?),
			None => None,
		};

		let identifier = match (op, request.identifier.as_deref()) {
			(Operation::Create, _) => None,
			(_, Some(raw)) => Some(Identifier::resolve(raw, rt)?),
			(Operation::Update | Operation::Delete, None) => {
				return Err(InputError::MissingIdentifier {
					resource_type: rt,
					operation: op,
				}
				.into());
			}
			(Operation::Read, None) => None,
		};

		if op == Operation::Create {
			match (rt.created_in_study(), &scope) {
				(true, None) => return Err(InputError::MissingScope(rt).into()),
				(false, Some(_)) if rt.supports(op) => {
					return Err(InputError::NotNestable(rt).into());
				}
				_ => {}
			}
		}

		let target = match (op, &identifier) {
			(Operation::Read, None) => Target::Collection,
			(Operation::Read, Some(_)) => Target::Detail,
			(Operation::Create, _) => Target::Create,
			(mutation, _) => Target::Mutation(mutation),
		};

		// Studies found through a strain are listed whatever their own status.
		let default_status = match target {
			Target::Collection if strain.is_none() => ActiveStatus::Active,
			_ => ActiveStatus::Any,
		};
		let attributes = if op == Operation::Create {
			None
		} else {
			Some(filter::build(&request.filters, default_status)?)
		};

		if let Some(strain) = strain {
			return self.plan_strain_usage(request, strain, identifier, target, attributes);
		}

		// Authorization.
		let access = capability::evaluate(&request.principal, rt, op, Reach::Record, &self.options);

		if !rt.supports(op) {
			return Err(match access {
				Access::Anonymous => AuthzError::NotFound,
				Access::Denied => AuthzError::Forbidden,
				Access::Unrestricted | Access::MustScopeFilter(_) => {
					tracing::debug!("operation not supported for resource type");
					AuthzError::MethodNotSupported {
						resource_type: rt,
						operation: op,
					}
				}
			});
		}

		match (access, op) {
			(Access::Anonymous, Operation::Read) | (Access::Denied, Operation::Read) => {}
			(Access::Anonymous, _) => {
				tracing::debug!("anonymous mutation");
				return Err(AuthzError::NotFound);
			}
			(Access::Denied, _) => {
				tracing::debug!("mutation denied");
				return Err(AuthzError::Forbidden);
			}
			_ => {}
		}

		if op == Operation::Create {
			return Ok(self.plan_create(request, scope, access));
		}

		let mut scope_parts = Vec::new();
		if let Some(study) = scope {
			let parent_access = capability::evaluate(
				&request.principal,
				ResourceType::Study,
				Operation::Read,
				Reach::Contents,
				&self.options,
			);
			scope_parts.push(Predicate::InScope { scope: study });
			scope_parts.push(scoped::for_access(
				&request.principal,
				ResourceType::Study,
				parent_access,
			));
			if rt.linked_through_lines() {
				scope_parts.extend(attributes.as_ref().and_then(|a| a.line_active.clone()));
			}
		}

		let plan = Assembly {
			identifier: identifier.as_ref().map(Identifier::predicate),
			attributes,
			authorization: Some(scoped::for_access(&request.principal, rt, access)),
			scope: scope_parts,
		}
		.assemble(rt, target, access);

		tracing::debug!(
			?target,
			?access,
			distinct = plan.distinct,
			never = plan.predicate.is_never(),
			"planned query"
		);
		Ok(Plan::Query(plan))
	}

	fn plan_create(&self, request: &Request, scope: Option<Identifier>, access: Access) -> Plan {
		let Some(study) = scope else {
			tracing::debug!(?access, "creation permitted");
			return Plan::Allowed;
		};

		// The new record attaches to the study, so the study itself must be writable.
		let plan = Assembly {
			identifier: Some(study.predicate()),
			attributes: None,
			authorization: Some(scoped::for_access(
				&request.principal,
				ResourceType::Study,
				access,
			)),
			scope: Vec::new(),
		}
		.assemble(ResourceType::Study, Target::Create, access);

		tracing::debug!(?access, "planned owning-study lookup for creation");
		Plan::Query(plan)
	}

	/// Studies whose lines use a strain. Only superusers may list them;
	/// anonymous callers see nothing and other users are refused outright.
	fn plan_strain_usage(
		&self,
		request: &Request,
		strain: Identifier,
		identifier: Option<Identifier>,
		target: Target,
		attributes: Option<AttributeFilters>,
	) -> Result<Plan> {
		let access = match request.principal.user() {
			None => Access::Anonymous,
			Some(user) if user.superuser => Access::Unrestricted,
			Some(_) => Access::Denied,
		};

		match (access, target) {
			(Access::Anonymous, Target::Collection | Target::Detail) => {}
			(Access::Anonymous, _) => return Err(AuthzError::NotFound),
			(Access::Denied, _) => {
				tracing::debug!("studies using a strain are superuser-only");
				return Err(AuthzError::Forbidden);
			}
			(_, Target::Collection | Target::Detail) => {}
			(_, _) => {
				return Err(AuthzError::MethodNotSupported {
					resource_type: ResourceType::Study,
					operation: request.operation,
				});
			}
		}

		let mut usage = vec![Predicate::UsesStrain { strain }];
		usage.extend(attributes.as_ref().and_then(|a| a.line_active.clone()));

		let plan = Assembly {
			identifier: identifier.as_ref().map(Identifier::predicate),
			attributes,
			authorization: Some(scoped::for_access(
				&request.principal,
				ResourceType::Study,
				access,
			)),
			scope: usage,
		}
		.assemble(ResourceType::Study, target, access);

		tracing::debug!(?target, ?access, "planned studies using strain");
		Ok(Plan::Query(plan))
	}

	/// Plans and runs `request` against `store`.
	#[instrument(
		level = "debug",
		skip(self, store, request),
		fields(
			user = %request.principal.log_id(),
			resource_type = %request.resource_type,
			operation = %request.operation,
		)
	)]
	pub async fn execute<S>(&self, store: &S, request: &Request) -> Result<Outcome>
	where
		S: RecordStore + ?Sized,
	{
		match self.plan(request)? {
			Plan::Allowed => Ok(Outcome::Creatable { scope: None }),
			Plan::Query(plan) => {
				let rows = self.fetch(store, &plan).await?;
				policy::respond(&plan, rows)
			}
		}
	}

	async fn fetch<S>(&self, store: &S, plan: &QueryPlan) -> Result<Vec<Record>>
	where
		S: RecordStore + ?Sized,
	{
		if plan.predicate.is_never() {
			tracing::debug!("plan matches nothing, skipping store");
			return Ok(Vec::new());
		}

		let rows = store.fetch(plan).await?;
		let rows = if plan.distinct {
			dedupe_by_key(rows)
		} else {
			rows
		};
		tracing::debug!(rows = rows.len(), "fetched");
		Ok(rows)
	}
}
