// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use anyhow::{anyhow, bail, Context, Result};
use edd_server_authz::{
	effective_level, AuthzError, Engine, FilterSet, Identifier, Operation, Plan, Principal,
	RecordStore, Request, ResourceType,
};
use edd_server_db::{sql, GrantRepository, UserRepository};
use serde_json::{json, Value};
use sqlx::SqlitePool;

/// One request, as typed on the command line.
#[derive(clap::Args, Debug, Clone)]
pub struct RequestArgs {
	/// `anonymous`, a user key or a username
	#[arg(long, default_value = "anonymous")]
	pub user: String,

	/// Resource type (study, line, assay, measurement, strain)
	#[arg(long, required_unless_present = "search")]
	pub resource: Option<ResourceType>,

	/// Operation (read, create, update, delete)
	#[arg(long, default_value = "read")]
	pub op: Operation,

	/// Generic search type (studies, lines, ...). Always a read.
	#[arg(long, conflicts_with_all = ["resource", "op"])]
	pub search: Option<String>,

	/// Key, UUID or slug of the targeted record
	#[arg(long)]
	pub id: Option<String>,

	/// Key, UUID or slug of the study the request is nested in
	#[arg(long)]
	pub study: Option<String>,

	/// Key or registry UUID of a strain; lists the studies whose lines use it
	#[arg(long, conflicts_with = "study")]
	pub strain: Option<String>,

	/// Filter parameters as a JSON object
	#[arg(long)]
	pub filters: Option<String>,
}

/// Loads the principal named by `--user` and builds the request.
pub async fn resolve_request(pool: &SqlitePool, args: &RequestArgs) -> Result<Request> {
	let principal = UserRepository::new(pool.clone())
		.principal(&args.user)
		.await
		.with_context(|| format!("cannot act as '{}'", args.user))?;
	build_request(args, principal)
}

pub fn build_request(args: &RequestArgs, principal: Principal) -> Result<Request> {
	let filters: FilterSet = match &args.filters {
		Some(raw) => serde_json::from_str(raw).context("--filters must be a JSON object")?,
		None => FilterSet::default(),
	};

	let mut request = match (&args.search, args.resource) {
		(Some(search_type), _) => Request::search(principal, search_type, filters)?,
		(None, Some(rt)) => Request::new(principal, rt, args.op).with_filters(filters),
		(None, None) => bail!("either --resource or --search is required"),
	};
	if let Some(id) = &args.id {
		request = request.with_identifier(id.clone());
	}
	if let Some(study) = &args.study {
		request = request.within_study(study.clone());
	}
	if let Some(strain) = &args.strain {
		request = request.within_strain(strain.clone());
	}
	Ok(request)
}

/// The plan for `request` and its statement text, or the refusal the caller would get.
pub fn explain(engine: &Engine, request: &Request) -> Result<Value> {
	let plan = match engine.plan(request) {
		Ok(plan) => plan,
		Err(err) => return refusal(err),
	};
	let statement = match &plan {
		Plan::Query(query) => Some(sql::explain(query)?),
		Plan::Allowed => None,
	};
	Ok(json!({ "plan": plan, "sql": statement }))
}

pub async fn run<S: RecordStore + ?Sized>(
	engine: &Engine,
	store: &S,
	request: &Request,
) -> Result<Value> {
	match engine.execute(store, request).await {
		Ok(outcome) => Ok(serde_json::to_value(outcome)?),
		Err(err) => refusal(err),
	}
}

/// Decisions are output; storage failures are errors.
fn refusal(err: AuthzError) -> Result<Value> {
	if let AuthzError::Storage(message) = err {
		bail!("storage failure: {message}");
	}
	Ok(json!({
		"status": err.status_code().as_u16(),
		"error": err.to_string(),
	}))
}

pub async fn levels(pool: &SqlitePool, study: &str) -> Result<Value> {
	let identifier = Identifier::resolve(study, ResourceType::Study)?;
	let grants = GrantRepository::new(pool.clone());
	let users = UserRepository::new(pool.clone());

	let key = grants
		.find_study(&identifier)
		.await?
		.ok_or_else(|| anyhow!("study '{study}' not found"))?;

	let (grants, users) = futures::try_join!(grants.grants_for_study(key), users.list_users())?;

	let levels: Vec<Value> = users
		.into_iter()
		.map(|user| {
			let username = user.username.clone();
			let level = effective_level(&Principal::from(user), key, &grants);
			json!({ "user": username, "level": level })
		})
		.collect();

	Ok(json!({ "study": key, "grants": grants, "levels": levels }))
}
