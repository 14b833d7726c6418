// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Renders a [`QueryPlan`] into one SQLite statement.
//!
//! The fetched type is always aliased `r`. When the predicate refers to the
//! owning study, the resource type's ownership chain is joined in, giving
//! the study alias `s` and, on chains through lines, the line alias `l`.
//! Studies filtered by strain usage join down to their lines `l` and the
//! strains `t` those lines use.
//! Only table and column names from this module are pushed as SQL text;
//! every caller-supplied value is a bind parameter.

use edd_server_authz::{
	Column, Hop, Identifier, Literal, MetaOp, MetaPredicate, MetaValue, Predicate, QueryPlan,
	ResourceType, ScopedAccess, SortOrder, TextMatch, TimeBound,
};
use sqlx::{QueryBuilder, Sqlite};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::DbError;
use crate::schema::format_timestamp;

type Builder = QueryBuilder<'static, Sqlite>;

const ROW: &str = "r";
const LINK: &str = "x";
const EACH: &str = "json_each(r.meta_store) j";

/// Builds the statement for `plan`. Call `.build()` on the result to run it.
pub fn select(plan: &QueryPlan) -> Result<Builder, DbError> {
	let rt = plan.resource_type;
	let mut chain = if plan.predicate.touches_scope() {
		Chain::walk(rt)
	} else {
		Chain::row_only(rt)
	};
	if plan.predicate.touches_strain_usage() {
		chain.join_strain_usage()?;
	}

	let mut qb = QueryBuilder::new("SELECT ");
	if plan.distinct {
		qb.push("DISTINCT ");
	}
	qb.push(format!(
		"r.id AS id, {uuid} AS uuid, {slug} AS slug, r.name AS name, r.description AS description, \
		 r.active AS active, r.created_at AS created_at, r.updated_at AS updated_at, \
		 r.meta_store AS meta_store FROM {table} {ROW}",
		uuid = uuid_column(rt),
		slug = slug_column(rt),
		table = table(rt),
	));
	for join in &chain.joins {
		qb.push(" ");
		qb.push(join);
	}

	qb.push(" WHERE ");
	push_predicate(&mut qb, &plan.predicate, rt, &chain)?;

	qb.push(match plan.order {
		SortOrder::Key => " ORDER BY r.id",
		SortOrder::NameAscending => " ORDER BY r.name ASC, r.id",
		SortOrder::NameDescending => " ORDER BY r.name DESC, r.id",
	});

	Ok(qb)
}

/// The statement text for `plan`, with `?` placeholders.
pub fn explain(plan: &QueryPlan) -> Result<String, DbError> {
	Ok(select(plan)?.sql().to_string())
}

fn table(rt: ResourceType) -> &'static str {
	rt.as_str()
}

fn alias(rt: ResourceType) -> &'static str {
	match rt {
		ResourceType::Study => "s",
		ResourceType::Line => "l",
		ResourceType::Assay => "a",
		ResourceType::Measurement => "m",
		ResourceType::Strain => "t",
	}
}

fn uuid_column(rt: ResourceType) -> &'static str {
	match rt {
		ResourceType::Strain => "r.registry_id",
		ResourceType::Measurement => "NULL",
		ResourceType::Study | ResourceType::Line | ResourceType::Assay => "r.uuid",
	}
}

fn slug_column(rt: ResourceType) -> &'static str {
	match rt {
		ResourceType::Study => "r.slug",
		_ => "NULL",
	}
}

fn column(rt: ResourceType, column: Column) -> &'static str {
	match column {
		Column::Key => "r.id",
		Column::Uuid => uuid_column(rt),
		Column::Slug => slug_column(rt),
		Column::Name => "r.name",
		Column::Description => "r.description",
		Column::Active => "r.active",
		Column::CreatedAt => "r.created_at",
		Column::UpdatedAt => "r.updated_at",
	}
}

/// Joins along the ownership chain and the aliases they introduce.
#[derive(Debug, Default)]
struct Chain {
	joins: Vec<String>,
	study: Option<&'static str>,
	line: Option<&'static str>,
	strain: Option<&'static str>,
}

impl Chain {
	fn row_only(rt: ResourceType) -> Chain {
		let mut chain = Chain::default();
		chain.note(rt, ROW);
		chain
	}

	fn walk(rt: ResourceType) -> Chain {
		let mut chain = Chain::row_only(rt);
		let (mut from_alias, mut from_type) = (ROW, rt);

		for hop in rt.policy().scope_path {
			let to_type = match *hop {
				Hop::Parent(t) | Hop::Linked(t) => t,
			};
			let to_alias = alias(to_type);
			let (from, to) = (table(from_type), table(to_type));

			match hop {
				Hop::Parent(_) => chain.joins.push(format!(
					"JOIN {to} {to_alias} ON {to_alias}.id = {from_alias}.{to}_id"
				)),
				Hop::Linked(_) => {
					chain.joins.push(format!(
						"JOIN {to}_{from} {LINK} ON {LINK}.{from}_id = {from_alias}.id"
					));
					chain.joins.push(format!(
						"JOIN {to} {to_alias} ON {to_alias}.id = {LINK}.{to}_id"
					));
				}
			}

			chain.note(to_type, to_alias);
			from_alias = to_alias;
			from_type = to_type;
		}
		chain
	}

	/// Joins a study row down to the strains its lines use.
	fn join_strain_usage(&mut self) -> Result<(), DbError> {
		let study = self.study()?;
		if !self.joins.is_empty() {
			return Err(DbError::Internal(
				"strain usage can only be joined from a study row".to_string(),
			));
		}

		let (line, strain) = (alias(ResourceType::Line), alias(ResourceType::Strain));
		self.joins
			.push(format!("JOIN line {line} ON {line}.study_id = {study}.id"));
		self.joins
			.push(format!("JOIN line_strain {LINK} ON {LINK}.line_id = {line}.id"));
		self.joins
			.push(format!("JOIN strain {strain} ON {strain}.id = {LINK}.strain_id"));
		self.line = Some(line);
		self.strain = Some(strain);
		Ok(())
	}

	fn note(&mut self, rt: ResourceType, alias: &'static str) {
		match rt {
			ResourceType::Study => self.study = Some(alias),
			ResourceType::Line => self.line = Some(alias),
			_ => {}
		}
	}

	fn study(&self) -> Result<&'static str, DbError> {
		self.study
			.ok_or_else(|| DbError::Internal("predicate needs the owning study".to_string()))
	}

	fn line(&self) -> Result<&'static str, DbError> {
		self.line
			.ok_or_else(|| DbError::Internal("predicate needs a line on the chain".to_string()))
	}

	fn strain(&self) -> Result<&'static str, DbError> {
		self.strain
			.ok_or_else(|| DbError::Internal("predicate needs the strain join".to_string()))
	}
}

fn push_predicate(
	qb: &mut Builder,
	predicate: &Predicate,
	rt: ResourceType,
	chain: &Chain,
) -> Result<(), DbError> {
	match predicate {
		Predicate::Always => {
			qb.push("1 = 1");
		}
		Predicate::Never => {
			qb.push("1 = 0");
		}
		Predicate::All { parts } => {
			for (i, part) in parts.iter().enumerate() {
				if i > 0 {
					qb.push(" AND ");
				}
				qb.push("(");
				push_predicate(qb, part, rt, chain)?;
				qb.push(")");
			}
		}
		Predicate::Equals { column: col, value } => {
			qb.push(format!("{} = ", column(rt, *col)));
			push_literal(qb, value);
		}
		Predicate::Time { column: col, bound, at } => {
			let op = match bound {
				TimeBound::AtOrAfter => ">=",
				TimeBound::Before => "<",
			};
			qb.push(format!("{} {op} ", column(rt, *col)));
			qb.push_bind(format_timestamp(*at));
		}
		Predicate::Text {
			column: col,
			pattern,
			mode,
			case_sensitive,
		} => {
			let col = column(rt, *col);
			match (mode, case_sensitive) {
				(TextMatch::Regex, true) => {
					qb.push(format!("{col} REGEXP "));
					qb.push_bind(pattern.clone());
				}
				(TextMatch::Regex, false) => {
					qb.push(format!("{col} REGEXP "));
					qb.push_bind(format!("(?i){pattern}"));
				}
				(TextMatch::Contains, true) => {
					qb.push(format!("instr({col}, "));
					qb.push_bind(pattern.clone());
					qb.push(") > 0");
				}
				(TextMatch::Contains, false) => {
					qb.push(format!("{col} REGEXP "));
					qb.push_bind(folded(pattern, "", ""));
				}
			}
		}
		Predicate::Meta { test } => push_meta(qb, test)?,
		Predicate::Granted { access } => push_granted(qb, access, chain.study()?),
		Predicate::InScope { scope } => {
			let study = chain.study()?;
			match scope {
				Identifier::Key(key) => {
					qb.push(format!("{study}.id = "));
					qb.push_bind(*key);
				}
				Identifier::Uuid(uuid) => {
					qb.push(format!("{study}.uuid = "));
					qb.push_bind(uuid.to_string());
				}
				Identifier::Slug(slug) => {
					qb.push(format!("{study}.slug = "));
					qb.push_bind(slug.clone());
				}
			}
		}
		Predicate::LineActive { active } => {
			qb.push(format!("{}.active = ", chain.line()?));
			qb.push_bind(*active);
		}
		Predicate::UsesStrain { strain } => {
			let alias = chain.strain()?;
			match strain {
				Identifier::Key(key) => {
					qb.push(format!("{alias}.id = "));
					qb.push_bind(*key);
				}
				Identifier::Uuid(uuid) => {
					qb.push(format!("{alias}.registry_id = "));
					qb.push_bind(uuid.to_string());
				}
				Identifier::Slug(_) => {
					return Err(DbError::Internal("strains have no slug".to_string()));
				}
			}
		}
	}
	Ok(())
}

fn push_literal(qb: &mut Builder, value: &Literal) {
	match value {
		Literal::Int(v) => qb.push_bind(*v),
		Literal::Uuid(v) => qb.push_bind(v.to_string()),
		Literal::Text(v) => qb.push_bind(v.clone()),
		Literal::Bool(v) => qb.push_bind(*v),
	};
}

/// A grant on the owning study, at or above the required level, that names
/// the caller, one of the caller's groups, or everyone.
fn push_granted(qb: &mut Builder, access: &ScopedAccess, study: &str) {
	qb.push(format!(
		"EXISTS (SELECT 1 FROM scope_grant g WHERE g.study_id = {study}.id AND g.level >= "
	));
	qb.push_bind(access.level.as_i64());
	qb.push(" AND (g.grantee = 'everyone' OR (g.grantee = 'user' AND g.grantee_id = ");
	qb.push_bind(access.user.into_inner());
	qb.push(")");
	if !access.groups.is_empty() {
		qb.push(" OR (g.grantee = 'group' AND g.grantee_id IN (");
		push_list(qb, access.groups.iter().map(|g| g.into_inner()));
		qb.push("))");
	}
	qb.push("))");
}

fn push_list<T>(qb: &mut Builder, items: impl IntoIterator<Item = T>)
where
	T: 'static + Send + sqlx::Encode<'static, Sqlite> + sqlx::Type<Sqlite>,
{
	let mut separated = qb.separated(", ");
	for item in items {
		separated.push_bind(item);
	}
}

fn push_meta(qb: &mut Builder, test: &MetaPredicate) -> Result<(), DbError> {
	let unexpected =
		|| DbError::Internal(format!("metadata comparison cannot be rendered: {test}"));

	if let Some(key) = &test.key {
		qb.push(format!("EXISTS (SELECT 1 FROM {EACH} WHERE j.key = "));
		qb.push_bind(key.clone());
		qb.push(" AND ");
		push_value_test(qb, test.op, &test.value).ok_or_else(unexpected)?;
		qb.push(")");
		return Ok(());
	}

	match (test.op, &test.value) {
		(MetaOp::HasKey, MetaValue::Text(key)) => push_has_key(qb, key),
		(MetaOp::HasKeys, MetaValue::List(keys)) => {
			push_conjunction(qb, keys, |qb, key| push_has_key(qb, key))
		}
		(MetaOp::HasAnyKeys, MetaValue::List(keys)) => {
			qb.push(format!("EXISTS (SELECT 1 FROM {EACH} WHERE j.key IN ("));
			push_list(qb, keys.clone());
			qb.push("))");
		}
		(MetaOp::Keys, MetaValue::List(keys)) => {
			let keys: BTreeSet<&String> = keys.iter().collect();
			qb.push("(SELECT COUNT(*) FROM json_each(r.meta_store)) = ");
			qb.push_bind(keys.len() as i64);
			for key in keys {
				qb.push(" AND ");
				push_has_key(qb, key);
			}
		}
		(MetaOp::Values, MetaValue::List(values)) => {
			let mut counts: BTreeMap<&String, i64> = BTreeMap::new();
			for value in values {
				*counts.entry(value).or_default() += 1;
			}
			qb.push("(SELECT COUNT(*) FROM json_each(r.meta_store)) = ");
			qb.push_bind(values.len() as i64);
			for (value, count) in counts {
				qb.push(format!(" AND (SELECT COUNT(*) FROM {EACH} WHERE j.value = "));
				qb.push_bind(value.clone());
				qb.push(") = ");
				qb.push_bind(count);
			}
		}
		(MetaOp::Contains, MetaValue::Object(pairs)) => {
			push_conjunction(qb, pairs, |qb, (key, value)| {
				qb.push(format!("EXISTS (SELECT 1 FROM {EACH} WHERE j.key = "));
				qb.push_bind(key.clone());
				qb.push(" AND j.value = ");
				qb.push_bind(value.clone());
				qb.push(")");
			})
		}
		(MetaOp::ContainedBy, MetaValue::Object(pairs)) => {
			qb.push(format!("NOT EXISTS (SELECT 1 FROM {EACH} WHERE NOT ("));
			for (i, (key, value)) in pairs.iter().enumerate() {
				if i > 0 {
					qb.push(" OR ");
				}
				qb.push("(j.key = ");
				qb.push_bind(key.clone());
				qb.push(" AND j.value = ");
				qb.push_bind(value.clone());
				qb.push(")");
			}
			qb.push("))");
		}
		_ => return Err(unexpected()),
	}
	Ok(())
}

fn push_has_key(qb: &mut Builder, key: &str) {
	qb.push(format!("EXISTS (SELECT 1 FROM {EACH} WHERE j.key = "));
	qb.push_bind(key.to_string());
	qb.push(")");
}

fn push_conjunction<I, F>(qb: &mut Builder, items: I, mut push: F)
where
	I: IntoIterator,
	F: FnMut(&mut Builder, I::Item),
{
	for (i, item) in items.into_iter().enumerate() {
		if i > 0 {
			qb.push(" AND ");
		}
		push(qb, item);
	}
}

/// Case-insensitive literal match as a pattern for the registered `REGEXP`
/// function. SQLite's `lower()` folds ASCII only; the regex engine folds Unicode.
fn folded(literal: &str, prefix: &str, suffix: &str) -> String {
	format!("(?i){prefix}{}{suffix}", regex::escape(literal))
}

/// Comparison of the current `json_each` value. Returns `None` for an
/// operator and value that cannot be combined.
fn push_value_test(qb: &mut Builder, op: MetaOp, value: &MetaValue) -> Option<()> {
	if let (MetaOp::In, MetaValue::List(items)) = (op, value) {
		qb.push("j.value IN (");
		push_list(qb, items.clone());
		qb.push(")");
		return Some(());
	}

	let MetaValue::Text(test) = value else {
		return None;
	};
	let test = test.clone();

	match op {
		MetaOp::Exact => {
			qb.push("j.value = ");
			qb.push_bind(test);
		}
		MetaOp::IExact => {
			qb.push("j.value REGEXP ");
			qb.push_bind(folded(&test, "^", "$"));
		}
		MetaOp::Contains => {
			qb.push("instr(j.value, ");
			qb.push_bind(test);
			qb.push(") > 0");
		}
		MetaOp::IContains => {
			qb.push("j.value REGEXP ");
			qb.push_bind(folded(&test, "", ""));
		}
		MetaOp::StartsWith => {
			qb.push("instr(j.value, ");
			qb.push_bind(test);
			qb.push(") = 1");
		}
		MetaOp::IStartsWith => {
			qb.push("j.value REGEXP ");
			qb.push_bind(folded(&test, "^", ""));
		}
		MetaOp::EndsWith => {
			qb.push("substr(j.value, -length(");
			qb.push_bind(test.clone());
			qb.push(")) = ");
			qb.push_bind(test);
		}
		MetaOp::IEndsWith => {
			qb.push("j.value REGEXP ");
			qb.push_bind(folded(&test, "", "$"));
		}
		MetaOp::Lt | MetaOp::Lte | MetaOp::Gt | MetaOp::Gte => {
			let cmp = match op {
				MetaOp::Lt => "<",
				MetaOp::Lte => "<=",
				MetaOp::Gt => ">",
				_ => ">=",
			};
			qb.push(format!("j.value {cmp} "));
			qb.push_bind(test);
		}
		MetaOp::Regex => {
			qb.push("j.value REGEXP ");
			qb.push_bind(test);
		}
		MetaOp::IRegex => {
			qb.push("j.value REGEXP ");
			qb.push_bind(format!("(?i){test}"));
		}
		MetaOp::ContainedBy => {
			qb.push("instr(");
			qb.push_bind(test);
			qb.push(", j.value) > 0");
		}
		MetaOp::In
		| MetaOp::HasKey
		| MetaOp::HasKeys
		| MetaOp::HasAnyKeys
		| MetaOp::Keys
		| MetaOp::Values => return None,
	}
	Some(())
}
