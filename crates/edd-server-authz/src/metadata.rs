// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Free-form metadata comparisons.
//!
//! Each resource carries a string-to-string metadata store. Callers send one
//! comparison or a list of them as `{ "key", "op", "test" }` objects; a list
//! is combined with AND. Numbers in `test` are compared as their string form,
//! since the store holds text.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::InputError;

/// Operators that test keys rather than values, and so never take a `key`.
const KEYLESS_OPERATORS: [&str; 5] = ["has_key", "has_any_keys", "has_keys", "keys", "values"];

/// One comparison as the caller sent it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaFilter {
	#[serde(default)]
	pub key: Option<String>,
	#[serde(default)]
	pub op: Option<String>,
	#[serde(default)]
	pub test: Option<serde_json::Value>,
}

/// A single comparison or a list of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaFilters {
	Many(Vec<MetaFilter>),
	One(MetaFilter),
}

impl MetaFilters {
	/// Validates every comparison, naming the failing position when more than one was sent.
	pub fn compile(&self) -> Result<Vec<MetaPredicate>, InputError> {
		match self {
			MetaFilters::One(filter) => Ok(vec![compile(filter, None)?]),
			MetaFilters::Many(filters) if filters.len() == 1 => Ok(vec![compile(&filters[0], None)?]),
			MetaFilters::Many(filters) => filters
				.iter()
				.enumerate()
				.map(|(i, filter)| compile(filter, Some(i + 1)))
				.collect(),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetaOp {
	Exact,
	IExact,
	Contains,
	IContains,
	StartsWith,
	IStartsWith,
	EndsWith,
	IEndsWith,
	Lt,
	Lte,
	Gt,
	Gte,
	Regex,
	IRegex,
	In,
	ContainedBy,
	HasKey,
	HasKeys,
	HasAnyKeys,
	/// The store's key set equals the given keys.
	Keys,
	/// The store's values equal the given values, counted with multiplicity.
	Values,
}

impl MetaOp {
	fn parse(op: &str) -> Option<MetaOp> {
		let op = match op {
			"=" | "exact" => MetaOp::Exact,
			"iexact" => MetaOp::IExact,
			"contains" => MetaOp::Contains,
			"icontains" => MetaOp::IContains,
			"startswith" => MetaOp::StartsWith,
			"istartswith" => MetaOp::IStartsWith,
			"endswith" => MetaOp::EndsWith,
			"iendswith" => MetaOp::IEndsWith,
			"lt" => MetaOp::Lt,
			"lte" => MetaOp::Lte,
			"gt" => MetaOp::Gt,
			"gte" => MetaOp::Gte,
			"regex" => MetaOp::Regex,
			"iregex" => MetaOp::IRegex,
			"in" => MetaOp::In,
			"contained_by" => MetaOp::ContainedBy,
			"has_key" => MetaOp::HasKey,
			"has_keys" | "keys__contains" => MetaOp::HasKeys,
			"has_any_keys" | "keys__overlap" => MetaOp::HasAnyKeys,
			"keys" => MetaOp::Keys,
			"values" => MetaOp::Values,
			_ => return None,
		};
		Some(op)
	}

	pub fn as_str(self) -> &'static str {
		match self {
			MetaOp::Exact => "exact",
			MetaOp::IExact => "iexact",
			MetaOp::Contains => "contains",
			MetaOp::IContains => "icontains",
			MetaOp::StartsWith => "startswith",
			MetaOp::IStartsWith => "istartswith",
			MetaOp::EndsWith => "endswith",
			MetaOp::IEndsWith => "iendswith",
			MetaOp::Lt => "lt",
			MetaOp::Lte => "lte",
			MetaOp::Gt => "gt",
			MetaOp::Gte => "gte",
			MetaOp::Regex => "regex",
			MetaOp::IRegex => "iregex",
			MetaOp::In => "in",
			MetaOp::ContainedBy => "contained_by",
			MetaOp::HasKey => "has_key",
			MetaOp::HasKeys => "has_keys",
			MetaOp::HasAnyKeys => "has_any_keys",
			MetaOp::Keys => "keys",
			MetaOp::Values => "values",
		}
	}
}

/// The coerced `test` value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MetaValue {
	Text(String),
	List(Vec<String>),
	Object(BTreeMap<String, String>),
}

impl MetaValue {
	fn kind(&self) -> &'static str {
		match self {
			MetaValue::Text(_) => "a string or number",
			MetaValue::List(_) => "a list",
			MetaValue::Object(_) => "an object",
		}
	}

	fn is_empty(&self) -> bool {
		match self {
			MetaValue::Text(s) => s.is_empty(),
			MetaValue::List(items) => items.is_empty(),
			MetaValue::Object(map) => map.is_empty(),
		}
	}
}

/// A validated metadata comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetaPredicate {
	/// Absent for key-existence operators and whole-store containment.
	pub key: Option<String>,
	pub op: MetaOp,
	pub value: MetaValue,
}

impl fmt::Display for MetaPredicate {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if let Some(key) = &self.key {
			write!(f, "[{key}] ")?;
		}
		write!(f, "{} {:?}", self.op.as_str(), self.value)
	}
}

/// Validates one comparison. `ordinal` is its 1-based position when several were sent.
pub fn compile(filter: &MetaFilter, ordinal: Option<usize>) -> Result<MetaPredicate, InputError> {
	let fail = |message: String| InputError::Metadata { ordinal, message };

	let op_name = match filter.op.as_deref() {
		Some(op) if !op.is_empty() => op,
		_ => return Err(fail("\"op\" is required".to_string())),
	};

	let key = filter.key.clone().filter(|k| !k.is_empty());
	let keyless = KEYLESS_OPERATORS.contains(&op_name) || op_name.starts_with("keys");
	if keyless && key.is_some() {
		return Err(fail(format!(
			"\"key\" isn't allowed for operator \"{op_name}\". Use \"test\" instead."
		)));
	}

	let value = match filter.test.as_ref().map(coerce).transpose().map_err(fail)? {
		Some(value) if !value.is_empty() => value,
		_ => {
			return Err(fail(
				"Parameters are inconsistent. \"test\" is required when \"op\" is provided."
					.to_string(),
			))
		}
	};

	let op = MetaOp::parse(op_name)
		.ok_or_else(|| fail(format!("unsupported operator \"{op_name}\"")))?;

	let expected = expected_shape(op, key.is_some());
	let needs_key = op == MetaOp::In || (expected == Shape::Text && op != MetaOp::HasKey);
	if key.is_none() && needs_key {
		return Err(fail(format!(
			"\"key\" is required for operator \"{}\"",
			op.as_str()
		)));
	}

	let shape_ok = matches!(
		(&value, expected),
		(MetaValue::Text(_), Shape::Text)
			| (MetaValue::List(_), Shape::List)
			| (MetaValue::Object(_), Shape::Object)
	);
	if !shape_ok {
		return Err(fail(format!(
			"\"test\" must be {} for operator \"{}\", not {}",
			expected.describe(),
			op.as_str(),
			value.kind()
		)));
	}

	if let (MetaOp::Regex | MetaOp::IRegex, MetaValue::Text(pattern)) = (op, &value) {
		regex::Regex::new(pattern)
			.map_err(|e| fail(format!("invalid regular expression: {e}")))?;
	}

	Ok(MetaPredicate { key, op, value })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
	Text,
	List,
	Object,
}

impl Shape {
	fn describe(self) -> &'static str {
		match self {
			Shape::Text => "a string or number",
			Shape::List => "a list",
			Shape::Object => "an object",
		}
	}
}

fn expected_shape(op: MetaOp, keyed: bool) -> Shape {
	match op {
		MetaOp::In | MetaOp::HasKeys | MetaOp::HasAnyKeys | MetaOp::Keys | MetaOp::Values => {
			Shape::List
		}
		MetaOp::Contains | MetaOp::ContainedBy if !keyed => Shape::Object,
		_ => Shape::Text,
	}
}

fn coerce(test: &serde_json::Value) -> Result<MetaValue, String> {
	use serde_json::Value;

	match test {
		Value::Array(items) => items
			.iter()
			.map(coerce_scalar)
			.collect::<Result<Vec<_>, _>>()
			.map(MetaValue::List),
		Value::Object(map) => map
			.iter()
			.map(|(k, v)| coerce_scalar(v).map(|v| (k.clone(), v)))
			.collect::<Result<BTreeMap<_, _>, _>>()
			.map(MetaValue::Object),
		Value::Null => Ok(MetaValue::Text(String::new())),
		scalar => coerce_scalar(scalar).map(MetaValue::Text),
	}
}

fn coerce_scalar(value: &serde_json::Value) -> Result<String, String> {
	use serde_json::Value;

	match value {
		Value::String(s) => Ok(s.clone()),
		Value::Number(n) => Ok(n.to_string()),
		Value::Bool(b) => Ok(b.to_string()),
		_ => Err("\"test\" items must be strings or numbers".to_string()),
	}
}
