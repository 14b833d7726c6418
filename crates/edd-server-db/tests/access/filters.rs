// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use edd_server_authz::{AuthzError, Operation, ResourceType};
use edd_server_db::testing::Seed;
use http::StatusCode;
use serde_json::json;

use super::support::{filters, request, run_access_cases, AccessCase, Expected, World};

fn lines_where(value: serde_json::Value) -> edd_server_authz::Request {
	request(ResourceType::Line, Operation::Read).with_filters(filters(value))
}

#[tokio::test]
async fn test_text_filters() {
	let world = World::new().await;
	let admin = &world.users.admin;

	let cases = vec![
		AccessCase {
			name: "regex_ignores_case_by_default",
			user: admin.clone(),
			request: lines_where(json!({"name_regex": "^wt"})),
			expected: Expected::Keys(vec![10, 20]),
		},
		AccessCase {
			name: "case_sensitive_regex",
			user: admin.clone(),
			request: lines_where(json!({"name_regex": "^wt", "case_sensitive": true})),
			expected: Expected::Keys(vec![]),
		},
		AccessCase {
			name: "substring",
			user: admin.clone(),
			request: lines_where(json!({"name_contains": "t-"})),
			expected: Expected::Keys(vec![10, 20]),
		},
		AccessCase {
			name: "missing_description_never_matches",
			user: admin.clone(),
			request: lines_where(json!({"description_regex": "."})),
			expected: Expected::Keys(vec![]),
		},
		AccessCase {
			name: "filters_narrow_scoped_results",
			user: world.users.alice.clone(),
			request: lines_where(json!({"name_contains": "wt"})),
			expected: Expected::Keys(vec![10]),
		},
		AccessCase {
			name: "invalid_regex",
			user: admin.clone(),
			request: lines_where(json!({"name_regex": "(unclosed"})),
			expected: Expected::Status(StatusCode::BAD_REQUEST),
		},
	];

	run_access_cases(&world, cases).await;
}

#[tokio::test]
async fn test_case_folding_beyond_ascii() {
	let world = World::new().await;
	Seed::new(&world.pool)
		.line(40, 3, "Élan-1")
		.await
		.meta(ResourceType::Line, 40, json!({"origin": "Örebro"}))
		.await;
	let admin = &world.users.admin;

	let cases = vec![
		AccessCase {
			name: "substring_folds_accents",
			user: admin.clone(),
			request: lines_where(json!({"name_contains": "élan"})),
			expected: Expected::Keys(vec![40]),
		},
		AccessCase {
			name: "regex_folds_accents",
			user: admin.clone(),
			request: lines_where(json!({"name_regex": "^élan"})),
			expected: Expected::Keys(vec![40]),
		},
		AccessCase {
			name: "case_sensitive_substring",
			user: admin.clone(),
			request: lines_where(json!({"name_contains": "élan", "case_sensitive": true})),
			expected: Expected::Keys(vec![]),
		},
		AccessCase {
			name: "substring_is_literal",
			user: admin.clone(),
			request: lines_where(json!({"name_contains": "."})),
			expected: Expected::Keys(vec![]),
		},
		AccessCase {
			name: "metadata_iexact_folds_accents",
			user: admin.clone(),
			request: lines_where(json!({"meta": {"key": "origin", "op": "iexact", "test": "öREBRO"}})),
			expected: Expected::Keys(vec![40]),
		},
		AccessCase {
			name: "metadata_istartswith_folds_accents",
			user: admin.clone(),
			request: lines_where(json!({"meta": {"key": "origin", "op": "istartswith", "test": "ö"}})),
			expected: Expected::Keys(vec![40]),
		},
	];

	run_access_cases(&world, cases).await;
}

#[tokio::test]
async fn test_metadata_filters() {
	let world = World::new().await;
	let admin = &world.users.admin;

	let cases = vec![
		AccessCase {
			name: "numbers_compare_as_text",
			user: admin.clone(),
			request: lines_where(json!({"meta": {"key": "temp", "op": "gte", "test": 31}})),
			expected: Expected::Keys(vec![20]),
		},
		AccessCase {
			name: "has_key",
			user: admin.clone(),
			request: lines_where(json!({"meta": {"op": "has_key", "test": "media"}})),
			expected: Expected::Keys(vec![10]),
		},
		AccessCase {
			name: "exact_key_set",
			user: admin.clone(),
			request: lines_where(json!({"meta": {"op": "keys", "test": ["temp"]}})),
			expected: Expected::Keys(vec![20]),
		},
		AccessCase {
			name: "any_of_keys",
			user: admin.clone(),
			request: lines_where(json!({"meta": {"op": "has_any_keys", "test": ["media", "ph"]}})),
			expected: Expected::Keys(vec![10]),
		},
		AccessCase {
			name: "object_containment",
			user: admin.clone(),
			request: lines_where(json!({"meta": {"op": "contains", "test": {"media": "LB"}}})),
			expected: Expected::Keys(vec![10]),
		},
		AccessCase {
			name: "contained_by_includes_empty_stores",
			user: admin.clone(),
			request: lines_where(
				json!({"meta": {"op": "contained_by", "test": {"temp": "37", "x": "y"}}}),
			),
			expected: Expected::Keys(vec![20, 30]),
		},
		AccessCase {
			name: "values",
			user: admin.clone(),
			request: lines_where(json!({"meta": {"op": "values", "test": ["LB", "30"]}})),
			expected: Expected::Keys(vec![10]),
		},
		AccessCase {
			name: "values_in_any_order",
			user: admin.clone(),
			request: lines_where(json!({"meta": {"op": "values", "test": [30, "LB"]}})),
			expected: Expected::Keys(vec![10]),
		},
		AccessCase {
			name: "values_must_cover_the_whole_store",
			user: admin.clone(),
			request: lines_where(json!({"meta": {"op": "values", "test": ["LB"]}})),
			expected: Expected::Keys(vec![]),
		},
		AccessCase {
			name: "in_list_with_number",
			user: admin.clone(),
			request: lines_where(json!({"meta": {"key": "temp", "op": "in", "test": [30, 99]}})),
			expected: Expected::Keys(vec![10]),
		},
		AccessCase {
			name: "comparisons_are_anded",
			user: admin.clone(),
			request: lines_where(json!({"meta": [
				{"key": "temp", "op": "startswith", "test": "3"},
				{"op": "has_key", "test": "media"},
			]})),
			expected: Expected::Keys(vec![10]),
		},
		AccessCase {
			name: "case_insensitive_suffix",
			user: admin.clone(),
			request: lines_where(json!({"meta": {"key": "media", "op": "iendswith", "test": "b"}})),
			expected: Expected::Keys(vec![10]),
		},
		AccessCase {
			name: "incomplete_comparison",
			user: admin.clone(),
			request: lines_where(json!({"meta": {"key": "temp", "op": "gte"}})),
			expected: Expected::Status(StatusCode::BAD_REQUEST),
		},
	];

	run_access_cases(&world, cases).await;
}

#[tokio::test]
async fn test_metadata_errors_name_position() {
	let world = World::new().await;
	let mut request = lines_where(json!({"meta": [
		{"op": "has_key", "test": "media"},
		{"key": "temp", "op": "has_key", "test": "temp"},
	]}));
	request.principal = world.users.admin.clone();

	let err = world.engine.execute(&world.store, &request).await.unwrap_err();
	assert!(matches!(err, AuthzError::Input(_)));
	assert_eq!(
		err.to_string(),
		"Bad request: meta (comparison 2): \"key\" isn't allowed for operator \"has_key\". Use \"test\" instead."
	);
}

#[tokio::test]
async fn test_timestamp_filters() {
	let world = World::new().await;
	let admin = &world.users.admin;

	let cases = vec![
		AccessCase {
			name: "created_after_is_inclusive",
			user: admin.clone(),
			request: lines_where(json!({"created_after": "2020-01-01T00:00:00Z"})),
			expected: Expected::Keys(vec![10, 20, 30]),
		},
		AccessCase {
			name: "created_after_date",
			user: admin.clone(),
			request: lines_where(json!({"created_after": "2021-01-01"})),
			expected: Expected::Keys(vec![20]),
		},
		AccessCase {
			name: "created_before_date",
			user: admin.clone(),
			request: lines_where(json!({"created_before": "2021-01-01"})),
			expected: Expected::Keys(vec![10, 30]),
		},
		AccessCase {
			name: "updated_before_is_exclusive",
			user: admin.clone(),
			request: lines_where(json!({"updated_before": "2020-01-01"})),
			expected: Expected::Keys(vec![]),
		},
		AccessCase {
			name: "malformed_timestamp",
			user: admin.clone(),
			request: lines_where(json!({"created_after": "soon"})),
			expected: Expected::Status(StatusCode::BAD_REQUEST),
		},
	];

	run_access_cases(&world, cases).await;
}

#[tokio::test]
async fn test_sort_order() {
	let world = World::new().await;
	let admin = &world.users.admin;

	let cases = vec![
		AccessCase {
			name: "default_order_is_key",
			user: admin.clone(),
			request: lines_where(json!({})),
			expected: Expected::Keys(vec![10, 20, 30]),
		},
		AccessCase {
			name: "ascending_by_name",
			user: admin.clone(),
			request: lines_where(json!({"sort_order": "ascending"})),
			expected: Expected::Keys(vec![30, 10, 20]),
		},
		AccessCase {
			name: "descending_by_name",
			user: admin.clone(),
			request: lines_where(json!({"sort_order": "descending"})),
			expected: Expected::Keys(vec![20, 10, 30]),
		},
	];

	run_access_cases(&world, cases).await;
}
