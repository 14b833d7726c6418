// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use edd_server_authz::{Operation, Principal, ResourceType};
use edd_server_db::testing::uuid_for;
use http::StatusCode;
use serde_json::json;

use super::support::{filters, request, run_access_cases, AccessCase, Expected, World};

#[tokio::test]
async fn test_nested_collections() {
	let world = World::new().await;
	let u = &world.users;

	let cases = vec![
		AccessCase {
			name: "lines_within_writable_study",
			user: u.alice.clone(),
			request: request(ResourceType::Line, Operation::Read).within_study("alpha"),
			expected: Expected::Keys(vec![10]),
		},
		AccessCase {
			name: "inactive_lines_within_study",
			user: u.alice.clone(),
			request: request(ResourceType::Line, Operation::Read)
				.within_study("1")
				.with_filters(filters(json!({"active": "all"}))),
			expected: Expected::Keys(vec![10, 11]),
		},
		AccessCase {
			name: "invisible_parent_gives_empty_collection",
			user: u.alice.clone(),
			request: request(ResourceType::Line, Operation::Read).within_study("beta"),
			expected: Expected::Keys(vec![]),
		},
		AccessCase {
			name: "missing_parent_gives_empty_collection",
			user: u.admin.clone(),
			request: request(ResourceType::Line, Operation::Read).within_study("nope"),
			expected: Expected::Keys(vec![]),
		},
		AccessCase {
			name: "elevated_role_does_not_open_study_contents",
			user: u.dave.clone(),
			request: request(ResourceType::Line, Operation::Read).within_study("alpha"),
			expected: Expected::Keys(vec![]),
		},
		AccessCase {
			name: "study_capability_does_not_open_study_contents",
			user: u.frank.clone(),
			request: request(ResourceType::Line, Operation::Read).within_study("alpha"),
			expected: Expected::Keys(vec![]),
		},
		AccessCase {
			name: "measurements_within_study",
			user: u.alice.clone(),
			request: request(ResourceType::Measurement, Operation::Read).within_study("alpha"),
			expected: Expected::Keys(vec![1000]),
		},
		AccessCase {
			name: "malformed_parent_identifier",
			user: u.alice.clone(),
			request: request(ResourceType::Line, Operation::Read).within_study(""),
			expected: Expected::Status(StatusCode::BAD_REQUEST),
		},
	];

	run_access_cases(&world, cases).await;
}

#[tokio::test]
async fn test_nested_strains() {
	let world = World::new().await;
	let u = &world.users;

	let cases = vec![
		AccessCase {
			name: "strains_via_active_lines",
			user: u.admin.clone(),
			request: request(ResourceType::Strain, Operation::Read).within_study("alpha"),
			expected: Expected::Keys(vec![500, 503]),
		},
		AccessCase {
			name: "strains_via_inactive_lines",
			user: u.admin.clone(),
			request: request(ResourceType::Strain, Operation::Read)
				.within_study("alpha")
				.with_filters(filters(json!({"line_active": "inactive"}))),
			expected: Expected::Keys(vec![500]),
		},
		AccessCase {
			name: "strains_via_any_line",
			user: u.admin.clone(),
			request: request(ResourceType::Strain, Operation::Read)
				.within_study("alpha")
				.with_filters(filters(json!({"line_active": "all"}))),
			expected: Expected::Keys(vec![500, 503]),
		},
		AccessCase {
			name: "curator_still_needs_study_access",
			user: u.carol.clone(),
			request: request(ResourceType::Strain, Operation::Read).within_study("alpha"),
			expected: Expected::Keys(vec![]),
		},
		AccessCase {
			name: "curator_with_everyone_grant",
			user: u.carol.clone(),
			request: request(ResourceType::Strain, Operation::Read).within_study("gamma"),
			expected: Expected::Keys(vec![503]),
		},
	];

	run_access_cases(&world, cases).await;
}

#[tokio::test]
async fn test_studies_using_strain() {
	let world = World::new().await;
	let u = &world.users;
	let shared = uuid_for(ResourceType::Strain, 503).to_string();

	let cases = vec![
		AccessCase {
			name: "studies_via_active_lines",
			user: u.admin.clone(),
			request: request(ResourceType::Study, Operation::Read).within_strain("503"),
			expected: Expected::Keys(vec![1, 3]),
		},
		AccessCase {
			name: "strain_by_registry_id",
			user: u.admin.clone(),
			request: request(ResourceType::Study, Operation::Read).within_strain(shared.clone()),
			expected: Expected::Keys(vec![1, 3]),
		},
		AccessCase {
			name: "studies_via_inactive_lines",
			user: u.admin.clone(),
			request: request(ResourceType::Study, Operation::Read)
				.within_strain("500")
				.with_filters(filters(json!({"line_active": "inactive"}))),
			expected: Expected::Keys(vec![1]),
		},
		AccessCase {
			name: "two_lines_one_study",
			user: u.admin.clone(),
			request: request(ResourceType::Study, Operation::Read)
				.within_strain("500")
				.with_filters(filters(json!({"line_active": "all"}))),
			expected: Expected::Keys(vec![1]),
		},
		AccessCase {
			name: "unused_strain",
			user: u.admin.clone(),
			request: request(ResourceType::Study, Operation::Read).within_strain("502"),
			expected: Expected::Keys(vec![]),
		},
		AccessCase {
			name: "study_using_strain",
			user: u.admin.clone(),
			request: request(ResourceType::Study, Operation::Read)
				.within_strain("503")
				.with_identifier("gamma"),
			expected: Expected::Record(3),
		},
		AccessCase {
			name: "study_not_using_strain",
			user: u.admin.clone(),
			request: request(ResourceType::Study, Operation::Read)
				.within_strain("503")
				.with_identifier("2"),
			expected: Expected::Status(StatusCode::NOT_FOUND),
		},
		AccessCase {
			name: "grant_holder_is_refused",
			user: u.alice.clone(),
			request: request(ResourceType::Study, Operation::Read).within_strain("500"),
			expected: Expected::Status(StatusCode::FORBIDDEN),
		},
		AccessCase {
			name: "elevated_role_is_refused",
			user: u.dave.clone(),
			request: request(ResourceType::Study, Operation::Read).within_strain("500"),
			expected: Expected::Status(StatusCode::FORBIDDEN),
		},
		AccessCase {
			name: "strain_curator_is_refused",
			user: u.carol.clone(),
			request: request(ResourceType::Study, Operation::Read).within_strain("500"),
			expected: Expected::Status(StatusCode::FORBIDDEN),
		},
		AccessCase {
			name: "anonymous_collection_is_empty",
			user: Principal::Anonymous,
			request: request(ResourceType::Study, Operation::Read).within_strain("500"),
			expected: Expected::Keys(vec![]),
		},
		AccessCase {
			name: "anonymous_detail_is_not_found",
			user: Principal::Anonymous,
			request: request(ResourceType::Study, Operation::Read)
				.within_strain("500")
				.with_identifier("1"),
			expected: Expected::Status(StatusCode::NOT_FOUND),
		},
		AccessCase {
			name: "read_only",
			user: u.admin.clone(),
			request: request(ResourceType::Study, Operation::Update)
				.within_strain("500")
				.with_identifier("1"),
			expected: Expected::Status(StatusCode::METHOD_NOT_ALLOWED),
		},
		AccessCase {
			name: "only_studies_nest_in_strains",
			user: u.admin.clone(),
			request: request(ResourceType::Line, Operation::Read).within_strain("500"),
			expected: Expected::Status(StatusCode::BAD_REQUEST),
		},
		AccessCase {
			name: "malformed_strain_identifier",
			user: u.admin.clone(),
			request: request(ResourceType::Study, Operation::Read).within_strain("e-coli"),
			expected: Expected::Status(StatusCode::BAD_REQUEST),
		},
	];

	run_access_cases(&world, cases).await;
}

#[tokio::test]
async fn test_nested_single_records() {
	let world = World::new().await;
	let u = &world.users;

	let cases = vec![
		AccessCase {
			name: "line_within_its_study",
			user: u.alice.clone(),
			request: request(ResourceType::Line, Operation::Read)
				.within_study("alpha")
				.with_identifier("10"),
			expected: Expected::Record(10),
		},
		AccessCase {
			name: "line_within_another_study",
			user: u.alice.clone(),
			request: request(ResourceType::Line, Operation::Read)
				.within_study("gamma")
				.with_identifier("10"),
			expected: Expected::Status(StatusCode::NOT_FOUND),
		},
		AccessCase {
			name: "line_within_invisible_study",
			user: u.alice.clone(),
			request: request(ResourceType::Line, Operation::Read)
				.within_study("beta")
				.with_identifier("20"),
			expected: Expected::Status(StatusCode::NOT_FOUND),
		},
		AccessCase {
			name: "update_within_writable_study",
			user: u.alice.clone(),
			request: request(ResourceType::Line, Operation::Update)
				.within_study("alpha")
				.with_identifier("10"),
			expected: Expected::Record(10),
		},
		AccessCase {
			name: "update_within_readable_study",
			user: u.bob.clone(),
			request: request(ResourceType::Line, Operation::Update)
				.within_study("beta")
				.with_identifier("20"),
			expected: Expected::Status(StatusCode::FORBIDDEN),
		},
		AccessCase {
			name: "strain_cannot_be_created_within_study",
			user: u.carol.clone(),
			request: request(ResourceType::Strain, Operation::Create).within_study("alpha"),
			expected: Expected::Status(StatusCode::BAD_REQUEST),
		},
		AccessCase {
			name: "update_within_invisible_study",
			user: u.alice.clone(),
			request: request(ResourceType::Line, Operation::Update)
				.within_study("beta")
				.with_identifier("20"),
			expected: Expected::Status(StatusCode::FORBIDDEN),
		},
	];

	run_access_cases(&world, cases).await;
}
