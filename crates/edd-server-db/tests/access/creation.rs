// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use edd_server_authz::{EngineOptions, Operation, Principal, ResourceType, StudyCreationPolicy};
use http::StatusCode;

use super::support::{request, run_access_cases, AccessCase, Expected, World};

#[tokio::test]
async fn test_line_creation() {
	let world = World::new().await;
	let u = &world.users;

	let cases = vec![
		AccessCase {
			name: "writer_creates_line_in_study",
			user: u.alice.clone(),
			request: request(ResourceType::Line, Operation::Create).within_study("alpha"),
			expected: Expected::Creatable(Some(1)),
		},
		AccessCase {
			name: "writer_creates_line_by_study_key",
			user: u.alice.clone(),
			request: request(ResourceType::Line, Operation::Create).within_study("1"),
			expected: Expected::Creatable(Some(1)),
		},
		AccessCase {
			name: "reader_cannot_create_line",
			user: u.bob.clone(),
			request: request(ResourceType::Line, Operation::Create).within_study("beta"),
			expected: Expected::Status(StatusCode::FORBIDDEN),
		},
		AccessCase {
			name: "everyone_read_cannot_create_line",
			user: u.alice.clone(),
			request: request(ResourceType::Line, Operation::Create).within_study("gamma"),
			expected: Expected::Status(StatusCode::FORBIDDEN),
		},
		AccessCase {
			name: "line_creation_needs_study",
			user: u.alice.clone(),
			request: request(ResourceType::Line, Operation::Create),
			expected: Expected::Status(StatusCode::BAD_REQUEST),
		},
		AccessCase {
			name: "superuser_missing_study_is_not_found",
			user: u.admin.clone(),
			request: request(ResourceType::Line, Operation::Create).within_study("nope"),
			expected: Expected::Status(StatusCode::NOT_FOUND),
		},
		AccessCase {
			name: "scoped_missing_study_is_forbidden",
			user: u.alice.clone(),
			request: request(ResourceType::Line, Operation::Create).within_study("nope"),
			expected: Expected::Status(StatusCode::FORBIDDEN),
		},
		AccessCase {
			name: "anonymous_line_creation_is_not_found",
			user: Principal::Anonymous,
			request: request(ResourceType::Line, Operation::Create).within_study("alpha"),
			expected: Expected::Status(StatusCode::NOT_FOUND),
		},
		AccessCase {
			name: "assays_cannot_be_created",
			user: u.alice.clone(),
			request: request(ResourceType::Assay, Operation::Create).within_study("alpha"),
			expected: Expected::Status(StatusCode::METHOD_NOT_ALLOWED),
		},
		AccessCase {
			name: "studies_do_not_nest",
			user: u.alice.clone(),
			request: request(ResourceType::Study, Operation::Create).within_study("alpha"),
			expected: Expected::Status(StatusCode::BAD_REQUEST),
		},
	];

	run_access_cases(&world, cases).await;
}

#[tokio::test]
async fn test_strain_creation() {
	let world = World::new().await;
	let u = &world.users;

	let cases = vec![
		AccessCase {
			name: "update_capability_is_not_create",
			user: u.carol.clone(),
			request: request(ResourceType::Strain, Operation::Create),
			expected: Expected::Status(StatusCode::FORBIDDEN),
		},
		AccessCase {
			name: "study_writer_cannot_create_strain",
			user: u.alice.clone(),
			request: request(ResourceType::Strain, Operation::Create),
			expected: Expected::Status(StatusCode::FORBIDDEN),
		},
		AccessCase {
			name: "superuser_creates_strain",
			user: u.admin.clone(),
			request: request(ResourceType::Strain, Operation::Create),
			expected: Expected::Creatable(None),
		},
	];

	run_access_cases(&world, cases).await;
}

#[tokio::test]
async fn test_study_creation_policies() {
	let open = World::new().await;
	run_access_cases(
		&open,
		vec![
			AccessCase {
				name: "anyone_creates_study",
				user: open.users.erin.clone(),
				request: request(ResourceType::Study, Operation::Create),
				expected: Expected::Creatable(None),
			},
			AccessCase {
				name: "anonymous_study_creation_is_not_found",
				user: Principal::Anonymous,
				request: request(ResourceType::Study, Operation::Create),
				expected: Expected::Status(StatusCode::NOT_FOUND),
			},
		],
	)
	.await;

	for policy in [StudyCreationPolicy::SuperuserOnly, StudyCreationPolicy::Permission] {
		let world = World::with_options(EngineOptions {
			study_creation: policy,
			..EngineOptions::default()
		})
		.await;

		run_access_cases(
			&world,
			vec![
				AccessCase {
					name: "restricted_study_creation_is_forbidden",
					user: world.users.erin.clone(),
					request: request(ResourceType::Study, Operation::Create),
					expected: Expected::Status(StatusCode::FORBIDDEN),
				},
				AccessCase {
					name: "update_capability_is_not_create",
					user: world.users.frank.clone(),
					request: request(ResourceType::Study, Operation::Create),
					expected: Expected::Status(StatusCode::FORBIDDEN),
				},
				AccessCase {
					name: "superuser_creates_study",
					user: world.users.admin.clone(),
					request: request(ResourceType::Study, Operation::Create),
					expected: Expected::Creatable(None),
				},
			],
		)
		.await;
	}
}
