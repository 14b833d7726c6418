// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Database-backed visibility agrees with the in-memory grant model.

use edd_server_authz::{
	effective_level, Engine, GrantLevel, GroupId, Operation, Principal, ResourceType, ScopedGrant,
	StudyKey, User, UserId,
};
use edd_server_db::testing::{create_schema_pool, Seed};
use edd_server_db::{GrantRepository, SqliteRecordStore, UserRepository};
use http::StatusCode;
use proptest::prelude::*;

use super::support::{observe_with, request, run_access_cases, AccessCase, Expected, World};

const SUBJECT: UserId = UserId::new(1);
const BYSTANDER: UserId = UserId::new(2);
const STUDY: StudyKey = StudyKey::new(1);
const OTHER_STUDY: StudyKey = StudyKey::new(2);

fn level_strategy() -> impl Strategy<Value = GrantLevel> {
	prop_oneof![
		Just(GrantLevel::None),
		Just(GrantLevel::Read),
		Just(GrantLevel::Write),
	]
}

fn grant_strategy() -> impl Strategy<Value = ScopedGrant> {
	let scope = prop_oneof![Just(STUDY), Just(OTHER_STUDY)];
	prop_oneof![
		(scope.clone(), prop_oneof![Just(SUBJECT), Just(BYSTANDER)], level_strategy())
			.prop_map(|(scope, user, level)| ScopedGrant::User { scope, user, level }),
		(scope.clone(), 1i64..=3, level_strategy()).prop_map(|(scope, group, level)| {
			ScopedGrant::Group {
				scope,
				group: GroupId::new(group),
				level,
			}
		}),
		(scope, level_strategy()).prop_map(|(scope, level)| ScopedGrant::Everyone { scope, level }),
	]
}

struct Observed {
	principal: Principal,
	studies: Expected,
	line_update: Expected,
}

async fn observe_grants(groups: &[i64], grants: &[ScopedGrant]) -> Observed {
	let pool = create_schema_pool().await;
	Seed::new(&pool)
		.study(1, "one", "One")
		.await
		.study(2, "two", "Two")
		.await
		.line(10, 1, "L-1")
		.await
		.line(20, 2, "L-2")
		.await;

	let users = UserRepository::new(pool.clone());
	for group in 1..=3 {
		users
			.create_group(GroupId::new(group), &format!("group{group}"))
			.await
			.unwrap();
	}
	let mut subject = User::new(SUBJECT, "subject");
	for group in groups {
		subject = subject.with_group(GroupId::new(*group));
	}
	users.create_user(&subject).await.unwrap();
	users
		.create_user(&User::new(BYSTANDER, "bystander"))
		.await
		.unwrap();

	let repo = GrantRepository::new(pool.clone());
	for grant in grants {
		repo.add_grant(grant).await.unwrap();
	}

	let principal = users.principal("subject").await.unwrap();
	let engine = Engine::default();
	let store = SqliteRecordStore::new(pool);

	let mut studies = request(ResourceType::Study, Operation::Read);
	studies.principal = principal.clone();
	let mut line_update = request(ResourceType::Line, Operation::Update).with_identifier("10");
	line_update.principal = principal.clone();

	Observed {
		studies: observe_with(&engine, &store, &studies).await,
		line_update: observe_with(&engine, &store, &line_update).await,
		principal,
	}
}

proptest! {
	#![proptest_config(ProptestConfig::with_cases(32))]

	#[test]
	fn stored_grants_match_effective_level(
		groups in proptest::sample::subsequence(vec![1i64, 2, 3], 0..=3),
		grants in proptest::collection::vec(grant_strategy(), 0..6),
	) {
		let observed = tokio_test::block_on(observe_grants(&groups, &grants));

		let mut visible = Vec::new();
		for study in [STUDY, OTHER_STUDY] {
			if effective_level(&observed.principal, study, &grants).satisfies(GrantLevel::Read) {
				visible.push(study.into_inner());
			}
		}
		prop_assert_eq!(observed.studies, Expected::Keys(visible));

		let expected_update =
			if effective_level(&observed.principal, STUDY, &grants).satisfies(GrantLevel::Write) {
				Expected::Record(10)
			} else {
				Expected::Status(StatusCode::FORBIDDEN)
			};
		prop_assert_eq!(observed.line_update, expected_update);
	}
}

#[tokio::test]
async fn test_new_grant_takes_effect_immediately() {
	let world = World::new().await;
	let erin = world.users.erin.clone();

	let update_beta_line = || AccessCase {
		name: "erin_updates_beta_line",
		user: erin.clone(),
		request: request(ResourceType::Line, Operation::Update).with_identifier("20"),
		expected: Expected::Record(20),
	};

	let mut before = update_beta_line();
	before.expected = Expected::Status(StatusCode::FORBIDDEN);
	run_access_cases(&world, vec![before]).await;

	let erin_id = erin.user().map(|u| u.id).unwrap();
	GrantRepository::new(world.pool.clone())
		.add_grant(&ScopedGrant::User {
			scope: StudyKey::new(2),
			user: erin_id,
			level: GrantLevel::Write,
		})
		.await
		.unwrap();

	run_access_cases(&world, vec![update_beta_line()]).await;
}
