// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{TimeZone, Utc};
use edd_server_authz::{
	Engine, EngineOptions, FilterSet, GrantLevel, GroupId, Operation, Outcome, Principal, Request,
	ResourceType, ScopedGrant, StudyKey, User, UserId,
};
use edd_server_db::testing::{create_schema_pool, Seed};
use edd_server_db::{GrantRepository, SqliteRecordStore, UserRepository};
use http::StatusCode;
use serde_json::json;
use sqlx::sqlite::SqlitePool;

pub struct Users {
	pub admin: Principal,
	/// WRITE on alpha, READ on the inactive delta.
	pub alice: Principal,
	/// READ on beta through the labmates group.
	pub bob: Principal,
	/// Class-level "update strain".
	pub carol: Principal,
	/// Elevated role.
	pub dave: Principal,
	/// No grants of their own.
	pub erin: Principal,
	/// Class-level "update study".
	pub frank: Principal,
}

/// A seeded database and an engine over it.
///
/// | study | key | grants |
/// |---|---|---|
/// | alpha | 1 | alice WRITE |
/// | beta | 2 | labmates READ |
/// | gamma | 3 | everyone READ |
/// | delta (inactive) | 4 | alice READ |
///
/// Lines 10 (WT-1) and 11 (KO-1, inactive) are in alpha, 20 (WT-2) in beta,
/// 30 (G-1) in gamma. Assay 100 / measurement 1000 hang off line 10, assay
/// 200 / measurement 2000 off line 20. Strain 500 is used by lines 10 and 11,
/// 501 by 20, 503 by 10 and 30; 502 is used by nothing.
pub struct World {
	pub pool: SqlitePool,
	pub engine: Engine,
	pub store: SqliteRecordStore,
	pub users: Users,
}

impl World {
	pub async fn new() -> Self {
		Self::with_options(EngineOptions::default()).await
	}

	pub async fn with_options(options: EngineOptions) -> Self {
		let pool = create_schema_pool().await;

		Seed::new(&pool)
			.study(1, "alpha", "Alpha")
			.await
			.study(2, "beta", "Beta")
			.await
			.study(3, "gamma", "Gamma")
			.await
			.study(4, "delta", "Delta")
			.await
			.inactive(ResourceType::Study, 4)
			.await
			.line(10, 1, "WT-1")
			.await
			.line(11, 1, "KO-1")
			.await
			.inactive(ResourceType::Line, 11)
			.await
			.line(20, 2, "WT-2")
			.await
			.line(30, 3, "G-1")
			.await
			.assay(100, 10, "OD600")
			.await
			.assay(200, 20, "HPLC")
			.await
			.measurement(1000, 100, "od")
			.await
			.measurement(2000, 200, "glucose")
			.await
			.strain(500, "E. coli")
			.await
			.strain(501, "Yeast")
			.await
			.strain(502, "Orphan")
			.await
			.strain(503, "Shared")
			.await
			.link(10, 500)
			.await
			.link(11, 500)
			.await
			.link(20, 501)
			.await
			.link(10, 503)
			.await
			.link(30, 503)
			.await
			.meta(ResourceType::Line, 10, json!({"temp": "30", "media": "LB"}))
			.await
			.meta(ResourceType::Line, 20, json!({"temp": "37"}))
			.await
			.created(
				ResourceType::Line,
				20,
				Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap(),
			)
			.await;

		let user_repo = UserRepository::new(pool.clone());
		user_repo
			.create_group(GroupId::new(10), "labmates")
			.await
			.unwrap();

		let accounts = [
			User::new(UserId::new(1), "admin").with_superuser(),
			User::new(UserId::new(2), "alice"),
			User::new(UserId::new(3), "bob").with_group(GroupId::new(10)),
			User::new(UserId::new(4), "carol").with_capability(ResourceType::Strain, Operation::Update),
			User::new(UserId::new(5), "dave").with_elevated_role(),
			User::new(UserId::new(6), "erin"),
			User::new(UserId::new(7), "frank").with_capability(ResourceType::Study, Operation::Update),
		];
		for user in &accounts {
			user_repo.create_user(user).await.unwrap();
		}

		let grants = GrantRepository::new(pool.clone());
		for grant in [
			ScopedGrant::User {
				scope: StudyKey::new(1),
				user: UserId::new(2),
				level: GrantLevel::Write,
			},
			ScopedGrant::Group {
				scope: StudyKey::new(2),
				group: GroupId::new(10),
				level: GrantLevel::Read,
			},
			ScopedGrant::Everyone {
				scope: StudyKey::new(3),
				level: GrantLevel::Read,
			},
			ScopedGrant::User {
				scope: StudyKey::new(4),
				user: UserId::new(2),
				level: GrantLevel::Read,
			},
		] {
			grants.add_grant(&grant).await.unwrap();
		}

		let users = Users {
			admin: user_repo.principal("admin").await.unwrap(),
			alice: user_repo.principal("alice").await.unwrap(),
			bob: user_repo.principal("bob").await.unwrap(),
			carol: user_repo.principal("carol").await.unwrap(),
			dave: user_repo.principal("dave").await.unwrap(),
			erin: user_repo.principal("erin").await.unwrap(),
			frank: user_repo.principal("frank").await.unwrap(),
		};

		World {
			store: SqliteRecordStore::new(pool.clone()),
			engine: Engine::new(options),
			pool,
			users,
		}
	}
}

/// What the caller should observe.
#[derive(Debug, Clone, PartialEq)]
pub enum Expected {
	/// A collection with exactly these keys, in order.
	Keys(Vec<i64>),
	/// A single record, from a detail lookup or a permitted mutation.
	Record(i64),
	/// Creation permitted, attached to this study if any.
	Creatable(Option<i64>),
	Status(StatusCode),
}

pub struct AccessCase {
	pub name: &'static str,
	pub user: Principal,
	/// The principal on the request is replaced by `user`.
	pub request: Request,
	pub expected: Expected,
}

/// Builds a request; the principal is filled in by [`run_access_cases`].
pub fn request(rt: ResourceType, op: Operation) -> Request {
	Request::new(Principal::Anonymous, rt, op)
}

pub fn filters(value: serde_json::Value) -> FilterSet {
	serde_json::from_value(value).unwrap()
}

pub async fn observe(world: &World, request: &Request) -> Expected {
	observe_with(&world.engine, &world.store, request).await
}

pub async fn observe_with(engine: &Engine, store: &SqliteRecordStore, request: &Request) -> Expected {
	match engine.execute(store, request).await {
		Ok(Outcome::Collection(page)) => {
			assert_eq!(page.count, page.results.len());
			assert!(page.next.is_none() && page.previous.is_none());
			Expected::Keys(page.results.iter().map(|r| r.key).collect())
		}
		Ok(Outcome::Detail(record)) | Ok(Outcome::Mutable(record)) => Expected::Record(record.key),
		Ok(Outcome::Creatable { scope }) => Expected::Creatable(scope.map(StudyKey::into_inner)),
		Err(err) => Expected::Status(err.status_code()),
	}
}

pub async fn run_access_cases(world: &World, cases: Vec<AccessCase>) {
	for case in cases {
		let mut request = case.request;
		request.principal = case.user;
		let observed = observe(world, &request).await;
		if observed != case.expected {
			panic!(
				"Case '{}': {} {} - expected {:?}, got {:?}",
				case.name, request.operation, request.resource_type, case.expected, observed
			);
		}
	}
}
