// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Principal and grant repositories.
//!
//! This module loads what the engine needs to know about a caller:
//! - Users with their superuser and elevated-role flags
//! - Class-level capabilities
//! - Group memberships
//! - Scoped grants on studies

use edd_server_authz::{
	Capability, GrantLevel, GroupId, Identifier, Operation, Principal, ResourceType,
	ScopedGrant, StudyKey, User, UserId,
};
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::DbError;

/// Repository for users, their capabilities and group memberships.
#[derive(Clone)]
pub struct UserRepository {
	pool: SqlitePool,
}

impl UserRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Create a user with their capabilities and memberships.
	///
	/// # Errors
	/// Returns `DbError::Sqlx` if the username is taken or a group does not exist.
	#[tracing::instrument(skip(self, user), fields(user_id = %user.id, username = %user.username))]
	pub async fn create_user(&self, user: &User) -> Result<(), DbError> {
		let mut tx = self.pool.begin().await?;

		sqlx::query(
			r#"
			INSERT INTO app_user (id, username, is_superuser, is_elevated)
			VALUES (?, ?, ?, ?)
			"#,
		)
		.bind(user.id.into_inner())
		.bind(&user.username)
		.bind(user.superuser)
		.bind(user.elevated_role)
		.execute(&mut *tx)
		.await?;

		for capability in &user.capabilities {
			sqlx::query(
				"INSERT INTO user_capability (user_id, resource_type, operation) VALUES (?, ?, ?)",
			)
			.bind(user.id.into_inner())
			.bind(capability.resource_type.as_str())
			.bind(capability.operation.as_str())
			.execute(&mut *tx)
			.await?;
		}

		for group in &user.groups {
			sqlx::query("INSERT INTO group_member (group_id, user_id) VALUES (?, ?)")
				.bind(group.into_inner())
				.bind(user.id.into_inner())
				.execute(&mut *tx)
				.await?;
		}

		tx.commit().await?;
		tracing::debug!(
			capabilities = user.capabilities.len(),
			groups = user.groups.len(),
			"user created"
		);
		Ok(())
	}

	#[tracing::instrument(skip(self))]
	pub async fn create_group(&self, id: GroupId, name: &str) -> Result<(), DbError> {
		sqlx::query("INSERT INTO user_group (id, name) VALUES (?, ?)")
			.bind(id.into_inner())
			.bind(name)
			.execute(&self.pool)
			.await?;
		Ok(())
	}

	/// Get a user by key, with capabilities and groups.
	#[tracing::instrument(skip(self), fields(user_id = %id))]
	pub async fn get_user(&self, id: UserId) -> Result<Option<User>, DbError> {
		let row = sqlx::query(
			"SELECT id, username, is_superuser, is_elevated FROM app_user WHERE id = ?",
		)
		.bind(id.into_inner())
		.fetch_optional(&self.pool)
		.await?;

		match row {
			Some(row) => Ok(Some(self.hydrate(&row).await?)),
			None => Ok(None),
		}
	}

	#[tracing::instrument(skip(self))]
	pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, DbError> {
		let row = sqlx::query(
			"SELECT id, username, is_superuser, is_elevated FROM app_user WHERE username = ?",
		)
		.bind(username)
		.fetch_optional(&self.pool)
		.await?;

		match row {
			Some(row) => Ok(Some(self.hydrate(&row).await?)),
			None => Ok(None),
		}
	}

	#[tracing::instrument(skip(self))]
	pub async fn list_users(&self) -> Result<Vec<User>, DbError> {
		let rows = sqlx::query(
			"SELECT id, username, is_superuser, is_elevated FROM app_user ORDER BY id",
		)
		.fetch_all(&self.pool)
		.await?;

		let mut users = Vec::with_capacity(rows.len());
		for row in &rows {
			users.push(self.hydrate(row).await?);
		}
		Ok(users)
	}

	/// Resolve a caller reference: `anonymous`, a user key, or a username.
	///
	/// # Errors
	/// Returns `DbError::NotFound` if no such user exists.
	#[tracing::instrument(skip(self))]
	pub async fn principal(&self, reference: &str) -> Result<Principal, DbError> {
		if reference.eq_ignore_ascii_case("anonymous") {
			return Ok(Principal::Anonymous);
		}

		let user = match reference.parse::<i64>() {
			Ok(key) => self.get_user(UserId::new(key)).await?,
			Err(_) => self.get_user_by_username(reference).await?,
		};
		user.map(Principal::from)
			.ok_or_else(|| DbError::NotFound(format!("user '{reference}'")))
	}

	async fn hydrate(&self, row: &sqlx::sqlite::SqliteRow) -> Result<User, DbError> {
		let id = UserId::new(row.try_get("id")?);
		let mut user = User::new(id, row.try_get::<String, _>("username")?);
		user.superuser = row.try_get("is_superuser")?;
		user.elevated_role = row.try_get("is_elevated")?;

		let capabilities = sqlx::query(
			"SELECT resource_type, operation FROM user_capability WHERE user_id = ?",
		)
		.bind(id.into_inner())
		.fetch_all(&self.pool)
		.await?;
		for row in &capabilities {
			user.capabilities.insert(row_to_capability(row)?);
		}

		let groups: Vec<i64> =
			sqlx::query_scalar("SELECT group_id FROM group_member WHERE user_id = ?")
				.bind(id.into_inner())
				.fetch_all(&self.pool)
				.await?;
		user.groups.extend(groups.into_iter().map(GroupId::new));

		Ok(user)
	}
}

fn row_to_capability(row: &sqlx::sqlite::SqliteRow) -> Result<Capability, DbError> {
	let resource_type: ResourceType = row
		.try_get::<String, _>("resource_type")?
		.parse()
		.map_err(DbError::Internal)?;
	let operation: Operation = row
		.try_get::<String, _>("operation")?
		.parse()
		.map_err(DbError::Internal)?;
	Ok(Capability::new(resource_type, operation))
}

/// Repository for scoped grants on studies.
#[derive(Clone)]
pub struct GrantRepository {
	pool: SqlitePool,
}

impl GrantRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Store a grant and return its row id.
	#[tracing::instrument(skip(self, grant), fields(study = %grant.scope(), level = %grant.level()))]
	pub async fn add_grant(&self, grant: &ScopedGrant) -> Result<i64, DbError> {
		let (grantee, grantee_id) = match *grant {
			ScopedGrant::User { user, .. } => ("user", Some(user.into_inner())),
			ScopedGrant::Group { group, .. } => ("group", Some(group.into_inner())),
			ScopedGrant::Everyone { .. } => ("everyone", None),
		};

		let result = sqlx::query(
			r#"
			INSERT INTO scope_grant (study_id, grantee, grantee_id, level)
			VALUES (?, ?, ?, ?)
			"#,
		)
		.bind(grant.scope().into_inner())
		.bind(grantee)
		.bind(grantee_id)
		.bind(grant.level().as_i64())
		.execute(&self.pool)
		.await?;

		tracing::debug!(grantee, "grant added");
		Ok(result.last_insert_rowid())
	}

	#[tracing::instrument(skip(self), fields(study = %study))]
	pub async fn grants_for_study(&self, study: StudyKey) -> Result<Vec<ScopedGrant>, DbError> {
		let rows = sqlx::query(
			"SELECT grantee, grantee_id, level FROM scope_grant WHERE study_id = ? ORDER BY id",
		)
		.bind(study.into_inner())
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(|row| row_to_grant(study, row)).collect()
	}

	/// Key of the study `identifier` names, whatever its active status.
	#[tracing::instrument(skip(self))]
	pub async fn find_study(&self, identifier: &Identifier) -> Result<Option<StudyKey>, DbError> {
		let query = match identifier {
			Identifier::Key(key) => sqlx::query_scalar("SELECT id FROM study WHERE id = ?").bind(*key),
			Identifier::Uuid(uuid) => {
				sqlx::query_scalar("SELECT id FROM study WHERE uuid = ?").bind(uuid.to_string())
			}
			Identifier::Slug(slug) => {
				sqlx::query_scalar("SELECT id FROM study WHERE slug = ?").bind(slug.clone())
			}
		};
		let key: Option<i64> = query.fetch_optional(&self.pool).await?;
		Ok(key.map(StudyKey::new))
	}
}

fn row_to_grant(study: StudyKey, row: &sqlx::sqlite::SqliteRow) -> Result<ScopedGrant, DbError> {
	let raw_level: i64 = row.try_get("level")?;
	let level = GrantLevel::from_i64(raw_level)
		.ok_or_else(|| DbError::Internal(format!("Invalid grant level {raw_level}")))?;
	let grantee_id: Option<i64> = row.try_get("grantee_id")?;
	let grantee: String = row.try_get("grantee")?;

	match (grantee.as_str(), grantee_id) {
		("user", Some(id)) => Ok(ScopedGrant::User {
			scope: study,
			user: UserId::new(id),
			level,
		}),
		("group", Some(id)) => Ok(ScopedGrant::Group {
			scope: study,
			group: GroupId::new(id),
			level,
		}),
		("everyone", None) => Ok(ScopedGrant::Everyone { scope: study, level }),
		(other, _) => Err(DbError::Internal(format!("Invalid grantee '{other}'"))),
	}
}
