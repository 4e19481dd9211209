// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Users, repositories and watches.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::DbError;
use crate::types::{flag, from_unix};

#[async_trait]
pub trait RepoStore: Send + Sync {
	async fn create_user(&self, user: &UserRecord) -> Result<i64, DbError>;
	async fn get_user_by_id(&self, id: i64) -> Result<Option<UserRecord>, DbError>;

	async fn create_repository(&self, repo: &RepositoryRecord) -> Result<i64, DbError>;
	async fn get_repository_by_id(&self, id: i64) -> Result<Option<RepositoryRecord>, DbError>;
	async fn update_repository_size(&self, id: i64, size: i64) -> Result<(), DbError>;
	/// Move `updated_at` forward to `updated_at`; never backwards.
	///
	/// Returns whether the row changed.
	async fn advance_repository_updated_at(
		&self,
		id: i64,
		updated_at: DateTime<Utc>,
	) -> Result<bool, DbError>;
	async fn delete_repository(&self, id: i64) -> Result<(), DbError>;

	async fn watch_repo(&self, user_id: i64, repo_id: i64) -> Result<(), DbError>;
	async fn list_watcher_ids(&self, repo_id: i64) -> Result<Vec<i64>, DbError>;
}

#[derive(Clone)]
pub struct RepoRepository {
	pool: SqlitePool,
}

impl RepoRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}
}

const REPOSITORY_COLUMNS: &str = r#"
	r.id, r.owner_id, u.name AS owner_name, r.name, r.description, r.default_branch,
	r.is_private, r.is_unlisted, r.is_mirror, r.has_wiki, r.size, r.created_unix, r.updated_unix
"#;

#[async_trait]
impl RepoStore for RepoRepository {
	#[tracing::instrument(skip(self, user), fields(user_name = %user.name))]
	async fn create_user(&self, user: &UserRecord) -> Result<i64, DbError> {
		let result = sqlx::query(
			r#"
			INSERT INTO users (name, full_name, email, avatar_url, is_organization)
			VALUES (?, ?, ?, ?, ?)
			"#,
		)
		.bind(&user.name)
		.bind(&user.full_name)
		.bind(&user.email)
		.bind(&user.avatar_url)
		.bind(user.is_organization as i64)
		.execute(&self.pool)
		.await?;

		Ok(result.last_insert_rowid())
	}

	#[tracing::instrument(skip(self), fields(user_id = id))]
	async fn get_user_by_id(&self, id: i64) -> Result<Option<UserRecord>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, name, full_name, email, avatar_url, is_organization
			FROM users
			WHERE id = ?
			"#,
		)
		.bind(id)
		.fetch_optional(&self.pool)
		.await?;

		Ok(row.map(|r| row_to_user(&r)))
	}

	#[tracing::instrument(skip(self, repo), fields(owner_id = repo.owner_id, name = %repo.name))]
	async fn create_repository(&self, repo: &RepositoryRecord) -> Result<i64, DbError> {
		let result = sqlx::query(
			r#"
			INSERT INTO repositories (
				owner_id, name, description, default_branch, is_private, is_unlisted,
				is_mirror, has_wiki, size, created_unix, updated_unix
			)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(repo.owner_id)
		.bind(&repo.name)
		.bind(&repo.description)
		.bind(&repo.default_branch)
		.bind(repo.is_private as i64)
		.bind(repo.is_unlisted as i64)
		.bind(repo.is_mirror as i64)
		.bind(repo.has_wiki as i64)
		.bind(repo.size)
		.bind(repo.created_at.timestamp())
		.bind(repo.updated_at.timestamp())
		.execute(&self.pool)
		.await?;

		Ok(result.last_insert_rowid())
	}

	#[tracing::instrument(skip(self), fields(repo_id = id))]
	async fn get_repository_by_id(&self, id: i64) -> Result<Option<RepositoryRecord>, DbError> {
		let row = sqlx::query(&format!(
			r#"
			SELECT {REPOSITORY_COLUMNS}
			FROM repositories r
			JOIN users u ON u.id = r.owner_id
			WHERE r.id = ?
			"#
		))
		.bind(id)
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_repository(&r)).transpose()
	}

	#[tracing::instrument(skip(self), fields(repo_id = id))]
	async fn update_repository_size(&self, id: i64, size: i64) -> Result<(), DbError> {
		sqlx::query("UPDATE repositories SET size = ? WHERE id = ?")
			.bind(size)
			.bind(id)
			.execute(&self.pool)
			.await?;
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(repo_id = id))]
	async fn advance_repository_updated_at(
		&self,
		id: i64,
		updated_at: DateTime<Utc>,
	) -> Result<bool, DbError> {
		let result = sqlx::query(
			r#"
			UPDATE repositories
			SET updated_unix = ?
			WHERE id = ? AND updated_unix < ?
			"#,
		)
		.bind(updated_at.timestamp())
		.bind(id)
		.bind(updated_at.timestamp())
		.execute(&self.pool)
		.await?;

		Ok(result.rows_affected() > 0)
	}

	#[tracing::instrument(skip(self), fields(repo_id = id))]
	async fn delete_repository(&self, id: i64) -> Result<(), DbError> {
		let result = sqlx::query("DELETE FROM repositories WHERE id = ?")
			.bind(id)
			.execute(&self.pool)
			.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("repository {id}")));
		}
		Ok(())
	}

	#[tracing::instrument(skip(self))]
	async fn watch_repo(&self, user_id: i64, repo_id: i64) -> Result<(), DbError> {
		sqlx::query("INSERT OR IGNORE INTO watches (user_id, repo_id) VALUES (?, ?)")
			.bind(user_id)
			.bind(repo_id)
			.execute(&self.pool)
			.await?;
		Ok(())
	}

	#[tracing::instrument(skip(self))]
	async fn list_watcher_ids(&self, repo_id: i64) -> Result<Vec<i64>, DbError> {
		let rows = sqlx::query("SELECT user_id FROM watches WHERE repo_id = ? ORDER BY user_id")
			.bind(repo_id)
			.fetch_all(&self.pool)
			.await?;

		Ok(rows.iter().map(|r| r.get("user_id")).collect())
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
	pub id: i64,
	pub name: String,
	pub full_name: String,
	pub email: String,
	pub avatar_url: String,
	pub is_organization: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRecord {
	pub id: i64,
	pub owner_id: i64,
	/// Filled from the owner row on reads; ignored on insert.
	pub owner_name: String,
	pub name: String,
	pub description: String,
	pub default_branch: String,
	pub is_private: bool,
	pub is_unlisted: bool,
	pub is_mirror: bool,
	pub has_wiki: bool,
	pub size: i64,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl RepositoryRecord {
	pub fn full_name(&self) -> String {
		format!("{}/{}", self.owner_name, self.name)
	}
}

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> UserRecord {
	UserRecord {
		id: row.get("id"),
		name: row.get("name"),
		full_name: row.get("full_name"),
		email: row.get("email"),
		avatar_url: row.get("avatar_url"),
		is_organization: flag(row.get("is_organization")),
	}
}

fn row_to_repository(row: &sqlx::sqlite::SqliteRow) -> Result<RepositoryRecord, DbError> {
	Ok(RepositoryRecord {
		id: row.get("id"),
		owner_id: row.get("owner_id"),
		owner_name: row.get("owner_name"),
		name: row.get("name"),
		description: row.get("description"),
		default_branch: row.get("default_branch"),
		is_private: flag(row.get("is_private")),
		is_unlisted: flag(row.get("is_unlisted")),
		is_mirror: flag(row.get("is_mirror")),
		has_wiki: flag(row.get("has_wiki")),
		size: row.get("size"),
		created_at: from_unix(row.get("created_unix"))?,
		updated_at: from_unix(row.get("updated_unix"))?,
	})
}
