// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Pull mirror schedule rows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::DbError;
use crate::types::{flag, from_unix};

#[async_trait]
pub trait MirrorStore: Send + Sync {
	async fn create_mirror(&self, mirror: &MirrorRecord) -> Result<i64, DbError>;
	async fn get_mirror_by_repo_id(&self, repo_id: i64) -> Result<Option<MirrorRecord>, DbError>;
	/// Mirrors whose next sync is at or before `now`, oldest schedule first.
	async fn list_mirrors_due(&self, now: DateTime<Utc>) -> Result<Vec<MirrorRecord>, DbError>;
	async fn update_mirror(&self, mirror: &MirrorRecord) -> Result<(), DbError>;
	async fn delete_mirror_by_repo_id(&self, repo_id: i64) -> Result<(), DbError>;
}

#[derive(Clone)]
pub struct MirrorRepository {
	pool: SqlitePool,
}

impl MirrorRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}
}

#[async_trait]
impl MirrorStore for MirrorRepository {
	#[tracing::instrument(skip(self, mirror), fields(repo_id = mirror.repo_id))]
	async fn create_mirror(&self, mirror: &MirrorRecord) -> Result<i64, DbError> {
		let result = sqlx::query(
			r#"
			INSERT INTO mirrors (repo_id, interval_hours, enable_prune, last_sync_unix, next_sync_unix)
			VALUES (?, ?, ?, ?, ?)
			"#,
		)
		.bind(mirror.repo_id)
		.bind(mirror.interval_hours)
		.bind(mirror.enable_prune as i64)
		.bind(mirror.last_sync.timestamp())
		.bind(mirror.next_sync.timestamp())
		.execute(&self.pool)
		.await
		.map_err(|e| match e {
			sqlx::Error::Database(ref db) if db.is_unique_violation() => {
				DbError::Conflict(format!("mirror for repository {}", mirror.repo_id))
			}
			other => DbError::Sqlx(other),
		})?;

		Ok(result.last_insert_rowid())
	}

	#[tracing::instrument(skip(self))]
	async fn get_mirror_by_repo_id(&self, repo_id: i64) -> Result<Option<MirrorRecord>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, repo_id, interval_hours, enable_prune, last_sync_unix, next_sync_unix
			FROM mirrors
			WHERE repo_id = ?
			"#,
		)
		.bind(repo_id)
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_mirror(&r)).transpose()
	}

	#[tracing::instrument(skip(self))]
	async fn list_mirrors_due(&self, now: DateTime<Utc>) -> Result<Vec<MirrorRecord>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT id, repo_id, interval_hours, enable_prune, last_sync_unix, next_sync_unix
			FROM mirrors
			WHERE next_sync_unix <= ?
			ORDER BY next_sync_unix, id
			"#,
		)
		.bind(now.timestamp())
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_mirror).collect()
	}

	#[tracing::instrument(skip(self, mirror), fields(repo_id = mirror.repo_id))]
	async fn update_mirror(&self, mirror: &MirrorRecord) -> Result<(), DbError> {
		let result = sqlx::query(
			r#"
			UPDATE mirrors
			SET interval_hours = ?, enable_prune = ?, last_sync_unix = ?, next_sync_unix = ?
			WHERE id = ?
			"#,
		)
		.bind(mirror.interval_hours)
		.bind(mirror.enable_prune as i64)
		.bind(mirror.last_sync.timestamp())
		.bind(mirror.next_sync.timestamp())
		.bind(mirror.id)
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("mirror {}", mirror.id)));
		}
		Ok(())
	}

	#[tracing::instrument(skip(self))]
	async fn delete_mirror_by_repo_id(&self, repo_id: i64) -> Result<(), DbError> {
		sqlx::query("DELETE FROM mirrors WHERE repo_id = ?")
			.bind(repo_id)
			.execute(&self.pool)
			.await?;
		Ok(())
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorRecord {
	pub id: i64,
	pub repo_id: i64,
	pub interval_hours: i64,
	pub enable_prune: bool,
	pub last_sync: DateTime<Utc>,
	pub next_sync: DateTime<Utc>,
}

impl MirrorRecord {
	/// A mirror that is due immediately.
	pub fn new(repo_id: i64, interval_hours: i64, now: DateTime<Utc>) -> Self {
		Self {
			id: 0,
			repo_id,
			interval_hours,
			enable_prune: true,
			last_sync: now,
			next_sync: now,
		}
	}

	/// Record a completed sync that started at `now`.
	pub fn schedule_next_sync(&mut self, now: DateTime<Utc>) {
		self.last_sync = now;
		self.next_sync = now + chrono::Duration::hours(self.interval_hours);
	}
}

fn row_to_mirror(row: &sqlx::sqlite::SqliteRow) -> Result<MirrorRecord, DbError> {
	Ok(MirrorRecord {
		id: row.get("id"),
		repo_id: row.get("repo_id"),
		interval_hours: row.get("interval_hours"),
		enable_prune: flag(row.get("enable_prune")),
		last_sync: from_unix(row.get("last_sync_unix"))?,
		next_sync: from_unix(row.get("next_sync_unix"))?,
	})
}
