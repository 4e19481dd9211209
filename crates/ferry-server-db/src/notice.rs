// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Administrator-visible system notices.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::DbError;
use crate::types::from_unix;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i64)]
pub enum NoticeType {
	Repository = 1,
}

impl TryFrom<i64> for NoticeType {
	type Error = DbError;

	fn try_from(value: i64) -> Result<Self, Self::Error> {
		match value {
			1 => Ok(NoticeType::Repository),
			other => Err(DbError::Internal(format!("unknown notice type {other}"))),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeRecord {
	pub id: i64,
	pub kind: NoticeType,
	pub description: String,
	pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait NoticeStore: Send + Sync {
	async fn create_notice(&self, kind: NoticeType, description: &str) -> Result<i64, DbError>;
	/// Newest first.
	async fn list_notices(&self, limit: u32) -> Result<Vec<NoticeRecord>, DbError>;
}

#[derive(Clone)]
pub struct NoticeRepository {
	pool: SqlitePool,
}

impl NoticeRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}
}

#[async_trait]
impl NoticeStore for NoticeRepository {
	#[tracing::instrument(skip(self, description))]
	async fn create_notice(&self, kind: NoticeType, description: &str) -> Result<i64, DbError> {
		let result = sqlx::query(
			"INSERT INTO notices (kind, description, created_unix) VALUES (?, ?, ?)",
		)
		.bind(kind as i64)
		.bind(description)
		.bind(Utc::now().timestamp())
		.execute(&self.pool)
		.await?;

		Ok(result.last_insert_rowid())
	}

	#[tracing::instrument(skip(self))]
	async fn list_notices(&self, limit: u32) -> Result<Vec<NoticeRecord>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT id, kind, description, created_unix
			FROM notices
			ORDER BY id DESC
			LIMIT ?
			"#,
		)
		.bind(limit as i64)
		.fetch_all(&self.pool)
		.await?;

		rows
			.iter()
			.map(|row| {
				Ok(NoticeRecord {
					id: row.get("id"),
					kind: NoticeType::try_from(row.get::<i64, _>("kind"))?,
					description: row.get("description"),
					created_at: from_unix(row.get("created_unix"))?,
				})
			})
			.collect()
	}
}
