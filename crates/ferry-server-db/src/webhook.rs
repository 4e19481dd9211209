// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Webhooks and their delivery tasks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePool, Row, SqliteConnection};
use uuid::Uuid;

use crate::error::DbError;
use crate::types::{flag, from_unix};

#[async_trait]
pub trait WebhookStore: Send + Sync {
	async fn create_webhook(&self, webhook: &WebhookRecord) -> Result<i64, DbError>;
	async fn update_webhook(&self, webhook: &WebhookRecord) -> Result<(), DbError>;
	async fn get_webhook_by_id(&self, id: i64) -> Result<Option<WebhookRecord>, DbError>;
	async fn get_webhook_of_repo_by_id(
		&self,
		repo_id: i64,
		id: i64,
	) -> Result<Option<WebhookRecord>, DbError>;
	async fn get_webhook_of_org_by_id(
		&self,
		org_id: i64,
		id: i64,
	) -> Result<Option<WebhookRecord>, DbError>;
	async fn list_webhooks_by_repo(&self, repo_id: i64) -> Result<Vec<WebhookRecord>, DbError>;
	async fn list_webhooks_by_org(&self, org_id: i64) -> Result<Vec<WebhookRecord>, DbError>;
	async fn list_active_webhooks_by_repo(
		&self,
		repo_id: i64,
	) -> Result<Vec<WebhookRecord>, DbError>;
	async fn list_active_webhooks_by_org(&self, org_id: i64)
		-> Result<Vec<WebhookRecord>, DbError>;
	/// Deletes the webhook and, by cascade, its delivery history.
	async fn delete_webhook(&self, id: i64) -> Result<(), DbError>;
	async fn update_webhook_last_status(&self, id: i64, status: &str) -> Result<(), DbError>;

	/// Insert all tasks in one transaction.
	async fn create_hook_tasks(&self, tasks: &[HookTaskRecord]) -> Result<(), DbError>;
	/// Mark an undelivered task as taken. Returns `false` when another
	/// worker already claimed it.
	async fn claim_hook_task(&self, id: i64) -> Result<bool, DbError>;
	async fn update_hook_task(&self, task: &HookTaskRecord) -> Result<(), DbError>;
	async fn get_hook_task_by_uuid(&self, uuid: Uuid) -> Result<Option<HookTaskRecord>, DbError>;
	async fn list_undelivered_hook_tasks(&self) -> Result<Vec<HookTaskRecord>, DbError>;
	async fn list_undelivered_hook_tasks_by_repo(
		&self,
		repo_id: i64,
	) -> Result<Vec<HookTaskRecord>, DbError>;
	/// Delivery history, newest first. `page` starts at 1.
	async fn list_hook_tasks_by_webhook(
		&self,
		hook_id: i64,
		page: u32,
		page_size: u32,
	) -> Result<Vec<HookTaskRecord>, DbError>;
}

#[derive(Clone)]
pub struct WebhookRepository {
	pool: SqlitePool,
}

impl WebhookRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	async fn fetch_webhooks(
		&self,
		filter: &str,
		id: i64,
	) -> Result<Vec<WebhookRecord>, DbError> {
		let rows = sqlx::query(&format!("SELECT {WEBHOOK_COLUMNS} FROM webhooks WHERE {filter} ORDER BY id"))
			.bind(id)
			.fetch_all(&self.pool)
			.await?;

		rows.iter().map(row_to_webhook).collect()
	}

	async fn fetch_hook_tasks(
		&self,
		filter: &str,
		repo_id: Option<i64>,
	) -> Result<Vec<HookTaskRecord>, DbError> {
		let sql = format!("SELECT {HOOK_TASK_COLUMNS} FROM hook_tasks WHERE {filter} ORDER BY id");
		let mut query = sqlx::query(&sql);
		if let Some(repo_id) = repo_id {
			query = query.bind(repo_id);
		}
		let rows = query.fetch_all(&self.pool).await?;

		rows.iter().map(row_to_hook_task).collect()
	}
}

const WEBHOOK_COLUMNS: &str = r#"
	id, repo_id, org_id, url, content_type, secret, events, skip_tls_verify, is_active,
	hook_task_type, meta, last_status, created_unix, updated_unix
"#;

const HOOK_TASK_COLUMNS: &str = r#"
	id, repo_id, hook_id, uuid, task_type, url, signature, payload_content, content_type,
	event_type, skip_tls_verify, is_delivered, delivered, is_succeed, request_content,
	response_content
"#;

#[async_trait]
impl WebhookStore for WebhookRepository {
	#[tracing::instrument(skip(self, webhook), fields(repo_id = ?webhook.repo_id, org_id = ?webhook.org_id))]
	async fn create_webhook(&self, webhook: &WebhookRecord) -> Result<i64, DbError> {
		let result = sqlx::query(
			r#"
			INSERT INTO webhooks (
				repo_id, org_id, url, content_type, secret, events, skip_tls_verify, is_active,
				hook_task_type, meta, last_status, created_unix, updated_unix
			)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(webhook.repo_id)
		.bind(webhook.org_id)
		.bind(&webhook.url)
		.bind(&webhook.content_type)
		.bind(&webhook.secret)
		.bind(&webhook.events)
		.bind(webhook.skip_tls_verify as i64)
		.bind(webhook.is_active as i64)
		.bind(&webhook.hook_task_type)
		.bind(&webhook.meta)
		.bind(&webhook.last_status)
		.bind(webhook.created_at.timestamp())
		.bind(webhook.updated_at.timestamp())
		.execute(&self.pool)
		.await?;

		Ok(result.last_insert_rowid())
	}

	#[tracing::instrument(skip(self, webhook), fields(webhook_id = webhook.id))]
	async fn update_webhook(&self, webhook: &WebhookRecord) -> Result<(), DbError> {
		let result = sqlx::query(
			r#"
			UPDATE webhooks
			SET url = ?, content_type = ?, secret = ?, events = ?, skip_tls_verify = ?,
				is_active = ?, hook_task_type = ?, meta = ?, last_status = ?, updated_unix = ?
			WHERE id = ?
			"#,
		)
		.bind(&webhook.url)
		.bind(&webhook.content_type)
		.bind(&webhook.secret)
		.bind(&webhook.events)
		.bind(webhook.skip_tls_verify as i64)
		.bind(webhook.is_active as i64)
		.bind(&webhook.hook_task_type)
		.bind(&webhook.meta)
		.bind(&webhook.last_status)
		.bind(webhook.updated_at.timestamp())
		.bind(webhook.id)
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("webhook {}", webhook.id)));
		}
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(webhook_id = id))]
	async fn get_webhook_by_id(&self, id: i64) -> Result<Option<WebhookRecord>, DbError> {
		Ok(self.fetch_webhooks("id = ?", id).await?.into_iter().next())
	}

	#[tracing::instrument(skip(self), fields(webhook_id = id))]
	async fn get_webhook_of_repo_by_id(
		&self,
		repo_id: i64,
		id: i64,
	) -> Result<Option<WebhookRecord>, DbError> {
		Ok(self
			.get_webhook_by_id(id)
			.await?
			.filter(|w| w.repo_id == Some(repo_id)))
	}

	#[tracing::instrument(skip(self), fields(webhook_id = id))]
	async fn get_webhook_of_org_by_id(
		&self,
		org_id: i64,
		id: i64,
	) -> Result<Option<WebhookRecord>, DbError> {
		Ok(self
			.get_webhook_by_id(id)
			.await?
			.filter(|w| w.org_id == Some(org_id)))
	}

	#[tracing::instrument(skip(self))]
	async fn list_webhooks_by_repo(&self, repo_id: i64) -> Result<Vec<WebhookRecord>, DbError> {
		self.fetch_webhooks("repo_id = ?", repo_id).await
	}

	#[tracing::instrument(skip(self))]
	async fn list_webhooks_by_org(&self, org_id: i64) -> Result<Vec<WebhookRecord>, DbError> {
		self.fetch_webhooks("org_id = ?", org_id).await
	}

	#[tracing::instrument(skip(self))]
	async fn list_active_webhooks_by_repo(
		&self,
		repo_id: i64,
	) -> Result<Vec<WebhookRecord>, DbError> {
		self.fetch_webhooks("repo_id = ? AND is_active = 1", repo_id).await
	}

	#[tracing::instrument(skip(self))]
	async fn list_active_webhooks_by_org(
		&self,
		org_id: i64,
	) -> Result<Vec<WebhookRecord>, DbError> {
		self.fetch_webhooks("org_id = ? AND is_active = 1", org_id).await
	}

	#[tracing::instrument(skip(self), fields(webhook_id = id))]
	async fn delete_webhook(&self, id: i64) -> Result<(), DbError> {
		let result = sqlx::query("DELETE FROM webhooks WHERE id = ?")
			.bind(id)
			.execute(&self.pool)
			.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("webhook {id}")));
		}
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(webhook_id = id))]
	async fn update_webhook_last_status(&self, id: i64, status: &str) -> Result<(), DbError> {
		sqlx::query("UPDATE webhooks SET last_status = ? WHERE id = ?")
			.bind(status)
			.bind(id)
			.execute(&self.pool)
			.await?;
		Ok(())
	}

	#[tracing::instrument(skip(self, tasks), fields(count = tasks.len()))]
	async fn create_hook_tasks(&self, tasks: &[HookTaskRecord]) -> Result<(), DbError> {
		let mut tx = self.pool.begin().await?;
		for task in tasks {
			insert_hook_task(&mut tx, task).await?;
		}
		tx.commit().await?;
		Ok(())
	}

	#[tracing::instrument(skip(self))]
	async fn claim_hook_task(&self, id: i64) -> Result<bool, DbError> {
		let result = sqlx::query("UPDATE hook_tasks SET is_delivered = 1 WHERE id = ? AND is_delivered = 0")
			.bind(id)
			.execute(&self.pool)
			.await?;
		Ok(result.rows_affected() == 1)
	}

	#[tracing::instrument(skip(self, task), fields(task_id = task.id, uuid = %task.uuid))]
	async fn update_hook_task(&self, task: &HookTaskRecord) -> Result<(), DbError> {
		let result = sqlx::query(
			r#"
			UPDATE hook_tasks
			SET is_delivered = ?, delivered = ?, is_succeed = ?, request_content = ?,
				response_content = ?
			WHERE id = ?
			"#,
		)
		.bind(task.is_delivered as i64)
		.bind(task.delivered)
		.bind(task.is_succeed as i64)
		.bind(&task.request_content)
		.bind(&task.response_content)
		.bind(task.id)
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("hook task {}", task.id)));
		}
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(uuid = %uuid))]
	async fn get_hook_task_by_uuid(&self, uuid: Uuid) -> Result<Option<HookTaskRecord>, DbError> {
		let row = sqlx::query(&format!(
			"SELECT {HOOK_TASK_COLUMNS} FROM hook_tasks WHERE uuid = ?"
		))
		.bind(uuid.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_hook_task(&r)).transpose()
	}

	#[tracing::instrument(skip(self))]
	async fn list_undelivered_hook_tasks(&self) -> Result<Vec<HookTaskRecord>, DbError> {
		self.fetch_hook_tasks("is_delivered = 0", None).await
	}

	#[tracing::instrument(skip(self))]
	async fn list_undelivered_hook_tasks_by_repo(
		&self,
		repo_id: i64,
	) -> Result<Vec<HookTaskRecord>, DbError> {
		self
			.fetch_hook_tasks("repo_id = ? AND is_delivered = 0", Some(repo_id))
			.await
	}

	#[tracing::instrument(skip(self))]
	async fn list_hook_tasks_by_webhook(
		&self,
		hook_id: i64,
		page: u32,
		page_size: u32,
	) -> Result<Vec<HookTaskRecord>, DbError> {
		let offset = page.saturating_sub(1) as i64 * page_size as i64;
		let rows = sqlx::query(&format!(
			r#"
			SELECT {HOOK_TASK_COLUMNS}
			FROM hook_tasks
			WHERE hook_id = ?
			ORDER BY id DESC
			LIMIT ? OFFSET ?
			"#
		))
		.bind(hook_id)
		.bind(page_size as i64)
		.bind(offset)
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_hook_task).collect()
	}
}

pub(crate) async fn insert_hook_task(
	conn: &mut SqliteConnection,
	task: &HookTaskRecord,
) -> Result<(), DbError> {
	sqlx::query(
		r#"
		INSERT INTO hook_tasks (
			repo_id, hook_id, uuid, task_type, url, signature, payload_content, content_type,
			event_type, skip_tls_verify, is_delivered, delivered, is_succeed, request_content,
			response_content
		)
		VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
		"#,
	)
	.bind(task.repo_id)
	.bind(task.hook_id)
	.bind(task.uuid.to_string())
	.bind(&task.task_type)
	.bind(&task.url)
	.bind(&task.signature)
	.bind(&task.payload_content)
	.bind(&task.content_type)
	.bind(&task.event_type)
	.bind(task.skip_tls_verify as i64)
	.bind(task.is_delivered as i64)
	.bind(task.delivered)
	.bind(task.is_succeed as i64)
	.bind(&task.request_content)
	.bind(&task.response_content)
	.execute(&mut *conn)
	.await?;
	Ok(())
}

#[derive(Clone, PartialEq, Eq)]
pub struct WebhookRecord {
	pub id: i64,
	/// Exactly one of `repo_id` and `org_id` is set.
	pub repo_id: Option<i64>,
	pub org_id: Option<i64>,
	pub url: String,
	pub content_type: String,
	pub secret: String,
	/// Serialized event selection.
	pub events: String,
	pub skip_tls_verify: bool,
	pub is_active: bool,
	pub hook_task_type: String,
	pub meta: String,
	pub last_status: String,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for WebhookRecord {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("WebhookRecord")
			.field("id", &self.id)
			.field("repo_id", &self.repo_id)
			.field("org_id", &self.org_id)
			.field("url", &self.url)
			.field("content_type", &self.content_type)
			.field("secret", &"[REDACTED]")
			.field("events", &self.events)
			.field("skip_tls_verify", &self.skip_tls_verify)
			.field("is_active", &self.is_active)
			.field("hook_task_type", &self.hook_task_type)
			.field("last_status", &self.last_status)
			.finish()
	}
}

#[derive(Clone, PartialEq, Eq)]
pub struct HookTaskRecord {
	pub id: i64,
	pub repo_id: i64,
	pub hook_id: i64,
	pub uuid: Uuid,
	pub task_type: String,
	pub url: String,
	pub signature: String,
	pub payload_content: String,
	pub content_type: String,
	pub event_type: String,
	pub skip_tls_verify: bool,
	pub is_delivered: bool,
	/// Unix nanoseconds; zero until delivered.
	pub delivered: i64,
	pub is_succeed: bool,
	pub request_content: String,
	pub response_content: String,
}

impl std::fmt::Debug for HookTaskRecord {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HookTaskRecord")
			.field("id", &self.id)
			.field("repo_id", &self.repo_id)
			.field("hook_id", &self.hook_id)
			.field("uuid", &self.uuid)
			.field("task_type", &self.task_type)
			.field("url", &self.url)
			.field("signature", &"[REDACTED]")
			.field("content_type", &self.content_type)
			.field("event_type", &self.event_type)
			.field("is_delivered", &self.is_delivered)
			.field("delivered", &self.delivered)
			.field("is_succeed", &self.is_succeed)
			.finish()
	}
}

fn row_to_webhook(row: &sqlx::sqlite::SqliteRow) -> Result<WebhookRecord, DbError> {
	Ok(WebhookRecord {
		id: row.get("id"),
		repo_id: row.get("repo_id"),
		org_id: row.get("org_id"),
		url: row.get("url"),
		content_type: row.get("content_type"),
		secret: row.get("secret"),
		events: row.get("events"),
		skip_tls_verify: flag(row.get("skip_tls_verify")),
		is_active: flag(row.get("is_active")),
		hook_task_type: row.get("hook_task_type"),
		meta: row.get("meta"),
		last_status: row.get("last_status"),
		created_at: from_unix(row.get("created_unix"))?,
		updated_at: from_unix(row.get("updated_unix"))?,
	})
}

fn row_to_hook_task(row: &sqlx::sqlite::SqliteRow) -> Result<HookTaskRecord, DbError> {
	let uuid_str: String = row.get("uuid");

	Ok(HookTaskRecord {
		id: row.get("id"),
		repo_id: row.get("repo_id"),
		hook_id: row.get("hook_id"),
		uuid: Uuid::parse_str(&uuid_str).map_err(|e| DbError::Internal(e.to_string()))?,
		task_type: row.get("task_type"),
		url: row.get("url"),
		signature: row.get("signature"),
		payload_content: row.get("payload_content"),
		content_type: row.get("content_type"),
		event_type: row.get("event_type"),
		skip_tls_verify: flag(row.get("skip_tls_verify")),
		is_delivered: flag(row.get("is_delivered")),
		delivered: row.get("delivered"),
		is_succeed: flag(row.get("is_succeed")),
		request_content: row.get("request_content"),
		response_content: row.get("response_content"),
	})
}
