// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Fixtures shared by the store tests and by downstream crates.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use uuid::Uuid;

use crate::pool::run_migrations;
use crate::webhook::HookTaskRecord;

/// In-memory database with the full schema. A single connection keeps every
/// query on the same memory database.
pub async fn create_test_pool() -> SqlitePool {
	let options = SqliteConnectOptions::from_str("sqlite::memory:")
		.unwrap()
		.foreign_keys(true);
	let pool = SqlitePoolOptions::new()
		.max_connections(1)
		.idle_timeout(None)
		.max_lifetime(None)
		.connect_with(options)
		.await
		.unwrap();
	run_migrations(&pool).await.unwrap();
	pool
}

pub async fn seed_user(pool: &SqlitePool, name: &str, is_organization: bool) -> i64 {
	sqlx::query(
		r#"
		INSERT INTO users (name, full_name, email, avatar_url, is_organization)
		VALUES (?, ?, ?, ?, ?)
		"#,
	)
	.bind(name)
	.bind(name)
	.bind(format!("{name}@example.com"))
	.bind(format!("https://avatars.example.com/{name}"))
	.bind(is_organization as i64)
	.execute(pool)
	.await
	.unwrap()
	.last_insert_rowid()
}

/// A public mirror repository with a wiki, created at unix time 1000.
pub async fn seed_repository(pool: &SqlitePool, owner_id: i64, name: &str) -> i64 {
	sqlx::query(
		r#"
		INSERT INTO repositories (
			owner_id, name, description, default_branch, is_private, is_unlisted, is_mirror,
			has_wiki, size, created_unix, updated_unix
		)
		VALUES (?, ?, '', 'master', 0, 0, 1, 1, 0, 1000, 1000)
		"#,
	)
	.bind(owner_id)
	.bind(name)
	.execute(pool)
	.await
	.unwrap()
	.last_insert_rowid()
}

/// An active JSON webhook subscribed to every event.
pub async fn seed_webhook(
	pool: &SqlitePool,
	repo_id: Option<i64>,
	org_id: Option<i64>,
	url: &str,
) -> i64 {
	sqlx::query(
		r#"
		INSERT INTO webhooks (
			repo_id, org_id, url, content_type, secret, events, skip_tls_verify, is_active,
			hook_task_type, meta, last_status, created_unix, updated_unix
		)
		VALUES (?, ?, ?, 'json', '', ?, 0, 1, 'gogs', '', 'none', 1000, 1000)
		"#,
	)
	.bind(repo_id)
	.bind(org_id)
	.bind(url)
	.bind(r#"{"push_only":false,"send_everything":true,"choose_events":false,"events":{}}"#)
	.execute(pool)
	.await
	.unwrap()
	.last_insert_rowid()
}

/// An undelivered push task with a fresh UUID.
pub fn sample_hook_task(repo_id: i64, hook_id: i64) -> HookTaskRecord {
	HookTaskRecord {
		id: 0,
		repo_id,
		hook_id,
		uuid: Uuid::new_v4(),
		task_type: "gogs".to_string(),
		url: "https://hooks.example.com/a".to_string(),
		signature: String::new(),
		payload_content: r#"{"ref":"refs/heads/master"}"#.to_string(),
		content_type: "json".to_string(),
		event_type: "push".to_string(),
		skip_tls_verify: false,
		is_delivered: false,
		delivered: 0,
		is_succeed: false,
		request_content: String::new(),
		response_content: String::new(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_seeded_rows_are_linked() {
		let pool = create_test_pool().await;
		let owner = seed_user(&pool, "alice", false).await;
		let repo_id = seed_repository(&pool, owner, "widgets").await;
		let hook_id = seed_webhook(&pool, Some(repo_id), None, "https://a.example.com").await;

		let (linked,): (i64,) = sqlx::query_as(
			"SELECT COUNT(*) FROM webhooks w JOIN repositories r ON r.id = w.repo_id WHERE w.id = ?",
		)
		.bind(hook_id)
		.fetch_one(&pool)
		.await
		.unwrap();
		assert_eq!(linked, 1);
	}

	#[test]
	fn test_sample_tasks_have_distinct_uuids() {
		assert_ne!(sample_hook_task(1, 1).uuid, sample_hook_task(1, 1).uuid);
	}
}
