// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Newsfeed actions.
//!
//! One row is written per receiver: the actor plus every watcher of the
//! repository. Rows are append-only.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePool, Row, SqliteConnection};

use crate::error::DbError;
use crate::types::{flag, from_unix};
use crate::webhook::{insert_hook_task, HookTaskRecord};

/// Persisted as an integer. Values are never renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i64)]
pub enum ActionType {
	CreateRepo = 1,
	RenameRepo = 2,
	StarRepo = 3,
	WatchRepo = 4,
	CommitRepo = 5,
	CreateIssue = 6,
	CreatePullRequest = 7,
	TransferRepo = 8,
	PushTag = 9,
	CommentIssue = 10,
	MergePullRequest = 11,
	CloseIssue = 12,
	ReopenIssue = 13,
	ClosePullRequest = 14,
	ReopenPullRequest = 15,
	CreateBranch = 16,
	DeleteBranch = 17,
	DeleteTag = 18,
	ForkRepo = 19,
	MirrorSyncPush = 20,
	MirrorSyncCreate = 21,
	MirrorSyncDelete = 22,
}

impl ActionType {
	pub fn as_i64(self) -> i64 {
		self as i64
	}
}

impl TryFrom<i64> for ActionType {
	type Error = DbError;

	fn try_from(value: i64) -> Result<Self, Self::Error> {
		use ActionType::*;
		Ok(match value {
			1 => CreateRepo,
			2 => RenameRepo,
			3 => StarRepo,
			4 => WatchRepo,
			5 => CommitRepo,
			6 => CreateIssue,
			7 => CreatePullRequest,
			8 => TransferRepo,
			9 => PushTag,
			10 => CommentIssue,
			11 => MergePullRequest,
			12 => CloseIssue,
			13 => ReopenIssue,
			14 => ClosePullRequest,
			15 => ReopenPullRequest,
			16 => CreateBranch,
			17 => DeleteBranch,
			18 => DeleteTag,
			19 => ForkRepo,
			20 => MirrorSyncPush,
			21 => MirrorSyncCreate,
			22 => MirrorSyncDelete,
			other => return Err(DbError::Internal(format!("unknown action type {other}"))),
		})
	}
}

#[async_trait]
pub trait ActionStore: Send + Sync {
	async fn create_actions(&self, actions: &[ActionRecord]) -> Result<(), DbError>;
	/// Write actions and the webhook tasks they trigger atomically.
	async fn create_actions_with_hook_tasks(
		&self,
		actions: &[ActionRecord],
		tasks: &[HookTaskRecord],
	) -> Result<(), DbError>;
	async fn list_actions_by_receiver(
		&self,
		user_id: i64,
		limit: u32,
	) -> Result<Vec<ActionRecord>, DbError>;
}

#[derive(Clone)]
pub struct ActionRepository {
	pool: SqlitePool,
}

impl ActionRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}
}

#[async_trait]
impl ActionStore for ActionRepository {
	#[tracing::instrument(skip(self, actions), fields(count = actions.len()))]
	async fn create_actions(&self, actions: &[ActionRecord]) -> Result<(), DbError> {
		let mut tx = self.pool.begin().await?;
		for action in actions {
			insert_action(&mut tx, action).await?;
		}
		tx.commit().await?;
		Ok(())
	}

	#[tracing::instrument(skip(self, actions, tasks), fields(actions = actions.len(), tasks = tasks.len()))]
	async fn create_actions_with_hook_tasks(
		&self,
		actions: &[ActionRecord],
		tasks: &[HookTaskRecord],
	) -> Result<(), DbError> {
		let mut tx = self.pool.begin().await?;
		for action in actions {
			insert_action(&mut tx, action).await?;
		}
		for task in tasks {
			insert_hook_task(&mut tx, task).await?;
		}
		tx.commit().await?;
		Ok(())
	}

	#[tracing::instrument(skip(self))]
	async fn list_actions_by_receiver(
		&self,
		user_id: i64,
		limit: u32,
	) -> Result<Vec<ActionRecord>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT id, user_id, op_type, act_user_id, act_user_name, repo_id, repo_user_name,
				repo_name, ref_name, is_private, content, created_unix
			FROM actions
			WHERE user_id = ?
			ORDER BY id
			LIMIT ?
			"#,
		)
		.bind(user_id)
		.bind(limit as i64)
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_action).collect()
	}
}

async fn insert_action(conn: &mut SqliteConnection, action: &ActionRecord) -> Result<(), DbError> {
	sqlx::query(
		r#"
		INSERT INTO actions (
			user_id, op_type, act_user_id, act_user_name, repo_id, repo_user_name,
			repo_name, ref_name, is_private, content, created_unix
		)
		VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
		"#,
	)
	.bind(action.user_id)
	.bind(action.op_type.as_i64())
	.bind(action.act_user_id)
	.bind(&action.act_user_name)
	.bind(action.repo_id)
	.bind(&action.repo_user_name)
	.bind(&action.repo_name)
	.bind(&action.ref_name)
	.bind(action.is_private as i64)
	.bind(&action.content)
	.bind(action.created_at.timestamp())
	.execute(&mut *conn)
	.await?;
	Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRecord {
	pub id: i64,
	/// Receiver of this feed entry.
	pub user_id: i64,
	pub op_type: ActionType,
	pub act_user_id: i64,
	pub act_user_name: String,
	pub repo_id: i64,
	pub repo_user_name: String,
	pub repo_name: String,
	pub ref_name: String,
	pub is_private: bool,
	pub content: String,
	pub created_at: DateTime<Utc>,
}

impl ActionRecord {
	/// Copies of this action for the actor and every other watcher.
	pub fn fan_out(&self, watcher_ids: &[i64]) -> Vec<ActionRecord> {
		let mut receivers = vec![self.act_user_id];
		receivers.extend(
			watcher_ids
				.iter()
				.copied()
				.filter(|id| *id != self.act_user_id),
		);

		receivers
			.into_iter()
			.map(|user_id| ActionRecord {
				user_id,
				..self.clone()
			})
			.collect()
	}
}

fn row_to_action(row: &sqlx::sqlite::SqliteRow) -> Result<ActionRecord, DbError> {
	Ok(ActionRecord {
		id: row.get("id"),
		user_id: row.get("user_id"),
		op_type: ActionType::try_from(row.get::<i64, _>("op_type"))?,
		act_user_id: row.get("act_user_id"),
		act_user_name: row.get("act_user_name"),
		repo_id: row.get("repo_id"),
		repo_user_name: row.get("repo_user_name"),
		repo_name: row.get("repo_name"),
		ref_name: row.get("ref_name"),
		is_private: flag(row.get("is_private")),
		content: row.get("content"),
		created_at: from_unix(row.get("created_unix"))?,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{create_test_pool, sample_hook_task, seed_repository, seed_user, seed_webhook};

	fn action(actor: i64, repo_id: i64) -> ActionRecord {
		ActionRecord {
			id: 0,
			user_id: actor,
			op_type: ActionType::MirrorSyncCreate,
			act_user_id: actor,
			act_user_name: "alice".to_string(),
			repo_id,
			repo_user_name: "alice".to_string(),
			repo_name: "widgets".to_string(),
			ref_name: "feature".to_string(),
			is_private: false,
			content: String::new(),
			created_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
		}
	}

	#[test]
	fn test_action_type_values_are_stable() {
		assert_eq!(ActionType::CreateRepo.as_i64(), 1);
		assert_eq!(ActionType::MirrorSyncPush.as_i64(), 20);
		assert_eq!(ActionType::MirrorSyncCreate.as_i64(), 21);
		assert_eq!(ActionType::MirrorSyncDelete.as_i64(), 22);
		for value in 1..=22 {
			assert_eq!(ActionType::try_from(value).unwrap().as_i64(), value);
		}
		assert!(ActionType::try_from(23).is_err());
	}

	#[test]
	fn test_fan_out_includes_actor_once() {
		let base = action(1, 10);
		let rows = base.fan_out(&[3, 1, 2]);
		let receivers: Vec<i64> = rows.iter().map(|a| a.user_id).collect();
		assert_eq!(receivers, vec![1, 3, 2]);
		assert!(rows.iter().all(|a| a.act_user_id == 1));
	}

	#[tokio::test]
	async fn test_create_actions_with_hook_tasks_commits_both() {
		let pool = create_test_pool().await;
		let store = ActionRepository::new(pool.clone());
		let owner = seed_user(&pool, "alice", false).await;
		let repo_id = seed_repository(&pool, owner, "widgets").await;
		let hook_id = seed_webhook(&pool, Some(repo_id), None, "https://hooks.example.com/a").await;

		store
			.create_actions_with_hook_tasks(
				&[action(owner, repo_id)],
				&[sample_hook_task(repo_id, hook_id)],
			)
			.await
			.unwrap();

		let feed = store.list_actions_by_receiver(owner, 10).await.unwrap();
		assert_eq!(feed.len(), 1);
		assert_eq!(feed[0].op_type, ActionType::MirrorSyncCreate);

		let (tasks,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM hook_tasks")
			.fetch_one(&pool)
			.await
			.unwrap();
		assert_eq!(tasks, 1);
	}

	#[tokio::test]
	async fn test_failed_hook_task_rolls_back_actions() {
		let pool = create_test_pool().await;
		let store = ActionRepository::new(pool.clone());
		let owner = seed_user(&pool, "alice", false).await;
		let repo_id = seed_repository(&pool, owner, "widgets").await;
		let hook_id = seed_webhook(&pool, Some(repo_id), None, "https://hooks.example.com/a").await;

		let task = sample_hook_task(repo_id, hook_id);
		let result = store
			.create_actions_with_hook_tasks(&[action(owner, repo_id)], &[task.clone(), task])
			.await;
		assert!(result.is_err());

		let feed = store.list_actions_by_receiver(owner, 10).await.unwrap();
		assert!(feed.is_empty());
	}
}
