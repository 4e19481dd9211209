// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Turning domain events into persisted delivery tasks.

use std::sync::Arc;

use ferry_common_queue::UniqueQueue;
use ferry_common_webhook::sign_payload;
use ferry_server_db::{
	ActionRecord, ActionStore, HookTaskRecord, RepoStore, RepositoryRecord, WebhookStore,
};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::payload::Payload;
use crate::transform::TransformerSet;
use crate::types::{HookEventType, Webhook};

pub struct WebhookDispatcher {
	repos: Arc<dyn RepoStore>,
	webhooks: Arc<dyn WebhookStore>,
	actions: Arc<dyn ActionStore>,
	queue: Arc<UniqueQueue<i64>>,
	transformers: TransformerSet,
}

impl WebhookDispatcher {
	pub fn new(
		repos: Arc<dyn RepoStore>,
		webhooks: Arc<dyn WebhookStore>,
		actions: Arc<dyn ActionStore>,
		queue: Arc<UniqueQueue<i64>>,
		transformers: TransformerSet,
	) -> Self {
		Self {
			repos,
			webhooks,
			actions,
			queue,
			transformers,
		}
	}

	/// Persist one task per matching webhook and queue the repository for
	/// delivery. Returns the number of tasks created.
	#[instrument(skip(self, repo, payload), fields(repo_id = repo.id, event = %event))]
	pub async fn prepare_webhooks(
		&self,
		repo: &RepositoryRecord,
		event: HookEventType,
		payload: &Payload,
	) -> Result<usize> {
		let tasks = self.build_tasks(repo, event, payload).await?;
		if tasks.is_empty() {
			return Ok(0);
		}

		self.webhooks.create_hook_tasks(&tasks).await?;
		self.queue.add(repo.id);
		Ok(tasks.len())
	}

	/// Like [`Self::prepare_webhooks`], writing `actions` in the same
	/// transaction as the tasks.
	#[instrument(skip(self, repo, actions, payload), fields(repo_id = repo.id, event = %event, actions = actions.len()))]
	pub async fn prepare_webhooks_with_actions(
		&self,
		repo: &RepositoryRecord,
		actions: &[ActionRecord],
		event: HookEventType,
		payload: &Payload,
	) -> Result<usize> {
		let tasks = self.build_tasks(repo, event, payload).await?;

		self
			.actions
			.create_actions_with_hook_tasks(actions, &tasks)
			.await?;

		if !tasks.is_empty() {
			self.queue.add(repo.id);
		}
		Ok(tasks.len())
	}

	/// Active repository webhooks, plus the owning organization's when the
	/// owner is one.
	async fn candidates(&self, repo: &RepositoryRecord) -> Result<Vec<Webhook>> {
		let mut records = self.webhooks.list_active_webhooks_by_repo(repo.id).await?;

		let owner = self.repos.get_user_by_id(repo.owner_id).await?;
		if owner.is_some_and(|o| o.is_organization) {
			records.extend(
				self
					.webhooks
					.list_active_webhooks_by_org(repo.owner_id)
					.await?,
			);
		}

		let mut hooks = Vec::with_capacity(records.len());
		for record in records {
			match Webhook::try_from(record) {
				Ok(hook) => hooks.push(hook),
				Err(e) => warn!(error = %e, "skipping undecodable webhook"),
			}
		}
		Ok(hooks)
	}

	async fn build_tasks(
		&self,
		repo: &RepositoryRecord,
		event: HookEventType,
		payload: &Payload,
	) -> Result<Vec<HookTaskRecord>> {
		let hooks = self.candidates(repo).await?;
		let native = match payload.to_json() {
			Ok(json) => Some(json),
			Err(e) => {
				warn!(error = %e, "payload could not be serialized for signing");
				None
			}
		};

		let mut tasks = Vec::new();
		for hook in hooks.iter().filter(|h| h.events.has(event)) {
			match self.build_task(hook, repo.id, event, payload, native.as_deref()) {
				Ok(task) => tasks.push(task),
				Err(e) => {
					warn!(webhook_id = hook.id, error = %e, "skipping webhook, payload transform failed")
				}
			}
		}

		debug!(candidates = hooks.len(), tasks = tasks.len(), "prepared webhook tasks");
		Ok(tasks)
	}

	/// Build the task for one webhook without consulting its event filter.
	pub fn build_task_for_webhook(
		&self,
		hook: &Webhook,
		repo_id: i64,
		event: HookEventType,
		payload: &Payload,
	) -> Result<HookTaskRecord> {
		let native = payload.to_json().ok();
		self.build_task(hook, repo_id, event, payload, native.as_deref())
	}

	fn build_task(
		&self,
		hook: &Webhook,
		repo_id: i64,
		event: HookEventType,
		payload: &Payload,
		native: Option<&str>,
	) -> Result<HookTaskRecord> {
		let payload_content = self
			.transformers
			.get(hook.hook_task_type)
			.transform(payload, &hook.meta)?;

		let signature = match native {
			Some(json) => sign_payload(&hook.secret, json.as_bytes()),
			None => String::new(),
		};

		Ok(HookTaskRecord {
			id: 0,
			repo_id,
			hook_id: hook.id,
			uuid: Uuid::new_v4(),
			task_type: hook.hook_task_type.as_str().to_string(),
			url: hook.url.clone(),
			signature,
			payload_content,
			content_type: hook.content_type.as_str().to_string(),
			event_type: event.as_str().to_string(),
			skip_tls_verify: hook.skip_tls_verify,
			is_delivered: false,
			delivered: 0,
			is_succeed: false,
			request_content: String::new(),
			response_content: String::new(),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::payload::fixtures;
	use ferry_common_webhook::verify_hmac_sha256;
	use ferry_server_db::testing::{create_test_pool, seed_repository, seed_user, seed_webhook};
	use ferry_server_db::{
		ActionRepository, ActionType, RepoRepository, WebhookRecord, WebhookRepository,
	};
	use sqlx::SqlitePool;

	struct Harness {
		pool: SqlitePool,
		dispatcher: WebhookDispatcher,
		webhooks: WebhookRepository,
		repos: RepoRepository,
		queue: Arc<UniqueQueue<i64>>,
	}

	async fn harness() -> Harness {
		let pool = create_test_pool().await;
		let queue = Arc::new(UniqueQueue::new("hook_queue", 10));
		let dispatcher = WebhookDispatcher::new(
			Arc::new(RepoRepository::new(pool.clone())),
			Arc::new(WebhookRepository::new(pool.clone())),
			Arc::new(ActionRepository::new(pool.clone())),
			queue.clone(),
			TransformerSet::new("https://git.example.com/"),
		);
		Harness {
			webhooks: WebhookRepository::new(pool.clone()),
			repos: RepoRepository::new(pool.clone()),
			pool,
			dispatcher,
			queue,
		}
	}

	async fn set_hook(h: &Harness, id: i64, edit: impl FnOnce(&mut WebhookRecord)) {
		let mut record = h.webhooks.get_webhook_by_id(id).await.unwrap().unwrap();
		edit(&mut record);
		h.webhooks.update_webhook(&record).await.unwrap();
	}

	#[tokio::test]
	async fn test_org_and_repo_hooks_fan_out() {
		let h = harness().await;
		let org = seed_user(&h.pool, "acme", true).await;
		let repo_id = seed_repository(&h.pool, org, "widgets").await;
		seed_webhook(&h.pool, Some(repo_id), None, "https://a.example.com/hook").await;
		seed_webhook(&h.pool, None, Some(org), "https://b.example.com/hook").await;
		let repo = h.repos.get_repository_by_id(repo_id).await.unwrap().unwrap();

		let payload = fixtures::push(vec![], "");
		let count = h
			.dispatcher
			.prepare_webhooks(&repo, HookEventType::Push, &payload)
			.await
			.unwrap();
		assert_eq!(count, 2);

		let tasks = h
			.webhooks
			.list_undelivered_hook_tasks_by_repo(repo_id)
			.await
			.unwrap();
		assert_eq!(tasks.len(), 2);
		assert_ne!(tasks[0].uuid, tasks[1].uuid);
		assert_eq!(tasks[0].payload_content, tasks[1].payload_content);
		assert_eq!(tasks[0].event_type, "push");
		assert!(h.queue.exists(&repo_id));
	}

	#[tokio::test]
	async fn test_org_hooks_ignored_for_user_owner() {
		let h = harness().await;
		let user = seed_user(&h.pool, "alice", false).await;
		let org = seed_user(&h.pool, "acme", true).await;
		let repo_id = seed_repository(&h.pool, user, "widgets").await;
		seed_webhook(&h.pool, None, Some(org), "https://b.example.com/hook").await;
		let repo = h.repos.get_repository_by_id(repo_id).await.unwrap().unwrap();

		let count = h
			.dispatcher
			.prepare_webhooks(&repo, HookEventType::Push, &fixtures::push(vec![], ""))
			.await
			.unwrap();
		assert_eq!(count, 0);
		assert!(!h.queue.exists(&repo_id));
	}

	#[tokio::test]
	async fn test_event_filter_and_inactive_hooks() {
		let h = harness().await;
		let owner = seed_user(&h.pool, "alice", false).await;
		let repo_id = seed_repository(&h.pool, owner, "widgets").await;
		let push_only = seed_webhook(&h.pool, Some(repo_id), None, "https://a.example.com").await;
		let inactive = seed_webhook(&h.pool, Some(repo_id), None, "https://b.example.com").await;
		set_hook(&h, push_only, |w| {
			w.events = r#"{"push_only":true}"#.to_string();
		})
		.await;
		set_hook(&h, inactive, |w| w.is_active = false).await;
		let repo = h.repos.get_repository_by_id(repo_id).await.unwrap().unwrap();

		let created = h
			.dispatcher
			.prepare_webhooks(
				&repo,
				HookEventType::Create,
				&fixtures::create("branch", "refs/heads/x"),
			)
			.await
			.unwrap();
		assert_eq!(created, 0);

		let pushed = h
			.dispatcher
			.prepare_webhooks(&repo, HookEventType::Push, &fixtures::push(vec![], ""))
			.await
			.unwrap();
		assert_eq!(pushed, 1);
	}

	#[tokio::test]
	async fn test_signature_covers_native_payload() {
		let h = harness().await;
		let owner = seed_user(&h.pool, "alice", false).await;
		let repo_id = seed_repository(&h.pool, owner, "widgets").await;
		let hook = seed_webhook(&h.pool, Some(repo_id), None, "https://a.example.com").await;
		set_hook(&h, hook, |w| {
			w.secret = "s3cret".to_string();
			w.hook_task_type = "slack".to_string();
			w.meta = r##"{"channel":"#dev"}"##.to_string();
		})
		.await;
		let repo = h.repos.get_repository_by_id(repo_id).await.unwrap().unwrap();
		let payload = fixtures::push(vec![], "");

		h.dispatcher
			.prepare_webhooks(&repo, HookEventType::Push, &payload)
			.await
			.unwrap();

		let task = &h.webhooks.list_undelivered_hook_tasks().await.unwrap()[0];
		assert_eq!(task.task_type, "slack");
		assert!(task.payload_content.contains("\"channel\": \"#dev\""));
		let native = payload.to_json().unwrap();
		assert!(verify_hmac_sha256(b"s3cret", native.as_bytes(), &task.signature));
	}

	#[tokio::test]
	async fn test_bad_meta_skips_only_that_hook() {
		let h = harness().await;
		let owner = seed_user(&h.pool, "alice", false).await;
		let repo_id = seed_repository(&h.pool, owner, "widgets").await;
		let broken = seed_webhook(&h.pool, Some(repo_id), None, "https://a.example.com").await;
		seed_webhook(&h.pool, Some(repo_id), None, "https://b.example.com").await;
		set_hook(&h, broken, |w| {
			w.hook_task_type = "discord".to_string();
			w.meta = "{".to_string();
		})
		.await;
		let repo = h.repos.get_repository_by_id(repo_id).await.unwrap().unwrap();

		let count = h
			.dispatcher
			.prepare_webhooks(&repo, HookEventType::Push, &fixtures::push(vec![], ""))
			.await
			.unwrap();
		assert_eq!(count, 1);
		let tasks = h.webhooks.list_undelivered_hook_tasks().await.unwrap();
		assert_eq!(tasks[0].url, "https://b.example.com");
	}

	#[tokio::test]
	async fn test_actions_written_with_tasks() {
		let h = harness().await;
		let owner = seed_user(&h.pool, "alice", false).await;
		let repo_id = seed_repository(&h.pool, owner, "widgets").await;
		seed_webhook(&h.pool, Some(repo_id), None, "https://a.example.com").await;
		let repo = h.repos.get_repository_by_id(repo_id).await.unwrap().unwrap();

		let action = ActionRecord {
			id: 0,
			user_id: owner,
			op_type: ActionType::MirrorSyncCreate,
			act_user_id: owner,
			act_user_name: "alice".to_string(),
			repo_id,
			repo_user_name: "alice".to_string(),
			repo_name: "widgets".to_string(),
			ref_name: "feature".to_string(),
			is_private: false,
			content: String::new(),
			created_at: repo.created_at,
		};

		let count = h
			.dispatcher
			.prepare_webhooks_with_actions(
				&repo,
				&[action],
				HookEventType::Create,
				&fixtures::create("branch", "refs/heads/feature"),
			)
			.await
			.unwrap();
		assert_eq!(count, 1);

		let feed = ActionRepository::new(h.pool.clone())
			.list_actions_by_receiver(owner, 10)
			.await
			.unwrap();
		assert_eq!(feed.len(), 1);
		assert!(h.queue.exists(&repo_id));
	}
}
