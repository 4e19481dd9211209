// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Turning fetched ref transitions into newsfeed actions and webhooks.

use std::path::Path;

use chrono::{DateTime, Utc};
use ferry_server_db::{ActionRecord, ActionType, RepositoryRecord, UserRecord};
use ferry_server_scm::{CommitInfo, GitClient};
use ferry_server_webhook::{
	ApiRepository, ApiUser, CreatePayload, DeletePayload, HookEventType, Payload, PushPayload,
	WebhookDispatcher,
};
use tracing::{debug, warn};

use crate::error::Result;
use crate::feed::{api_commit, compare_url, PushCommits};
use crate::parser::{SyncResult, EMPTY_ID};

/// Branch tip plus this many ancestors are reported for a new branch.
pub const NEW_BRANCH_ANCESTORS: usize = 9;

pub(crate) struct Replayer<'a> {
	pub git: &'a dyn GitClient,
	pub dispatcher: &'a WebhookDispatcher,
	pub repo: &'a RepositoryRecord,
	pub owner: &'a UserRecord,
	pub repo_path: &'a Path,
	pub api_repo: ApiRepository,
	pub watchers: Vec<i64>,
	pub now: DateTime<Utc>,
	pub feed_max_commit_num: usize,
}

impl Replayer<'_> {
	/// Replay `results` in order. A failing ref is logged and skipped.
	/// Returns the number of refs replayed.
	pub async fn replay(&self, results: &[SyncResult]) -> usize {
		let mut replayed = 0;

		for result in results {
			if result.is_pull_ref() {
				debug!(ref_name = %result.ref_name, "ignoring pull request ref");
				continue;
			}

			let outcome = if result.is_deleted() {
				self.deleted(&result.ref_name).await
			} else if result.is_new() {
				self.created(&result.ref_name).await
			} else {
				self.updated(result).await
			};

			match outcome {
				Ok(()) => replayed += 1,
				Err(e) => warn!(
					repo_id = self.repo.id,
					ref_name = %result.ref_name,
					error = %e,
					"failed to replay mirrored ref"
				),
			}
		}

		replayed
	}

	async fn deleted(&self, ref_name: &str) -> Result<()> {
		let ref_type = if ref_name.starts_with("refs/tags/") {
			"tag"
		} else {
			"branch"
		};

		let actions = self.actions(ActionType::MirrorSyncDelete, ref_name, String::new());
		let payload = Payload::Delete(DeletePayload {
			ref_name: ref_name.to_string(),
			ref_type: ref_type.to_string(),
			pusher_type: "user".to_string(),
			repository: self.api_repo.clone(),
			sender: ApiUser::from(self.owner),
		});

		self
			.dispatcher
			.prepare_webhooks_with_actions(self.repo, &actions, HookEventType::Delete, &payload)
			.await?;
		Ok(())
	}

	/// The create action and webhook go out first. Failing to read the new
	/// branch's history afterwards only skips its push.
	async fn created(&self, ref_name: &str) -> Result<()> {
		let is_branch = match self.git.has_branch(self.repo_path, ref_name).await {
			Ok(is_branch) => is_branch,
			Err(e) => {
				warn!(repo_id = self.repo.id, ref_name, error = %e, "failed to check branch; treating as tag");
				false
			}
		};
		let sha = if is_branch {
			self
				.git
				.branch_tip(self.repo_path, ref_name)
				.await
				.map(|tip| tip.sha)
		} else {
			self.git.resolve_revision(self.repo_path, ref_name).await
		}
		.unwrap_or_default();

		let actions = self.actions(ActionType::MirrorSyncCreate, ref_name, String::new());
		let payload = Payload::Create(CreatePayload {
			ref_name: ref_name.to_string(),
			ref_type: if is_branch { "branch" } else { "tag" }.to_string(),
			sha,
			default_branch: self.repo.default_branch.clone(),
			repository: self.api_repo.clone(),
			sender: ApiUser::from(self.owner),
		});
		self
			.dispatcher
			.prepare_webhooks_with_actions(self.repo, &actions, HookEventType::Create, &payload)
			.await?;

		if !is_branch {
			return Ok(());
		}
		let commits = match self
			.git
			.ancestors(self.repo_path, ref_name, NEW_BRANCH_ANCESTORS + 1)
			.await
		{
			Ok(commits) => commits,
			Err(e) => {
				warn!(repo_id = self.repo.id, ref_name, error = %e, "failed to list new branch commits");
				return Ok(());
			}
		};
		let Some(tip) = commits.first() else {
			return Ok(());
		};
		self.push(ref_name, EMPTY_ID, &tip.sha, &commits).await
	}

	async fn updated(&self, result: &SyncResult) -> Result<()> {
		let old = self
			.git
			.resolve_revision(self.repo_path, &result.old_commit_id)
			.await?;
		let new = self
			.git
			.resolve_revision(self.repo_path, &result.new_commit_id)
			.await?;
		let commits = self.git.commits_in_range(self.repo_path, &old, &new).await?;

		self.push(&result.ref_name, &old, &new, &commits).await
	}

	async fn push(&self, ref_name: &str, old: &str, new: &str, commits: &[CommitInfo]) -> Result<()> {
		let html_url = &self.api_repo.html_url;
		let compare = compare_url(html_url, old, new);
		let content = serde_json::to_string(&PushCommits::new(
			commits,
			self.feed_max_commit_num,
			&compare,
		))?;

		let actions = self.actions(ActionType::MirrorSyncPush, ref_name, content);
		let sender = ApiUser::from(self.owner);
		let payload = Payload::Push(PushPayload {
			ref_name: ref_name.to_string(),
			before: old.to_string(),
			after: new.to_string(),
			compare_url: compare,
			commits: commits
				.iter()
				.take(self.feed_max_commit_num)
				.map(|c| api_commit(c, html_url))
				.collect(),
			repository: self.api_repo.clone(),
			pusher: sender.clone(),
			sender,
		});

		self
			.dispatcher
			.prepare_webhooks_with_actions(self.repo, &actions, HookEventType::Push, &payload)
			.await?;
		Ok(())
	}

	/// One action per receiver, acted by the repository owner.
	fn actions(&self, op_type: ActionType, ref_name: &str, content: String) -> Vec<ActionRecord> {
		ActionRecord {
			id: 0,
			user_id: self.owner.id,
			op_type,
			act_user_id: self.owner.id,
			act_user_name: self.owner.name.clone(),
			repo_id: self.repo.id,
			repo_user_name: self.repo.owner_name.clone(),
			repo_name: self.repo.name.clone(),
			ref_name: ref_name.to_string(),
			is_private: self.repo.is_private || self.repo.is_unlisted,
			content,
			created_at: self.now,
		}
		.fan_out(&self.watchers)
	}
}
