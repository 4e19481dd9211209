// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Scheduling and running pull mirror syncs.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ferry_common_queue::UniqueQueue;
use ferry_server_db::{
	Clock, MirrorStore, NoticeStore, NoticeType, RepoStore, RepositoryRecord, UserRecord,
};
use ferry_server_jobs::TaskStatusTable;
use ferry_server_scm::{repo_path, wiki_path, GitClient};
use ferry_server_webhook::{ApiRepository, WebhookDispatcher};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::address::{handle_mirror_credentials, redact_address};
use crate::error::{MirrorError, Result};
use crate::parser::{parse_remote_update_output, SyncResult};
use crate::replay::Replayer;

/// Name of the scan in the [`TaskStatusTable`].
pub const MIRROR_UPDATE_TASK: &str = "mirror_update";

#[derive(Clone)]
pub struct MirrorStores {
	pub repos: Arc<dyn RepoStore>,
	pub mirrors: Arc<dyn MirrorStore>,
	pub notices: Arc<dyn NoticeStore>,
}

#[derive(Debug, Clone)]
pub struct MirrorSyncConfig {
	pub repository_root: PathBuf,
	/// External URL with its trailing slash.
	pub site_url: String,
	pub git_timeout: Duration,
	pub probe_timeout: Duration,
	pub feed_max_commit_num: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
	/// The mirror, its repository or the owner no longer exists.
	Skipped,
	/// The remote failed the reachability probe.
	Unreachable,
	/// `git remote update` failed or timed out.
	UpdateFailed,
	/// Fetched and rescheduled; `refs` transitions were reported by git.
	Synced { refs: usize },
}

pub struct MirrorSyncer {
	stores: MirrorStores,
	git: Arc<dyn GitClient>,
	dispatcher: Arc<WebhookDispatcher>,
	queue: Arc<UniqueQueue<i64>>,
	tasks: TaskStatusTable,
	clock: Arc<dyn Clock>,
	config: MirrorSyncConfig,
}

impl MirrorSyncer {
	pub fn new(
		stores: MirrorStores,
		git: Arc<dyn GitClient>,
		dispatcher: Arc<WebhookDispatcher>,
		queue: Arc<UniqueQueue<i64>>,
		tasks: TaskStatusTable,
		clock: Arc<dyn Clock>,
		config: MirrorSyncConfig,
	) -> Self {
		Self {
			stores,
			git,
			dispatcher,
			queue,
			tasks,
			clock,
			config,
		}
	}

	/// Queue every mirror that is due. Returns immediately with `0` when a
	/// scan is already running.
	#[instrument(skip(self))]
	pub async fn mirror_update(&self) -> Result<usize> {
		let Some(_guard) = self.tasks.try_start(MIRROR_UPDATE_TASK) else {
			debug!("mirror update already running");
			return Ok(0);
		};

		let due = self.stores.mirrors.list_mirrors_due(self.clock.now()).await?;
		let mut queued = 0;
		for mirror in &due {
			match self.stores.repos.get_repository_by_id(mirror.repo_id).await {
				Ok(Some(_)) => {
					if self.queue.add(mirror.repo_id) {
						queued += 1;
					}
				}
				Ok(None) => error!(
					mirror_id = mirror.id,
					repo_id = mirror.repo_id,
					"mirror points at a missing repository"
				),
				Err(e) => error!(mirror_id = mirror.id, error = %e, "failed to load mirror repository"),
			}
		}

		info!(due = due.len(), queued, "mirror update scan finished");
		Ok(queued)
	}

	/// Sync queued repositories until the queue closes.
	pub async fn sync_mirrors(self: Arc<Self>) {
		while let Some(repo_id) = self.queue.recv().await {
			self.queue.remove(&repo_id);
			match self.sync_one(repo_id).await {
				Ok(outcome) => debug!(repo_id, ?outcome, "mirror sync finished"),
				Err(e) => error!(repo_id, error = %e, "mirror sync failed"),
			}
		}
	}

	/// Fetch one mirror, reschedule it and replay what changed.
	#[instrument(skip(self))]
	pub async fn sync_one(&self, repo_id: i64) -> Result<SyncOutcome> {
		let Some(mut mirror) = self.stores.mirrors.get_mirror_by_repo_id(repo_id).await? else {
			warn!(repo_id, "no mirror for repository");
			return Ok(SyncOutcome::Skipped);
		};
		let Some(repo) = self.stores.repos.get_repository_by_id(repo_id).await? else {
			warn!(repo_id, "mirrored repository not found");
			return Ok(SyncOutcome::Skipped);
		};
		let Some(owner) = self.stores.repos.get_user_by_id(repo.owner_id).await? else {
			warn!(repo_id, owner_id = repo.owner_id, "mirror owner not found");
			return Ok(SyncOutcome::Skipped);
		};

		let started = self.clock.now();
		let path = repo_path(&self.config.repository_root, &repo.owner_name, &repo.name);

		let address = self.git.remote_address(&path).await?;
		if address.is_empty() {
			return Err(MirrorError::GitError(format!(
				"no origin remote configured for {}",
				path.display()
			)));
		}

		if let Err(e) = self.git.probe(&address, self.config.probe_timeout).await {
			self
				.notify(format!(
					"Source URL of mirror repository '{}' is not accessible: {}",
					handle_mirror_credentials(&address, true),
					redact_address(&e.to_string(), &address)
				))
				.await;
			return Ok(SyncOutcome::Unreachable);
		}

		let output = match self
			.git
			.remote_update(&path, mirror.enable_prune, self.config.git_timeout)
			.await
		{
			Ok(output) => output,
			Err(e) => {
				self
					.notify(format!(
						"Failed to update mirror repository '{}': {}",
						path.display(),
						redact_address(&e.to_string(), &address)
					))
					.await;
				return Ok(SyncOutcome::UpdateFailed);
			}
		};

		self.refresh_size(&repo, &path).await;
		if repo.has_wiki {
			self.update_wiki(&repo).await;
		}

		mirror.schedule_next_sync(started);
		self.stores.mirrors.update_mirror(&mirror).await?;

		let results = parse_remote_update_output(&output);
		let replayed = self.replay(&repo, &owner, &path, &results).await;

		self.advance_updated_at(&repo, &path).await;

		info!(
			repo_id,
			refs = results.len(),
			replayed,
			next_sync = %mirror.next_sync,
			"mirror synced"
		);
		Ok(SyncOutcome::Synced {
			refs: results.len(),
		})
	}

	async fn replay(
		&self,
		repo: &RepositoryRecord,
		owner: &UserRecord,
		path: &Path,
		results: &[SyncResult],
	) -> usize {
		if results.is_empty() {
			return 0;
		}

		let watchers = match self.stores.repos.list_watcher_ids(repo.id).await {
			Ok(watchers) => watchers,
			Err(e) => {
				warn!(repo_id = repo.id, error = %e, "failed to list watchers");
				Vec::new()
			}
		};

		Replayer {
			git: self.git.as_ref(),
			dispatcher: self.dispatcher.as_ref(),
			repo,
			owner,
			repo_path: path,
			api_repo: ApiRepository::new(repo, owner, &self.config.site_url),
			watchers,
			now: self.clock.now(),
			feed_max_commit_num: self.config.feed_max_commit_num,
		}
		.replay(results)
		.await
	}

	async fn refresh_size(&self, repo: &RepositoryRecord, path: &Path) {
		match self.git.repository_size(path).await {
			Ok(size) => {
				if let Err(e) = self.stores.repos.update_repository_size(repo.id, size).await {
					warn!(repo_id = repo.id, error = %e, "failed to store repository size");
				}
			}
			Err(e) => warn!(repo_id = repo.id, error = %e, "failed to compute repository size"),
		}
	}

	/// The wiki is always pruned, whatever the mirror's own setting.
	async fn update_wiki(&self, repo: &RepositoryRecord) {
		let path = wiki_path(&self.config.repository_root, &repo.owner_name, &repo.name);
		if !self.git.exists(&path).await {
			return;
		}

		if let Err(e) = self
			.git
			.remote_update(&path, true, self.config.git_timeout)
			.await
		{
			let address = self.git.remote_address(&path).await.unwrap_or_default();
			self
				.notify(format!(
					"Failed to update mirror wiki repository '{}': {}",
					path.display(),
					redact_address(&e.to_string(), &address)
				))
				.await;
		}
	}

	async fn advance_updated_at(&self, repo: &RepositoryRecord, path: &Path) {
		let latest = match self.git.latest_commit_time(path).await {
			Ok(Some(latest)) => latest,
			Ok(None) => return,
			Err(e) => {
				warn!(repo_id = repo.id, error = %e, "failed to read latest commit time");
				return;
			}
		};

		match self
			.stores
			.repos
			.advance_repository_updated_at(repo.id, latest)
			.await
		{
			Ok(true) => debug!(repo_id = repo.id, updated_at = %latest, "repository updated time advanced"),
			Ok(false) => {}
			Err(e) => warn!(repo_id = repo.id, error = %e, "failed to advance repository updated time"),
		}
	}

	async fn notify(&self, description: String) {
		warn!(%description, "mirror sync problem");
		if let Err(e) = self
			.stores
			.notices
			.create_notice(NoticeType::Repository, &description)
			.await
		{
			error!(error = %e, "failed to record system notice");
		}
	}
}

/// Spawn the sync loop.
pub fn init_sync_mirrors(syncer: Arc<MirrorSyncer>) -> JoinHandle<()> {
	tokio::spawn(syncer.sync_mirrors())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::feed::PushCommits;
	use crate::parser::EMPTY_ID;
	use crate::testing::{MockGit, UPSTREAM};
	use chrono::{DateTime, Utc};
	use ferry_server_db::testing::{create_test_pool, seed_repository, seed_user, seed_webhook};
	use ferry_server_db::{
		ActionRepository, ActionStore, ActionType, FixedClock, HookTaskRecord, MirrorRecord,
		MirrorRepository,
		NoticeRepository, RepoRepository, WebhookRepository, WebhookStore,
	};
	use ferry_server_webhook::TransformerSet;
	use sqlx::SqlitePool;

	const NOW: i64 = 1_700_000_000;

	struct Harness {
		pool: SqlitePool,
		git: Arc<MockGit>,
		mirror_queue: Arc<UniqueQueue<i64>>,
		hook_queue: Arc<UniqueQueue<i64>>,
		tasks: TaskStatusTable,
		syncer: Arc<MirrorSyncer>,
		owner_id: i64,
		repo_id: i64,
	}

	fn at(unix: i64) -> DateTime<Utc> {
		DateTime::from_timestamp(unix, 0).unwrap()
	}

	async fn harness() -> Harness {
		let pool = create_test_pool().await;
		let owner_id = seed_user(&pool, "alice", false).await;
		let repo_id = seed_repository(&pool, owner_id, "widgets").await;
		seed_webhook(&pool, Some(repo_id), None, "https://hooks.example.com/a").await;
		MirrorRepository::new(pool.clone())
			.create_mirror(&MirrorRecord::new(repo_id, 8, at(NOW - 60)))
			.await
			.unwrap();

		let repos: Arc<dyn RepoStore> = Arc::new(RepoRepository::new(pool.clone()));
		let hook_queue = Arc::new(UniqueQueue::new("hook_queue", 100));
		let dispatcher = Arc::new(WebhookDispatcher::new(
			repos.clone(),
			Arc::new(WebhookRepository::new(pool.clone())),
			Arc::new(ActionRepository::new(pool.clone())),
			hook_queue.clone(),
			TransformerSet::new("https://git.example.com/"),
		));

		let git = Arc::new(MockGit::new());
		let mirror_queue = Arc::new(UniqueQueue::new("mirror_queue", 100));
		let tasks = TaskStatusTable::new();
		let syncer = Arc::new(MirrorSyncer::new(
			MirrorStores {
				repos,
				mirrors: Arc::new(MirrorRepository::new(pool.clone())),
				notices: Arc::new(NoticeRepository::new(pool.clone())),
			},
			git.clone(),
			dispatcher,
			mirror_queue.clone(),
			tasks.clone(),
			Arc::new(FixedClock::new(at(NOW))),
			MirrorSyncConfig {
				repository_root: PathBuf::from("/data/repos"),
				site_url: "https://git.example.com/".to_string(),
				git_timeout: Duration::from_secs(300),
				probe_timeout: Duration::from_secs(60),
				feed_max_commit_num: 5,
			},
		));

		Harness {
			pool,
			git,
			mirror_queue,
			hook_queue,
			tasks,
			syncer,
			owner_id,
			repo_id,
		}
	}

	impl Harness {
		async fn mirror(&self) -> MirrorRecord {
			MirrorRepository::new(self.pool.clone())
				.get_mirror_by_repo_id(self.repo_id)
				.await
				.unwrap()
				.unwrap()
		}

		async fn actions(&self) -> Vec<ferry_server_db::ActionRecord> {
			ActionRepository::new(self.pool.clone())
				.list_actions_by_receiver(self.owner_id, 100)
				.await
				.unwrap()
		}

		async fn hook_tasks(&self) -> Vec<HookTaskRecord> {
			WebhookRepository::new(self.pool.clone())
				.list_undelivered_hook_tasks()
				.await
				.unwrap()
		}

		async fn notices(&self) -> Vec<String> {
			NoticeRepository::new(self.pool.clone())
				.list_notices(10)
				.await
				.unwrap()
				.into_iter()
				.map(|n| n.description)
				.collect()
		}
	}

	#[tokio::test]
	async fn test_mirror_update_queues_due_mirrors() {
		let h = harness().await;
		let later = seed_repository(&h.pool, h.owner_id, "gadgets").await;
		let mut future = MirrorRecord::new(later, 8, at(NOW));
		future.next_sync = at(NOW + 3600);
		MirrorRepository::new(h.pool.clone())
			.create_mirror(&future)
			.await
			.unwrap();

		assert_eq!(h.syncer.mirror_update().await.unwrap(), 1);
		assert!(h.mirror_queue.exists(&h.repo_id));
		assert!(!h.mirror_queue.exists(&later));

		// Still queued, so a second scan adds nothing.
		assert_eq!(h.syncer.mirror_update().await.unwrap(), 0);
	}

	#[tokio::test]
	async fn test_mirror_update_is_noop_while_running() {
		let h = harness().await;
		let _running = h.tasks.try_start(MIRROR_UPDATE_TASK).unwrap();

		assert_eq!(h.syncer.mirror_update().await.unwrap(), 0);
		assert!(!h.mirror_queue.exists(&h.repo_id));
	}

	#[tokio::test]
	async fn test_reschedule_is_exactly_one_interval_with_no_refs() {
		let h = harness().await;

		let outcome = h.syncer.sync_one(h.repo_id).await.unwrap();

		assert_eq!(outcome, SyncOutcome::Synced { refs: 0 });
		let mirror = h.mirror().await;
		assert_eq!(mirror.last_sync, at(NOW));
		assert_eq!(mirror.next_sync, at(NOW + 8 * 3600));
		assert!(h.actions().await.is_empty());
		assert!(h.notices().await.is_empty());
	}

	#[tokio::test]
	async fn test_new_branch_creates_then_pushes() {
		let h = harness().await;
		h.git.set_output(" * [new branch]      feature    -> feature\n");
		h.git.add_branch("feature", 12);

		let outcome = h.syncer.sync_one(h.repo_id).await.unwrap();
		assert_eq!(outcome, SyncOutcome::Synced { refs: 1 });

		let actions = h.actions().await;
		assert_eq!(actions.len(), 2);
		assert_eq!(actions[0].op_type, ActionType::MirrorSyncCreate);
		assert_eq!(actions[0].ref_name, "feature");
		assert_eq!(actions[0].act_user_name, "alice");
		assert_eq!(actions[1].op_type, ActionType::MirrorSyncPush);

		let content: PushCommits = serde_json::from_str(&actions[1].content).unwrap();
		assert_eq!(content.len, 10);
		assert_eq!(content.commits.len(), 5);
		assert_eq!(content.compare_url, "");

		let tasks = h.hook_tasks().await;
		let events: Vec<&str> = tasks.iter().map(|t| t.event_type.as_str()).collect();
		assert_eq!(events, vec!["create", "push"]);
		let push: serde_json::Value = serde_json::from_str(&tasks[1].payload_content).unwrap();
		assert_eq!(push["before"], EMPTY_ID);
		assert_eq!(push["after"], h.git.tip("feature"));
		assert_eq!(push["commits"].as_array().unwrap().len(), 5);
		assert!(h.hook_queue.exists(&h.repo_id));

		assert_eq!(h.mirror().await.next_sync, at(NOW + 8 * 3600));
	}

	#[tokio::test]
	async fn test_new_branch_keeps_create_when_history_fails() {
		let h = harness().await;
		h.git.set_output(" * [new branch]      feature    -> feature\n");
		h.git.add_branch("feature", 3);
		h.git.fail_ancestors("object database unavailable");

		let outcome = h.syncer.sync_one(h.repo_id).await.unwrap();
		assert_eq!(outcome, SyncOutcome::Synced { refs: 1 });

		let actions = h.actions().await;
		assert_eq!(actions.len(), 1);
		assert_eq!(actions[0].op_type, ActionType::MirrorSyncCreate);
		let tasks = h.hook_tasks().await;
		assert_eq!(tasks.len(), 1);
		let create: serde_json::Value = serde_json::from_str(&tasks[0].payload_content).unwrap();
		assert_eq!(create["ref_type"], "branch");
		assert_eq!(create["sha"], h.git.tip("feature"));
	}

	#[tokio::test]
	async fn test_new_tag_skips_push() {
		let h = harness().await;
		h.git.set_output(" * [new tag]         v1.0       -> v1.0\n");
		h.git.add_revision("v1.0", &"c".repeat(40));

		h.syncer.sync_one(h.repo_id).await.unwrap();

		let actions = h.actions().await;
		assert_eq!(actions.len(), 1);
		assert_eq!(actions[0].op_type, ActionType::MirrorSyncCreate);
		let tasks = h.hook_tasks().await;
		assert_eq!(tasks.len(), 1);
		let create: serde_json::Value = serde_json::from_str(&tasks[0].payload_content).unwrap();
		assert_eq!(create["ref_type"], "tag");
		assert_eq!(create["sha"], "c".repeat(40));
	}

	#[tokio::test]
	async fn test_updated_ref_pushes_commit_range() {
		let h = harness().await;
		let old = "a".repeat(40);
		let new = "b".repeat(40);
		h.git.set_output("   b0bb24f..1d85a4f  master     -> master\n");
		h.git.add_revision("b0bb24f", &old);
		h.git.add_revision("1d85a4f", &new);
		h.git.add_range(&old, &new, 3);

		h.syncer.sync_one(h.repo_id).await.unwrap();

		let actions = h.actions().await;
		assert_eq!(actions.len(), 1);
		assert_eq!(actions[0].op_type, ActionType::MirrorSyncPush);
		let content: PushCommits = serde_json::from_str(&actions[0].content).unwrap();
		assert_eq!(content.len, 3);
		assert_eq!(
			content.compare_url,
			format!("https://git.example.com/alice/widgets/compare/{old}...{new}")
		);
	}

	#[tokio::test]
	async fn test_pull_refs_never_replayed() {
		let h = harness().await;
		h.git.set_output(concat!(
			" * [new ref]         refs/pull/7/head -> refs/pull/7/head\n",
			" - [deleted]         (none)     -> refs/pull/3/head\n",
		));

		let outcome = h.syncer.sync_one(h.repo_id).await.unwrap();

		assert_eq!(outcome, SyncOutcome::Synced { refs: 2 });
		assert!(h.actions().await.is_empty());
		assert!(h.hook_tasks().await.is_empty());
		assert!(!h.hook_queue.exists(&h.repo_id));
	}

	#[tokio::test]
	async fn test_bad_ref_does_not_abort_batch() {
		let h = harness().await;
		h.git.set_output(concat!(
			"   1111111..2222222  master     -> master\n",
			" - [deleted]         (none)     -> bugfix\n",
		));

		h.syncer.sync_one(h.repo_id).await.unwrap();

		let actions = h.actions().await;
		assert_eq!(actions.len(), 1);
		assert_eq!(actions[0].op_type, ActionType::MirrorSyncDelete);
		assert_eq!(actions[0].ref_name, "bugfix");
		let tasks = h.hook_tasks().await;
		assert_eq!(tasks.len(), 1);
		assert_eq!(tasks[0].event_type, "delete");
	}

	#[tokio::test]
	async fn test_watchers_receive_actions() {
		let h = harness().await;
		let bob = seed_user(&h.pool, "bob", false).await;
		let repos = RepoRepository::new(h.pool.clone());
		repos.watch_repo(bob, h.repo_id).await.unwrap();
		h.git.set_output(" - [deleted]         (none)     -> bugfix\n");

		h.syncer.sync_one(h.repo_id).await.unwrap();

		let feed = ActionRepository::new(h.pool.clone())
			.list_actions_by_receiver(bob, 10)
			.await
			.unwrap();
		assert_eq!(feed.len(), 1);
		assert_eq!(feed[0].act_user_id, h.owner_id);
	}

	#[tokio::test]
	async fn test_probe_failure_records_notice_without_reschedule() {
		let h = harness().await;
		h.git.fail_probe("could not resolve host");

		let outcome = h.syncer.sync_one(h.repo_id).await.unwrap();

		assert_eq!(outcome, SyncOutcome::Unreachable);
		assert_eq!(h.mirror().await.next_sync, at(NOW - 60));
		let notices = h.notices().await;
		assert_eq!(notices.len(), 1);
		assert!(notices[0].starts_with(
			"Source URL of mirror repository 'https://<credentials>@upstream.example.com/widgets.git' is not accessible: "
		));
		assert!(!notices[0].contains("hunter2"));
		assert!(h.git.updated_paths().is_empty());
	}

	#[tokio::test]
	async fn test_update_failure_records_notice_without_reschedule() {
		let h = harness().await;
		h.git.fail_update(&format!("fatal: unable to access '{UPSTREAM}': 502"));

		let outcome = h.syncer.sync_one(h.repo_id).await.unwrap();

		assert_eq!(outcome, SyncOutcome::UpdateFailed);
		assert_eq!(h.mirror().await.next_sync, at(NOW - 60));
		let notices = h.notices().await;
		assert!(notices[0].starts_with(
			"Failed to update mirror repository '/data/repos/alice/widgets.git': "
		));
		assert!(!notices[0].contains("hunter2"));
	}

	#[tokio::test]
	async fn test_wiki_failure_does_not_abort_sync() {
		let h = harness().await;
		h.git.set_wiki(true, Some("wiki remote gone"));
		h.git.set_output(" - [deleted]         (none)     -> bugfix\n");

		let outcome = h.syncer.sync_one(h.repo_id).await.unwrap();

		assert_eq!(outcome, SyncOutcome::Synced { refs: 1 });
		assert_eq!(h.actions().await.len(), 1);
		let notices = h.notices().await;
		assert_eq!(notices.len(), 1);
		assert!(notices[0]
			.starts_with("Failed to update mirror wiki repository '/data/repos/alice/widgets.wiki.git'"));
		assert_eq!(h.git.updated_paths().len(), 2);
	}

	#[tokio::test]
	async fn test_wiki_is_pruned_regardless_of_mirror_setting() {
		let h = harness().await;
		h.git.set_wiki(true, None);
		let mut mirror = h.mirror().await;
		mirror.enable_prune = false;
		MirrorRepository::new(h.pool.clone())
			.update_mirror(&mirror)
			.await
			.unwrap();

		h.syncer.sync_one(h.repo_id).await.unwrap();

		let updates = h.git.updates();
		assert_eq!(updates.len(), 2);
		assert!(!updates[0].1);
		assert!(updates[1].0.to_string_lossy().ends_with(".wiki.git"));
		assert!(updates[1].1);
	}

	#[tokio::test]
	async fn test_updated_time_only_moves_forward() {
		let h = harness().await;
		let repos = RepoRepository::new(h.pool.clone());

		h.git.set_latest(Some(at(500)));
		h.syncer.sync_one(h.repo_id).await.unwrap();
		let repo = repos.get_repository_by_id(h.repo_id).await.unwrap().unwrap();
		assert_eq!(repo.updated_at, at(1000));

		h.git.set_latest(Some(at(2000)));
		h.syncer.sync_one(h.repo_id).await.unwrap();
		let repo = repos.get_repository_by_id(h.repo_id).await.unwrap().unwrap();
		assert_eq!(repo.updated_at, at(2000));
		assert_eq!(repo.size, 4096);
	}

	#[tokio::test]
	async fn test_missing_mirror_is_skipped() {
		let h = harness().await;
		MirrorRepository::new(h.pool.clone())
			.delete_mirror_by_repo_id(h.repo_id)
			.await
			.unwrap();

		assert_eq!(
			h.syncer.sync_one(h.repo_id).await.unwrap(),
			SyncOutcome::Skipped
		);
	}

	#[tokio::test]
	async fn test_sync_loop_drains_queue() {
		let h = harness().await;
		let handle = init_sync_mirrors(h.syncer.clone());
		h.mirror_queue.add(h.repo_id);

		let synced = tokio::time::timeout(Duration::from_secs(5), async {
			loop {
				if h.mirror().await.next_sync == at(NOW + 8 * 3600) {
					break;
				}
				tokio::time::sleep(Duration::from_millis(10)).await;
			}
		})
		.await;

		handle.abort();
		assert!(synced.is_ok());
		assert!(!h.mirror_queue.exists(&h.repo_id));
	}

	#[tokio::test]
	async fn test_mirror_update_job_reports_queued() {
		use crate::job::MirrorUpdateJob;
		use ferry_server_jobs::{CancellationToken, Job, JobContext, JobError};

		let h = harness().await;
		let job = MirrorUpdateJob::new(h.syncer.clone());
		let ctx = JobContext {
			run_id: "run-1".to_string(),
			cancellation_token: CancellationToken::new(),
		};

		let output = job.run(&ctx).await.unwrap();
		assert_eq!(output.metadata.unwrap()["queued"], 1);
		assert!(h.mirror_queue.exists(&h.repo_id));

		ctx.cancellation_token.cancel();
		assert!(matches!(job.run(&ctx).await, Err(JobError::Cancelled)));
	}

	#[tokio::test]
	async fn test_mirror_update_job_reports_scan_failure() {
		use crate::job::MirrorUpdateJob;
		use ferry_server_jobs::{CancellationToken, Job, JobContext, JobError};

		let h = harness().await;
		h.pool.close().await;
		let job = MirrorUpdateJob::new(h.syncer.clone());
		let ctx = JobContext {
			run_id: "run-2".to_string(),
			cancellation_token: CancellationToken::new(),
		};

		assert!(matches!(job.run(&ctx).await, Err(JobError::Failed { .. })));
	}
}
