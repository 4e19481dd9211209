// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::command::{parse_count_objects, run_git};
use crate::error::{Result, ScmError};
use crate::git::GitRepository;
use crate::types::CommitInfo;

/// Budget for local, read-only git subprocesses.
const LOCAL_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// Git operations the mirror engine depends on.
#[async_trait]
pub trait GitClient: Send + Sync {
	/// Whether `path` holds a repository.
	async fn exists(&self, path: &Path) -> bool;
	/// `remote.origin.url` of the repository.
	async fn remote_address(&self, repo_path: &Path) -> Result<String>;
	/// `git ls-remote -q -h <address> HEAD`.
	async fn probe(&self, address: &str, timeout: Duration) -> Result<()>;
	/// `git remote update [--prune]`; returns the captured stderr, which is
	/// where git reports ref transitions.
	async fn remote_update(&self, repo_path: &Path, prune: bool, timeout: Duration)
		-> Result<String>;
	/// On-disk size in bytes.
	async fn repository_size(&self, repo_path: &Path) -> Result<i64>;
	async fn resolve_revision(&self, repo_path: &Path, rev: &str) -> Result<String>;
	async fn has_branch(&self, repo_path: &Path, branch: &str) -> Result<bool>;
	async fn branch_tip(&self, repo_path: &Path, branch: &str) -> Result<CommitInfo>;
	/// `rev` and its ancestors, at most `limit` commits.
	async fn ancestors(&self, repo_path: &Path, rev: &str, limit: usize)
		-> Result<Vec<CommitInfo>>;
	/// Commits reachable from `new` but not `old`, newest first.
	async fn commits_in_range(&self, repo_path: &Path, old: &str, new: &str)
		-> Result<Vec<CommitInfo>>;
	async fn latest_commit_time(&self, repo_path: &Path) -> Result<Option<DateTime<Utc>>>;
}

/// [`GitClient`] over local bare repositories.
#[derive(Debug, Clone, Default)]
pub struct LocalGitClient;

impl LocalGitClient {
	pub fn new() -> Self {
		Self
	}
}

async fn with_repo<T, F>(repo_path: &Path, f: F) -> Result<T>
where
	T: Send + 'static,
	F: FnOnce(GitRepository) -> Result<T> + Send + 'static,
{
	let path: PathBuf = repo_path.to_path_buf();
	tokio::task::spawn_blocking(move || f(GitRepository::open(&path)?))
		.await
		.map_err(|e| ScmError::GitError(format!("Task join error: {e}")))?
}

#[async_trait]
impl GitClient for LocalGitClient {
	async fn exists(&self, path: &Path) -> bool {
		let path = path.to_path_buf();
		tokio::task::spawn_blocking(move || gix::open(&path).is_ok())
			.await
			.unwrap_or(false)
	}

	#[instrument(skip(self), fields(repo = %repo_path.display()))]
	async fn remote_address(&self, repo_path: &Path) -> Result<String> {
		let output = run_git(
			Some(repo_path),
			&["config", "--get", "remote.origin.url"],
			LOCAL_COMMAND_TIMEOUT,
		)
		.await?;
		Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
	}

	#[instrument(skip_all)]
	async fn probe(&self, address: &str, timeout: Duration) -> Result<()> {
		if address.starts_with('-') {
			return Err(ScmError::GitError(format!(
				"remote address must not start with '-': {address}"
			)));
		}
		run_git(None, &["ls-remote", "-q", "-h", address, "HEAD"], timeout).await?;
		Ok(())
	}

	#[instrument(skip(self), fields(repo = %repo_path.display()))]
	async fn remote_update(
		&self,
		repo_path: &Path,
		prune: bool,
		timeout: Duration,
	) -> Result<String> {
		let mut args = vec!["remote", "update"];
		if prune {
			args.push("--prune");
		}
		let output = run_git(Some(repo_path), &args, timeout).await?;
		Ok(String::from_utf8_lossy(&output.stderr).to_string())
	}

	#[instrument(skip(self), fields(repo = %repo_path.display()))]
	async fn repository_size(&self, repo_path: &Path) -> Result<i64> {
		let output = run_git(
			Some(repo_path),
			&["count-objects", "-v"],
			LOCAL_COMMAND_TIMEOUT,
		)
		.await?;
		Ok(parse_count_objects(&String::from_utf8_lossy(&output.stdout)))
	}

	async fn resolve_revision(&self, repo_path: &Path, rev: &str) -> Result<String> {
		let rev = rev.to_string();
		with_repo(repo_path, move |repo| repo.resolve_revision(&rev)).await
	}

	async fn has_branch(&self, repo_path: &Path, branch: &str) -> Result<bool> {
		let branch = branch.to_string();
		with_repo(repo_path, move |repo| repo.has_branch(&branch)).await
	}

	async fn branch_tip(&self, repo_path: &Path, branch: &str) -> Result<CommitInfo> {
		let branch = branch.to_string();
		with_repo(repo_path, move |repo| repo.branch_tip(&branch)).await
	}

	async fn ancestors(
		&self,
		repo_path: &Path,
		rev: &str,
		limit: usize,
	) -> Result<Vec<CommitInfo>> {
		let rev = rev.to_string();
		with_repo(repo_path, move |repo| repo.ancestors(&rev, limit)).await
	}

	#[instrument(skip(self), fields(repo = %repo_path.display(), old = %old, new = %new))]
	async fn commits_in_range(
		&self,
		repo_path: &Path,
		old: &str,
		new: &str,
	) -> Result<Vec<CommitInfo>> {
		let range = format!("{old}..{new}");
		let output = run_git(Some(repo_path), &["rev-list", &range], LOCAL_COMMAND_TIMEOUT).await?;
		let shas: Vec<String> = String::from_utf8_lossy(&output.stdout)
			.lines()
			.map(str::trim)
			.filter(|line| !line.is_empty())
			.map(str::to_string)
			.collect();

		with_repo(repo_path, move |repo| {
			shas.iter().map(|sha| repo.get_commit(sha)).collect()
		})
		.await
	}

	async fn latest_commit_time(&self, repo_path: &Path) -> Result<Option<DateTime<Utc>>> {
		with_repo(repo_path, |repo| repo.latest_commit_time()).await
	}
}
