// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use gix::ObjectId;
use tracing::instrument;

use crate::error::{Result, ScmError};
use crate::types::CommitInfo;

/// Read access to a bare repository through gitoxide. Every call reopens the
/// repository, so a handle stays valid across external `git` writes.
pub struct GitRepository {
	path: PathBuf,
}

impl GitRepository {
	#[instrument(skip_all, fields(path = %path.display()))]
	pub fn open(path: &Path) -> Result<Self> {
		let repo = gix::open(path).map_err(|e| ScmError::GitError(e.to_string()))?;
		Ok(Self {
			path: repo.path().to_path_buf(),
		})
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	fn repo(&self) -> Result<gix::Repository> {
		gix::open(&self.path).map_err(|e| ScmError::GitError(e.to_string()))
	}

	/// Resolve any revision (abbreviated SHA, branch, tag) to the full SHA of
	/// the commit it points at.
	#[instrument(skip(self), fields(rev = %rev))]
	pub fn resolve_revision(&self, rev: &str) -> Result<String> {
		let repo = self.repo()?;
		let spec = format!("{rev}^{{commit}}");
		let id = repo
			.rev_parse_single(spec.as_str())
			.map_err(|_| ScmError::RefNotFound(rev.to_string()))?;
		Ok(id.detach().to_string())
	}

	#[instrument(skip(self), fields(branch = %branch))]
	pub fn has_branch(&self, branch: &str) -> Result<bool> {
		let repo = self.repo()?;
		match self.resolve_to_oid(&repo, branch) {
			Ok(_) => Ok(true),
			Err(ScmError::RefNotFound(_)) => Ok(false),
			Err(e) => Err(e),
		}
	}

	#[instrument(skip(self), fields(branch = %branch))]
	pub fn branch_tip(&self, branch: &str) -> Result<CommitInfo> {
		let repo = self.repo()?;
		let oid = self.resolve_to_oid(&repo, branch)?;
		self.commit_by_id(&repo, oid)
	}

	#[instrument(skip(self), fields(sha = %sha))]
	pub fn get_commit(&self, sha: &str) -> Result<CommitInfo> {
		let repo = self.repo()?;
		let oid =
			ObjectId::from_hex(sha.as_bytes()).map_err(|e| ScmError::GitError(e.to_string()))?;
		self.commit_by_id(&repo, oid)
	}

	/// `rev` followed by its ancestors, at most `limit` commits in total.
	#[instrument(skip(self), fields(rev = %rev, limit))]
	pub fn ancestors(&self, rev: &str, limit: usize) -> Result<Vec<CommitInfo>> {
		let repo = self.repo()?;
		let oid = self.resolve_to_oid(&repo, rev)?;
		let walk = repo
			.rev_walk([oid])
			.all()
			.map_err(|e| ScmError::GitError(e.to_string()))?;
		let mut commits = Vec::new();
		for info in walk.take(limit) {
			let info = info.map_err(|e| ScmError::GitError(e.to_string()))?;
			let commit = info
				.object()
				.map_err(|e| ScmError::GitError(e.to_string()))?;
			commits.push(commit_to_info(&commit)?);
		}
		Ok(commits)
	}

	/// Newest committer time across all branches, `None` for an empty
	/// repository.
	#[instrument(skip(self))]
	pub fn latest_commit_time(&self) -> Result<Option<DateTime<Utc>>> {
		let repo = self.repo()?;
		let refs = repo
			.references()
			.map_err(|e| ScmError::GitError(e.to_string()))?;
		let branches = refs
			.prefixed("refs/heads/")
			.map_err(|e| ScmError::GitError(e.to_string()))?;

		let mut latest: Option<DateTime<Utc>> = None;
		for r in branches {
			let mut r = r.map_err(|e| ScmError::GitError(e.to_string()))?;
			let oid = r
				.peel_to_id_in_place()
				.map_err(|e| ScmError::GitError(e.to_string()))?
				.detach();
			let commit = self.commit_by_id(&repo, oid)?;
			if latest.map_or(true, |t| commit.committer_date > t) {
				latest = Some(commit.committer_date);
			}
		}
		Ok(latest)
	}

	fn commit_by_id(&self, repo: &gix::Repository, oid: ObjectId) -> Result<CommitInfo> {
		let object = repo
			.find_object(oid)
			.map_err(|_| ScmError::ObjectNotFound(oid.to_string()))?;
		let commit = object
			.try_into_commit()
			.map_err(|e| ScmError::GitError(e.to_string()))?;
		commit_to_info(&commit)
	}

	fn resolve_to_oid(&self, repo: &gix::Repository, refname: &str) -> Result<ObjectId> {
		if let Ok(oid) = ObjectId::from_hex(refname.as_bytes()) {
			return Ok(oid);
		}
		let full_ref = if refname.starts_with("refs/") {
			refname.to_string()
		} else {
			format!("refs/heads/{refname}")
		};
		let mut reference = repo
			.find_reference(&full_ref)
			.map_err(|_| ScmError::RefNotFound(refname.to_string()))?;
		let peeled = reference
			.peel_to_id_in_place()
			.map_err(|e| ScmError::GitError(e.to_string()))?;
		Ok(peeled.detach())
	}
}

fn commit_to_info(commit: &gix::Commit<'_>) -> Result<CommitInfo> {
	let decoded = commit
		.decode()
		.map_err(|e| ScmError::GitError(e.to_string()))?;
	let author_date = DateTime::from_timestamp(decoded.author.time.seconds, 0).unwrap_or_default();
	let committer_date =
		DateTime::from_timestamp(decoded.committer.time.seconds, 0).unwrap_or_default();
	Ok(CommitInfo {
		sha: commit.id.to_string(),
		message: decoded.message.to_string(),
		author_name: decoded.author.name.to_string(),
		author_email: decoded.author.email.to_string(),
		author_date,
		committer_name: decoded.committer.name.to_string(),
		committer_email: decoded.committer.email.to_string(),
		committer_date,
		parent_shas: decoded.parents().map(|id| id.to_string()).collect(),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::Fixture;

	#[test]
	fn test_resolve_short_and_named_revisions() {
		let fixture = Fixture::new();
		let sha = fixture.commit("master", "one");
		let repo = GitRepository::open(&fixture.source).unwrap();

		assert_eq!(repo.resolve_revision(&sha[..7]).unwrap(), sha);
		assert_eq!(repo.resolve_revision("master").unwrap(), sha);
		assert!(matches!(
			repo.resolve_revision("does-not-exist"),
			Err(ScmError::RefNotFound(_))
		));
	}

	#[test]
	fn test_has_branch_distinguishes_tags() {
		let fixture = Fixture::new();
		fixture.commit("master", "one");
		fixture.tag("v1.0");
		let repo = GitRepository::open(&fixture.source).unwrap();

		assert!(repo.has_branch("master").unwrap());
		assert!(!repo.has_branch("v1.0").unwrap());
	}

	#[test]
	fn test_ancestors_are_bounded() {
		let fixture = Fixture::new();
		let mut shas = Vec::new();
		for i in 0..12 {
			shas.push(fixture.commit("master", &format!("commit {i}")));
		}
		let repo = GitRepository::open(&fixture.source).unwrap();

		let commits = repo.ancestors("master", 10).unwrap();
		assert_eq!(commits.len(), 10);
		assert_eq!(commits[0].sha, shas[11]);
		assert_eq!(commits[0].summary(), "commit 11");
		assert_eq!(repo.branch_tip("master").unwrap().sha, shas[11]);
	}

	#[test]
	fn test_latest_commit_time_empty_repository() {
		let fixture = Fixture::new();
		let repo = GitRepository::open(&fixture.source).unwrap();
		assert_eq!(repo.latest_commit_time().unwrap(), None);
	}

	#[test]
	fn test_latest_commit_time_takes_newest_branch() {
		let fixture = Fixture::new();
		fixture.commit_at("master", "old", 1_600_000_000);
		fixture.commit_at("feature", "new", 1_700_000_000);
		let repo = GitRepository::open(&fixture.source).unwrap();

		let latest = repo.latest_commit_time().unwrap().unwrap();
		assert_eq!(latest.timestamp(), 1_700_000_000);
	}
}
