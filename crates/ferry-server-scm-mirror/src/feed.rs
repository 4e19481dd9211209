// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Newsfeed content and webhook commits for mirrored pushes.

use chrono::{DateTime, Utc};
use ferry_server_scm::CommitInfo;
use ferry_server_webhook::{ApiCommit, ApiPayloadUser};
use serde::{Deserialize, Serialize};

use crate::parser::EMPTY_ID;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PushCommit {
	pub sha1: String,
	pub message: String,
	pub author_email: String,
	pub author_name: String,
	pub committer_email: String,
	pub committer_name: String,
	pub timestamp: DateTime<Utc>,
}

impl From<&CommitInfo> for PushCommit {
	fn from(commit: &CommitInfo) -> Self {
		Self {
			sha1: commit.sha.clone(),
			message: commit.message.clone(),
			author_email: commit.author_email.clone(),
			author_name: commit.author_name.clone(),
			committer_email: commit.committer_email.clone(),
			committer_name: commit.committer_name.clone(),
			timestamp: commit.author_date,
		}
	}
}

/// Content of a `mirror_sync_push` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushCommits {
	/// Number of commits pushed, before truncation.
	#[serde(rename = "Len")]
	pub len: usize,
	#[serde(rename = "Commits")]
	pub commits: Vec<PushCommit>,
	#[serde(rename = "CompareURL")]
	pub compare_url: String,
}

impl PushCommits {
	/// Keep at most `max_commits` of `commits` (newest first).
	pub fn new(commits: &[CommitInfo], max_commits: usize, compare_url: &str) -> Self {
		Self {
			len: commits.len(),
			commits: commits.iter().take(max_commits).map(PushCommit::from).collect(),
			compare_url: compare_url.to_string(),
		}
	}
}

/// `<html_url>/compare/<old>...<new>`, or empty for a newly created ref.
pub fn compare_url(html_url: &str, old: &str, new: &str) -> String {
	if old == EMPTY_ID {
		return String::new();
	}
	format!("{html_url}/compare/{old}...{new}")
}

pub fn api_commit(commit: &CommitInfo, html_url: &str) -> ApiCommit {
	ApiCommit {
		id: commit.sha.clone(),
		message: commit.message.clone(),
		url: format!("{html_url}/commit/{}", commit.sha),
		author: ApiPayloadUser {
			name: commit.author_name.clone(),
			email: commit.author_email.clone(),
			username: String::new(),
		},
		committer: ApiPayloadUser {
			name: commit.committer_name.clone(),
			email: commit.committer_email.clone(),
			username: String::new(),
		},
		timestamp: commit.author_date,
	}
}

#[cfg(test)]
pub(crate) fn sample_commit(sha: &str, message: &str) -> CommitInfo {
	let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
	CommitInfo {
		sha: sha.to_string(),
		message: message.to_string(),
		author_name: "Alice".to_string(),
		author_email: "alice@example.com".to_string(),
		author_date: at,
		committer_name: "Alice".to_string(),
		committer_email: "alice@example.com".to_string(),
		committer_date: at,
		parent_shas: vec![],
	}
}
