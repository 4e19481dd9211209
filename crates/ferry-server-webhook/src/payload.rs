// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Native webhook payloads.
//!
//! Field names follow the Gogs API so existing receivers keep working.

use chrono::{DateTime, Utc};
use ferry_server_db::{RepositoryRecord, UserRecord};
use serde::{Deserialize, Serialize};

use crate::types::HookEventType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiUser {
	pub id: i64,
	pub username: String,
	pub login: String,
	pub full_name: String,
	pub email: String,
	pub avatar_url: String,
}

impl From<&UserRecord> for ApiUser {
	fn from(user: &UserRecord) -> Self {
		Self {
			id: user.id,
			username: user.name.clone(),
			login: user.name.clone(),
			full_name: user.full_name.clone(),
			email: user.email.clone(),
			avatar_url: user.avatar_url.clone(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRepository {
	pub id: i64,
	pub owner: ApiUser,
	pub name: String,
	pub full_name: String,
	pub description: String,
	pub private: bool,
	pub unlisted: bool,
	pub mirror: bool,
	pub size: i64,
	pub html_url: String,
	pub clone_url: String,
	pub default_branch: String,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl ApiRepository {
	/// `site_url` is the external URL with its trailing slash.
	pub fn new(repo: &RepositoryRecord, owner: &UserRecord, site_url: &str) -> Self {
		let html_url = format!("{site_url}{}/{}", owner.name, repo.name);
		Self {
			id: repo.id,
			owner: ApiUser::from(owner),
			name: repo.name.clone(),
			full_name: repo.full_name(),
			description: repo.description.clone(),
			private: repo.is_private,
			unlisted: repo.is_unlisted,
			mirror: repo.is_mirror,
			size: repo.size,
			clone_url: format!("{html_url}.git"),
			html_url,
			default_branch: repo.default_branch.clone(),
			created_at: repo.created_at,
			updated_at: repo.updated_at,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiPayloadUser {
	pub name: String,
	pub email: String,
	pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiCommit {
	pub id: String,
	pub message: String,
	pub url: String,
	pub author: ApiPayloadUser,
	pub committer: ApiPayloadUser,
	pub timestamp: DateTime<Utc>,
}

impl ApiCommit {
	pub fn short_id(&self) -> &str {
		self.id.get(..7).unwrap_or(&self.id)
	}

	pub fn summary(&self) -> &str {
		self.message.lines().next().unwrap_or_default()
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiLabel {
	pub id: i64,
	pub name: String,
	pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiMilestone {
	pub id: i64,
	pub title: String,
	pub description: String,
	pub state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiIssue {
	pub id: i64,
	pub number: i64,
	pub user: ApiUser,
	pub title: String,
	pub body: String,
	pub labels: Vec<ApiLabel>,
	pub milestone: Option<ApiMilestone>,
	pub assignee: Option<ApiUser>,
	pub state: String,
	pub comments: i64,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiComment {
	pub id: i64,
	pub html_url: String,
	pub user: ApiUser,
	pub body: String,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiPullRequest {
	pub id: i64,
	pub number: i64,
	pub user: ApiUser,
	pub title: String,
	pub body: String,
	pub labels: Vec<ApiLabel>,
	pub milestone: Option<ApiMilestone>,
	pub assignee: Option<ApiUser>,
	pub state: String,
	pub html_url: String,
	pub head_branch: String,
	pub base_branch: String,
	pub merged: bool,
	pub merged_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRelease {
	pub id: i64,
	pub tag_name: String,
	pub target_commitish: String,
	pub name: String,
	pub body: String,
	pub draft: bool,
	pub prerelease: bool,
	pub author: ApiUser,
	pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookIssueAction {
	Opened,
	Closed,
	Reopened,
	Edited,
	Assigned,
	Unassigned,
	LabelUpdated,
	LabelCleared,
	Milestoned,
	Demilestoned,
	Synchronized,
}

impl HookIssueAction {
	pub fn as_str(&self) -> &'static str {
		match self {
			HookIssueAction::Opened => "opened",
			HookIssueAction::Closed => "closed",
			HookIssueAction::Reopened => "reopened",
			HookIssueAction::Edited => "edited",
			HookIssueAction::Assigned => "assigned",
			HookIssueAction::Unassigned => "unassigned",
			HookIssueAction::LabelUpdated => "label_updated",
			HookIssueAction::LabelCleared => "label_cleared",
			HookIssueAction::Milestoned => "milestoned",
			HookIssueAction::Demilestoned => "demilestoned",
			HookIssueAction::Synchronized => "synchronized",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookCommentAction {
	Created,
	Edited,
	Deleted,
}

impl HookCommentAction {
	pub fn as_str(&self) -> &'static str {
		match self {
			HookCommentAction::Created => "created",
			HookCommentAction::Edited => "edited",
			HookCommentAction::Deleted => "deleted",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookReleaseAction {
	Published,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePayload {
	#[serde(rename = "ref")]
	pub ref_name: String,
	pub ref_type: String,
	pub sha: String,
	pub default_branch: String,
	pub repository: ApiRepository,
	pub sender: ApiUser,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletePayload {
	#[serde(rename = "ref")]
	pub ref_name: String,
	pub ref_type: String,
	pub pusher_type: String,
	pub repository: ApiRepository,
	pub sender: ApiUser,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForkPayload {
	pub forkee: ApiRepository,
	pub repository: ApiRepository,
	pub sender: ApiUser,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushPayload {
	#[serde(rename = "ref")]
	pub ref_name: String,
	pub before: String,
	pub after: String,
	pub compare_url: String,
	pub commits: Vec<ApiCommit>,
	pub repository: ApiRepository,
	pub pusher: ApiUser,
	pub sender: ApiUser,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuesPayload {
	pub action: HookIssueAction,
	pub number: i64,
	pub issue: ApiIssue,
	pub repository: ApiRepository,
	pub sender: ApiUser,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueCommentPayload {
	pub action: HookCommentAction,
	pub issue: ApiIssue,
	pub comment: ApiComment,
	pub repository: ApiRepository,
	pub sender: ApiUser,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequestPayload {
	pub action: HookIssueAction,
	pub number: i64,
	pub pull_request: ApiPullRequest,
	pub repository: ApiRepository,
	pub sender: ApiUser,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleasePayload {
	pub action: HookReleaseAction,
	pub release: ApiRelease,
	pub repository: ApiRepository,
	pub sender: ApiUser,
}

/// Any payload a webhook can carry. Serializes as the inner payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
	Create(CreatePayload),
	Delete(DeletePayload),
	Fork(ForkPayload),
	Push(PushPayload),
	Issues(IssuesPayload),
	IssueComment(IssueCommentPayload),
	PullRequest(PullRequestPayload),
	Release(ReleasePayload),
}

impl Payload {
	pub fn event_type(&self) -> HookEventType {
		match self {
			Payload::Create(_) => HookEventType::Create,
			Payload::Delete(_) => HookEventType::Delete,
			Payload::Fork(_) => HookEventType::Fork,
			Payload::Push(_) => HookEventType::Push,
			Payload::Issues(_) => HookEventType::Issues,
			Payload::IssueComment(_) => HookEventType::IssueComment,
			Payload::PullRequest(_) => HookEventType::PullRequest,
			Payload::Release(_) => HookEventType::Release,
		}
	}

	pub fn repository(&self) -> &ApiRepository {
		match self {
			Payload::Create(p) => &p.repository,
			Payload::Delete(p) => &p.repository,
			Payload::Fork(p) => &p.repository,
			Payload::Push(p) => &p.repository,
			Payload::Issues(p) => &p.repository,
			Payload::IssueComment(p) => &p.repository,
			Payload::PullRequest(p) => &p.repository,
			Payload::Release(p) => &p.repository,
		}
	}

	/// Indented JSON, the exact bytes that are signed and sent to native
	/// receivers.
	pub fn to_json(&self) -> serde_json::Result<String> {
		serde_json::to_string_pretty(self)
	}
}

/// Short name of a fully qualified ref: `refs/heads/main` becomes `main`.
pub fn ref_end_name(ref_name: &str) -> &str {
	ref_name
		.strip_prefix("refs/heads/")
		.or_else(|| ref_name.strip_prefix("refs/tags/"))
		.unwrap_or(ref_name)
}


#[cfg(test)]
mod tests {
	use super::fixtures::*;
	use super::*;

	#[test]
	fn test_push_payload_uses_native_field_names() {
		let payload = push(vec![commit(&"c".repeat(40), "Add widget\n\nLong body")], "");
		let value: serde_json::Value = serde_json::from_str(&payload.to_json().unwrap()).unwrap();
		assert_eq!(value["ref"], "refs/heads/master");
		assert_eq!(value["compare_url"], "");
		assert_eq!(value["repository"]["full_name"], "alice/widgets");
		assert_eq!(value["commits"][0]["author"]["username"], "alice");
		assert!(value.get("Push").is_none());
	}

	#[test]
	fn test_issue_action_serializes_snake_case() {
		let value = serde_json::to_value(issues(HookIssueAction::LabelUpdated)).unwrap();
		assert_eq!(value["action"], "label_updated");
	}

	#[test]
	fn test_event_type_follows_variant() {
		assert_eq!(push(vec![], "").event_type(), HookEventType::Push);
		assert_eq!(create("tag", "v1").event_type(), HookEventType::Create);
		assert_eq!(release().event_type(), HookEventType::Release);
	}

	#[test]
	fn test_ref_end_name() {
		assert_eq!(ref_end_name("refs/heads/feature/x"), "feature/x");
		assert_eq!(ref_end_name("refs/tags/v1.0"), "v1.0");
		assert_eq!(ref_end_name("main"), "main");
	}

	#[test]
	fn test_commit_short_id_and_summary() {
		let c = commit("0123456789abcdef", "first line\nsecond");
		assert_eq!(c.short_id(), "0123456");
		assert_eq!(c.summary(), "first line");
		assert_eq!(commit("abc", "").short_id(), "abc");
	}

	#[test]
	fn test_api_repository_links() {
		let at = DateTime::from_timestamp(1_000, 0).unwrap();
		let owner = UserRecord {
			id: 1,
			name: "alice".to_string(),
			full_name: "Alice".to_string(),
			email: "alice@example.com".to_string(),
			avatar_url: String::new(),
			is_organization: false,
		};
		let repo = RepositoryRecord {
			id: 5,
			owner_id: 1,
			owner_name: "alice".to_string(),
			name: "widgets".to_string(),
			description: String::new(),
			default_branch: "master".to_string(),
			is_private: false,
			is_unlisted: false,
			is_mirror: true,
			has_wiki: false,
			size: 0,
			created_at: at,
			updated_at: at,
		};
		let api = ApiRepository::new(&repo, &owner, "https://git.example.com/");
		assert_eq!(api.html_url, "https://git.example.com/alice/widgets");
		assert_eq!(api.clone_url, "https://git.example.com/alice/widgets.git");
		assert_eq!(api.full_name, "alice/widgets");
	}
}
