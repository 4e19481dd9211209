// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use ferry_server_db::WebhookRecord;
use serde::{Deserialize, Serialize};

use crate::error::WebhookError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookEventType {
	Create,
	Delete,
	Fork,
	Push,
	Issues,
	PullRequest,
	IssueComment,
	Release,
}

impl HookEventType {
	pub fn as_str(&self) -> &'static str {
		match self {
			HookEventType::Create => "create",
			HookEventType::Delete => "delete",
			HookEventType::Fork => "fork",
			HookEventType::Push => "push",
			HookEventType::Issues => "issues",
			HookEventType::PullRequest => "pull_request",
			HookEventType::IssueComment => "issue_comment",
			HookEventType::Release => "release",
		}
	}
}

impl std::fmt::Display for HookEventType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

impl std::str::FromStr for HookEventType {
	type Err = ();
	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s {
			"create" => Ok(HookEventType::Create),
			"delete" => Ok(HookEventType::Delete),
			"fork" => Ok(HookEventType::Fork),
			"push" => Ok(HookEventType::Push),
			"issues" => Ok(HookEventType::Issues),
			"pull_request" => Ok(HookEventType::PullRequest),
			"issue_comment" => Ok(HookEventType::IssueComment),
			"release" => Ok(HookEventType::Release),
			_ => Err(()),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookContentType {
	Json = 1,
	Form = 2,
}

impl HookContentType {
	pub fn as_str(&self) -> &'static str {
		match self {
			HookContentType::Json => "json",
			HookContentType::Form => "form",
		}
	}
}

impl std::str::FromStr for HookContentType {
	type Err = ();
	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s {
			"json" => Ok(HookContentType::Json),
			"form" => Ok(HookContentType::Form),
			_ => Err(()),
		}
	}
}

/// Receiver flavour; decides which transformer shapes the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookTaskType {
	Gogs = 1,
	Slack = 2,
	Discord = 3,
	Dingtalk = 4,
}

impl HookTaskType {
	pub fn as_str(&self) -> &'static str {
		match self {
			HookTaskType::Gogs => "gogs",
			HookTaskType::Slack => "slack",
			HookTaskType::Discord => "discord",
			HookTaskType::Dingtalk => "dingtalk",
		}
	}
}

impl std::str::FromStr for HookTaskType {
	type Err = ();
	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s {
			"gogs" => Ok(HookTaskType::Gogs),
			"slack" => Ok(HookTaskType::Slack),
			"discord" => Ok(HookTaskType::Discord),
			"dingtalk" => Ok(HookTaskType::Dingtalk),
			_ => Err(()),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookStatus {
	None = 0,
	Succeed = 1,
	Failed = 2,
}

impl HookStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			HookStatus::None => "none",
			HookStatus::Succeed => "succeed",
			HookStatus::Failed => "failed",
		}
	}
}

impl std::str::FromStr for HookStatus {
	type Err = ();
	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s {
			"none" => Ok(HookStatus::None),
			"succeed" => Ok(HookStatus::Succeed),
			"failed" => Ok(HookStatus::Failed),
			_ => Err(()),
		}
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookEvents {
	pub create: bool,
	pub delete: bool,
	pub fork: bool,
	pub push: bool,
	pub issues: bool,
	pub pull_request: bool,
	pub issue_comment: bool,
	pub release: bool,
}

/// Which events a webhook subscribes to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookEvent {
	pub push_only: bool,
	pub send_everything: bool,
	pub choose_events: bool,
	pub events: HookEvents,
}

impl HookEvent {
	pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
		if raw.trim().is_empty() {
			return Ok(Self::default());
		}
		serde_json::from_str(raw)
	}

	pub fn has(&self, event: HookEventType) -> bool {
		if self.send_everything {
			return true;
		}
		let chosen = |flag: bool| self.choose_events && flag;
		match event {
			HookEventType::Create => chosen(self.events.create),
			HookEventType::Delete => chosen(self.events.delete),
			HookEventType::Fork => chosen(self.events.fork),
			HookEventType::Push => self.push_only || chosen(self.events.push),
			HookEventType::Issues => chosen(self.events.issues),
			HookEventType::PullRequest => chosen(self.events.pull_request),
			HookEventType::IssueComment => chosen(self.events.issue_comment),
			HookEventType::Release => chosen(self.events.release),
		}
	}
}

/// A webhook with its stored columns decoded.
#[derive(Clone)]
pub struct Webhook {
	pub id: i64,
	pub repo_id: Option<i64>,
	pub org_id: Option<i64>,
	pub url: String,
	pub content_type: HookContentType,
	pub secret: String,
	pub events: HookEvent,
	pub skip_tls_verify: bool,
	pub is_active: bool,
	pub hook_task_type: HookTaskType,
	pub meta: String,
	pub last_status: HookStatus,
}

impl std::fmt::Debug for Webhook {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Webhook")
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

impl TryFrom<WebhookRecord> for Webhook {
	type Error = WebhookError;

	fn try_from(record: WebhookRecord) -> Result<Self, Self::Error> {
		let invalid = |field: &str, value: &str| {
			WebhookError::InvalidRecord(format!("webhook {}: invalid {field} {value:?}", record.id))
		};

		Ok(Webhook {
			id: record.id,
			repo_id: record.repo_id,
			org_id: record.org_id,
			content_type: record
				.content_type
				.parse()
				.map_err(|_| invalid("content_type", &record.content_type))?,
			events: HookEvent::from_json(&record.events)
				.map_err(|_| invalid("events", &record.events))?,
			hook_task_type: record
				.hook_task_type
				.parse()
				.map_err(|_| invalid("hook_task_type", &record.hook_task_type))?,
			last_status: record
				.last_status
				.parse()
				.map_err(|_| invalid("last_status", &record.last_status))?,
			url: record.url,
			secret: record.secret,
			skip_tls_verify: record.skip_tls_verify,
			is_active: record.is_active,
			meta: record.meta,
		})
	}
}
