// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Receiver-specific payload shapes.
//!
//! Each [`HookTaskType`] has one [`PayloadTransformer`]. The native
//! transformer passes the payload through; chat integrations render it into
//! their own message format.

mod dingtalk;
mod discord;
mod slack;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WebhookError};
use crate::payload::Payload;
use crate::types::HookTaskType;

pub use dingtalk::DingtalkTransformer;
pub use discord::DiscordTransformer;
pub use slack::SlackTransformer;

pub trait PayloadTransformer: Send + Sync {
	/// Render `payload` for the receiver. `meta` is the webhook's opaque,
	/// type-specific settings.
	fn transform(&self, payload: &Payload, meta: &str) -> Result<String>;
}

pub struct NativeTransformer;

impl PayloadTransformer for NativeTransformer {
	fn transform(&self, payload: &Payload, _meta: &str) -> Result<String> {
		payload
			.to_json()
			.map_err(|e| WebhookError::Transform(e.to_string()))
	}
}

/// Settings shared by the Slack and Discord integrations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackMeta {
	pub channel: String,
	pub username: String,
	pub icon_url: String,
	pub color: String,
}

impl SlackMeta {
	pub fn parse(meta: &str) -> Result<Self> {
		serde_json::from_str(meta).map_err(|e| WebhookError::InvalidMeta(e.to_string()))
	}
}

/// One transformer per hook task type.
pub struct TransformerSet {
	native: NativeTransformer,
	slack: SlackTransformer,
	discord: DiscordTransformer,
	dingtalk: DingtalkTransformer,
}

impl TransformerSet {
	/// `site_url` is the external URL with its trailing slash; chat messages
	/// link senders to their profile pages under it.
	pub fn new(site_url: impl Into<String>) -> Self {
		let site_url = site_url.into();
		Self {
			native: NativeTransformer,
			slack: SlackTransformer::new(site_url.clone()),
			discord: DiscordTransformer::new(site_url),
			dingtalk: DingtalkTransformer,
		}
	}

	pub fn get(&self, task_type: HookTaskType) -> &dyn PayloadTransformer {
		match task_type {
			HookTaskType::Gogs => &self.native,
			HookTaskType::Slack => &self.slack,
			HookTaskType::Discord => &self.discord,
			HookTaskType::Dingtalk => &self.dingtalk,
		}
	}
}

fn to_pretty_json<T: Serialize>(value: &T) -> Result<String> {
	serde_json::to_string_pretty(value).map_err(|e| WebhookError::Transform(e.to_string()))
}

fn markdown_link(url: &str, text: &str) -> String {
	format!("[{text}]({url})")
}

fn title_case(s: &str) -> String {
	s.split('_')
		.map(|word| {
			let mut chars = word.chars();
			match chars.next() {
				Some(first) => first.to_uppercase().chain(chars).collect(),
				None => String::new(),
			}
		})
		.collect::<Vec<_>>()
		.join(" ")
}

fn commits_desc(count: usize) -> String {
	if count == 1 {
		"1 new commit".to_string()
	} else {
		format!("{count} new commits")
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::payload::fixtures::*;

	#[test]
	fn test_native_passes_payload_through() {
		let payload = create("branch", "refs/heads/feature");
		let set = TransformerSet::new("https://git.example.com/");
		let out = set.get(HookTaskType::Gogs).transform(&payload, "").unwrap();
		assert_eq!(out, payload.to_json().unwrap());
	}

	#[test]
	fn test_slack_meta_rejects_garbage() {
		assert!(matches!(
			SlackMeta::parse("{not json"),
			Err(WebhookError::InvalidMeta(_))
		));
		let meta = SlackMeta::parse(r##"{"channel":"#dev"}"##).unwrap();
		assert_eq!(meta.channel, "#dev");
		assert!(meta.color.is_empty());
	}

	#[test]
	fn test_title_case() {
		assert_eq!(title_case("branch"), "Branch");
		assert_eq!(title_case("label_updated"), "Label Updated");
		assert_eq!(title_case(""), "");
	}

	#[test]
	fn test_commits_desc() {
		assert_eq!(commits_desc(1), "1 new commit");
		assert_eq!(commits_desc(0), "0 new commits");
		assert_eq!(commits_desc(3), "3 new commits");
	}
}
