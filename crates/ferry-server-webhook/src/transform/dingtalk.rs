// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::Serialize;

use super::{markdown_link, title_case, to_pretty_json, PayloadTransformer};
use crate::error::Result;
use crate::payload::{
	ref_end_name, HookCommentAction, HookIssueAction, IssueCommentPayload, IssuesPayload,
	Payload, PullRequestPayload, PushPayload, ReleasePayload,
};

pub const NOTIFICATION_TITLE: &str = "Gogs Notification";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DingtalkActionCard {
	pub title: String,
	pub text: String,
	pub hide_avatar: String,
	pub btn_orientation: String,
	pub single_title: String,
	#[serde(rename = "singleURL")]
	pub single_url: String,
}

impl DingtalkActionCard {
	fn new(single_title: &str, single_url: &str) -> Self {
		Self {
			title: NOTIFICATION_TITLE.to_string(),
			single_title: single_title.to_string(),
			single_url: single_url.to_string(),
			..Default::default()
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DingtalkAt {
	pub at_mobiles: Vec<String>,
	pub is_at_all: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DingtalkPayload {
	pub msgtype: String,
	pub at: DingtalkAt,
	#[serde(rename = "actionCard")]
	pub action_card: DingtalkActionCard,
}

/// DingTalk robots take no per-hook settings; `meta` is ignored.
pub struct DingtalkTransformer;

impl PayloadTransformer for DingtalkTransformer {
	fn transform(&self, payload: &Payload, _meta: &str) -> Result<String> {
		let action_card = match payload {
			Payload::Create(p) => {
				let ref_name = ref_end_name(&p.ref_name);
				let ref_type = title_case(&p.ref_type);
				let ref_url = format!("{}/src/{ref_name}", p.repository.html_url);

				let mut card = DingtalkActionCard::new(&format!("View {ref_type}"), &ref_url);
				card.text = format!(
					"# New {ref_type} Create Event\n- Repo: **{}**\n- New {ref_type}: **{}**",
					markdown_link(&p.repository.html_url, &p.repository.name),
					markdown_link(&ref_url, ref_name),
				);
				card
			}
			Payload::Delete(p) => {
				let ref_type = title_case(&p.ref_type);
				let mut card = DingtalkActionCard::new("View Repo", &p.repository.html_url);
				card.text = format!(
					"# {ref_type} Delete Event\n- Repo: **{}**\n- {ref_type}: **{}**",
					markdown_link(&p.repository.html_url, &p.repository.name),
					ref_end_name(&p.ref_name),
				);
				card
			}
			Payload::Fork(p) => {
				let mut card = DingtalkActionCard::new("View Forkee", &p.forkee.html_url);
				card.text = format!(
					"# Repo Fork Event\n- From Repo: **{}**\n- To Repo: **{}**",
					markdown_link(&p.repository.html_url, &p.repository.name),
					markdown_link(&p.forkee.html_url, &p.forkee.full_name),
				);
				card
			}
			Payload::Push(p) => push_card(p),
			Payload::Issues(p) => issues_card(p),
			Payload::IssueComment(p) => comment_card(p),
			Payload::PullRequest(p) => pull_request_card(p),
			Payload::Release(p) => release_card(p),
		};

		to_pretty_json(&DingtalkPayload {
			msgtype: "actionCard".to_string(),
			at: DingtalkAt::default(),
			action_card,
		})
	}
}

fn push_card(p: &PushPayload) -> DingtalkActionCard {
	let ref_name = ref_end_name(&p.ref_name);
	let pusher = if p.pusher.full_name.is_empty() {
		&p.pusher.username
	} else {
		&p.pusher.full_name
	};

	let detail: String = p
		.commits
		.iter()
		.enumerate()
		.map(|(i, c)| {
			format!(
				"> {i}. {} {} - {}\n",
				markdown_link(&c.url, c.short_id()),
				c.author.name,
				c.summary()
			)
		})
		.collect();

	let mut card = DingtalkActionCard::new("View Changes", &p.compare_url);
	card.text = format!(
		"# Repo Push Event\n- Repo: **{}**\n- Ref: **{}**\n- Pusher: **{pusher}**\n## Total {} commits(s)\n{detail}",
		markdown_link(&p.repository.html_url, &p.repository.name),
		markdown_link(&format!("{}/src/{ref_name}", p.repository.html_url), ref_name),
		p.commits.len(),
	);
	card
}

fn issues_card(p: &IssuesPayload) -> DingtalkActionCard {
	let issue_name = format!("#{} {}", p.number, p.issue.title);
	let issue_url = format!("{}/issues/{}", p.repository.html_url, p.number);

	let mut card = DingtalkActionCard::new("View Issue", &issue_url);
	card.text = format!(
		"# Issue Event {}\n- Issue: **{}**",
		title_case(p.action.as_str()),
		markdown_link(&issue_url, &issue_name)
	);

	match p.action {
		HookIssueAction::Assigned => {
			let assignee = p.issue.assignee.as_ref().map(|a| a.username.as_str());
			card.text += &format!("\n- New Assignee: **{}**", assignee.unwrap_or_default());
		}
		HookIssueAction::Milestoned => {
			let milestone = p.issue.milestone.as_ref().map(|m| m.title.as_str());
			card.text += &format!("\n- New Milestone: **{}**", milestone.unwrap_or_default());
		}
		HookIssueAction::LabelUpdated if p.issue.labels.is_empty() => {
			card.text += "\n- Labels: **empty**";
		}
		HookIssueAction::LabelUpdated => {
			let labels: Vec<String> = p
				.issue
				.labels
				.iter()
				.map(|l| format!("**{}**", l.name))
				.collect();
			card.text += &format!("\n- Labels: {}", labels.join(","));
		}
		_ => {}
	}

	if !p.issue.body.is_empty() {
		card.text += &format!("\n> {}", p.issue.body);
	}
	card
}

fn comment_card(p: &IssueCommentPayload) -> DingtalkActionCard {
	let issue_name = format!("#{} {}", p.issue.number, p.issue.title);
	let issue_url = format!("{}/issues/{}", p.repository.html_url, p.issue.number);
	let comment_url = match p.action {
		HookCommentAction::Deleted => issue_url.clone(),
		_ => p.comment.html_url.clone(),
	};

	let mut card = DingtalkActionCard::new("View Issue Comment", &comment_url);
	card.text = format!(
		"# Issue Comment {}\n- Issue: {}\n- Comment content: \n> {}",
		title_case(p.action.as_str()),
		markdown_link(&issue_url, &issue_name),
		p.comment.body
	);
	card
}

fn pull_request_card(p: &PullRequestPayload) -> DingtalkActionCard {
	let title = if p.action == HookIssueAction::Closed && p.pull_request.merged {
		"# Pull Request Merged".to_string()
	} else {
		format!("# Pull Request {}", title_case(p.action.as_str()))
	};
	let url = format!("{}/pulls/{}", p.repository.html_url, p.number);

	let mut content = format!(
		"- PR: {}",
		markdown_link(&url, &format!("#{} {}", p.number, p.pull_request.title))
	);
	match p.action {
		HookIssueAction::Assigned => {
			let assignee = p.pull_request.assignee.as_ref().map(|a| a.username.as_str());
			content += &format!("\n- New Assignee: **{}**", assignee.unwrap_or_default());
		}
		HookIssueAction::Milestoned => {
			let milestone = p.pull_request.milestone.as_ref().map(|m| m.title.as_str());
			content += &format!("\n- New Milestone: *{}*", milestone.unwrap_or_default());
		}
		HookIssueAction::LabelUpdated => {
			let labels: Vec<String> = p
				.pull_request
				.labels
				.iter()
				.map(|l| format!("**{}**", l.name))
				.collect();
			content += &format!("\n- New Labels: {}", labels.join(","));
		}
		_ => {}
	}

	let mut card = DingtalkActionCard::new("View Pull Request", &url);
	card.text = format!("{title}\n{content}");
	if matches!(p.action, HookIssueAction::Opened | HookIssueAction::Edited) {
		card.text += &format!("\n> {}", p.pull_request.body);
	}
	card
}

fn release_card(p: &ReleasePayload) -> DingtalkActionCard {
	let url = format!("{}/src/{}", p.repository.html_url, p.release.tag_name);
	let author = if p.release.author.full_name.is_empty() {
		&p.release.author.username
	} else {
		&p.release.author.full_name
	};

	let mut card = DingtalkActionCard::new("View Release", &url);
	card.text = format!(
		"# New Release Published\n- Repo: {}\n- Tag: {}\n- Author: {author}\n- Draft?: {}\n- Pre Release?: {}\n- Title: {}",
		markdown_link(&p.repository.html_url, &p.repository.name),
		markdown_link(&url, &p.release.tag_name),
		p.release.draft,
		p.release.prerelease,
		p.release.name,
	);
	if !p.release.body.is_empty() {
		card.text += &format!("\n- Note: {}", p.release.body);
	}
	card
}
