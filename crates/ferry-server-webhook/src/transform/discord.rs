// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::Serialize;

use super::{commits_desc, markdown_link, to_pretty_json, PayloadTransformer, SlackMeta};
use crate::error::Result;
use crate::payload::{
	ref_end_name, ApiUser, HookCommentAction, HookIssueAction, Payload, PullRequestPayload,
	PushPayload,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscordEmbedFooter {
	pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscordEmbedAuthor {
	pub name: String,
	pub url: String,
	pub icon_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscordEmbedField {
	pub name: String,
	pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscordEmbed {
	pub title: String,
	pub description: String,
	pub url: String,
	pub color: i64,
	pub footer: Option<DiscordEmbedFooter>,
	pub author: Option<DiscordEmbedAuthor>,
	pub fields: Vec<DiscordEmbedField>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscordPayload {
	pub content: String,
	pub username: String,
	pub avatar_url: String,
	pub embeds: Vec<DiscordEmbed>,
}

pub struct DiscordTransformer {
	site_url: String,
}

/// `#439FE0` style colors; anything unparsable renders as black.
fn parse_color(color: &str) -> i64 {
	i64::from_str_radix(color.trim_start_matches('#'), 16).unwrap_or(0)
}

fn sha_link(url: &str, sha: &str) -> String {
	format!("[`{sha}`]({url})")
}

impl DiscordTransformer {
	pub fn new(site_url: String) -> Self {
		Self { site_url }
	}

	fn author(&self, sender: &ApiUser) -> DiscordEmbedAuthor {
		DiscordEmbedAuthor {
			name: sender.username.clone(),
			url: format!("{}{}", self.site_url, sender.username),
			icon_url: sender.avatar_url.clone(),
		}
	}

	fn embed(&self, payload: &Payload) -> DiscordEmbed {
		match payload {
			Payload::Create(p) => {
				let ref_name = ref_end_name(&p.ref_name);
				let repo_link = markdown_link(&p.repository.html_url, &p.repository.name);
				let ref_link =
					markdown_link(&format!("{}/src/{ref_name}", p.repository.html_url), ref_name);
				DiscordEmbed {
					description: format!("Created new {}: {repo_link}/{ref_link}", p.ref_type),
					url: format!("{}{}", self.site_url, p.sender.username),
					..Default::default()
				}
			}
			Payload::Delete(p) => {
				let repo_link = markdown_link(&p.repository.html_url, &p.repository.name);
				DiscordEmbed {
					description: format!(
						"Deleted {}: {repo_link}/{}",
						p.ref_type,
						ref_end_name(&p.ref_name)
					),
					url: format!("{}{}", self.site_url, p.sender.username),
					..Default::default()
				}
			}
			Payload::Fork(p) => DiscordEmbed {
				description: format!(
					"{} is forked to {}",
					markdown_link(&p.repository.html_url, &p.repository.full_name),
					markdown_link(&p.forkee.html_url, &p.forkee.full_name)
				),
				url: p.forkee.html_url.clone(),
				..Default::default()
			},
			Payload::Push(p) => DiscordEmbed {
				description: push_description(p),
				url: format!("{}{}", self.site_url, p.sender.username),
				..Default::default()
			},
			Payload::Issues(p) => {
				let title = format!("#{} {}", p.number, p.issue.title);
				let (title, description, fields) = issue_like(
					"Issue",
					p.action,
					title,
					&p.issue.body,
					false,
					p.issue.assignee.as_ref(),
					p.issue.labels.iter().map(|l| l.name.as_str()),
				);
				DiscordEmbed {
					title,
					description,
					url: format!("{}/issues/{}", p.repository.html_url, p.number),
					footer: Some(DiscordEmbedFooter {
						text: p.repository.full_name.clone(),
					}),
					fields,
					..Default::default()
				}
			}
			Payload::IssueComment(p) => {
				let title = format!("#{} {}", p.issue.number, p.issue.title);
				let (title, description, url) = match p.action {
					HookCommentAction::Created => (
						format!("New comment: {title}"),
						p.comment.body.clone(),
						p.comment.html_url.clone(),
					),
					HookCommentAction::Edited => (
						format!("Comment edited: {title}"),
						p.comment.body.clone(),
						p.comment.html_url.clone(),
					),
					HookCommentAction::Deleted => (
						format!("Comment deleted: {title}"),
						String::new(),
						format!("{}/issues/{}", p.repository.html_url, p.issue.number),
					),
				};
				DiscordEmbed {
					title,
					description,
					url,
					footer: Some(DiscordEmbedFooter {
						text: p.repository.full_name.clone(),
					}),
					..Default::default()
				}
			}
			Payload::PullRequest(p) => pull_request_embed(p),
			Payload::Release(p) => {
				let url = format!("{}/src/{}", p.repository.html_url, p.release.tag_name);
				DiscordEmbed {
					title: format!("New release published: {}", p.release.tag_name),
					description: p.release.body.clone(),
					url,
					footer: Some(DiscordEmbedFooter {
						text: p.repository.full_name.clone(),
					}),
					..Default::default()
				}
			}
		}
	}
}

impl PayloadTransformer for DiscordTransformer {
	fn transform(&self, payload: &Payload, meta: &str) -> Result<String> {
		let meta = SlackMeta::parse(meta)?;
		let sender = match payload {
			Payload::Create(p) => &p.sender,
			Payload::Delete(p) => &p.sender,
			Payload::Fork(p) => &p.sender,
			Payload::Push(p) => &p.sender,
			Payload::Issues(p) => &p.sender,
			Payload::IssueComment(p) => &p.sender,
			Payload::PullRequest(p) => &p.sender,
			Payload::Release(p) => &p.sender,
		};

		let mut embed = self.embed(payload);
		embed.color = parse_color(&meta.color);
		embed.author = Some(self.author(sender));

		to_pretty_json(&DiscordPayload {
			content: String::new(),
			username: meta.username,
			avatar_url: meta.icon_url,
			embeds: vec![embed],
		})
	}
}

fn push_description(p: &PushPayload) -> String {
	let branch = ref_end_name(&p.ref_name);
	let desc = commits_desc(p.commits.len());
	let commit_string = if p.compare_url.is_empty() {
		desc
	} else {
		markdown_link(&p.compare_url, &desc)
	};

	let repo_link = markdown_link(&p.repository.html_url, &p.repository.name);
	let branch_link = markdown_link(&format!("{}/src/{branch}", p.repository.html_url), branch);

	let commits = p
		.commits
		.iter()
		.map(|c| format!("{} {} - {}", sha_link(&c.url, c.short_id()), c.summary(), c.author.name))
		.collect::<Vec<_>>()
		.join("\n");

	format!("Pushed {commit_string} to {repo_link}/{branch_link}\n{commits}")
}

fn pull_request_embed(p: &PullRequestPayload) -> DiscordEmbed {
	let title = format!("#{} {}", p.number, p.pull_request.title);
	let (title, description, fields) = issue_like(
		"Pull request",
		p.action,
		title,
		&p.pull_request.body,
		p.pull_request.merged,
		p.pull_request.assignee.as_ref(),
		p.pull_request.labels.iter().map(|l| l.name.as_str()),
	);
	DiscordEmbed {
		title,
		description,
		url: format!("{}/pulls/{}", p.repository.html_url, p.number),
		footer: Some(DiscordEmbedFooter {
			text: p.repository.full_name.clone(),
		}),
		fields,
		..Default::default()
	}
}

fn issue_like<'a>(
	kind: &str,
	action: HookIssueAction,
	title: String,
	body: &str,
	merged: bool,
	assignee: Option<&ApiUser>,
	labels: impl Iterator<Item = &'a str>,
) -> (String, String, Vec<DiscordEmbedField>) {
	let mut description = String::new();
	let mut fields = Vec::new();

	let title = match action {
		HookIssueAction::Opened => {
			description = body.to_string();
			format!("New {}: {title}", kind.to_lowercase())
		}
		HookIssueAction::Closed if merged => format!("{kind} merged: {title}"),
		HookIssueAction::Closed => format!("{kind} closed: {title}"),
		HookIssueAction::Reopened => format!("{kind} re-opened: {title}"),
		HookIssueAction::Edited => {
			description = body.to_string();
			format!("{kind} edited: {title}")
		}
		HookIssueAction::Assigned => {
			fields.push(DiscordEmbedField {
				name: "New Assignee".to_string(),
				value: assignee.map(|a| a.username.clone()).unwrap_or_default(),
			});
			format!("{kind} assigned: {title}")
		}
		HookIssueAction::Unassigned => format!("{kind} unassigned: {title}"),
		HookIssueAction::LabelUpdated => {
			fields.push(DiscordEmbedField {
				name: "Labels".to_string(),
				value: labels.collect::<Vec<_>>().join(", "),
			});
			format!("{kind} labels updated: {title}")
		}
		HookIssueAction::LabelCleared => format!("{kind} labels cleared: {title}"),
		HookIssueAction::Milestoned => format!("{kind} milestoned: {title}"),
		HookIssueAction::Demilestoned => format!("{kind} demilestoned: {title}"),
		HookIssueAction::Synchronized => format!("{kind} synchronized: {title}"),
	};

	(title, description, fields)
}
