// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::Serialize;

use super::{commits_desc, to_pretty_json, PayloadTransformer, SlackMeta};
use crate::error::Result;
use crate::payload::{
	ref_end_name, ApiUser, CreatePayload, DeletePayload, ForkPayload, HookCommentAction,
	HookIssueAction, IssueCommentPayload, IssuesPayload, Payload, PullRequestPayload,
	PushPayload, ReleasePayload,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SlackAttachment {
	pub fallback: String,
	pub color: String,
	pub title: String,
	pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SlackPayload {
	pub channel: String,
	pub text: String,
	pub username: String,
	pub icon_url: String,
	pub unfurl_links: u8,
	pub link_names: u8,
	pub attachments: Vec<SlackAttachment>,
}

pub struct SlackTransformer {
	site_url: String,
}

impl SlackTransformer {
	pub fn new(site_url: String) -> Self {
		Self { site_url }
	}

	fn sender_link(&self, sender: &ApiUser) -> String {
		link(&format!("{}{}", self.site_url, sender.username), &sender.username)
	}

	fn render(&self, payload: &Payload) -> (String, Option<(String, String)>) {
		match payload {
			Payload::Create(p) => (create_text(p), None),
			Payload::Delete(p) => (delete_text(p), None),
			Payload::Fork(p) => (fork_text(p), None),
			Payload::Push(p) => push_message(p),
			Payload::Issues(p) => self.issues_message(p),
			Payload::IssueComment(p) => self.comment_message(p),
			Payload::PullRequest(p) => self.pull_request_message(p),
			Payload::Release(p) => (self.release_text(p), None),
		}
	}

	fn issues_message(&self, p: &IssuesPayload) -> (String, Option<(String, String)>) {
		let repo = &p.repository.full_name;
		let sender = self.sender_link(&p.sender);
		let title_link = link(
			&format!("{}/issues/{}", p.repository.html_url, p.number),
			&format!("#{} {}", p.number, p.issue.title),
		);

		let text = match p.action {
			HookIssueAction::Opened => {
				let text = format!("[{repo}] New issue created by {sender}");
				return (text, Some((title_link, escape(&p.issue.body))));
			}
			HookIssueAction::Edited => {
				let text = format!("[{repo}] Issue edited: {title_link} by {sender}");
				return (text, Some((String::new(), escape(&p.issue.body))));
			}
			HookIssueAction::Closed => format!("[{repo}] Issue closed: {title_link} by {sender}"),
			HookIssueAction::Reopened => {
				format!("[{repo}] Issue re-opened: {title_link} by {sender}")
			}
			HookIssueAction::Assigned => {
				let assignee = p
					.issue
					.assignee
					.as_ref()
					.map(|a| self.sender_link(a))
					.unwrap_or_default();
				format!("[{repo}] Issue assigned to {assignee}: {title_link} by {sender}")
			}
			HookIssueAction::Unassigned => {
				format!("[{repo}] Issue unassigned: {title_link} by {sender}")
			}
			HookIssueAction::LabelUpdated => {
				format!("[{repo}] Issue labels updated: {title_link} by {sender}")
			}
			HookIssueAction::LabelCleared => {
				format!("[{repo}] Issue labels cleared: {title_link} by {sender}")
			}
			HookIssueAction::Milestoned => {
				format!("[{repo}] Issue milestoned: {title_link} by {sender}")
			}
			HookIssueAction::Demilestoned => {
				format!("[{repo}] Issue demilestoned: {title_link} by {sender}")
			}
			HookIssueAction::Synchronized => {
				format!("[{repo}] Issue synchronized: {title_link} by {sender}")
			}
		};
		(text, None)
	}

	fn comment_message(&self, p: &IssueCommentPayload) -> (String, Option<(String, String)>) {
		let repo = &p.repository.full_name;
		let sender = self.sender_link(&p.sender);
		let title = format!("#{} {}", p.issue.number, p.issue.title);

		match p.action {
			HookCommentAction::Created => (
				format!("[{repo}] New comment created by {sender}"),
				Some((link(&p.comment.html_url, &title), escape(&p.comment.body))),
			),
			HookCommentAction::Edited => (
				format!("[{repo}] Comment edited by {sender}"),
				Some((link(&p.comment.html_url, &title), escape(&p.comment.body))),
			),
			HookCommentAction::Deleted => {
				let issue_url = format!("{}/issues/{}", p.repository.html_url, p.issue.number);
				(
					format!("[{repo}] Comment deleted by {sender}"),
					Some((link(&issue_url, &title), String::new())),
				)
			}
		}
	}

	fn pull_request_message(&self, p: &PullRequestPayload) -> (String, Option<(String, String)>) {
		let repo = &p.repository.full_name;
		let sender = self.sender_link(&p.sender);
		let title_link = link(
			&format!("{}/pulls/{}", p.repository.html_url, p.number),
			&format!("#{} {}", p.number, p.pull_request.title),
		);

		let text = match p.action {
			HookIssueAction::Opened => {
				let text = format!("[{repo}] Pull request submitted by {sender}");
				return (text, Some((title_link, escape(&p.pull_request.body))));
			}
			HookIssueAction::Edited => {
				let text = format!("[{repo}] Pull request edited: {title_link} by {sender}");
				return (text, Some((String::new(), escape(&p.pull_request.body))));
			}
			HookIssueAction::Closed if p.pull_request.merged => {
				format!("[{repo}] Pull request merged: {title_link} by {sender}")
			}
			HookIssueAction::Closed => {
				format!("[{repo}] Pull request closed: {title_link} by {sender}")
			}
			HookIssueAction::Reopened => {
				format!("[{repo}] Pull request re-opened: {title_link} by {sender}")
			}
			HookIssueAction::Assigned => {
				let assignee = p
					.pull_request
					.assignee
					.as_ref()
					.map(|a| self.sender_link(a))
					.unwrap_or_default();
				format!("[{repo}] Pull request assigned to {assignee}: {title_link} by {sender}")
			}
			HookIssueAction::Unassigned => {
				format!("[{repo}] Pull request unassigned: {title_link} by {sender}")
			}
			HookIssueAction::LabelUpdated => {
				format!("[{repo}] Pull request labels updated: {title_link} by {sender}")
			}
			HookIssueAction::LabelCleared => {
				format!("[{repo}] Pull request labels cleared: {title_link} by {sender}")
			}
			HookIssueAction::Milestoned => {
				format!("[{repo}] Pull request milestoned: {title_link} by {sender}")
			}
			HookIssueAction::Demilestoned => {
				format!("[{repo}] Pull request demilestoned: {title_link} by {sender}")
			}
			HookIssueAction::Synchronized => {
				format!("[{repo}] Pull request synchronized: {title_link} by {sender}")
			}
		};
		(text, None)
	}

	fn release_text(&self, p: &ReleasePayload) -> String {
		let url = format!("{}/src/{}", p.repository.html_url, p.release.tag_name);
		format!(
			"[{}] new release {} published by {}",
			p.repository.full_name,
			link(&url, &p.release.tag_name),
			self.sender_link(&p.sender)
		)
	}
}

impl PayloadTransformer for SlackTransformer {
	fn transform(&self, payload: &Payload, meta: &str) -> Result<String> {
		let meta = SlackMeta::parse(meta)?;
		let (text, attachment) = self.render(payload);

		let attachments = attachment
			.map(|(title, text)| {
				vec![SlackAttachment {
					fallback: String::new(),
					color: meta.color.clone(),
					title,
					text,
				}]
			})
			.unwrap_or_default();

		to_pretty_json(&SlackPayload {
			channel: meta.channel,
			text,
			username: meta.username,
			icon_url: meta.icon_url,
			unfurl_links: 0,
			link_names: 0,
			attachments,
		})
	}
}

/// Slack treats `&`, `<` and `>` as control characters.
pub(crate) fn escape(s: &str) -> String {
	s.replace('&', "&amp;")
		.replace('<', "&lt;")
		.replace('>', "&gt;")
}

fn short_text(s: &str) -> String {
	escape(s.lines().next().unwrap_or_default())
}

fn link(url: &str, text: &str) -> String {
	format!("<{url}|{}>", escape(text))
}

fn create_text(p: &CreatePayload) -> String {
	let ref_name = ref_end_name(&p.ref_name);
	let repo_link = link(&p.repository.html_url, &p.repository.name);
	let ref_link = link(&format!("{}/src/{ref_name}", p.repository.html_url), ref_name);
	format!(
		"[{repo_link}:{ref_link}] {} created by {}",
		p.ref_type,
		escape(&p.sender.username)
	)
}

fn delete_text(p: &DeletePayload) -> String {
	let ref_name = ref_end_name(&p.ref_name);
	let repo_link = link(&p.repository.html_url, &p.repository.name);
	format!(
		"[{repo_link}:{}] {} deleted by {}",
		escape(ref_name),
		p.ref_type,
		escape(&p.sender.username)
	)
}

fn fork_text(p: &ForkPayload) -> String {
	let base_link = link(&p.repository.html_url, &p.repository.full_name);
	let fork_link = link(&p.forkee.html_url, &p.forkee.full_name);
	format!("{base_link} is forked to {fork_link}")
}

fn push_message(p: &PushPayload) -> (String, Option<(String, String)>) {
	let branch = ref_end_name(&p.ref_name);
	let desc = commits_desc(p.commits.len());
	let commit_string = if p.compare_url.is_empty() {
		desc
	} else {
		link(&p.compare_url, &desc)
	};

	let repo_link = link(&p.repository.html_url, &p.repository.name);
	let branch_link = link(&format!("{}/src/{branch}", p.repository.html_url), branch);
	let text = format!(
		"[{repo_link}:{branch_link}] {commit_string} pushed by {}",
		escape(&p.pusher.username)
	);

	let attachment_text = p
		.commits
		.iter()
		.map(|c| {
			format!(
				"{}: {} - {}",
				link(&c.url, c.short_id()),
				short_text(&c.message),
				escape(&c.author.name)
			)
		})
		.collect::<Vec<_>>()
		.join("\n");

	(text, Some((String::new(), attachment_text)))
}
