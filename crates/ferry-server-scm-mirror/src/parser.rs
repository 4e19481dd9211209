// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Reading ref transitions out of `git remote update` output.

use tracing::warn;

/// Placeholder git prints for a missing side of a transition.
pub const SHORT_EMPTY_ID: &str = "0000000";

/// Full-length null object ID, used as `before` for newly created refs.
pub const EMPTY_ID: &str = "0000000000000000000000000000000000000000";

const ARROW: &str = "-> ";

/// One ref transition reported by a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncResult {
	pub ref_name: String,
	pub old_commit_id: String,
	pub new_commit_id: String,
}

impl SyncResult {
	fn new(ref_name: &str, old_commit_id: &str, new_commit_id: &str) -> Self {
		Self {
			ref_name: ref_name.to_string(),
			old_commit_id: old_commit_id.to_string(),
			new_commit_id: new_commit_id.to_string(),
		}
	}

	pub fn is_new(&self) -> bool {
		self.old_commit_id == SHORT_EMPTY_ID
	}

	pub fn is_deleted(&self) -> bool {
		self.new_commit_id == SHORT_EMPTY_ID
	}

	/// Synthetic pull request refs are never replayed.
	pub fn is_pull_ref(&self) -> bool {
		self.ref_name.starts_with("refs/pull/")
	}
}

/// Parse the output of `git remote update`, keeping source order.
///
/// ```text
///  * [new branch]      develop    -> develop
///    b0bb24f..1d85a4f  master     -> master
///  - [deleted]         (none)     -> bugfix
/// ```
///
/// Lines without an arrow are ignored. Lines with an arrow but an
/// unrecognised shape are skipped with a warning.
pub fn parse_remote_update_output(output: &str) -> Vec<SyncResult> {
	let mut results = Vec::new();

	for line in output.lines() {
		let line = line.trim_end_matches('\r');
		let Some(arrow) = line.find(ARROW) else {
			continue;
		};
		let ref_name = line[arrow + ARROW.len()..].trim_end();

		if line.starts_with(" * ") {
			results.push(SyncResult::new(ref_name, SHORT_EMPTY_ID, ""));
		} else if line.starts_with(" - ") {
			results.push(SyncResult::new(ref_name, "", SHORT_EMPTY_ID));
		} else if let Some(rest) = line.strip_prefix("   ") {
			let Some(end) = rest.find(' ') else {
				warn!(line, "no space after commit range in remote update output");
				continue;
			};
			let shas: Vec<&str> = rest[..end].split("..").collect();
			if shas.len() != 2 {
				warn!(line, "expected <old>..<new> in remote update output");
				continue;
			}
			results.push(SyncResult::new(ref_name, shas[0], shas[1]));
		} else {
			warn!(line, "unrecognised line in remote update output");
		}
	}

	results
}
