// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `git` subprocesses for the operations gitoxide does not cover: remote
//! updates, ls-remote probes, object counting and config reads.

use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, ScmError};

/// Run `git <args>` in `dir`, killing the child if it outlives `timeout`.
/// A non-zero exit is returned as `GitError` carrying trimmed stderr.
pub(crate) async fn run_git(dir: Option<&Path>, args: &[&str], timeout: Duration) -> Result<Output> {
	let mut cmd = Command::new("git");
	cmd.args(args)
		.env("GIT_TERMINAL_PROMPT", "0")
		.stdin(Stdio::null())
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.kill_on_drop(true);
	if let Some(dir) = dir {
		cmd.current_dir(dir);
	}

	let command = args.first().copied().unwrap_or_default().to_string();
	debug!(command = %command, dir = ?dir, "running git");

	let output = tokio::time::timeout(timeout, cmd.output())
		.await
		.map_err(|_| ScmError::Timeout {
			command: command.clone(),
			timeout,
		})??;

	if !output.status.success() {
		let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
		let message = if stderr.is_empty() {
			format!("git {command} exited with {}", output.status)
		} else {
			stderr
		};
		return Err(ScmError::GitError(message));
	}
	Ok(output)
}

/// Total on-disk object size in bytes from `git count-objects -v` output:
/// loose `size` plus `size-pack`, both reported in KiB.
pub fn parse_count_objects(output: &str) -> i64 {
	output
		.lines()
		.filter_map(|line| line.split_once(": "))
		.filter(|(key, _)| *key == "size" || *key == "size-pack")
		.filter_map(|(_, value)| value.trim().parse::<i64>().ok())
		.sum::<i64>()
		* 1024
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn test_parse_count_objects() {
		let output = "count: 3\nsize: 12\nin-pack: 40\npacks: 1\nsize-pack: 100\nprune-packable: 0\ngarbage: 0\nsize-garbage: 0\n";
		assert_eq!(parse_count_objects(output), 112 * 1024);
	}

	#[test]
	fn test_parse_count_objects_ignores_garbage_size() {
		assert_eq!(parse_count_objects("size-garbage: 50\n"), 0);
		assert_eq!(parse_count_objects(""), 0);
	}

	#[tokio::test]
	async fn test_run_git_reports_stderr() {
		let temp = tempfile::tempdir().unwrap();
		let err = run_git(
			Some(temp.path()),
			&["rev-parse", "HEAD"],
			Duration::from_secs(30),
		)
		.await
		.unwrap_err();
		assert!(matches!(err, ScmError::GitError(ref msg) if !msg.is_empty()));
	}

	proptest! {
		#[test]
		fn parse_count_objects_sums_both_sizes(loose in 0i64..1_000_000, packed in 0i64..1_000_000) {
			let output = format!("count: 1\nsize: {loose}\nsize-pack: {packed}\n");
			prop_assert_eq!(parse_count_objects(&output), (loose + packed) * 1024);
		}
	}
}
