// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Throwaway repositories built with the `git` binary.

use std::path::{Path, PathBuf};
use std::process::Command;

pub struct Fixture {
	_temp: tempfile::TempDir,
	pub root: PathBuf,
	/// Bare upstream repository.
	pub source: PathBuf,
	work: PathBuf,
}

impl Fixture {
	pub fn new() -> Self {
		let temp = tempfile::tempdir().unwrap();
		let root = temp.path().to_path_buf();
		let source = root.join("source.git");
		let work = root.join("work");

		git(&root, &["-c", "init.defaultBranch=master", "init", "--bare", "source.git"]);
		git(&root, &["-c", "init.defaultBranch=master", "clone", "source.git", "work"]);

		Self {
			_temp: temp,
			root,
			source,
			work,
		}
	}

	pub fn commit(&self, branch: &str, message: &str) -> String {
		self.commit_with_env(branch, message, &[])
	}

	pub fn commit_at(&self, branch: &str, message: &str, unix: i64) -> String {
		let date = format!("@{unix} +0000");
		self.commit_with_env(
			branch,
			message,
			&[("GIT_AUTHOR_DATE", &date), ("GIT_COMMITTER_DATE", &date)],
		)
	}

	fn commit_with_env(&self, branch: &str, message: &str, env: &[(&str, &str)]) -> String {
		let _ = Command::new("git")
			.args(["checkout", "-q", "-B", branch])
			.current_dir(&self.work)
			.output();
		std::fs::write(self.work.join("file.txt"), message).unwrap();
		git(&self.work, &["add", "."]);

		let mut cmd = Command::new("git");
		cmd.args([
			"-c",
			"user.email=test@test.com",
			"-c",
			"user.name=Test",
			"commit",
			"-q",
			"-m",
			message,
		])
		.current_dir(&self.work);
		for (key, value) in env {
			cmd.env(key, value);
		}
		let output = cmd.output().unwrap();
		assert!(output.status.success(), "git commit failed: {output:?}");

		git(
			&self.work,
			&["push", "-q", "-f", "origin", &format!("HEAD:refs/heads/{branch}")],
		);
		git(&self.work, &["rev-parse", "HEAD"]).trim().to_string()
	}

	pub fn tag(&self, name: &str) {
		git(&self.work, &["tag", name]);
		git(&self.work, &["push", "-q", "origin", &format!("refs/tags/{name}")]);
	}

	pub fn delete_branch(&self, branch: &str) {
		git(&self.work, &["push", "-q", "origin", "--delete", branch]);
	}

	/// `git clone --mirror` of the upstream into `<root>/<name>`.
	pub fn mirror(&self, name: &str) -> PathBuf {
		git(&self.root, &["clone", "-q", "--mirror", "source.git", name]);
		self.root.join(name)
	}
}

pub fn git(dir: &Path, args: &[&str]) -> String {
	let output = Command::new("git")
		.args(args)
		.current_dir(dir)
		.output()
		.expect("git not installed");
	assert!(
		output.status.success(),
		"git {args:?} failed: {}",
		String::from_utf8_lossy(&output.stderr)
	);
	String::from_utf8_lossy(&output.stdout).to_string()
}
