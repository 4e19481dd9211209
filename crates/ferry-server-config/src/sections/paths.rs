// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Filesystem locations.

use std::path::PathBuf;

use serde::Deserialize;

const DEFAULT_REPOSITORY_ROOT: &str = "./data/repositories";

#[derive(Debug, Clone)]
pub struct PathsConfig {
	/// Bare repositories live at `<repository_root>/<owner>/<name>.git`.
	pub repository_root: PathBuf,
}

impl Default for PathsConfig {
	fn default() -> Self {
		Self {
			repository_root: PathBuf::from(DEFAULT_REPOSITORY_ROOT),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfigLayer {
	#[serde(default)]
	pub repository_root: Option<PathBuf>,
}

impl PathsConfigLayer {
	pub fn merge(&mut self, other: PathsConfigLayer) {
		if other.repository_root.is_some() {
			self.repository_root = other.repository_root;
		}
	}

	pub fn finalize(self) -> PathsConfig {
		PathsConfig {
			repository_root: self
				.repository_root
				.unwrap_or_else(|| PathBuf::from(DEFAULT_REPOSITORY_ROOT)),
		}
	}
}
