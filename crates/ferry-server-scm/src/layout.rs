// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! On-disk repository layout.

use std::path::{Path, PathBuf};

/// `<root>/<owner>/<name>.git`, lowercased.
pub fn repo_path(root: &Path, owner: &str, name: &str) -> PathBuf {
	root
		.join(owner.to_lowercase())
		.join(format!("{}.git", name.to_lowercase()))
}

/// `<root>/<owner>/<name>.wiki.git`, lowercased.
pub fn wiki_path(root: &Path, owner: &str, name: &str) -> PathBuf {
	root
		.join(owner.to_lowercase())
		.join(format!("{}.wiki.git", name.to_lowercase()))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_paths_are_lowercased() {
		let root = Path::new("/srv/git");
		assert_eq!(
			repo_path(root, "Alice", "Widgets"),
			PathBuf::from("/srv/git/alice/widgets.git")
		);
		assert_eq!(
			wiki_path(root, "Alice", "Widgets"),
			PathBuf::from("/srv/git/alice/widgets.wiki.git")
		);
	}
}
