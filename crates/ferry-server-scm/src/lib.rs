// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Git access for mirrored repositories.
//!
//! Reads go through gitoxide; network and maintenance operations shell out
//! to `git` with a timeout.

pub mod client;
pub mod command;
pub mod error;
pub mod git;
pub mod layout;
#[cfg(test)]
mod testing;
pub mod types;

pub use client::{GitClient, LocalGitClient};
pub use command::parse_count_objects;
pub use error::{Result, ScmError};
pub use git::GitRepository;
pub use layout::{repo_path, wiki_path};
pub use types::CommitInfo;
