// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScmError>;

#[derive(Error, Debug)]
pub enum ScmError {
	#[error("git error: {0}")]
	GitError(String),

	#[error("ref not found: {0}")]
	RefNotFound(String),

	#[error("object not found: {0}")]
	ObjectNotFound(String),

	#[error("git {command} timed out after {}s", timeout.as_secs())]
	Timeout { command: String, timeout: Duration },

	#[error("io error: {0}")]
	Io(#[from] std::io::Error),
}
