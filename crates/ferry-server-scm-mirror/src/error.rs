// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MirrorError>;

#[derive(Error, Debug)]
pub enum MirrorError {
	#[error("not found: {0}")]
	NotFound(String),

	#[error("git operation failed: {0}")]
	GitError(String),

	#[error("scm error: {0}")]
	Scm(#[from] ferry_server_scm::ScmError),

	#[error("db error: {0}")]
	Db(#[from] ferry_server_db::DbError),

	#[error("webhook error: {0}")]
	Webhook(#[from] ferry_server_webhook::WebhookError),

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}
