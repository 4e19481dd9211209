// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use ferry_server_db::DbError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebhookError {
	#[error("webhook not found: {0}")]
	NotFound(String),

	#[error("payload transform failed: {0}")]
	Transform(String),

	#[error("invalid webhook meta: {0}")]
	InvalidMeta(String),

	#[error("invalid webhook record: {0}")]
	InvalidRecord(String),

	#[error(transparent)]
	Db(#[from] DbError),

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WebhookError>;
