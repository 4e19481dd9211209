// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#[derive(Debug, thiserror::Error)]
pub enum JobError {
	/// The run is over; the next scheduled run is the only retry.
	#[error("Job failed: {message}")]
	Failed { message: String },

	#[error("Job cancelled")]
	Cancelled,
}

pub type Result<T> = std::result::Result<T, JobError>;
