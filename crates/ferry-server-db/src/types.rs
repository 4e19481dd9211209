// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};

use crate::error::DbError;

/// Timestamps are stored as unix seconds.
pub(crate) fn from_unix(secs: i64) -> Result<DateTime<Utc>, DbError> {
	DateTime::from_timestamp(secs, 0)
		.ok_or_else(|| DbError::Internal(format!("timestamp out of range: {secs}")))
}

pub(crate) fn flag(value: i64) -> bool {
	value != 0
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_from_unix_roundtrip() {
		let dt = from_unix(1_700_000_000).unwrap();
		assert_eq!(dt.timestamp(), 1_700_000_000);
	}

	#[test]
	fn test_from_unix_out_of_range() {
		assert!(matches!(from_unix(i64::MAX), Err(DbError::Internal(_))));
	}
}
