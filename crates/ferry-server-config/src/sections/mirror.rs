// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Mirror synchronization configuration section.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MirrorConfigLayer {
	pub queue_length: Option<usize>,
	pub default_interval_hours: Option<u64>,
	pub scan_interval_secs: Option<u64>,
	pub git_timeout_secs: Option<u64>,
	pub probe_timeout_secs: Option<u64>,
	pub feed_max_commit_num: Option<usize>,
}

impl MirrorConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.queue_length.is_some() {
			self.queue_length = other.queue_length;
		}
		if other.default_interval_hours.is_some() {
			self.default_interval_hours = other.default_interval_hours;
		}
		if other.scan_interval_secs.is_some() {
			self.scan_interval_secs = other.scan_interval_secs;
		}
		if other.git_timeout_secs.is_some() {
			self.git_timeout_secs = other.git_timeout_secs;
		}
		if other.probe_timeout_secs.is_some() {
			self.probe_timeout_secs = other.probe_timeout_secs;
		}
		if other.feed_max_commit_num.is_some() {
			self.feed_max_commit_num = other.feed_max_commit_num;
		}
	}

	pub fn finalize(self) -> MirrorConfig {
		let defaults = MirrorConfig::default();
		MirrorConfig {
			queue_length: self.queue_length.unwrap_or(defaults.queue_length),
			default_interval_hours: self
				.default_interval_hours
				.unwrap_or(defaults.default_interval_hours),
			scan_interval_secs: self.scan_interval_secs.unwrap_or(defaults.scan_interval_secs),
			git_timeout_secs: self.git_timeout_secs.unwrap_or(defaults.git_timeout_secs),
			probe_timeout_secs: self.probe_timeout_secs.unwrap_or(defaults.probe_timeout_secs),
			feed_max_commit_num: self
				.feed_max_commit_num
				.unwrap_or(defaults.feed_max_commit_num),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MirrorConfig {
	pub queue_length: usize,
	pub default_interval_hours: u64,
	pub scan_interval_secs: u64,
	pub git_timeout_secs: u64,
	pub probe_timeout_secs: u64,
	/// Commits kept in a mirror push action's newsfeed content.
	pub feed_max_commit_num: usize,
}

impl Default for MirrorConfig {
	fn default() -> Self {
		Self {
			queue_length: 1000,
			default_interval_hours: 8,
			scan_interval_secs: 600, // 10 minutes
			git_timeout_secs: 300,
			probe_timeout_secs: 60,
			feed_max_commit_num: 5,
		}
	}
}

impl MirrorConfig {
	pub fn scan_interval(&self) -> Duration {
		Duration::from_secs(self.scan_interval_secs)
	}

	pub fn git_timeout(&self) -> Duration {
		Duration::from_secs(self.git_timeout_secs)
	}

	pub fn probe_timeout(&self) -> Duration {
		Duration::from_secs(self.probe_timeout_secs)
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		let positive = [
			("mirror.queue_length", self.queue_length as u64),
			("mirror.default_interval_hours", self.default_interval_hours),
			("mirror.scan_interval_secs", self.scan_interval_secs),
			("mirror.git_timeout_secs", self.git_timeout_secs),
			("mirror.probe_timeout_secs", self.probe_timeout_secs),
		];
		for (key, value) in positive {
			if value == 0 {
				return Err(ConfigError::Validation(format!("{key} must be greater than zero")));
			}
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_layer_finalize_defaults() {
		let config = MirrorConfigLayer::default().finalize();
		assert_eq!(config, MirrorConfig::default());
		assert_eq!(config.git_timeout(), Duration::from_secs(300));
		assert_eq!(config.feed_max_commit_num, 5);
	}

	#[test]
	fn test_merge_overwrites_only_set_fields() {
		let mut base = MirrorConfigLayer {
			queue_length: Some(50),
			git_timeout_secs: Some(10),
			..Default::default()
		};
		base.merge(MirrorConfigLayer {
			git_timeout_secs: Some(30),
			..Default::default()
		});
		assert_eq!(base.queue_length, Some(50));
		assert_eq!(base.git_timeout_secs, Some(30));
	}

	#[test]
	fn test_zero_timeout_rejected() {
		let config = MirrorConfig {
			probe_timeout_secs: 0,
			..Default::default()
		};
		let err = config.validate().unwrap_err();
		assert!(err.to_string().contains("mirror.probe_timeout_secs"));
	}

	#[test]
	fn test_deserialize_layer_partial() {
		let layer: MirrorConfigLayer = toml::from_str("scan_interval_secs = 120").unwrap();
		assert_eq!(layer.scan_interval_secs, Some(120));
		assert!(layer.queue_length.is_none());
	}
}
