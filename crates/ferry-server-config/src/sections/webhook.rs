// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Webhook delivery configuration section.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WebhookConfigLayer {
	pub queue_length: Option<usize>,
	pub deliver_timeout_secs: Option<u64>,
	pub skip_tls_verify: Option<bool>,
	pub paging_num: Option<u32>,
}

impl WebhookConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.queue_length.is_some() {
			self.queue_length = other.queue_length;
		}
		if other.deliver_timeout_secs.is_some() {
			self.deliver_timeout_secs = other.deliver_timeout_secs;
		}
		if other.skip_tls_verify.is_some() {
			self.skip_tls_verify = other.skip_tls_verify;
		}
		if other.paging_num.is_some() {
			self.paging_num = other.paging_num;
		}
	}

	pub fn finalize(self) -> WebhookConfig {
		let defaults = WebhookConfig::default();
		WebhookConfig {
			queue_length: self.queue_length.unwrap_or(defaults.queue_length),
			deliver_timeout_secs: self
				.deliver_timeout_secs
				.unwrap_or(defaults.deliver_timeout_secs),
			skip_tls_verify: self.skip_tls_verify.unwrap_or(defaults.skip_tls_verify),
			paging_num: self.paging_num.unwrap_or(defaults.paging_num),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebhookConfig {
	pub queue_length: usize,
	pub deliver_timeout_secs: u64,
	/// Skip certificate verification for every webhook, regardless of the
	/// per-webhook flag.
	pub skip_tls_verify: bool,
	/// Page size for delivery history listings.
	pub paging_num: u32,
}

impl Default for WebhookConfig {
	fn default() -> Self {
		Self {
			queue_length: 1000,
			deliver_timeout_secs: 15,
			skip_tls_verify: false,
			paging_num: 10,
		}
	}
}

impl WebhookConfig {
	pub fn deliver_timeout(&self) -> Duration {
		Duration::from_secs(self.deliver_timeout_secs)
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.queue_length == 0 {
			return Err(ConfigError::Validation(
				"webhook.queue_length must be greater than zero".to_string(),
			));
		}
		if self.deliver_timeout_secs == 0 {
			return Err(ConfigError::Validation(
				"webhook.deliver_timeout_secs must be greater than zero".to_string(),
			));
		}
		Ok(())
	}
}
