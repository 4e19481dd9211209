// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Public site address, used to build links in webhook payloads and feeds.

use serde::Deserialize;

use crate::error::ConfigError;

const DEFAULT_EXTERNAL_URL: &str = "http://localhost:3000/";

#[derive(Debug, Clone)]
pub struct SiteConfig {
	/// Always ends with a `/`.
	pub external_url: String,
}

impl Default for SiteConfig {
	fn default() -> Self {
		Self {
			external_url: DEFAULT_EXTERNAL_URL.to_string(),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SiteConfigLayer {
	#[serde(default)]
	pub external_url: Option<String>,
}

impl SiteConfigLayer {
	pub fn merge(&mut self, other: SiteConfigLayer) {
		if other.external_url.is_some() {
			self.external_url = other.external_url;
		}
	}

	pub fn finalize(self) -> Result<SiteConfig, ConfigError> {
		let raw = self
			.external_url
			.unwrap_or_else(|| DEFAULT_EXTERNAL_URL.to_string());
		url::Url::parse(&raw).map_err(|e| ConfigError::InvalidValue {
			key: "site.external_url".to_string(),
			message: e.to_string(),
		})?;

		let external_url = if raw.ends_with('/') {
			raw
		} else {
			format!("{raw}/")
		};
		Ok(SiteConfig { external_url })
	}
}
