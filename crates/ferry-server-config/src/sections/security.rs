// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Outbound request safety.

use serde::Deserialize;

#[derive(Debug, Clone, Default)]
pub struct SecurityConfig {
	/// Hostnames exempt from the local-network block on webhook targets.
	/// A single `*` entry allows every host.
	pub local_network_allowlist: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecurityConfigLayer {
	#[serde(default)]
	pub local_network_allowlist: Option<Vec<String>>,
}

impl SecurityConfigLayer {
	pub fn merge(&mut self, other: SecurityConfigLayer) {
		if other.local_network_allowlist.is_some() {
			self.local_network_allowlist = other.local_network_allowlist;
		}
	}

	pub fn finalize(self) -> SecurityConfig {
		let local_network_allowlist = self
			.local_network_allowlist
			.unwrap_or_default()
			.into_iter()
			.map(|host| host.trim().to_ascii_lowercase())
			.filter(|host| !host.is_empty())
			.collect();
		SecurityConfig {
			local_network_allowlist,
		}
	}
}

/// Split a comma separated allowlist as given in the environment.
pub fn parse_allowlist(raw: &str) -> Vec<String> {
	raw.split(',')
		.map(str::trim)
		.filter(|s| !s.is_empty())
		.map(str::to_string)
		.collect()
}
