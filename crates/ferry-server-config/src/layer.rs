// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partial configuration as produced by a single source.

use serde::Deserialize;

use crate::sections::{
	DatabaseConfigLayer, LoggingConfigLayer, MirrorConfigLayer, PathsConfigLayer,
	SecurityConfigLayer, SiteConfigLayer, WebhookConfigLayer,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfigLayer {
	#[serde(default)]
	pub database: Option<DatabaseConfigLayer>,
	#[serde(default)]
	pub paths: Option<PathsConfigLayer>,
	#[serde(default)]
	pub site: Option<SiteConfigLayer>,
	#[serde(default)]
	pub mirror: Option<MirrorConfigLayer>,
	#[serde(default)]
	pub webhook: Option<WebhookConfigLayer>,
	#[serde(default)]
	pub security: Option<SecurityConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
}

fn merge_section<T>(base: &mut Option<T>, other: Option<T>, merge: impl FnOnce(&mut T, T)) {
	match (base.as_mut(), other) {
		(Some(existing), Some(incoming)) => merge(existing, incoming),
		(None, Some(incoming)) => *base = Some(incoming),
		(_, None) => {}
	}
}

impl ServerConfigLayer {
	/// Overlay `other` on top of `self`; fields set in `other` win.
	pub fn merge(&mut self, other: ServerConfigLayer) {
		merge_section(&mut self.database, other.database, DatabaseConfigLayer::merge);
		merge_section(&mut self.paths, other.paths, PathsConfigLayer::merge);
		merge_section(&mut self.site, other.site, SiteConfigLayer::merge);
		merge_section(&mut self.mirror, other.mirror, MirrorConfigLayer::merge);
		merge_section(&mut self.webhook, other.webhook, WebhookConfigLayer::merge);
		merge_section(&mut self.security, other.security, SecurityConfigLayer::merge);
		merge_section(&mut self.logging, other.logging, LoggingConfigLayer::merge);
	}
}
