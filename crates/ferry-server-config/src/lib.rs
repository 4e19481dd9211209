// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Centralized configuration management for the Ferry server.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`FERRY_SERVER_*`)
//!
//! # Usage
//!
//! ```ignore
//! use ferry_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("Mirrors are scanned every {}s", config.mirror.scan_interval_secs);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub database: DatabaseConfig,
	pub paths: PathsConfig,
	pub site: SiteConfig,
	pub mirror: MirrorConfig,
	pub webhook: WebhookConfig,
	pub security: SecurityConfig,
	pub logging: LoggingConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`FERRY_SERVER_*`)
/// 2. Config file (`/etc/ferry/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
pub fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let database = layer.database.unwrap_or_default().finalize();
	let paths = layer.paths.unwrap_or_default().finalize();
	let site = layer.site.unwrap_or_default().finalize()?;
	let mirror = layer.mirror.unwrap_or_default().finalize();
	let webhook = layer.webhook.unwrap_or_default().finalize();
	let security = layer.security.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();

	mirror.validate()?;
	webhook.validate()?;

	info!(
		database = %database.url,
		repository_root = %paths.repository_root.display(),
		external_url = %site.external_url,
		mirror_scan_interval_secs = mirror.scan_interval_secs,
		mirror_git_timeout_secs = mirror.git_timeout_secs,
		webhook_deliver_timeout_secs = webhook.deliver_timeout_secs,
		webhook_skip_tls_verify = webhook.skip_tls_verify,
		allowlisted_hosts = security.local_network_allowlist.len(),
		"Server configuration loaded"
	);

	Ok(ServerConfig {
		database,
		paths,
		site,
		mirror,
		webhook,
		security,
		logging,
	})
}
