// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{
	parse_allowlist, DatabaseConfigLayer, LoggingConfigLayer, MirrorConfigLayer, PathsConfigLayer,
	SecurityConfigLayer, SiteConfigLayer, WebhookConfigLayer,
};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/ferry/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: FERRY_SERVER_<SECTION>_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ServerConfigLayer {
			database: Some(DatabaseConfigLayer {
				url: env_var("FERRY_SERVER_DATABASE_URL"),
			}),
			paths: Some(PathsConfigLayer {
				repository_root: env_var("FERRY_SERVER_REPOSITORY_ROOT").map(PathBuf::from),
			}),
			site: Some(SiteConfigLayer {
				external_url: env_var("FERRY_SERVER_EXTERNAL_URL"),
			}),
			mirror: Some(load_mirror_from_env()?),
			webhook: Some(load_webhook_from_env()?),
			security: Some(SecurityConfigLayer {
				local_network_allowlist: env_var("FERRY_SERVER_LOCAL_NETWORK_ALLOWLIST")
					.map(|v| parse_allowlist(&v)),
			}),
			logging: Some(LoggingConfigLayer {
				level: env_var("FERRY_SERVER_LOG_LEVEL"),
			}),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_bool(name: &str) -> Option<bool> {
	env_var(name).map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid {} value '{v}'", std::any::type_name::<T>()),
		}),
		None => Ok(None),
	}
}

fn load_mirror_from_env() -> Result<MirrorConfigLayer, ConfigError> {
	Ok(MirrorConfigLayer {
		queue_length: env_parse("FERRY_SERVER_MIRROR_QUEUE_LENGTH")?,
		default_interval_hours: env_parse("FERRY_SERVER_MIRROR_DEFAULT_INTERVAL_HOURS")?,
		scan_interval_secs: env_parse("FERRY_SERVER_MIRROR_SCAN_INTERVAL_SECS")?,
		git_timeout_secs: env_parse("FERRY_SERVER_MIRROR_GIT_TIMEOUT_SECS")?,
		probe_timeout_secs: env_parse("FERRY_SERVER_MIRROR_PROBE_TIMEOUT_SECS")?,
		feed_max_commit_num: env_parse("FERRY_SERVER_MIRROR_FEED_MAX_COMMIT_NUM")?,
	})
}

fn load_webhook_from_env() -> Result<WebhookConfigLayer, ConfigError> {
	Ok(WebhookConfigLayer {
		queue_length: env_parse("FERRY_SERVER_WEBHOOK_QUEUE_LENGTH")?,
		deliver_timeout_secs: env_parse("FERRY_SERVER_WEBHOOK_DELIVER_TIMEOUT_SECS")?,
		skip_tls_verify: env_bool("FERRY_SERVER_WEBHOOK_SKIP_TLS_VERIFY"),
		paging_num: env_parse("FERRY_SERVER_WEBHOOK_PAGING_NUM")?,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn test_precedence_order() {
		assert!(Precedence::Defaults < Precedence::ConfigFile);
		assert!(Precedence::ConfigFile < Precedence::Environment);
	}

	#[test]
	fn test_missing_toml_file_is_empty_layer() {
		let layer = TomlSource::new("/nonexistent/ferry/server.toml")
			.load()
			.unwrap();
		assert!(layer.mirror.is_none());
		assert!(layer.database.is_none());
	}

	#[test]
	fn test_toml_file_loaded() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(
			file,
			r#"
[webhook]
deliver_timeout_secs = 7

[security]
local_network_allowlist = ["hooks.internal"]
"#
		)
		.unwrap();

		let layer = TomlSource::new(file.path()).load().unwrap();
		assert_eq!(layer.webhook.unwrap().deliver_timeout_secs, Some(7));
		assert_eq!(
			layer.security.unwrap().local_network_allowlist,
			Some(vec!["hooks.internal".to_string()])
		);
	}

	#[test]
	fn test_malformed_toml_reports_path() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[mirror\nqueue_length = ").unwrap();

		let err = TomlSource::new(file.path()).load().unwrap_err();
		assert!(matches!(err, ConfigError::TomlParse { .. }));
	}
}
