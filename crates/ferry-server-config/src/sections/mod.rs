// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod database;
mod logging;
mod mirror;
mod paths;
mod security;
mod site;
mod webhook;

pub use database::{DatabaseConfig, DatabaseConfigLayer};
pub use logging::{LoggingConfig, LoggingConfigLayer};
pub use mirror::{MirrorConfig, MirrorConfigLayer};
pub use paths::{PathsConfig, PathsConfigLayer};
pub use security::{parse_allowlist, SecurityConfig, SecurityConfigLayer};
pub use site::{SiteConfig, SiteConfigLayer};
pub use webhook::{WebhookConfig, WebhookConfigLayer};
