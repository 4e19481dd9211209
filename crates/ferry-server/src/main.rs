// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Ferry server binary.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use ferry_server::{build_scheduler, build_services};
use ferry_server_db::{create_pool, run_migrations, SystemClock};
use ferry_server_scm::LocalGitClient;
use ferry_server_scm_mirror::init_sync_mirrors;
use ferry_server_webhook::{init_deliver_hooks, ReqwestTransport};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Ferry server - pull mirror sync and webhook delivery.
#[derive(Parser, Debug)]
#[command(name = "ferry-server", about = "Ferry mirror sync and webhook delivery server", version)]
struct Args {
	/// Configuration file, instead of /etc/ferry/server.toml
	#[arg(short, long, env = "FERRY_SERVER_CONFIG")]
	config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	dotenvy::dotenv().ok();

	let config = match &args.config {
		Some(path) => ferry_server_config::load_config_with_file(path)?,
		None => ferry_server_config::load_config()?,
	};

	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.logging.level.clone().into()),
		)
		.with(tracing_subscriber::fmt::layer())
		.init();

	tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting ferry-server");

	let pool = create_pool(&config.database.url).await?;
	run_migrations(&pool).await?;

	let transport = ReqwestTransport::new(config.webhook.deliver_timeout())?;
	let services = build_services(
		&config,
		pool,
		Arc::new(LocalGitClient::new()),
		Arc::new(transport),
		Arc::new(SystemClock),
	);

	let sync_handle = init_sync_mirrors(services.syncer.clone());
	let deliver_handle = init_deliver_hooks(services.deliverer.clone());

	let scheduler = build_scheduler(&config, &services);
	scheduler.start().await;

	tokio::signal::ctrl_c().await?;
	tracing::info!("Received shutdown signal");

	scheduler.shutdown().await;
	sync_handle.abort();
	deliver_handle.abort();

	tracing::info!("Server shutdown complete");
	Ok(())
}
