// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wiring for the Ferry server: stores, queues, the mirror syncer, the
//! webhook pipeline and the periodic scan.

use std::sync::Arc;

use ferry_common_queue::UniqueQueue;
use ferry_server_config::ServerConfig;
use ferry_server_db::{
	ActionRepository, Clock, MirrorRepository, NoticeRepository, RepoRepository, RepoStore,
	WebhookRepository,
};
use ferry_server_jobs::{JobScheduler, TaskStatusTable};
use ferry_server_scm::GitClient;
use ferry_server_scm_mirror::{MirrorStores, MirrorSyncConfig, MirrorSyncer, MirrorUpdateJob};
use ferry_server_webhook::{
	DeliveryConfig, HookDeliverer, HookTransport, TransformerSet, WebhookDispatcher,
};
use sqlx::SqlitePool;

/// Long-lived services shared by the background loops.
pub struct Services {
	pub mirror_queue: Arc<UniqueQueue<i64>>,
	pub hook_queue: Arc<UniqueQueue<i64>>,
	pub dispatcher: Arc<WebhookDispatcher>,
	pub deliverer: Arc<HookDeliverer>,
	pub syncer: Arc<MirrorSyncer>,
}

pub fn build_services(
	config: &ServerConfig,
	pool: SqlitePool,
	git: Arc<dyn GitClient>,
	transport: Arc<dyn HookTransport>,
	clock: Arc<dyn Clock>,
) -> Services {
	let mirror_queue = Arc::new(UniqueQueue::new("mirror_queue", config.mirror.queue_length));
	let hook_queue = Arc::new(UniqueQueue::new("hook_queue", config.webhook.queue_length));

	let repos: Arc<dyn RepoStore> = Arc::new(RepoRepository::new(pool.clone()));
	let webhooks = Arc::new(WebhookRepository::new(pool.clone()));

	let dispatcher = Arc::new(WebhookDispatcher::new(
		repos.clone(),
		webhooks.clone(),
		Arc::new(ActionRepository::new(pool.clone())),
		hook_queue.clone(),
		TransformerSet::new(&config.site.external_url),
	));

	let deliverer = Arc::new(HookDeliverer::new(
		webhooks,
		hook_queue.clone(),
		transport,
		clock.clone(),
		DeliveryConfig {
			skip_tls_verify: config.webhook.skip_tls_verify,
			local_network_allowlist: config.security.local_network_allowlist.clone(),
		},
	));

	let syncer = Arc::new(MirrorSyncer::new(
		MirrorStores {
			repos,
			mirrors: Arc::new(MirrorRepository::new(pool.clone())),
			notices: Arc::new(NoticeRepository::new(pool)),
		},
		git,
		dispatcher.clone(),
		mirror_queue.clone(),
		TaskStatusTable::new(),
		clock,
		MirrorSyncConfig {
			repository_root: config.paths.repository_root.clone(),
			site_url: config.site.external_url.clone(),
			git_timeout: config.mirror.git_timeout(),
			probe_timeout: config.mirror.probe_timeout(),
			feed_max_commit_num: config.mirror.feed_max_commit_num,
		},
	));

	Services {
		mirror_queue,
		hook_queue,
		dispatcher,
		deliverer,
		syncer,
	}
}

/// Scheduler with the mirror scan registered; not yet started.
pub fn build_scheduler(config: &ServerConfig, services: &Services) -> JobScheduler {
	let mut scheduler = JobScheduler::new();
	scheduler.register_periodic(
		Arc::new(MirrorUpdateJob::new(services.syncer.clone())),
		config.mirror.scan_interval(),
		true,
	);
	scheduler
}

#[cfg(test)]
mod tests {
	use super::*;
	use ferry_server_db::testing::create_test_pool;
	use ferry_server_db::SystemClock;
	use ferry_server_scm::LocalGitClient;
	use ferry_server_webhook::ReqwestTransport;
	use std::time::Duration;

	#[tokio::test]
	async fn test_scheduler_registers_mirror_scan() {
		let config = ServerConfig::default();
		let services = build_services(
			&config,
			create_test_pool().await,
			Arc::new(LocalGitClient::new()),
			Arc::new(ReqwestTransport::new(Duration::from_secs(5)).unwrap()),
			Arc::new(SystemClock),
		);

		let scheduler = build_scheduler(&config, &services);
		assert_eq!(scheduler.job_ids(), vec!["mirror-update".to_string()]);
	}

	#[tokio::test]
	async fn test_queues_take_configured_capacity() {
		let mut config = ServerConfig::default();
		config.mirror.queue_length = 1;
		let services = build_services(
			&config,
			create_test_pool().await,
			Arc::new(LocalGitClient::new()),
			Arc::new(ReqwestTransport::new(Duration::from_secs(5)).unwrap()),
			Arc::new(SystemClock),
		);

		assert!(services.mirror_queue.add(1));
		assert!(!services.mirror_queue.add(2));
		assert!(services.hook_queue.add(1));
		assert!(services.hook_queue.add(2));
	}
}
