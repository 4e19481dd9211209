// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Hook delivery worker.
//!
//! A task is delivered once. A worker claims the task before sending, so a
//! task picked up by two workers is posted by only one. Whatever happens on the wire (success, an error
//! status, a transport failure or a refusal by the network guard), the task
//! is marked delivered, its request and response are recorded, and the
//! webhook's last status is updated. There are no automatic retries.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ferry_common_queue::UniqueQueue;
use ferry_common_webhook::headers;
use ferry_server_db::{Clock, HookTaskRecord, RepositoryRecord, WebhookStore};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::dispatch::WebhookDispatcher;
use crate::error::{Result, WebhookError};
use crate::netguard::is_blocked_local_hostname;
use crate::payload::Payload;
use crate::types::{HookContentType, HookEventType, HookStatus, Webhook};

pub const BLOCKED_LOCAL_NETWORK: &str =
	"Payload URL resolved to a local network address that is implicitly blocked.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryRequest {
	pub url: String,
	pub headers: Vec<(String, String)>,
	pub body: Vec<u8>,
	pub skip_tls_verify: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryResponse {
	pub status: u16,
	/// Repeated headers are joined with `,`.
	pub headers: BTreeMap<String, String>,
	/// `Err` holds the reason the body could not be read.
	pub body: std::result::Result<String, String>,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

#[async_trait]
pub trait HookTransport: Send + Sync {
	async fn post(
		&self,
		request: DeliveryRequest,
	) -> std::result::Result<DeliveryResponse, TransportError>;
}

/// reqwest-backed transport with one client per TLS verification mode.
pub struct ReqwestTransport {
	verified: Client,
	insecure: Client,
}

impl ReqwestTransport {
	pub fn new(timeout: Duration) -> reqwest::Result<Self> {
		Ok(Self {
			verified: ferry_common_http::delivery_client(timeout, false)?,
			insecure: ferry_common_http::delivery_client(timeout, true)?,
		})
	}
}

#[async_trait]
impl HookTransport for ReqwestTransport {
	async fn post(
		&self,
		request: DeliveryRequest,
	) -> std::result::Result<DeliveryResponse, TransportError> {
		let client = if request.skip_tls_verify {
			&self.insecure
		} else {
			&self.verified
		};

		let mut builder = client.post(&request.url);
		for (name, value) in &request.headers {
			builder = builder.header(name, value);
		}

		let response = builder
			.body(request.body)
			.send()
			.await
			.map_err(|e| TransportError(e.to_string()))?;

		let status = response.status().as_u16();
		let mut headers: BTreeMap<String, String> = BTreeMap::new();
		for (name, value) in response.headers() {
			let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
			headers
				.entry(name.as_str().to_string())
				.and_modify(|existing| {
					existing.push(',');
					existing.push_str(&value);
				})
				.or_insert(value);
		}
		let body = response.text().await.map_err(|e| e.to_string());

		Ok(DeliveryResponse {
			status,
			headers,
			body,
		})
	}
}

/// Stored in `hook_tasks.request_content`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookRequestInfo {
	pub headers: BTreeMap<String, String>,
}

/// Stored in `hook_tasks.response_content`. `status` is zero when nothing
/// was received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookResponseInfo {
	pub status: u16,
	pub headers: BTreeMap<String, String>,
	pub body: String,
}

impl HookResponseInfo {
	fn failure(body: impl Into<String>) -> Self {
		Self {
			body: body.into(),
			..Default::default()
		}
	}
}

#[derive(Debug, Clone, Default)]
pub struct DeliveryConfig {
	/// Skip TLS verification for every webhook, regardless of its own flag.
	pub skip_tls_verify: bool,
	pub local_network_allowlist: Vec<String>,
}

pub struct HookDeliverer {
	webhooks: Arc<dyn WebhookStore>,
	queue: Arc<UniqueQueue<i64>>,
	transport: Arc<dyn HookTransport>,
	clock: Arc<dyn Clock>,
	config: DeliveryConfig,
}

impl HookDeliverer {
	pub fn new(
		webhooks: Arc<dyn WebhookStore>,
		queue: Arc<UniqueQueue<i64>>,
		transport: Arc<dyn HookTransport>,
		clock: Arc<dyn Clock>,
		config: DeliveryConfig,
	) -> Self {
		Self {
			webhooks,
			queue,
			transport,
			clock,
			config,
		}
	}

	/// Deliver a single task and persist the outcome. Returns `false` when
	/// the task was already claimed by another worker.
	#[instrument(skip(self, task), fields(task_id = task.id, hook_id = task.hook_id, uuid = %task.uuid))]
	pub async fn deliver(&self, task: &mut HookTaskRecord) -> Result<bool> {
		if !self.webhooks.claim_hook_task(task.id).await? {
			debug!("hook task already claimed");
			return Ok(false);
		}

		let (request, response) = self.send(task).await;

		task.is_delivered = true;
		task.delivered = unix_nanos(self.clock.now());
		task.is_succeed = response.status / 100 == 2;
		task.request_content = serde_json::to_string(&request)?;
		task.response_content = serde_json::to_string(&response)?;
		self.webhooks.update_hook_task(task).await?;

		let status = if task.is_succeed {
			HookStatus::Succeed
		} else {
			HookStatus::Failed
		};
		self
			.webhooks
			.update_webhook_last_status(task.hook_id, status.as_str())
			.await?;

		if task.is_succeed {
			info!(status = response.status, "webhook delivered");
		} else {
			warn!(status = response.status, body = %response.body, "webhook delivery failed");
		}
		Ok(true)
	}

	async fn send(&self, task: &HookTaskRecord) -> (HookRequestInfo, HookResponseInfo) {
		let mut request_info = HookRequestInfo::default();

		let url = match Url::parse(&task.url) {
			Ok(url) => url,
			Err(e) => {
				return (
					request_info,
					HookResponseInfo::failure(format!("Cannot parse payload URL: {e}")),
				)
			}
		};
		let Some(host) = url.host_str() else {
			return (
				request_info,
				HookResponseInfo::failure("Cannot parse payload URL: missing host"),
			);
		};

		if is_blocked_local_hostname(host, &self.config.local_network_allowlist).await {
			warn!(host, "refusing webhook delivery to local network address");
			return (request_info, HookResponseInfo::failure(BLOCKED_LOCAL_NETWORK));
		}

		let uuid = task.uuid.to_string();
		let mut headers = vec![
			(headers::GITHUB_DELIVERY.to_string(), uuid.clone()),
			(headers::GITHUB_EVENT.to_string(), task.event_type.clone()),
			(headers::GOGS_DELIVERY.to_string(), uuid),
			(headers::GOGS_SIGNATURE.to_string(), task.signature.clone()),
			(headers::GOGS_EVENT.to_string(), task.event_type.clone()),
		];

		let body = match task.content_type.parse::<HookContentType>() {
			Ok(HookContentType::Form) => {
				headers.push((
					"Content-Type".to_string(),
					"application/x-www-form-urlencoded".to_string(),
				));
				url::form_urlencoded::Serializer::new(String::new())
					.append_pair("payload", &task.payload_content)
					.finish()
					.into_bytes()
			}
			_ => {
				headers.push(("Content-Type".to_string(), "application/json".to_string()));
				task.payload_content.clone().into_bytes()
			}
		};

		request_info.headers = headers.iter().cloned().collect();

		let request = DeliveryRequest {
			url: task.url.clone(),
			headers,
			body,
			skip_tls_verify: task.skip_tls_verify || self.config.skip_tls_verify,
		};

		let response = match self.transport.post(request).await {
			Ok(response) => response,
			Err(e) => return (request_info, HookResponseInfo::failure(format!("Delivery: {e}"))),
		};

		let body = match response.body {
			Ok(body) => body,
			Err(e) => format!("read body: {e}"),
		};

		(
			request_info,
			HookResponseInfo {
				status: response.status,
				headers: response.headers,
				body,
			},
		)
	}

	async fn deliver_all(&self, tasks: Vec<HookTaskRecord>) -> usize {
		let mut delivered = 0;
		for mut task in tasks {
			match self.deliver(&mut task).await {
				Ok(true) => delivered += 1,
				Ok(false) => {}
				Err(e) => error!(task_id = task.id, error = %e, "failed to record webhook delivery"),
			}
		}
		delivered
	}

	/// Deliver every task left undelivered, including those from before a
	/// restart.
	#[instrument(skip(self))]
	pub async fn sweep(&self) -> Result<usize> {
		let tasks = self.webhooks.list_undelivered_hook_tasks().await?;
		if !tasks.is_empty() {
			info!(count = tasks.len(), "delivering pending webhook tasks");
		}
		Ok(self.deliver_all(tasks).await)
	}

	#[instrument(skip(self))]
	pub async fn deliver_repository(&self, repo_id: i64) -> Result<usize> {
		let tasks = self
			.webhooks
			.list_undelivered_hook_tasks_by_repo(repo_id)
			.await?;
		Ok(self.deliver_all(tasks).await)
	}

	/// Sweep once, then deliver queued repositories until the queue closes.
	pub async fn run(self: Arc<Self>) {
		if let Err(e) = self.sweep().await {
			error!(error = %e, "startup webhook sweep failed");
		}

		while let Some(repo_id) = self.queue.recv().await {
			self.queue.remove(&repo_id);
			if let Err(e) = self.deliver_repository(repo_id).await {
				error!(repo_id, error = %e, "failed to deliver webhook tasks");
			}
		}
	}

	/// Create and immediately deliver a task for one webhook of `repo`,
	/// ignoring the webhook's event selection.
	#[instrument(skip(self, dispatcher, repo, payload), fields(repo_id = repo.id))]
	pub async fn test_webhook(
		&self,
		dispatcher: &WebhookDispatcher,
		repo: &RepositoryRecord,
		event: HookEventType,
		payload: &Payload,
		webhook_id: i64,
	) -> Result<HookTaskRecord> {
		let record = self
			.webhooks
			.get_webhook_of_repo_by_id(repo.id, webhook_id)
			.await?
			.ok_or_else(|| {
				WebhookError::NotFound(format!("webhook {webhook_id} of repository {}", repo.id))
			})?;
		let hook = Webhook::try_from(record)?;

		let task = dispatcher.build_task_for_webhook(&hook, repo.id, event, payload)?;
		self
			.webhooks
			.create_hook_tasks(std::slice::from_ref(&task))
			.await?;

		let mut task = self
			.webhooks
			.get_hook_task_by_uuid(task.uuid)
			.await?
			.ok_or_else(|| WebhookError::NotFound(format!("hook task {}", task.uuid)))?;
		if !self.deliver(&mut task).await? {
			task = self
				.webhooks
				.get_hook_task_by_uuid(task.uuid)
				.await?
				.ok_or_else(|| WebhookError::NotFound(format!("hook task {}", task.uuid)))?;
		}
		Ok(task)
	}
}

fn unix_nanos(at: DateTime<Utc>) -> i64 {
	at.timestamp_nanos_opt().unwrap_or(i64::MAX)
}

/// Spawn the delivery loop.
pub fn init_deliver_hooks(deliverer: Arc<HookDeliverer>) -> JoinHandle<()> {
	tokio::spawn(deliverer.run())
}
