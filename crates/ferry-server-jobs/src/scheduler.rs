// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::context::{CancellationToken, JobContext};
use crate::error::JobError;
use crate::job::Job;
use crate::types::JobOutput;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

struct PeriodicJob {
	job: Arc<dyn Job>,
	interval: Duration,
	run_at_start: bool,
}

/// Runs each registered job on its own task at a fixed interval.
///
/// A failed run is logged and not retried; the next tick runs the job again.
pub struct JobScheduler {
	jobs: Vec<PeriodicJob>,
	cancellation_token: CancellationToken,
	shutdown_tx: broadcast::Sender<()>,
	handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Default for JobScheduler {
	fn default() -> Self {
		Self::new()
	}
}

impl JobScheduler {
	pub fn new() -> Self {
		let (shutdown_tx, _) = broadcast::channel(1);
		Self {
			jobs: Vec::new(),
			cancellation_token: CancellationToken::new(),
			shutdown_tx,
			handles: Mutex::new(Vec::new()),
		}
	}

	/// Run `job` every `interval`. With `run_at_start` the first run happens
	/// as soon as the scheduler starts instead of after one interval.
	pub fn register_periodic(&mut self, job: Arc<dyn Job>, interval: Duration, run_at_start: bool) {
		self.jobs.push(PeriodicJob {
			job,
			interval,
			run_at_start,
		});
	}

	#[instrument(skip(self))]
	pub async fn start(&self) {
		let mut handles = self.handles.lock().await;

		for registered in &self.jobs {
			let job = Arc::clone(&registered.job);
			let interval = registered.interval;
			let run_at_start = registered.run_at_start;
			let mut shutdown_rx = self.shutdown_tx.subscribe();
			let cancellation_token = self.cancellation_token.clone();

			let handle = tokio::spawn(async move {
				if run_at_start {
					run_job(&job, &cancellation_token).await;
				}
				loop {
					tokio::select! {
						_ = tokio::time::sleep(interval) => {
							run_job(&job, &cancellation_token).await;
						}
						_ = shutdown_rx.recv() => {
							info!(job_id = %job.id(), "Shutting down periodic job");
							break;
						}
					}
				}
			});

			handles.push(handle);
		}

		info!(job_count = handles.len(), "Job scheduler started");
	}

	/// Cancel in-flight runs and wait for every job task to stop.
	#[instrument(skip(self))]
	pub async fn shutdown(&self) {
		self.cancellation_token.cancel();
		let _ = self.shutdown_tx.send(());

		let mut handles = self.handles.lock().await;
		for handle in handles.drain(..) {
			let _ = handle.await;
		}

		info!("Job scheduler shut down");
	}

	pub fn job_ids(&self) -> Vec<String> {
		self.jobs.iter().map(|j| j.job.id().to_string()).collect()
	}
}

async fn run_job(job: &Arc<dyn Job>, cancellation_token: &CancellationToken) {
	if cancellation_token.is_cancelled() {
		return;
	}

	let run_id = uuid::Uuid::new_v4().to_string();
	let started = Instant::now();
	let ctx = JobContext {
		run_id: run_id.clone(),
		cancellation_token: cancellation_token.clone(),
	};

	match job.run(&ctx).await {
		Ok(JobOutput { message, .. }) => info!(
			job_id = %job.id(),
			run_id = %run_id,
			duration_ms = started.elapsed().as_millis() as u64,
			output = %message,
			"Job completed successfully"
		),
		Err(JobError::Cancelled) => info!(job_id = %job.id(), run_id = %run_id, "Job cancelled"),
		Err(JobError::Failed { message }) => {
			warn!(job_id = %job.id(), run_id = %run_id, error = %message, "Job failed")
		}
	}
}
