// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use async_trait::async_trait;
use ferry_server_jobs::{Job, JobContext, JobError, JobOutput};
use tracing::instrument;

use crate::sync::MirrorSyncer;

/// Periodic scan that queues due mirrors for the sync loop.
pub struct MirrorUpdateJob {
	syncer: Arc<MirrorSyncer>,
}

impl MirrorUpdateJob {
	pub fn new(syncer: Arc<MirrorSyncer>) -> Self {
		Self { syncer }
	}
}

#[async_trait]
impl Job for MirrorUpdateJob {
	fn id(&self) -> &str {
		"mirror-update"
	}

	fn name(&self) -> &str {
		"Mirror Update"
	}

	fn description(&self) -> &str {
		"Queue pull mirrors whose next sync time has passed"
	}

	#[instrument(skip(self, ctx), fields(job_id = "mirror-update", run_id = %ctx.run_id))]
	async fn run(&self, ctx: &JobContext) -> Result<JobOutput, JobError> {
		if ctx.cancellation_token.is_cancelled() {
			return Err(JobError::Cancelled);
		}

		let queued = self
			.syncer
			.mirror_update()
			.await
			.map_err(|e| JobError::Failed {
				message: e.to_string(),
			})?;

		Ok(JobOutput {
			message: format!("Queued {queued} mirrors for sync"),
			metadata: Some(serde_json::json!({ "queued": queued })),
		})
	}
}
