// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Pull mirrors: finding due mirrors, fetching them from upstream, and
//! replaying what changed as newsfeed actions and webhooks.

pub mod address;
pub mod error;
pub mod feed;
pub mod job;
pub mod parser;
mod replay;
pub mod sync;
#[cfg(test)]
mod testing;

pub use address::{handle_mirror_credentials, redact_address, CREDENTIALS_PLACEHOLDER};
pub use error::{MirrorError, Result};
pub use feed::{PushCommit, PushCommits};
pub use job::MirrorUpdateJob;
pub use parser::{parse_remote_update_output, SyncResult, EMPTY_ID, SHORT_EMPTY_ID};
pub use replay::NEW_BRANCH_ANCESTORS;
pub use sync::{
	init_sync_mirrors, MirrorStores, MirrorSyncConfig, MirrorSyncer, SyncOutcome,
	MIRROR_UPDATE_TASK,
};
