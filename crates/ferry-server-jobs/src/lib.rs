// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Background job runner for the Ferry server.
//!
//! Jobs are registered with a fixed interval and run on their own tokio task
//! until shutdown. [`TaskStatusTable`] keeps a named task from overlapping
//! with itself.

pub mod context;
pub mod error;
pub mod guard;
pub mod job;
pub mod scheduler;
pub mod types;

pub use context::{CancellationToken, JobContext};
pub use error::{JobError, Result};
pub use guard::{TaskGuard, TaskStatusTable};
pub use job::Job;
pub use scheduler::JobScheduler;
pub use types::JobOutput;
