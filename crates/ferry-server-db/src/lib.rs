// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite persistence for repositories, mirrors, the newsfeed, webhooks and
//! notices.

pub mod action;
pub mod clock;
pub mod error;
pub mod mirror;
pub mod notice;
pub mod pool;
pub mod repo;
pub mod testing;
mod types;
pub mod webhook;

pub use action::{ActionRecord, ActionRepository, ActionStore, ActionType};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{DbError, Result};
pub use mirror::{MirrorRecord, MirrorRepository, MirrorStore};
pub use notice::{NoticeRecord, NoticeRepository, NoticeStore, NoticeType};
pub use pool::{create_pool, run_migrations};
pub use repo::{RepoRepository, RepoStore, RepositoryRecord, UserRecord};
pub use webhook::{HookTaskRecord, WebhookRecord, WebhookRepository, WebhookStore};
