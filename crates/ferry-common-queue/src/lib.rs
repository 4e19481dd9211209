// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Deduplicating, bounded work queue.
//!
//! A key stays "pending" from the moment it is added until the consumer calls
//! [`UniqueQueue::remove`]. Adding a pending key again is a no-op, so a burst
//! of adds for the same repository collapses into a single item on the
//! channel.
//!
//! The channel is bounded. When it is full, [`UniqueQueue::add`] drops the key
//! instead of blocking the producer; background scanners and the startup
//! sweep pick dropped work up again later.

use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{trace, warn};

pub const DEFAULT_QUEUE_LENGTH: usize = 1000;

pub struct UniqueQueue<K> {
	name: &'static str,
	tx: mpsc::Sender<K>,
	rx: tokio::sync::Mutex<mpsc::Receiver<K>>,
	pending: Mutex<HashSet<K>>,
}

impl<K> UniqueQueue<K>
where
	K: Eq + Hash + Clone + Debug + Send + 'static,
{
	pub fn new(name: &'static str, capacity: usize) -> Self {
		let (tx, rx) = mpsc::channel(capacity.max(1));
		Self {
			name,
			tx,
			rx: tokio::sync::Mutex::new(rx),
			pending: Mutex::new(HashSet::new()),
		}
	}

	pub fn name(&self) -> &'static str {
		self.name
	}

	/// Queue `key` unless it is already pending.
	///
	/// Returns `true` if the key was newly queued. Never blocks: a full queue
	/// drops the key and clears its pending marker.
	pub fn add(&self, key: K) -> bool {
		let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
		if !pending.insert(key.clone()) {
			trace!(queue = self.name, key = ?key, "key already pending");
			return false;
		}

		match self.tx.try_send(key) {
			Ok(()) => true,
			Err(TrySendError::Full(key)) => {
				pending.remove(&key);
				warn!(queue = self.name, key = ?key, "queue full, dropping key");
				false
			}
			Err(TrySendError::Closed(key)) => {
				pending.remove(&key);
				warn!(queue = self.name, key = ?key, "queue closed, dropping key");
				false
			}
		}
	}

	/// Clear the pending marker so `key` can be queued again.
	pub fn remove(&self, key: &K) {
		self
			.pending
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.remove(key);
	}

	pub fn exists(&self, key: &K) -> bool {
		self
			.pending
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.contains(key)
	}

	/// Wait for the next queued key.
	///
	/// Only one consumer is expected; concurrent callers are serialized.
	pub async fn recv(&self) -> Option<K> {
		self.rx.lock().await.recv().await
	}

	/// Non-blocking receive, `None` when nothing is queued or another consumer
	/// currently holds the receiver.
	pub fn try_recv(&self) -> Option<K> {
		self.rx.try_lock().ok()?.try_recv().ok()
	}
}
