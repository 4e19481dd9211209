// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Named in-process run flags.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

/// Tracks which named tasks are currently running.
#[derive(Debug, Clone, Default)]
pub struct TaskStatusTable {
	running: Arc<Mutex<HashSet<String>>>,
}

impl TaskStatusTable {
	pub fn new() -> Self {
		Self::default()
	}

	/// Mark `name` as running. Returns `None` if it already is. The flag is
	/// cleared when the returned guard is dropped.
	pub fn try_start(&self, name: &str) -> Option<TaskGuard> {
		let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
		if !running.insert(name.to_string()) {
			return None;
		}
		Some(TaskGuard {
			table: self.clone(),
			name: name.to_string(),
		})
	}

	pub fn is_running(&self, name: &str) -> bool {
		self
			.running
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.contains(name)
	}
}

#[derive(Debug)]
pub struct TaskGuard {
	table: TaskStatusTable,
	name: String,
}

impl TaskGuard {
	pub fn name(&self) -> &str {
		&self.name
	}
}

impl Drop for TaskGuard {
	fn drop(&mut self) {
		self
			.table
			.running
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.remove(&self.name);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_second_start_is_rejected_while_running() {
		let table = TaskStatusTable::new();
		let guard = table.try_start("mirror_update").unwrap();
		assert_eq!(guard.name(), "mirror_update");
		assert!(table.is_running("mirror_update"));
		assert!(table.try_start("mirror_update").is_none());
	}

	#[test]
	fn test_drop_releases_name() {
		let table = TaskStatusTable::new();
		drop(table.try_start("mirror_update").unwrap());
		assert!(!table.is_running("mirror_update"));
		assert!(table.try_start("mirror_update").is_some());
	}

	#[test]
	fn test_names_are_independent() {
		let table = TaskStatusTable::new();
		let _a = table.try_start("mirror_update").unwrap();
		assert!(table.try_start("deliver_hooks").is_some());
	}
}
