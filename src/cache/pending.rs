//! Tracks submitted server tasks whose effect has not yet been observed.
//!
//! Transform and training submissions are acknowledged before the server has
//! applied them; their outcome only shows up in a later refetch of the owning
//! entity's info. The tracker bridges that gap so callers can render an
//! in-progress state without per-task polling. The next fresh info resolution
//! is the single source of truth that retires all markers for that entity
//! together.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use super::lock;

/// Per-entity set of pending task identifiers.
pub struct PendingTasks {
  tasks: Mutex<HashMap<String, BTreeSet<String>>>,
}

impl PendingTasks {
  pub fn new() -> Self {
    Self { tasks: Mutex::new(HashMap::new()) }
  }

  /// Register a submitted task; idempotent.
  pub fn add(&self, key: &str, task: &str) {
    let mut tasks = lock(&self.tasks);
    let inserted = tasks.entry(key.to_string()).or_default().insert(task.to_string());
    if inserted {
      tracing::debug!(entity = key, task, "task pending");
    }
  }

  /// Drop one task marker, used by the clear-on-failure policy.
  pub fn remove(&self, key: &str, task: &str) {
    let mut tasks = lock(&self.tasks);
    if let Some(set) = tasks.get_mut(key) {
      set.remove(task);
      if set.is_empty() {
        tasks.remove(key);
      }
    }
  }

  /// Retire every marker for `key` at once. A fresh info resolution reflects
  /// the latest server state, so anything still marked is either applied or
  /// failed by then.
  pub fn clear(&self, key: &str) {
    if lock(&self.tasks).remove(key).is_some() {
      tracing::debug!(entity = key, "pending tasks cleared");
    }
  }

  pub fn is_pending(&self, key: &str, task: &str) -> bool {
    lock(&self.tasks).get(key).is_some_and(|set| set.contains(task))
  }

  /// Pending task identifiers for `key`, in stable order.
  pub fn tasks_for(&self, key: &str) -> Vec<String> {
    lock(&self.tasks)
      .get(key)
      .map(|set| set.iter().cloned().collect())
      .unwrap_or_default()
  }
}

impl Default for PendingTasks {
  fn default() -> Self {
    Self::new()
  }
}
