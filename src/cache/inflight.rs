//! In-flight fetch registry: at most one network call per entity key.

use futures::future::{BoxFuture, Shared};
use std::collections::HashMap;
use std::sync::Mutex;

use super::entity::{EntityKey, EntitySnapshot};
use super::lock;
use crate::error::ApiError;

/// A fetch every concurrent reader of a key awaits together. The underlying
/// work runs in a spawned task, so it completes and writes back to the store
/// even when every reader stops awaiting.
pub type SharedFetch = Shared<BoxFuture<'static, Result<EntitySnapshot, ApiError>>>;

pub struct Inflight {
  fetches: Mutex<HashMap<EntityKey, SharedFetch>>,
}

impl Inflight {
  pub fn new() -> Self {
    Self { fetches: Mutex::new(HashMap::new()) }
  }

  /// Join the fetch already in flight for `key`, or register the one produced
  /// by `start`. Returns the future to await and whether this caller started
  /// it. A refresh requested mid-flight takes the join path too, so expensive
  /// server-side recomputation is never doubled.
  pub fn join_or_start(
    &self,
    key: &EntityKey,
    start: impl FnOnce() -> SharedFetch,
  ) -> (SharedFetch, bool) {
    let mut fetches = lock(&self.fetches);
    if let Some(existing) = fetches.get(key) {
      return (existing.clone(), false);
    }
    let fetch = start();
    fetches.insert(key.clone(), fetch.clone());
    (fetch, true)
  }

  /// Deregister a completed fetch.
  pub fn finish(&self, key: &EntityKey) {
    lock(&self.fetches).remove(key);
  }

  pub fn len(&self) -> usize {
    lock(&self.fetches).len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl Default for Inflight {
  fn default() -> Self {
    Self::new()
  }
}
