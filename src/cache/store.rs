//! In-memory entity store: the single source of truth for server state.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use super::entity::{EntityKey, EntityPayload, EntitySnapshot, FetchStatus};
use super::lock;
use crate::error::ApiError;

/// Called with the key of every entity that resolves from a fresh fetch.
/// Cache hits never fire observers.
type ResolveObserver = Box<dyn Fn(&EntityKey) + Send + Sync>;

#[derive(Debug)]
struct Slot {
  payload: Option<EntityPayload>,
  status: FetchStatus,
  error: Option<ApiError>,
  version: u64,
  last_updated: Option<DateTime<Utc>>,
}

impl Slot {
  fn empty() -> Self {
    Self {
      payload: None,
      status: FetchStatus::Uninitialized,
      error: None,
      version: 0,
      last_updated: None,
    }
  }

  fn snapshot(&self, key: &EntityKey) -> EntitySnapshot {
    EntitySnapshot {
      key: key.clone(),
      status: self.status,
      payload: self.payload.clone(),
      error: self.error.clone(),
      version: self.version,
      last_updated: self.last_updated,
    }
  }
}

/// Map from entity key to cached slot, with resolve-event subscriptions.
///
/// Construction-injected everywhere (no process-wide instance), so tests can
/// build as many isolated stores as they need. Locks are held only across
/// synchronous sections; nothing yields while holding one.
pub struct EntityStore {
  slots: Mutex<HashMap<EntityKey, Slot>>,
  observers: Mutex<Vec<ResolveObserver>>,
}

impl EntityStore {
  pub fn new() -> Self {
    Self {
      slots: Mutex::new(HashMap::new()),
      observers: Mutex::new(Vec::new()),
    }
  }

  /// Pure lookup: no side effects, no status transitions.
  pub fn get(&self, key: &EntityKey) -> Option<EntitySnapshot> {
    lock(&self.slots).get(key).map(|slot| slot.snapshot(key))
  }

  /// Overwrite the payload, mark resolved, bump the version and timestamp,
  /// then notify resolve observers.
  pub fn put(&self, key: EntityKey, payload: EntityPayload) -> EntitySnapshot {
    debug_assert_eq!(payload.kind(), key.kind);
    let snapshot = {
      let mut slots = lock(&self.slots);
      let slot = slots.entry(key.clone()).or_insert_with(Slot::empty);
      slot.payload = Some(payload);
      slot.status = FetchStatus::Resolved;
      slot.error = None;
      slot.version += 1;
      slot.last_updated = Some(Utc::now());
      slot.snapshot(&key)
    };
    tracing::trace!(entity = %key, version = snapshot.version, "resolved");
    for observer in lock(&self.observers).iter() {
      observer(&key);
    }
    snapshot
  }

  /// Flag a resolved entity for lazy refetch, keeping its payload visible.
  /// Idempotent; does nothing for missing, loading or errored slots.
  pub fn invalidate(&self, key: &EntityKey) {
    let mut slots = lock(&self.slots);
    if let Some(slot) = slots.get_mut(key) {
      if slot.status == FetchStatus::Resolved {
        slot.status = FetchStatus::Stale;
        tracing::trace!(entity = %key, "marked stale");
      }
    }
  }

  /// Record a failed fetch. The prior payload (if any) stays visible; the
  /// status flips back to loading only when a fresh fetch is requested.
  pub fn mark_error(&self, key: &EntityKey, error: ApiError) -> EntitySnapshot {
    let mut slots = lock(&self.slots);
    let slot = slots.entry(key.clone()).or_insert_with(Slot::empty);
    slot.status = FetchStatus::Error;
    slot.error = Some(error);
    slot.snapshot(key)
  }

  /// Transition a slot to loading, creating it if absent.
  pub fn mark_loading(&self, key: &EntityKey) {
    let mut slots = lock(&self.slots);
    let slot = slots.entry(key.clone()).or_insert_with(Slot::empty);
    slot.status = FetchStatus::Loading;
  }

  /// Subscribe to fresh resolutions. Observers run synchronously after the
  /// slot is written and must not call back into the store.
  pub fn add_resolve_observer(&self, observer: impl Fn(&EntityKey) + Send + Sync + 'static) {
    lock(&self.observers).push(Box::new(observer));
  }
}

impl Default for EntityStore {
  fn default() -> Self {
    Self::new()
  }
}

impl std::fmt::Debug for EntityStore {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("EntityStore")
      .field("entries", &lock(&self.slots).len())
      .finish_non_exhaustive()
  }
}
