//! Caching layer for server-derived entities.
//!
//! This module is agnostic of the view layer; it:
//! - Keeps one in-memory slot per (kind, key) with payload, status and version
//! - Rebuilds tag provider edges on every successful resolution
//! - Tracks submitted-but-unconfirmed server tasks per entity
//! - Shares one in-flight fetch among all concurrent readers of a key

mod entity;
mod inflight;
mod pending;
mod store;
mod tags;

pub use entity::{EntityKey, EntityKind, EntityPayload, EntitySnapshot, FetchStatus};
pub use inflight::{Inflight, SharedFetch};
pub use pending::PendingTasks;
pub use store::EntityStore;
pub use tags::{Tag, TagGraph};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Poisoning only means a panic unwound mid-update elsewhere; the maps stay
/// structurally valid, so recover the guard and keep serving.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
