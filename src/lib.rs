//! Client-side resource cache and mutation orchestration for a tabular-ML
//! workbench.
//!
//! The remote service owns documents (uploaded tabular datasets), their
//! column semantics and transform pipelines, and trained model compositions.
//! This crate mirrors that state client-side:
//! - Caches server-derived entities keyed by identity, with status/version
//!   tracking and stale-while-revalidate semantics
//! - Deduplicates concurrent reads of the same entity into one network call
//! - Invalidates and lazily refetches dependents when a mutation changes
//!   shared state, via a tag graph
//! - Tracks long-running server jobs (transform application, composition
//!   training) whose completion is only observable through later refetches
//!
//! Rendering, routing and credential acquisition live elsewhere; the view
//! layer calls [`Client::read`]/[`Client::perform`] (or the typed wrappers)
//! and renders whatever comes back.

pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod mutation;
pub mod pipeline;
pub mod transport;

pub use client::{Client, ClientBuilder, ReadOptions};
pub use error::{ApiError, DraftError};
pub use mutation::{Mutation, MutationState};

use tracing_subscriber::EnvFilter;

/// Install a global tracing subscriber honoring `RUST_LOG`, for embedding
/// binaries. Does nothing if a subscriber is already set.
pub fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
