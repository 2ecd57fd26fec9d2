//! Invalidation tag graph.
//!
//! Tags decouple "what changed" (declared by a mutation) from "what must be
//! refetched" (declared by whichever queries currently provide the tag), so
//! new query kinds can subscribe to existing tags without touching mutation
//! code.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Mutex;

use super::entity::EntityKey;
use super::lock;

/// Invalidation label linking queries (providers) to mutations (invalidators).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
  /// The document listing as a whole.
  Documents,
  /// Everything derived from one document.
  SingleDocument(String),
  /// One document's column marks.
  ColumnMarks(String),
  /// One document's transform history.
  Pipeline(String),
  /// The composition listing as a whole.
  Compositions,
  /// Everything derived from one composition.
  SingleComposition(String),
}

impl fmt::Display for Tag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Documents => f.write_str("documents"),
      Self::SingleDocument(key) => write!(f, "single_document:{key}"),
      Self::ColumnMarks(key) => write!(f, "column_marks:{key}"),
      Self::Pipeline(key) => write!(f, "pipeline:{key}"),
      Self::Compositions => f.write_str("compositions"),
      Self::SingleComposition(key) => write!(f, "single_composition:{key}"),
    }
  }
}

#[derive(Default)]
struct Edges {
  providers: HashMap<Tag, HashSet<EntityKey>>,
  provided: HashMap<EntityKey, HashSet<Tag>>,
}

/// Bipartite graph between tags and the entities currently providing them.
///
/// Edges are rebuilt wholesale on every successful query resolution
/// (remove-all-then-add, never incremental), so an entity that stops
/// providing a tag can never linger as a dangling invalidation target.
pub struct TagGraph {
  edges: Mutex<Edges>,
}

impl TagGraph {
  pub fn new() -> Self {
    Self { edges: Mutex::new(Edges::default()) }
  }

  /// Replace the full provider edge set for `key`.
  pub fn set_providers(&self, key: &EntityKey, tags: Vec<Tag>) {
    let mut edges = lock(&self.edges);
    if let Some(old) = edges.provided.remove(key) {
      for tag in old {
        if let Some(set) = edges.providers.get_mut(&tag) {
          set.remove(key);
          if set.is_empty() {
            edges.providers.remove(&tag);
          }
        }
      }
    }
    if tags.is_empty() {
      return;
    }
    for tag in &tags {
      edges.providers.entry(tag.clone()).or_default().insert(key.clone());
    }
    edges.provided.insert(key.clone(), tags.into_iter().collect());
  }

  /// Every entity currently providing any tag in `tags`.
  pub fn providers_of(&self, tags: &[Tag]) -> Vec<EntityKey> {
    let edges = lock(&self.edges);
    let mut affected = HashSet::new();
    for tag in tags {
      if let Some(keys) = edges.providers.get(tag) {
        affected.extend(keys.iter().cloned());
      }
    }
    affected.into_iter().collect()
  }

  /// Tags currently provided by `key`, for diagnostics and tests.
  pub fn tags_of(&self, key: &EntityKey) -> Vec<Tag> {
    lock(&self.edges)
      .provided
      .get(key)
      .map(|tags| tags.iter().cloned().collect())
      .unwrap_or_default()
  }
}

impl Default for TagGraph {
  fn default() -> Self {
    Self::new()
  }
}
