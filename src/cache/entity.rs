//! Identity and payload types for cached entities.

use chrono::{DateTime, Utc};
use std::fmt;

use crate::api::types::{
  ColumnMarks, ColumnStat, CompositionInfo, CompositionSummary, DescribeTable, DocumentInfo,
  DocumentPage, DocumentSummary,
};
use crate::error::ApiError;

/// The kinds of server-derived data the cache can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
  DocumentList,
  DocumentPage,
  DocumentInfo,
  DocumentDescribe,
  DocumentColumns,
  DocumentColumnStats,
  DocumentColumnMarks,
  Pipeline,
  CompositionList,
  CompositionInfo,
}

impl fmt::Display for EntityKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::DocumentList => "document_list",
      Self::DocumentPage => "document_page",
      Self::DocumentInfo => "document_info",
      Self::DocumentDescribe => "document_describe",
      Self::DocumentColumns => "document_columns",
      Self::DocumentColumnStats => "document_column_stats",
      Self::DocumentColumnMarks => "document_column_marks",
      Self::Pipeline => "pipeline",
      Self::CompositionList => "composition_list",
      Self::CompositionInfo => "composition_info",
    };
    f.write_str(name)
  }
}

/// Cache identity of an entity: kind plus normalized argument key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey {
  pub kind: EntityKind,
  pub key: String,
}

impl EntityKey {
  pub fn new(kind: EntityKind, key: impl Into<String>) -> Self {
    Self { kind, key: key.into() }
  }
}

impl fmt::Display for EntityKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.kind, self.key)
  }
}

/// Typed payload per entity kind.
///
/// One variant per `EntityKind`, so a shape mismatch is caught when the
/// response is decoded instead of surfacing later as a bad downcast.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityPayload {
  DocumentList(Vec<DocumentSummary>),
  DocumentPage(DocumentPage),
  DocumentInfo(DocumentInfo),
  DocumentDescribe(DescribeTable),
  DocumentColumns(Vec<String>),
  DocumentColumnStats(Vec<ColumnStat>),
  DocumentColumnMarks(ColumnMarks),
  /// Server receipt for replicating one document's pipeline onto another.
  Pipeline(String),
  CompositionList(Vec<CompositionSummary>),
  CompositionInfo(CompositionInfo),
}

impl EntityPayload {
  pub fn kind(&self) -> EntityKind {
    match self {
      Self::DocumentList(_) => EntityKind::DocumentList,
      Self::DocumentPage(_) => EntityKind::DocumentPage,
      Self::DocumentInfo(_) => EntityKind::DocumentInfo,
      Self::DocumentDescribe(_) => EntityKind::DocumentDescribe,
      Self::DocumentColumns(_) => EntityKind::DocumentColumns,
      Self::DocumentColumnStats(_) => EntityKind::DocumentColumnStats,
      Self::DocumentColumnMarks(_) => EntityKind::DocumentColumnMarks,
      Self::Pipeline(_) => EntityKind::Pipeline,
      Self::CompositionList(_) => EntityKind::CompositionList,
      Self::CompositionInfo(_) => EntityKind::CompositionInfo,
    }
  }
}

/// Fetch lifecycle of a cache slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
  /// Slot exists but has never resolved (created by `mark_loading`).
  Uninitialized,
  /// Exactly one in-flight request owns the eventual resolution.
  Loading,
  Resolved,
  /// Resolved payload still served, but a refetch is due on next read.
  Stale,
  Error,
}

/// Point-in-time copy of a cache slot handed out to callers.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySnapshot {
  pub key: EntityKey,
  pub status: FetchStatus,
  pub payload: Option<EntityPayload>,
  pub error: Option<ApiError>,
  pub version: u64,
  pub last_updated: Option<DateTime<Utc>>,
}
