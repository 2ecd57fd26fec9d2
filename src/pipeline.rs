//! Derived view of a document's transform history, and the legality rules
//! for applying further methods.
//!
//! Nothing here owns state: the sequence is recomputed from the entity store
//! on every read so it can never diverge from the cached document info.

use crate::api::ops::QueryOp;
use crate::api::types::{ColumnTypes, DocumentMethod, PipelineStep};
use crate::cache::{EntityPayload, EntityStore};

/// Families of transform methods, used to gate what is currently legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodGroup {
  /// Row/column removal and deduplication.
  Cleaning,
  /// Missing-value imputation.
  MissingValues,
  /// Categorical-to-numeric encodings.
  Encoding,
  /// Methods that require an all-numeric feature set: standardization,
  /// outlier filters, feature selection.
  NumericOnly,
}

impl DocumentMethod {
  pub fn group(self) -> MethodGroup {
    match self {
      Self::RemoveDuplicates | Self::DropNa | Self::DropColumn => MethodGroup::Cleaning,
      Self::MissInsertMeanMode | Self::MissLinearImputer | Self::MissKnnImputer => {
        MethodGroup::MissingValues
      }
      Self::OrdinalEncoding | Self::OneHotEncoding => MethodGroup::Encoding,
      Self::StandardizeFeatures
      | Self::OutliersIsolationForest
      | Self::OutliersEllipticEnvelope
      | Self::OutliersLocalFactor
      | Self::OutliersOneClassSvm
      | Self::FsSelectPercentile
      | Self::FsSelectKBest
      | Self::FsSelectFpr
      | Self::FsSelectFdr
      | Self::FsSelectFwe
      | Self::FsSelectRfe
      | Self::FsSelectFromModel
      | Self::FsSelectPca => MethodGroup::NumericOnly,
    }
  }
}

/// Ordered transform steps applied to `filename`, from the latest cached
/// info. Stale payloads still count (last known value); an uncached document
/// yields an empty sequence.
pub fn sequence(store: &EntityStore, filename: &str) -> Vec<PipelineStep> {
  let key = QueryOp::DocumentInfo { filename: filename.to_string() }.entity_key();
  match store.get(&key).and_then(|snapshot| snapshot.payload) {
    Some(EntityPayload::DocumentInfo(info)) => info.summary.pipeline,
    _ => Vec::new(),
  }
}

/// Whether `method` is legal given the document's column semantics.
/// Numeric-only methods are refused while categorical columns exist.
pub fn is_method_allowed(method: DocumentMethod, column_types: &ColumnTypes) -> bool {
  match method.group() {
    MethodGroup::NumericOnly => column_types.categorical.is_empty(),
    _ => true,
  }
}

/// Legality of `method` for `filename` against the latest cached metadata.
/// With no info cached there is nothing to gate on; the server stays the
/// authority either way.
pub fn can_apply(store: &EntityStore, filename: &str, method: DocumentMethod) -> bool {
  let key = QueryOp::DocumentInfo { filename: filename.to_string() }.entity_key();
  match store.get(&key).and_then(|snapshot| snapshot.payload) {
    Some(EntityPayload::DocumentInfo(info)) => is_method_allowed(method, &info.column_types),
    _ => true,
  }
}
