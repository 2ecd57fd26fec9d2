//! Typed definitions of every remote operation.
//!
//! A query declares its cache identity, the tags it provides at resolution
//! time, and how to decode its payload. A mutation declares the tags it
//! invalidates on success and, for operations the server completes
//! asynchronously, the pending task to register at submission time.

use serde_json::Value;

use super::types::{ColumnMarks, DocumentMethod, TaskType, TrainSpec};
use crate::cache::{EntityKey, EntityKind, EntityPayload, Tag};
use crate::error::ApiError;

/// Pending-task identifier for composition training.
pub const TRAIN_TASK: &str = "train";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
  Get,
  Post,
  Put,
  Delete,
}

/// Wire-level request description handed to the transport. Endpoint
/// resolution, serialization and credential attachment happen there.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
  pub method: HttpMethod,
  pub path: &'static str,
  pub params: Vec<(&'static str, String)>,
  pub body: Option<Value>,
}

impl Request {
  fn get(path: &'static str, params: Vec<(&'static str, String)>) -> Self {
    Self { method: HttpMethod::Get, path, params, body: None }
  }

  fn post(path: &'static str, params: Vec<(&'static str, String)>, body: Option<Value>) -> Self {
    Self { method: HttpMethod::Post, path, params, body }
  }

  fn put(path: &'static str, params: Vec<(&'static str, String)>, body: Option<Value>) -> Self {
    Self { method: HttpMethod::Put, path, params, body }
  }

  fn delete(path: &'static str, params: Vec<(&'static str, String)>) -> Self {
    Self { method: HttpMethod::Delete, path, params, body: None }
  }
}

/// Read operations against the remote service.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOp {
  AllDocuments,
  DocumentPage { filename: String, page: u64 },
  DocumentInfo { filename: String },
  DescribeDocument { filename: String },
  DocumentColumns { filename: String },
  ColumnStats { filename: String },
  ColumnMarks { filename: String },
  /// Replicate `document_from`'s pipeline onto `document_to` and report the
  /// outcome.
  Pipeline { document_from: String, document_to: String },
  AllCompositions,
  CompositionInfo { name: String },
}

impl QueryOp {
  pub fn kind(&self) -> EntityKind {
    match self {
      Self::AllDocuments => EntityKind::DocumentList,
      Self::DocumentPage { .. } => EntityKind::DocumentPage,
      Self::DocumentInfo { .. } => EntityKind::DocumentInfo,
      Self::DescribeDocument { .. } => EntityKind::DocumentDescribe,
      Self::DocumentColumns { .. } => EntityKind::DocumentColumns,
      Self::ColumnStats { .. } => EntityKind::DocumentColumnStats,
      Self::ColumnMarks { .. } => EntityKind::DocumentColumnMarks,
      Self::Pipeline { .. } => EntityKind::Pipeline,
      Self::AllCompositions => EntityKind::CompositionList,
      Self::CompositionInfo { .. } => EntityKind::CompositionInfo,
    }
  }

  /// Normalized argument key. Identical arguments always map to the same key,
  /// so concurrent callers share one cache slot and one in-flight fetch.
  pub fn cache_key(&self) -> String {
    match self {
      Self::AllDocuments | Self::AllCompositions => "all".to_string(),
      Self::DocumentPage { filename, page } => format!("{}:{page}", normalize(filename)),
      Self::DocumentInfo { filename }
      | Self::DescribeDocument { filename }
      | Self::DocumentColumns { filename }
      | Self::ColumnStats { filename }
      | Self::ColumnMarks { filename } => normalize(filename),
      Self::Pipeline { document_from, document_to } => {
        format!("{}->{}", normalize(document_from), normalize(document_to))
      }
      Self::CompositionInfo { name } => normalize(name),
    }
  }

  pub fn entity_key(&self) -> EntityKey {
    EntityKey::new(self.kind(), self.cache_key())
  }

  /// Tags this query provides once resolved.
  pub fn provides(&self) -> Vec<Tag> {
    match self {
      Self::AllDocuments => vec![Tag::Documents],
      Self::DocumentPage { filename, .. }
      | Self::DocumentInfo { filename }
      | Self::DescribeDocument { filename }
      | Self::ColumnStats { filename } => vec![Tag::SingleDocument(normalize(filename))],
      Self::ColumnMarks { filename } => vec![
        Tag::SingleDocument(normalize(filename)),
        Tag::ColumnMarks(normalize(filename)),
      ],
      Self::DocumentColumns { .. } => Vec::new(),
      Self::Pipeline { document_to, .. } => vec![Tag::Pipeline(normalize(document_to))],
      Self::AllCompositions => vec![Tag::Compositions],
      Self::CompositionInfo { name } => vec![Tag::SingleComposition(normalize(name))],
    }
  }

  pub fn request(&self) -> Request {
    match self {
      Self::AllDocuments => Request::get("/document/all", Vec::new()),
      Self::DocumentPage { filename, page } => Request::get(
        "/document/df",
        vec![("filename", normalize(filename)), ("page", page.to_string())],
      ),
      Self::DocumentInfo { filename } => {
        Request::get("/document/info", vec![("filename", normalize(filename))])
      }
      Self::DescribeDocument { filename } => {
        Request::get("/document/df/describe", vec![("filename", normalize(filename))])
      }
      Self::DocumentColumns { filename } => {
        Request::get("/document/df/columns", vec![("filename", normalize(filename))])
      }
      Self::ColumnStats { filename } => {
        Request::get("/document/df/stats", vec![("filename", normalize(filename))])
      }
      Self::ColumnMarks { filename } => {
        Request::get("/document/column_marks", vec![("filename", normalize(filename))])
      }
      Self::Pipeline { document_from, document_to } => Request::get(
        "/document/pipeline",
        vec![
          ("document_from", normalize(document_from)),
          ("document_to", normalize(document_to)),
        ],
      ),
      Self::AllCompositions => Request::get("/composition/all", Vec::new()),
      Self::CompositionInfo { name } => {
        Request::get("/composition/info", vec![("name", normalize(name))])
      }
    }
  }

  /// Decode a raw response into this query's payload variant.
  pub fn decode(&self, value: Value) -> Result<EntityPayload, ApiError> {
    let payload = match self {
      Self::AllDocuments => {
        EntityPayload::DocumentList(serde_json::from_value(value).map_err(ApiError::decode)?)
      }
      Self::DocumentPage { .. } => {
        EntityPayload::DocumentPage(serde_json::from_value(value).map_err(ApiError::decode)?)
      }
      Self::DocumentInfo { .. } => {
        EntityPayload::DocumentInfo(serde_json::from_value(value).map_err(ApiError::decode)?)
      }
      Self::DescribeDocument { .. } => {
        EntityPayload::DocumentDescribe(serde_json::from_value(value).map_err(ApiError::decode)?)
      }
      Self::DocumentColumns { .. } => {
        EntityPayload::DocumentColumns(serde_json::from_value(value).map_err(ApiError::decode)?)
      }
      Self::ColumnStats { .. } => {
        EntityPayload::DocumentColumnStats(serde_json::from_value(value).map_err(ApiError::decode)?)
      }
      Self::ColumnMarks { .. } => {
        EntityPayload::DocumentColumnMarks(serde_json::from_value(value).map_err(ApiError::decode)?)
      }
      Self::Pipeline { .. } => {
        EntityPayload::Pipeline(serde_json::from_value(value).map_err(ApiError::decode)?)
      }
      Self::AllCompositions => {
        EntityPayload::CompositionList(serde_json::from_value(value).map_err(ApiError::decode)?)
      }
      Self::CompositionInfo { .. } => {
        EntityPayload::CompositionInfo(serde_json::from_value(value).map_err(ApiError::decode)?)
      }
    };
    Ok(payload)
  }

  pub fn describe(&self) -> String {
    match self {
      Self::AllDocuments => "all documents".to_string(),
      Self::DocumentPage { filename, page } => format!("document {filename} page {page}"),
      Self::DocumentInfo { filename } => format!("info for {filename}"),
      Self::DescribeDocument { filename } => format!("describe {filename}"),
      Self::DocumentColumns { filename } => format!("columns of {filename}"),
      Self::ColumnStats { filename } => format!("column stats of {filename}"),
      Self::ColumnMarks { filename } => format!("column marks of {filename}"),
      Self::Pipeline { document_from, document_to } => {
        format!("pipeline {document_from} -> {document_to}")
      }
      Self::AllCompositions => "all compositions".to_string(),
      Self::CompositionInfo { name } => format!("info for composition {name}"),
    }
  }
}

/// A pending-task descriptor registered at mutation submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTask {
  pub key: String,
  pub task: String,
}

/// Write operations against the remote service.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOp {
  /// Register an uploaded document under `filename`. Byte transport is the
  /// transport layer's concern.
  UploadDocument { filename: String },
  DeleteDocument { filename: String },
  RenameDocument { filename: String, new_filename: String },
  ChangeColumnMarks { filename: String, marks: ColumnMarks },
  SelectTarget { filename: String, target_column: String, task_type: TaskType },
  /// Apply a transform method; the server acknowledges acceptance and
  /// executes asynchronously.
  ApplyMethod { filename: String, method: DocumentMethod },
  /// Submit a composition for training; completion is observed through later
  /// info refetches reporting the trained stage.
  TrainComposition { spec: TrainSpec },
  PredictComposition { name: String, document_name: String },
  RenameComposition { name: String, new_name: String },
  DeleteComposition { name: String },
}

impl MutationOp {
  pub fn request(&self) -> Request {
    match self {
      Self::UploadDocument { filename } => {
        Request::post("/document", vec![("filename", normalize(filename))], None)
      }
      Self::DeleteDocument { filename } => {
        Request::delete("/document", vec![("filename", normalize(filename))])
      }
      Self::RenameDocument { filename, new_filename } => Request::put(
        "/document/rename",
        vec![
          ("filename", normalize(filename)),
          ("new_filename", normalize(new_filename)),
        ],
        None,
      ),
      Self::ChangeColumnMarks { filename, marks } => Request::put(
        "/document/column_marks",
        vec![("filename", normalize(filename))],
        serde_json::to_value(marks).ok(),
      ),
      Self::SelectTarget { filename, target_column, task_type } => Request::put(
        "/document/edit/target",
        vec![
          ("filename", normalize(filename)),
          ("target_column", target_column.clone()),
          ("task_type", task_type_param(*task_type)),
        ],
        None,
      ),
      Self::ApplyMethod { filename, method } => Request::post(
        "/document/edit/apply_method",
        vec![
          ("filename", normalize(filename)),
          ("function_name", method.as_str().to_string()),
        ],
        None,
      ),
      Self::TrainComposition { spec } => {
        Request::post("/composition/train", Vec::new(), serde_json::to_value(spec).ok())
      }
      Self::PredictComposition { name, document_name } => Request::post(
        "/composition/predict",
        vec![
          ("name", normalize(name)),
          ("document_name", normalize(document_name)),
        ],
        None,
      ),
      Self::RenameComposition { name, new_name } => Request::put(
        "/composition/rename",
        vec![("name", normalize(name)), ("new_name", normalize(new_name))],
        None,
      ),
      Self::DeleteComposition { name } => {
        Request::delete("/composition", vec![("name", normalize(name))])
      }
    }
  }

  /// Tags invalidated when this mutation succeeds.
  pub fn invalidates(&self) -> Vec<Tag> {
    match self {
      Self::UploadDocument { .. } | Self::DeleteDocument { .. } | Self::RenameDocument { .. } => {
        vec![Tag::Documents]
      }
      Self::ChangeColumnMarks { filename, .. } => vec![
        Tag::SingleDocument(normalize(filename)),
        Tag::ColumnMarks(normalize(filename)),
      ],
      Self::SelectTarget { filename, .. } => vec![Tag::SingleDocument(normalize(filename))],
      Self::ApplyMethod { filename, .. } => vec![
        Tag::Pipeline(normalize(filename)),
        Tag::SingleDocument(normalize(filename)),
      ],
      Self::TrainComposition { .. } => vec![Tag::Compositions],
      Self::PredictComposition { .. } => Vec::new(),
      Self::RenameComposition { .. } | Self::DeleteComposition { .. } => vec![Tag::Compositions],
    }
  }

  /// Pending task to register at submission time, for mutations whose side
  /// effect is itself asynchronous on the server.
  pub fn pending_task(&self) -> Option<PendingTask> {
    match self {
      Self::ApplyMethod { filename, method } => Some(PendingTask {
        key: normalize(filename),
        task: method.as_str().to_string(),
      }),
      Self::TrainComposition { spec } => Some(PendingTask {
        key: normalize(&spec.name),
        task: TRAIN_TASK.to_string(),
      }),
      _ => None,
    }
  }

  pub fn describe(&self) -> String {
    match self {
      Self::UploadDocument { filename } => format!("upload {filename}"),
      Self::DeleteDocument { filename } => format!("delete {filename}"),
      Self::RenameDocument { filename, new_filename } => {
        format!("rename {filename} -> {new_filename}")
      }
      Self::ChangeColumnMarks { filename, .. } => format!("change column marks of {filename}"),
      Self::SelectTarget { filename, target_column, .. } => {
        format!("select target {target_column} on {filename}")
      }
      Self::ApplyMethod { filename, method } => format!("apply {method} to {filename}"),
      Self::TrainComposition { spec } => format!("train composition {}", spec.name),
      Self::PredictComposition { name, document_name } => {
        format!("predict with {name} on {document_name}")
      }
      Self::RenameComposition { name, new_name } => {
        format!("rename composition {name} -> {new_name}")
      }
      Self::DeleteComposition { name } => format!("delete composition {name}"),
    }
  }
}

/// Normalize a caller-supplied name for use as a cache key and wire argument.
fn normalize(name: &str) -> String {
  name.trim().to_string()
}

fn task_type_param(task_type: TaskType) -> String {
  match task_type {
    TaskType::Regression => "regression".to_string(),
    TaskType::Classification => "classification".to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_same_arguments_share_a_cache_key() {
    let a = QueryOp::DocumentInfo { filename: "sales.csv".into() };
    let b = QueryOp::DocumentInfo { filename: "  sales.csv ".into() };
    assert_eq!(a.entity_key(), b.entity_key());
  }

  #[test]
  fn test_page_is_part_of_the_key() {
    let first = QueryOp::DocumentPage { filename: "sales.csv".into(), page: 1 };
    let second = QueryOp::DocumentPage { filename: "sales.csv".into(), page: 2 };
    assert_ne!(first.cache_key(), second.cache_key());
    assert_eq!(first.kind(), second.kind());
  }

  #[test]
  fn test_apply_method_declares_pipeline_and_document_tags() {
    let op = MutationOp::ApplyMethod {
      filename: "sales.csv".into(),
      method: DocumentMethod::DropNa,
    };
    assert_eq!(
      op.invalidates(),
      vec![
        Tag::Pipeline("sales.csv".into()),
        Tag::SingleDocument("sales.csv".into()),
      ]
    );
    let pending = op.pending_task().unwrap();
    assert_eq!(pending.key, "sales.csv");
    assert_eq!(pending.task, "drop_na");
  }

  #[test]
  fn test_rename_invalidates_the_listing_only() {
    let op = MutationOp::RenameDocument {
      filename: "sales.csv".into(),
      new_filename: "sales2.csv".into(),
    };
    assert_eq!(op.invalidates(), vec![Tag::Documents]);
    assert!(op.pending_task().is_none());
  }

  #[test]
  fn test_apply_method_request_carries_wire_name() {
    let op = MutationOp::ApplyMethod {
      filename: "sales.csv".into(),
      method: DocumentMethod::MissKnnImputer,
    };
    let request = op.request();
    assert_eq!(request.method, HttpMethod::Post);
    assert_eq!(request.path, "/document/edit/apply_method");
    assert!(request
      .params
      .contains(&(("function_name", "miss_knn_imputer".to_string()))));
  }

  #[test]
  fn test_decode_mismatch_is_a_decode_error() {
    let op = QueryOp::AllDocuments;
    let err = op.decode(json!({"not": "a list"})).unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
  }

  #[test]
  fn test_decode_document_list() {
    let op = QueryOp::AllDocuments;
    let payload = op
      .decode(json!([{
        "name": "sales.csv",
        "upload_date": "2024-01-10T10:00:00Z",
        "change_date": "2024-01-11T09:30:00Z",
        "pipeline": []
      }]))
      .unwrap();
    match payload {
      EntityPayload::DocumentList(docs) => assert_eq!(docs[0].name, "sales.csv"),
      other => panic!("unexpected payload: {other:?}"),
    }
  }
}
