//! Document operations on [`Client`].

use super::ops::{MutationOp, QueryOp};
use super::types::{
  ColumnMarks, ColumnStat, DescribeTable, DocumentInfo, DocumentMethod, DocumentPage,
  DocumentSummary, TaskType,
};
use crate::cache::EntityPayload;
use crate::client::{Client, ReadOptions};
use crate::error::ApiError;

impl Client {
  /// List every uploaded document.
  pub async fn all_documents(&self) -> Result<Vec<DocumentSummary>, ApiError> {
    let snapshot = self.read(QueryOp::AllDocuments, ReadOptions::default()).await?;
    match snapshot.payload {
      Some(EntityPayload::DocumentList(docs)) => Ok(docs),
      _ => Err(ApiError::Decode("document list missing from resolved entity".into())),
    }
  }

  /// One page of a document's rows.
  pub async fn document_page(&self, filename: &str, page: u64) -> Result<DocumentPage, ApiError> {
    let op = QueryOp::DocumentPage { filename: filename.to_string(), page };
    let snapshot = self.read(op, ReadOptions::default()).await?;
    match snapshot.payload {
      Some(EntityPayload::DocumentPage(page)) => Ok(page),
      _ => Err(ApiError::Decode("document page missing from resolved entity".into())),
    }
  }

  /// Full metadata of one document, including column semantics and the
  /// applied transform pipeline.
  pub async fn document_info(&self, filename: &str) -> Result<DocumentInfo, ApiError> {
    let op = QueryOp::DocumentInfo { filename: filename.to_string() };
    let snapshot = self.read(op, ReadOptions::default()).await?;
    match snapshot.payload {
      Some(EntityPayload::DocumentInfo(info)) => Ok(info),
      _ => Err(ApiError::Decode("document info missing from resolved entity".into())),
    }
  }

  /// Descriptive statistics table of one document.
  pub async fn describe_document(&self, filename: &str) -> Result<DescribeTable, ApiError> {
    let op = QueryOp::DescribeDocument { filename: filename.to_string() };
    let snapshot = self.read(op, ReadOptions::default()).await?;
    match snapshot.payload {
      Some(EntityPayload::DocumentDescribe(table)) => Ok(table),
      _ => Err(ApiError::Decode("describe table missing from resolved entity".into())),
    }
  }

  pub async fn document_columns(&self, filename: &str) -> Result<Vec<String>, ApiError> {
    let op = QueryOp::DocumentColumns { filename: filename.to_string() };
    let snapshot = self.read(op, ReadOptions::default()).await?;
    match snapshot.payload {
      Some(EntityPayload::DocumentColumns(columns)) => Ok(columns),
      _ => Err(ApiError::Decode("columns missing from resolved entity".into())),
    }
  }

  /// Per-column distribution digests.
  pub async fn column_stats(&self, filename: &str) -> Result<Vec<ColumnStat>, ApiError> {
    let op = QueryOp::ColumnStats { filename: filename.to_string() };
    let snapshot = self.read(op, ReadOptions::default()).await?;
    match snapshot.payload {
      Some(EntityPayload::DocumentColumnStats(stats)) => Ok(stats),
      _ => Err(ApiError::Decode("column stats missing from resolved entity".into())),
    }
  }

  pub async fn column_marks(&self, filename: &str) -> Result<ColumnMarks, ApiError> {
    let op = QueryOp::ColumnMarks { filename: filename.to_string() };
    let snapshot = self.read(op, ReadOptions::default()).await?;
    match snapshot.payload {
      Some(EntityPayload::DocumentColumnMarks(marks)) => Ok(marks),
      _ => Err(ApiError::Decode("column marks missing from resolved entity".into())),
    }
  }

  /// Replicate `document_from`'s pipeline onto `document_to`.
  pub async fn pipeline_document(
    &self,
    document_from: &str,
    document_to: &str,
  ) -> Result<String, ApiError> {
    let op = QueryOp::Pipeline {
      document_from: document_from.to_string(),
      document_to: document_to.to_string(),
    };
    let snapshot = self.read(op, ReadOptions::default()).await?;
    match snapshot.payload {
      Some(EntityPayload::Pipeline(receipt)) => Ok(receipt),
      _ => Err(ApiError::Decode("pipeline receipt missing from resolved entity".into())),
    }
  }

  /// Register an uploaded document under `filename`.
  pub async fn upload_document(&self, filename: &str) -> Result<(), ApiError> {
    self
      .perform(MutationOp::UploadDocument { filename: filename.to_string() })
      .await
      .map(drop)
  }

  pub async fn delete_document(&self, filename: &str) -> Result<(), ApiError> {
    self
      .perform(MutationOp::DeleteDocument { filename: filename.to_string() })
      .await
      .map(drop)
  }

  pub async fn rename_document(&self, filename: &str, new_filename: &str) -> Result<(), ApiError> {
    self
      .perform(MutationOp::RenameDocument {
        filename: filename.to_string(),
        new_filename: new_filename.to_string(),
      })
      .await
      .map(drop)
  }

  pub async fn change_column_marks(
    &self,
    filename: &str,
    marks: ColumnMarks,
  ) -> Result<(), ApiError> {
    self
      .perform(MutationOp::ChangeColumnMarks { filename: filename.to_string(), marks })
      .await
      .map(drop)
  }

  /// Choose the prediction target column and task type.
  pub async fn select_target(
    &self,
    filename: &str,
    target_column: &str,
    task_type: TaskType,
  ) -> Result<(), ApiError> {
    self
      .perform(MutationOp::SelectTarget {
        filename: filename.to_string(),
        target_column: target_column.to_string(),
        task_type,
      })
      .await
      .map(drop)
  }

  /// Submit a transform method. The response acknowledges acceptance only;
  /// the method stays pending until the next info refetch.
  pub async fn apply_method(
    &self,
    filename: &str,
    method: DocumentMethod,
  ) -> Result<(), ApiError> {
    self
      .perform(MutationOp::ApplyMethod { filename: filename.to_string(), method })
      .await
      .map(drop)
  }

  /// Whether a submitted transform has not yet been confirmed by a refetch.
  pub fn is_method_pending(&self, filename: &str, method: DocumentMethod) -> bool {
    self.pending().is_pending(filename.trim(), method.as_str())
  }
}
