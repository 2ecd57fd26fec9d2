//! Wire types for the workbench API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind of prediction problem a document (and the compositions trained on it)
/// is set up for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
  Regression,
  Classification,
}

/// Semantic mark a column can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryMark {
  Numeric,
  Categorical,
  Target,
}

/// Transform methods the server can apply to a document's dataframe.
///
/// Submitting one of these is asynchronous on the server side: the mutation
/// response only acknowledges acceptance, and the effect shows up in a later
/// refetch of the document's info.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentMethod {
  RemoveDuplicates,
  DropNa,
  DropColumn,
  MissInsertMeanMode,
  MissLinearImputer,
  MissKnnImputer,
  StandardizeFeatures,
  OrdinalEncoding,
  OneHotEncoding,
  OutliersIsolationForest,
  OutliersEllipticEnvelope,
  OutliersLocalFactor,
  OutliersOneClassSvm,
  FsSelectPercentile,
  FsSelectKBest,
  FsSelectFpr,
  FsSelectFdr,
  FsSelectFwe,
  FsSelectRfe,
  FsSelectFromModel,
  FsSelectPca,
}

impl DocumentMethod {
  /// Wire name of the method, also used as the pending-task identifier.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::RemoveDuplicates => "remove_duplicates",
      Self::DropNa => "drop_na",
      Self::DropColumn => "drop_column",
      Self::MissInsertMeanMode => "miss_insert_mean_mode",
      Self::MissLinearImputer => "miss_linear_imputer",
      Self::MissKnnImputer => "miss_knn_imputer",
      Self::StandardizeFeatures => "standardize_features",
      Self::OrdinalEncoding => "ordinal_encoding",
      Self::OneHotEncoding => "one_hot_encoding",
      Self::OutliersIsolationForest => "outliers_isolation_forest",
      Self::OutliersEllipticEnvelope => "outliers_elliptic_envelope",
      Self::OutliersLocalFactor => "outliers_local_factor",
      Self::OutliersOneClassSvm => "outliers_one_class_svm",
      Self::FsSelectPercentile => "fs_select_percentile",
      Self::FsSelectKBest => "fs_select_k_best",
      Self::FsSelectFpr => "fs_select_fpr",
      Self::FsSelectFdr => "fs_select_fdr",
      Self::FsSelectFwe => "fs_select_fwe",
      Self::FsSelectRfe => "fs_select_rfe",
      Self::FsSelectFromModel => "fs_select_from_model",
      Self::FsSelectPca => "fs_select_pca",
    }
  }
}

impl std::fmt::Display for DocumentMethod {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// One applied transform step, as reported by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStep {
  pub function_name: DocumentMethod,
  pub param: Option<String>,
}

/// Column semantics of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnTypes {
  pub numeric: Vec<String>,
  pub categorical: Vec<String>,
  #[serde(default)]
  pub target: Option<String>,
  #[serde(default)]
  pub task_type: Option<TaskType>,
}

/// Document entry as returned by the listing endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
  pub name: String,
  pub upload_date: DateTime<Utc>,
  pub change_date: DateTime<Utc>,
  pub pipeline: Vec<PipelineStep>,
}

/// Full per-document metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
  pub id: String,
  #[serde(flatten)]
  pub summary: DocumentSummary,
  pub column_types: ColumnTypes,
}

/// One page of a document's rows, column-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentPage {
  pub total: u64,
  pub records: BTreeMap<String, serde_json::Value>,
}

/// Per-column descriptive statistics: column name to statistic-name/value.
pub type DescribeTable = BTreeMap<String, BTreeMap<String, f64>>;

/// Distribution digest of a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStat {
  pub name: String,
  pub data_type: String,
  pub not_null_count: u64,
  #[serde(rename = "type")]
  pub mark: CategoryMark,
  pub data: Vec<HistogramBucket>,
}

/// Histogram entry: a numeric bin or a categorical value count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HistogramBucket {
  Numeric { value: f64, left: f64, right: f64 },
  Categorical { name: String, value: f64 },
}

/// Column marks as submitted by (and echoed back to) the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMarks {
  pub numeric: Vec<String>,
  pub categorical: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub target: Option<String>,
}

/// How member models of a composition are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositionType {
  None,
  SimpleVoting,
  WeightedVoting,
  Stacking,
}

/// How hyperparameters are chosen at training time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamsMode {
  Auto,
  Custom,
  Default,
}

/// Lifecycle of a submitted composition, server-owned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompositionStage {
  Training,
  Trained,
}

/// Model families the training service accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelType {
  DecisionTreeClassifier,
  CatBoostClassifier,
  AdaBoostClassifier,
  GradientBoostingClassifier,
  BaggingClassifier,
  ExtraTreesClassifier,
  #[serde(rename = "SGDClassifier")]
  SgdClassifier,
  #[serde(rename = "LinearSVC")]
  LinearSvc,
  #[serde(rename = "SVC")]
  Svc,
  LogisticRegression,
  Perceptron,
  #[serde(rename = "XGBoost")]
  XgBoost,
  #[serde(rename = "LightGBM")]
  LightGbm,
}

/// One member model of a composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
  pub model_type: ModelType,
  #[serde(default)]
  pub params: serde_json::Value,
}

/// Composition entry as returned by the listing endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionSummary {
  pub name: String,
  #[serde(rename = "csv_id")]
  pub document_id: String,
  pub features: Vec<String>,
  pub target: String,
  pub create_date: DateTime<Utc>,
  pub task_type: TaskType,
  pub composition_type: CompositionType,
  pub stage: CompositionStage,
}

/// Full per-composition metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionInfo {
  #[serde(flatten)]
  pub summary: CompositionSummary,
  #[serde(default)]
  pub models: Vec<ModelParams>,
}

/// Validated training submission, built from a `CompositionDraft`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainSpec {
  pub name: String,
  pub document_name: String,
  pub task_type: TaskType,
  pub composition_type: CompositionType,
  pub params_mode: ParamsMode,
  pub test_size: f64,
  pub models: Vec<ModelParams>,
}

/// Prediction output, column-major like a document page.
pub type PredictionTable = BTreeMap<String, Vec<serde_json::Value>>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_document_method_wire_names_round_trip() {
    let json = serde_json::to_string(&DocumentMethod::FsSelectKBest).unwrap();
    assert_eq!(json, "\"fs_select_k_best\"");
    let back: DocumentMethod = serde_json::from_str(&json).unwrap();
    assert_eq!(back, DocumentMethod::FsSelectKBest);
    assert_eq!(DocumentMethod::FsSelectKBest.as_str(), "fs_select_k_best");
  }

  #[test]
  fn test_document_info_flattens_summary() {
    let raw = serde_json::json!({
      "id": "6410",
      "name": "sales.csv",
      "upload_date": "2024-01-10T10:00:00Z",
      "change_date": "2024-01-11T09:30:00Z",
      "pipeline": [{"function_name": "drop_na", "param": null}],
      "column_types": {"numeric": ["price"], "categorical": [], "target": null}
    });
    let info: DocumentInfo = serde_json::from_value(raw).unwrap();
    assert_eq!(info.summary.name, "sales.csv");
    assert_eq!(info.summary.pipeline[0].function_name, DocumentMethod::DropNa);
    assert!(info.column_types.target.is_none());
  }

  #[test]
  fn test_histogram_bucket_shapes() {
    let numeric: HistogramBucket =
      serde_json::from_str(r#"{"value": 4.0, "left": 0.0, "right": 10.0}"#).unwrap();
    assert!(matches!(numeric, HistogramBucket::Numeric { .. }));

    let categorical: HistogramBucket =
      serde_json::from_str(r#"{"name": "red", "value": 12.0}"#).unwrap();
    assert!(matches!(categorical, HistogramBucket::Categorical { .. }));
  }

  #[test]
  fn test_model_type_wire_names() {
    assert_eq!(
      serde_json::to_string(&ModelType::SgdClassifier).unwrap(),
      "\"SGDClassifier\""
    );
    assert_eq!(serde_json::to_string(&ModelType::XgBoost).unwrap(), "\"XGBoost\"");
  }
}
