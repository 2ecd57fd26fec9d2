//! Composition operations on [`Client`], and the caller-owned draft state a
//! composition goes through before training is submitted.

use std::collections::BTreeMap;
use uuid::Uuid;

use super::ops::{MutationOp, QueryOp, TRAIN_TASK};
use super::types::{
  CompositionInfo, CompositionSummary, CompositionType, ModelParams, ModelType, ParamsMode,
  PredictionTable, TaskType, TrainSpec,
};
use crate::cache::EntityPayload;
use crate::client::{Client, ReadOptions};
use crate::error::{ApiError, DraftError};

impl Client {
  /// List every composition.
  pub async fn all_compositions(&self) -> Result<Vec<CompositionSummary>, ApiError> {
    let snapshot = self.read(QueryOp::AllCompositions, ReadOptions::default()).await?;
    match snapshot.payload {
      Some(EntityPayload::CompositionList(compositions)) => Ok(compositions),
      _ => Err(ApiError::Decode("composition list missing from resolved entity".into())),
    }
  }

  /// Full metadata of one composition, including its member models and the
  /// server-owned training stage.
  pub async fn composition_info(&self, name: &str) -> Result<CompositionInfo, ApiError> {
    let op = QueryOp::CompositionInfo { name: name.to_string() };
    let snapshot = self.read(op, ReadOptions::default()).await?;
    match snapshot.payload {
      Some(EntityPayload::CompositionInfo(info)) => Ok(info),
      _ => Err(ApiError::Decode("composition info missing from resolved entity".into())),
    }
  }

  /// Submit a composition for training. From here on the composition's
  /// canonical state is server-owned; training stays pending until an info
  /// refetch reports the trained stage.
  pub async fn train_composition(&self, spec: TrainSpec) -> Result<(), ApiError> {
    self.perform(MutationOp::TrainComposition { spec }).await.map(drop)
  }

  /// Run a trained composition against a document; column-major output.
  pub async fn predict_composition(
    &self,
    name: &str,
    document_name: &str,
  ) -> Result<PredictionTable, ApiError> {
    let value = self
      .perform(MutationOp::PredictComposition {
        name: name.to_string(),
        document_name: document_name.to_string(),
      })
      .await?;
    serde_json::from_value(value).map_err(ApiError::decode)
  }

  pub async fn rename_composition(&self, name: &str, new_name: &str) -> Result<(), ApiError> {
    self
      .perform(MutationOp::RenameComposition {
        name: name.to_string(),
        new_name: new_name.to_string(),
      })
      .await
      .map(drop)
  }

  pub async fn delete_composition(&self, name: &str) -> Result<(), ApiError> {
    self
      .perform(MutationOp::DeleteComposition { name: name.to_string() })
      .await
      .map(drop)
  }

  /// Whether a submitted training run has not yet been confirmed by a
  /// refetch.
  pub fn is_training_pending(&self, name: &str) -> bool {
    self.pending().is_pending(name.trim(), TRAIN_TASK)
  }
}

/// One member model being configured in a draft.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelDraft {
  pub model_type: Option<ModelType>,
  pub params: Option<serde_json::Value>,
}

/// Mutable composition state owned by the caller until training is
/// submitted. `build` validates it into an immutable [`TrainSpec`].
#[derive(Debug, Clone)]
pub struct CompositionDraft {
  pub name: String,
  pub document_name: String,
  pub task_type: Option<TaskType>,
  pub composition_type: Option<CompositionType>,
  pub params_mode: Option<ParamsMode>,
  pub test_size: f64,
  models: BTreeMap<String, ModelDraft>,
}

impl CompositionDraft {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      document_name: String::new(),
      task_type: None,
      composition_type: None,
      params_mode: None,
      test_size: 0.2,
      models: BTreeMap::new(),
    }
  }

  /// Add an empty model slot; returns its generated id.
  pub fn add_model(&mut self) -> String {
    let id = Uuid::new_v4().to_string();
    self.models.insert(id.clone(), ModelDraft::default());
    id
  }

  /// Replace a model slot. Returns false if the id is unknown.
  pub fn set_model(&mut self, id: &str, model: ModelDraft) -> bool {
    match self.models.get_mut(id) {
      Some(slot) => {
        *slot = model;
        true
      }
      None => false,
    }
  }

  pub fn remove_model(&mut self, id: &str) -> bool {
    self.models.remove(id).is_some()
  }

  pub fn models(&self) -> &BTreeMap<String, ModelDraft> {
    &self.models
  }

  /// Validate the draft into a training submission.
  pub fn build(&self) -> Result<TrainSpec, DraftError> {
    if self.name.trim().is_empty() {
      return Err(DraftError::MissingName);
    }
    if self.document_name.trim().is_empty() {
      return Err(DraftError::MissingDocument);
    }
    let task_type = self.task_type.ok_or(DraftError::MissingTaskType)?;
    let composition_type = self.composition_type.ok_or(DraftError::MissingCompositionType)?;
    let params_mode = self.params_mode.ok_or(DraftError::MissingParamsMode)?;
    if !(self.test_size > 0.0 && self.test_size < 1.0) {
      return Err(DraftError::TestSizeOutOfRange(self.test_size));
    }
    if self.models.is_empty() {
      return Err(DraftError::NoModels);
    }

    let mut models = Vec::with_capacity(self.models.len());
    for (id, draft) in &self.models {
      let model_type = draft.model_type.ok_or_else(|| DraftError::UntypedModel(id.clone()))?;
      models.push(ModelParams {
        model_type,
        params: draft
          .params
          .clone()
          .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new())),
      });
    }

    Ok(TrainSpec {
      name: self.name.trim().to_string(),
      document_name: self.document_name.trim().to_string(),
      task_type,
      composition_type,
      params_mode,
      test_size: self.test_size,
      models,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn filled_draft() -> CompositionDraft {
    let mut draft = CompositionDraft::new("churn-v1");
    draft.document_name = "sales.csv".into();
    draft.task_type = Some(TaskType::Classification);
    draft.composition_type = Some(CompositionType::Stacking);
    draft.params_mode = Some(ParamsMode::Auto);
    let id = draft.add_model();
    draft.set_model(
      &id,
      ModelDraft {
        model_type: Some(ModelType::CatBoostClassifier),
        params: Some(json!({"iterations": 200})),
      },
    );
    draft
  }

  #[test]
  fn test_build_produces_a_train_spec() {
    let spec = filled_draft().build().unwrap();
    assert_eq!(spec.name, "churn-v1");
    assert_eq!(spec.task_type, TaskType::Classification);
    assert_eq!(spec.test_size, 0.2);
    assert_eq!(spec.models.len(), 1);
    assert_eq!(spec.models[0].model_type, ModelType::CatBoostClassifier);
  }

  #[test]
  fn test_missing_choices_are_reported() {
    let mut draft = CompositionDraft::new("churn-v1");
    assert_eq!(draft.build().unwrap_err(), DraftError::MissingDocument);

    draft.document_name = "sales.csv".into();
    assert_eq!(draft.build().unwrap_err(), DraftError::MissingTaskType);

    draft.task_type = Some(TaskType::Regression);
    assert_eq!(draft.build().unwrap_err(), DraftError::MissingCompositionType);
  }

  #[test]
  fn test_empty_and_untyped_models_are_rejected() {
    let mut draft = filled_draft();
    let untyped = draft.add_model();
    assert_eq!(draft.build().unwrap_err(), DraftError::UntypedModel(untyped.clone()));

    draft.remove_model(&untyped);
    assert!(draft.build().is_ok());
  }

  #[test]
  fn test_test_size_bounds() {
    let mut draft = filled_draft();
    draft.test_size = 1.0;
    assert_eq!(draft.build().unwrap_err(), DraftError::TestSizeOutOfRange(1.0));
    draft.test_size = 0.0;
    assert_eq!(draft.build().unwrap_err(), DraftError::TestSizeOutOfRange(0.0));
  }

  #[test]
  fn test_unparameterized_model_defaults_to_empty_params() {
    let mut draft = filled_draft();
    let id = draft.add_model();
    draft.set_model(
      &id,
      ModelDraft { model_type: Some(ModelType::LogisticRegression), params: None },
    );
    let spec = draft.build().unwrap();
    let plain = spec
      .models
      .iter()
      .find(|m| m.model_type == ModelType::LogisticRegression)
      .unwrap();
    assert_eq!(plain.params, json!({}));
  }
}
