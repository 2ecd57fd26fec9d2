//! Error types shared across the cache and transport layers.

use thiserror::Error;

/// Failure of a remote operation, classified by where it went wrong.
///
/// The variants are `Clone` because every caller joined on a deduplicated
/// fetch observes the identical resolution, including failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
  /// The request never produced a response (unreachable host, timeout).
  #[error("transport failure: {0}")]
  Transport(String),

  /// The server answered with a well-formed failure (validation, missing
  /// entity, auth).
  #[error("rejected by server ({status}): {message}")]
  Rejected { status: u16, message: String },

  /// A response arrived but did not match the expected shape.
  #[error("malformed response: {0}")]
  Decode(String),
}

impl ApiError {
  pub(crate) fn decode(err: serde_json::Error) -> Self {
    ApiError::Decode(err.to_string())
  }
}

/// A composition draft that cannot be turned into a training submission.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DraftError {
  #[error("composition name is empty")]
  MissingName,

  #[error("no source document selected")]
  MissingDocument,

  #[error("task type not chosen")]
  MissingTaskType,

  #[error("composition type not chosen")]
  MissingCompositionType,

  #[error("params mode not chosen")]
  MissingParamsMode,

  #[error("test size {0} is outside (0, 1)")]
  TestSizeOutOfRange(f64),

  #[error("composition has no models")]
  NoModels,

  #[error("model {0} has no type chosen")]
  UntypedModel(String),
}
