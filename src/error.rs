//! Error taxonomy shared by the store, the generator, practice sessions and HTTP handlers.

use axum::{
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  /// Rejected before any work: bad counts, blank text, invalid transitions.
  #[error("invalid argument: {0}")]
  InvalidArgument(String),

  /// Nothing matched the filter or the explicit id list.
  #[error("no matching exercises: {0}")]
  EmptySelection(String),

  #[error("{entity} {id} not found")]
  NotFound { entity: &'static str, id: i64 },

  /// The record existed but changed since the caller read it.
  #[error("conflict: {0}")]
  Conflict(String),

  /// The backing snapshot could not be written; the transaction was discarded.
  #[error("persistence failure: {0}")]
  Persistence(String),
}

impl AppError {
  pub fn invalid(msg: impl Into<String>) -> Self {
    AppError::InvalidArgument(msg.into())
  }

  pub fn not_found(entity: &'static str, id: i64) -> Self {
    AppError::NotFound { entity, id }
  }

  /// Stable machine-readable code used in HTTP and WebSocket error payloads.
  pub fn code(&self) -> &'static str {
    match self {
      AppError::InvalidArgument(_) => "invalid_argument",
      AppError::EmptySelection(_) => "empty_selection",
      AppError::NotFound { .. } => "not_found",
      AppError::Conflict(_) => "conflict",
      AppError::Persistence(_) => "persistence_failure",
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      AppError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
      AppError::EmptySelection(_) => StatusCode::UNPROCESSABLE_ENTITY,
      AppError::NotFound { .. } => StatusCode::NOT_FOUND,
      AppError::Conflict(_) => StatusCode::CONFLICT,
      AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

// Extractor rejections (malformed body, path or query) are caller mistakes.

impl From<JsonRejection> for AppError {
  fn from(r: JsonRejection) -> Self {
    AppError::InvalidArgument(r.body_text())
  }
}

impl From<PathRejection> for AppError {
  fn from(r: PathRejection) -> Self {
    AppError::InvalidArgument(r.body_text())
  }
}

impl From<QueryRejection> for AppError {
  fn from(r: QueryRejection) -> Self {
    AppError::InvalidArgument(r.body_text())
  }
}

#[derive(Serialize)]
pub struct ErrorOut {
  pub error: &'static str,
  pub message: String,
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    if matches!(self, AppError::Persistence(_)) {
      tracing::error!(target: "recall_backend", error = %self, "Request failed in persistence layer");
    }
    let body = ErrorOut { error: self.code(), message: self.to_string() };
    (self.status(), Json(body)).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_selection_is_distinct_from_not_found() {
    let empty = AppError::EmptySelection("tags [rust]".into());
    let missing = AppError::not_found("exercise", 7);
    assert_ne!(empty.status(), missing.status());
    assert_eq!(empty.code(), "empty_selection");
    assert_eq!(missing.to_string(), "exercise 7 not found");
  }
}
