//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler. Rendered as
/// `{"status": "error", "message": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
  /// Invalid user input; reported before any query runs.
  #[error("{0}")]
  BadRequest(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = json!({ "status": "error", "message": self.to_string() });
    (status, Json(body)).into_response()
  }
}
