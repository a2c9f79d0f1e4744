//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use fieldtrack_core::ingest::IngestError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized")]
  Unauthorized,

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Wrap a backend error without naming its concrete type.
  pub fn store<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
    ApiError::Store(Box::new(err))
  }
}

impl<E: std::error::Error + Send + Sync + 'static> From<IngestError<E>>
  for ApiError
{
  fn from(err: IngestError<E>) -> Self {
    match err {
      IngestError::Unauthorized => ApiError::Unauthorized,
      IngestError::InvalidInput(e) => ApiError::BadRequest(e.to_string()),
      IngestError::StoreFailure(e) => ApiError::store(e),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::Unauthorized => {
        (StatusCode::UNAUTHORIZED, "unauthorized".to_string())
      }
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };

    let mut res = (status, Json(json!({ "error": message }))).into_response();
    if status == StatusCode::UNAUTHORIZED {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"fieldtrack\""),
      );
    }
    res
  }
}
