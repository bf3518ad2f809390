//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every failure leaves the API as `{"error": <message>, "details"?: <any>}`.

use axum::{
  Json,
  extract::{
    multipart::{MultipartError, MultipartRejection},
    rejection::{JsonRejection, QueryRejection},
  },
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized")]
  Unauthorized,

  #[error("{0}")]
  Forbidden(String),

  #[error("{0}")]
  NotFound(String),

  #[error("{message}")]
  BadRequest {
    message: String,
    details: Option<Value>,
  },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// Language model, object storage and other collaborator failures.
  #[error("{0}")]
  Internal(String),
}

impl ApiError {
  pub fn bad_request(message: impl Into<String>) -> Self {
    ApiError::BadRequest { message: message.into(), details: None }
  }

  pub fn not_found(what: &str) -> Self { ApiError::NotFound(format!("{what} not found")) }

  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    ApiError::Store(Box::new(e))
  }

  pub fn internal(context: &str, e: impl std::fmt::Display) -> Self {
    ApiError::Internal(format!("{context}: {e}"))
  }

  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
      ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
      ApiError::Store(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }

    let body = match self {
      ApiError::BadRequest { message, details: Some(details) } => {
        json!({ "error": message, "details": details })
      }
      ApiError::Store(e) => json!({ "error": e.to_string() }),
      other => json!({ "error": other.to_string() }),
    };
    (status, Json(body)).into_response()
  }
}

impl From<blake_core::Error> for ApiError {
  fn from(e: blake_core::Error) -> Self {
    ApiError::bad_request(e.to_string())
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    ApiError::BadRequest {
      message: "invalid request body".into(),
      details: Some(Value::String(rejection.body_text())),
    }
  }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self {
    ApiError::BadRequest {
      message: "invalid query string".into(),
      details: Some(Value::String(rejection.body_text())),
    }
  }
}

impl From<MultipartRejection> for ApiError {
  fn from(rejection: MultipartRejection) -> Self {
    ApiError::BadRequest {
      message: "invalid multipart body".into(),
      details: Some(Value::String(rejection.body_text())),
    }
  }
}

impl From<MultipartError> for ApiError {
  fn from(e: MultipartError) -> Self {
    ApiError::BadRequest {
      message: "invalid multipart body".into(),
      details: Some(Value::String(e.body_text())),
    }
  }
}
