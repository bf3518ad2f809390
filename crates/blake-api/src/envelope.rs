//! The success envelope: `{ <key>: <value> }`.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ApiError;

/// A JSON object with a single entry, sent with `status`.
#[derive(Debug)]
pub struct Envelope {
  key:    &'static str,
  value:  Value,
  status: StatusCode,
}

impl Envelope {
  pub fn ok<T: Serialize>(key: &'static str, value: T) -> Result<Self, ApiError> {
    Self::with_status(StatusCode::OK, key, value)
  }

  pub fn created<T: Serialize>(key: &'static str, value: T) -> Result<Self, ApiError> {
    Self::with_status(StatusCode::CREATED, key, value)
  }

  fn with_status<T: Serialize>(
    status: StatusCode,
    key: &'static str,
    value: T,
  ) -> Result<Self, ApiError> {
    let value =
      serde_json::to_value(value).map_err(|e| ApiError::internal("serialization", e))?;
    Ok(Self { key, value, status })
  }

  /// `{"deleted": true}`
  pub fn deleted() -> Self {
    Self { key: "deleted", value: Value::Bool(true), status: StatusCode::OK }
  }
}

impl IntoResponse for Envelope {
  fn into_response(self) -> Response {
    let mut body = Map::new();
    body.insert(self.key.to_owned(), self.value);
    (self.status, Json(Value::Object(body))).into_response()
  }
}
