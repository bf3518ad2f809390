//! Failures of the SQLite store.
//!
//! Anything here reaches the API as a 500; validation the caller should have
//! caught first still surfaces through [`Error::Rejected`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("rejected: {0}")]
  Rejected(#[from] blake_core::Error),

  #[error("sqlite: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// A JSON-encoded column (tags, images, embedding) failed to round-trip.
  #[error("list column: {0}")]
  Json(#[from] serde_json::Error),

  #[error("malformed id: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("malformed timestamp: {0}")]
  Timestamp(String),

  #[error("unknown relation type {0:?} in relations table")]
  UnknownRelationType(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
