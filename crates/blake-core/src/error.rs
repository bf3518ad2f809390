//! Error types for `blake-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Input rejected before it reaches the store.
  #[error("{0}")]
  Validation(String),

  #[error("unknown relation type: {0:?}")]
  UnknownRelationType(String),
}

impl Error {
  pub fn validation(message: impl Into<String>) -> Self {
    Self::Validation(message.into())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
