//! Image upload policy and the object-storage abstraction.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use uuid::Uuid;

use crate::{Error, Result};

/// Largest accepted image upload.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Largest accepted document upload for text extraction.
pub const MAX_DOCUMENT_BYTES: usize = 50 * 1024 * 1024;

/// Accepted image content types and the extension used for the stored key.
pub const IMAGE_TYPES: &[(&str, &str)] = &[
  ("image/jpeg", "jpg"),
  ("image/jpg", "jpg"),
  ("image/png", "png"),
  ("image/gif", "gif"),
  ("image/webp", "webp"),
];

/// Check an upload against the whitelist and the size ceiling. Returns the
/// file extension for the stored key.
pub fn check_image(content_type: &str, len: usize) -> Result<&'static str> {
  let content_type = content_type.trim().to_ascii_lowercase();
  let ext = IMAGE_TYPES
    .iter()
    .find(|(ct, _)| *ct == content_type)
    .map(|(_, ext)| *ext)
    .ok_or_else(|| {
      Error::validation(format!(
        "unsupported image type {content_type:?}; allowed: jpeg, png, gif, webp"
      ))
    })?;
  if len == 0 {
    return Err(Error::validation("file is empty"));
  }
  if len > MAX_IMAGE_BYTES {
    return Err(Error::validation("file exceeds the 5MB limit"));
  }
  Ok(ext)
}

/// A fresh storage key for an image of `owner`.
pub fn image_key(owner: Uuid, ext: &str) -> String {
  format!("{owner}/{}.{ext}", Uuid::new_v4())
}

/// The result of a successful upload.
#[derive(Debug, Clone, Serialize)]
pub struct StoredObject {
  pub key:          String,
  pub url:          String,
  pub content_type: String,
  pub size:         usize,
}

/// Object storage that accepts bytes under a key and serves them from a
/// public URL.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
  async fn put(
    &self,
    key: &str,
    bytes: Bytes,
    content_type: &str,
  ) -> Result<StoredObject, Box<dyn std::error::Error + Send + Sync>>;
}
