//! An [`ObjectStore`] writing into a local directory that is served over
//! HTTP under `public_base_url`.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use blake_core::media::{ObjectStore, StoredObject};
use bytes::Bytes;

use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct FsObjectStore {
  root:            PathBuf,
  public_base_url: String,
}

impl FsObjectStore {
  pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
    Self {
      root:            root.into(),
      public_base_url: public_base_url.into().trim_end_matches('/').to_owned(),
    }
  }

  /// Resolve `key` below the root; keys may not climb out of it.
  fn path_for(&self, key: &str) -> Result<PathBuf> {
    let relative = Path::new(key);
    let escapes = relative
      .components()
      .any(|c| !matches!(c, Component::Normal(_)));
    if key.is_empty() || escapes {
      return Err(Error::Io(std::io::Error::new(
        std::io::ErrorKind::InvalidInput,
        format!("invalid object key: {key}"),
      )));
    }
    Ok(self.root.join(relative))
  }

  pub async fn write(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<StoredObject> {
    let path = self.path_for(key)?;
    if let Some(parent) = path.parent() {
      tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, &bytes).await?;
    tracing::debug!(key, size = bytes.len(), "object stored");

    Ok(StoredObject {
      key:          key.to_owned(),
      url:          format!("{}/{key}", self.public_base_url),
      content_type: content_type.to_owned(),
      size:         bytes.len(),
    })
  }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
  async fn put(
    &self,
    key: &str,
    bytes: Bytes,
    content_type: &str,
  ) -> Result<StoredObject, Box<dyn std::error::Error + Send + Sync>> {
    Ok(self.write(key, bytes, content_type).await?)
  }
}
