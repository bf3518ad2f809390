//! Reading `multipart/form-data` bodies into memory.

use std::collections::HashMap;

use axum::extract::Multipart;
use bytes::Bytes;

use crate::error::ApiError;

/// The `file` part of an upload.
#[derive(Debug)]
pub struct UploadedFile {
  pub filename:     Option<String>,
  pub content_type: Option<String>,
  pub bytes:        Bytes,
}

/// A parsed form: the `file` part plus every other part as text.
#[derive(Debug, Default)]
pub struct UploadForm {
  pub file:   Option<UploadedFile>,
  pub fields: HashMap<String, String>,
}

impl UploadForm {
  pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
    let mut form = Self::default();
    while let Some(field) = multipart.next_field().await? {
      let Some(name) = field.name().map(str::to_owned) else {
        continue;
      };
      if name == "file" {
        let filename = field.file_name().map(str::to_owned);
        let content_type = field.content_type().map(str::to_owned);
        let bytes = field.bytes().await?;
        form.file = Some(UploadedFile { filename, content_type, bytes });
      } else {
        let text = field.text().await?;
        form.fields.insert(name, text);
      }
    }
    Ok(form)
  }

  pub fn take_file(&mut self) -> Result<UploadedFile, ApiError> {
    self
      .file
      .take()
      .ok_or_else(|| ApiError::bad_request("a file part named \"file\" is required"))
  }

  /// A non-blank text part.
  pub fn field(&self, name: &str) -> Option<&str> {
    self
      .fields
      .get(name)
      .map(|v| v.trim())
      .filter(|v| !v.is_empty())
  }
}
