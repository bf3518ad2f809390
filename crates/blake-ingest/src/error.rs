//! Error type for `blake-ingest`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unsupported document format: {0}")]
  UnsupportedDocument(String),

  #[error("no text found in document")]
  EmptyDocument,

  #[error("document is not valid UTF-8")]
  NotUtf8(#[from] std::string::FromUtf8Error),

  #[error("malformed docx: {0}")]
  Docx(String),

  #[error("malformed pdf: {0}")]
  Pdf(#[from] lopdf::Error),

  #[error("i/o error: {0}")]
  Io(#[from] std::io::Error),

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("language model returned {status}: {body}")]
  Upstream { status: u16, body: String },

  /// The model answered, but not with what was asked for.
  #[error("unexpected language model response: {0}")]
  MalformedResponse(String),
}

impl From<zip::result::ZipError> for Error {
  fn from(e: zip::result::ZipError) -> Self { Error::Docx(e.to_string()) }
}

impl From<quick_xml::Error> for Error {
  fn from(e: quick_xml::Error) -> Self { Error::Docx(e.to_string()) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
