//! `POST /documents/parse` — text extraction from an uploaded document.

use axum::extract::{Multipart, State, multipart::MultipartRejection};
use blake_core::{media::MAX_DOCUMENT_BYTES, store::VisionStore};
use blake_ingest::document::parse_document;

use crate::{
  AppState,
  auth::CurrentUser,
  envelope::Envelope,
  error::ApiError,
  upload::UploadForm,
};

impl From<blake_ingest::Error> for ApiError {
  fn from(e: blake_ingest::Error) -> Self {
    use blake_ingest::Error as E;
    match e {
      E::UnsupportedDocument(_)
      | E::EmptyDocument
      | E::NotUtf8(_)
      | E::Docx(_)
      | E::Pdf(_) => ApiError::bad_request(e.to_string()),
      other => ApiError::internal("document", other),
    }
  }
}

/// `POST /documents/parse` — multipart with a `file` part.
pub async fn parse<S>(
  State(_state): State<AppState<S>>,
  _user: CurrentUser,
  multipart: Result<Multipart, MultipartRejection>,
) -> Result<Envelope, ApiError>
where
  S: VisionStore + 'static,
{
  let mut form = UploadForm::read(multipart?).await?;
  let file = form.take_file()?;
  if file.bytes.len() > MAX_DOCUMENT_BYTES {
    return Err(ApiError::bad_request("file exceeds the 50MB limit"));
  }

  let filename = file.filename.as_deref().unwrap_or("document");
  let document = parse_document(filename, file.content_type.as_deref(), &file.bytes)?;
  Envelope::ok("document", document)
}
