//! `POST /images` — multipart image upload.
//!
//! Parts: `file` (the image) and an optional `ficha_id`. With a ficha, the
//! public URL is appended to that ficha's album.

use axum::extract::{Multipart, State, multipart::MultipartRejection};
use blake_core::{
  ficha::FichaUpdate,
  media::{check_image, image_key},
  store::VisionStore,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
  AppState,
  auth::CurrentUser,
  envelope::Envelope,
  error::ApiError,
  fichas::owned_ficha,
  upload::UploadForm,
};

#[derive(Debug, Serialize)]
pub struct ImageView {
  pub url:          String,
  pub key:          String,
  pub content_type: String,
  pub size:         usize,
  pub ficha_id:     Option<Uuid>,
}

/// `POST /images`
pub async fn upload<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  multipart: Result<Multipart, MultipartRejection>,
) -> Result<Envelope, ApiError>
where
  S: VisionStore + 'static,
{
  let mut form = UploadForm::read(multipart?).await?;
  let file = form.take_file()?;

  let content_type = file.content_type.unwrap_or_default();
  let ext = check_image(&content_type, file.bytes.len())?;

  let ficha = match form.field("ficha_id") {
    Some(raw) => {
      let id = Uuid::parse_str(raw)
        .map_err(|_| ApiError::bad_request("ficha_id must be a UUID"))?;
      Some(owned_ficha(&*state.store, user.id, id).await?)
    }
    None => None,
  };

  let key = image_key(user.id, ext);
  let stored = state
    .media
    .put(&key, file.bytes, &content_type)
    .await
    .map_err(|e| ApiError::internal("image upload", e))?;
  tracing::info!(key = %stored.key, size = stored.size, "image stored");

  let ficha_id = ficha.as_ref().map(|f| f.id);
  if let Some(ficha) = ficha {
    let mut images = ficha.images;
    images.push(stored.url.clone());
    state
      .store
      .update_ficha(user.id, ficha.id, FichaUpdate {
        title: ficha.title,
        summary: ficha.summary,
        content: ficha.content,
        tags: ficha.tags,
        diegetic_year: ficha.diegetic_year,
        temporal_layer: ficha.temporal_layer,
        episode_id: ficha.episode_id,
        images,
      })
      .await
      .map_err(ApiError::store)?
      .ok_or_else(|| ApiError::not_found("ficha"))?;
  }

  Envelope::created("image", ImageView {
    url: stored.url,
    key: stored.key,
    content_type: stored.content_type,
    size: stored.size,
    ficha_id,
  })
}
