//! JSON REST API for Blake Vision.
//!
//! Exposes an axum [`Router`] backed by any [`VisionStore`]. Every entity
//! route requires a bearer session; rows are always read and written on
//! behalf of the session's user.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = blake_api::router(state).nest_service("/media", ServeDir::new(dir));
//! ```

pub mod auth;
pub mod categories;
pub mod documents;
pub mod envelope;
pub mod episodes;
pub mod error;
pub mod extract;
pub mod extraction;
pub mod fichas;
pub mod images;
pub mod relations;
pub mod search;
pub mod universes;
pub mod upload;
pub mod worlds;

use std::sync::Arc;

use axum::{
  Json, Router,
  extract::DefaultBodyLimit,
  routing::{get, patch, post, put},
};
use blake_core::{
  extraction::LanguageModel,
  media::{MAX_DOCUMENT_BYTES, ObjectStore},
  store::VisionStore,
};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Room for multipart framing on top of the largest accepted file.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:       Arc<S>,
  pub media:       Arc<dyn ObjectStore>,
  /// `None` when no API key is configured; AI routes then answer 500.
  pub ai:          Option<Arc<dyn LanguageModel>>,
  pub session_ttl: chrono::Duration,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:       self.store.clone(),
      media:       self.media.clone(),
      ai:          self.ai.clone(),
      session_ttl: self.session_ttl,
    }
  }
}

impl<S> AppState<S> {
  pub fn language_model(&self) -> Result<&dyn LanguageModel, ApiError> {
    self
      .ai
      .as_deref()
      .ok_or_else(|| ApiError::Internal("language model is not configured".into()))
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: VisionStore + 'static,
{
  Router::new()
    .route("/health", get(health))
    // Auth
    .route("/auth/signup", post(auth::signup::<S>))
    .route("/auth/login", post(auth::login::<S>))
    .route("/auth/logout", post(auth::logout::<S>))
    .route("/auth/me", get(auth::me::<S>))
    // Universes
    .route("/universes", get(universes::list::<S>).post(universes::create::<S>))
    .route(
      "/universes/{id}",
      get(universes::get_one::<S>)
        .put(universes::update::<S>)
        .delete(universes::remove::<S>),
    )
    // Worlds
    .route("/worlds", get(worlds::list::<S>).post(worlds::create::<S>))
    .route("/worlds/reorder", patch(worlds::reorder::<S>))
    .route(
      "/worlds/{id}",
      get(worlds::get_one::<S>)
        .put(worlds::update::<S>)
        .delete(worlds::remove::<S>),
    )
    // Categories
    .route("/categories", get(categories::list::<S>).post(categories::create::<S>))
    .route(
      "/categories/{id}",
      put(categories::update::<S>).delete(categories::remove::<S>),
    )
    // Fichas
    .route("/fichas", get(fichas::list::<S>).post(fichas::create::<S>))
    .route(
      "/fichas/{id}",
      get(fichas::get_one::<S>)
        .put(fichas::update::<S>)
        .delete(fichas::remove::<S>),
    )
    .route("/fichas/{id}/embedding", post(fichas::embed::<S>))
    // Episodes
    .route("/episodes", get(episodes::list::<S>).post(episodes::create::<S>))
    .route(
      "/episodes/{id}",
      put(episodes::update::<S>).delete(episodes::remove::<S>),
    )
    // Relations
    .route("/relations", get(relations::list::<S>).post(relations::create::<S>))
    .route("/relations/types", get(relations::types::<S>))
    .route(
      "/relations/{id}",
      patch(relations::update::<S>).delete(relations::remove::<S>),
    )
    // Uploads and AI
    .route("/images", post(images::upload::<S>))
    .route("/documents/parse", post(documents::parse::<S>))
    .route("/extract", post(extraction::extract::<S>))
    .route("/search/semantic", get(search::semantic::<S>))
    .layer(DefaultBodyLimit::max(MAX_DOCUMENT_BYTES + MULTIPART_OVERHEAD))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

/// `GET /health`
async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }

#[cfg(test)]
mod tests;
