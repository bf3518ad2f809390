//! `GET /search/semantic` — rank a universe's embedded fichas against a query.

use axum::extract::State;
use blake_core::{similarity::rank, store::VisionStore};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  AppState,
  auth::CurrentUser,
  envelope::Envelope,
  error::ApiError,
  extract::AppQuery,
  fichas::FichaView,
  universes::owned_universe,
};

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
  pub universe_id: Uuid,
  pub q:           String,
  pub limit:       Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchHit {
  pub ficha: FichaView,
  pub score: f32,
}

/// `GET /search/semantic?universe_id=<id>&q=<text>[&limit=<n>]`
pub async fn semantic<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  AppQuery(params): AppQuery<SearchParams>,
) -> Result<Envelope, ApiError>
where
  S: VisionStore + 'static,
{
  let q = params.q.trim();
  if q.is_empty() {
    return Err(ApiError::bad_request("q is required"));
  }
  let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

  owned_universe(&*state.store, user.id, params.universe_id).await?;
  let model = state.language_model()?;
  let query = model
    .embed(q)
    .await
    .map_err(|e| ApiError::internal("embedding", e))?;

  let fichas = state
    .store
    .embedded_fichas(user.id, params.universe_id)
    .await
    .map_err(ApiError::store)?;
  let results: Vec<SearchHit> = rank(&query, fichas, limit)
    .into_iter()
    .map(|hit| SearchHit { ficha: FichaView::from(hit.ficha), score: hit.score })
    .collect();
  Envelope::ok("results", results)
}
