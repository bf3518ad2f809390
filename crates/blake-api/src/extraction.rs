//! `POST /extract` — entity extraction from narrative text.
//!
//! The model's answer is returned as-is; turning entities into fichas is left
//! to the client.

use axum::extract::State;
use blake_core::{
  extraction::{CategoryHint, ExtractedEntity, ExtractedRelation},
  store::VisionStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  AppState,
  auth::CurrentUser,
  envelope::Envelope,
  error::ApiError,
  extract::AppJson,
  universes::owned_universe,
  worlds::owned_world,
};

#[derive(Debug, Deserialize)]
pub struct ExtractBody {
  pub universe_id: Uuid,
  pub world_id:    Option<Uuid>,
  pub text:        String,
}

#[derive(Debug, Serialize)]
pub struct ExtractionView {
  pub universe_id: Uuid,
  pub world_id:    Option<Uuid>,
  pub entities:    Vec<ExtractedEntity>,
  pub relations:   Vec<ExtractedRelation>,
}

/// `POST /extract`
pub async fn extract<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  AppJson(body): AppJson<ExtractBody>,
) -> Result<Envelope, ApiError>
where
  S: VisionStore + 'static,
{
  let text = body.text.trim();
  if text.is_empty() {
    return Err(ApiError::bad_request("text is required"));
  }

  let store = &*state.store;
  owned_universe(store, user.id, body.universe_id).await?;
  if let Some(world_id) = body.world_id {
    let world = owned_world(store, user.id, world_id).await?;
    if world.universe_id != body.universe_id {
      return Err(ApiError::bad_request("world belongs to another universe"));
    }
  }

  let model = state.language_model()?;
  let categories = store
    .list_categories(user.id, body.universe_id)
    .await
    .map_err(ApiError::store)?;
  let hints: Vec<CategoryHint> = categories.iter().map(CategoryHint::from).collect();

  let result = model
    .extract_entities(text, &hints)
    .await
    .map_err(|e| ApiError::internal("extraction", e))?;
  tracing::info!(
    universe = %body.universe_id,
    entities = result.entities.len(),
    relations = result.relations.len(),
    "text extracted"
  );

  Envelope::ok("extraction", ExtractionView {
    universe_id: body.universe_id,
    world_id:    body.world_id,
    entities:    result.entities,
    relations:   result.relations,
  })
}
