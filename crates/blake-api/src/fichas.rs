//! Handlers for `/fichas` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/fichas` | Filters: `universe_id`, `world_id`, `category`, `episode_id`, `tag`, `q`, `limit`, `offset` |
//! | `POST`   | `/fichas` | Assigns the next code under `WORLD-CATEGORY-` |
//! | `GET`    | `/fichas/{id}` | |
//! | `PUT`    | `/fichas/{id}` | Replaces the editable fields; code and placement stay |
//! | `DELETE` | `/fichas/{id}` | Relations go with it |
//! | `POST`   | `/fichas/{id}/embedding` | Embeds title, summary and content |

use axum::extract::{Path, State};
use blake_core::{
  category::{SINOPSE, is_universe_wide},
  code::{code_stem, next_code},
  episode::Episode,
  ficha::{Ficha, FichaQuery, FichaUpdate, NewFicha, normalize_tags},
  prefix::require_name,
  store::VisionStore,
  world::World,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  AppState,
  auth::CurrentUser,
  envelope::Envelope,
  error::ApiError,
  extract::{AppJson, AppQuery},
  universes::owned_universe,
  worlds::owned_world,
};

/// A ficha as sent over the wire: the vector itself stays server-side.
#[derive(Debug, Serialize)]
pub struct FichaView {
  #[serde(flatten)]
  pub ficha:         Ficha,
  pub has_embedding: bool,
}

impl From<Ficha> for FichaView {
  fn from(ficha: Ficha) -> Self {
    let has_embedding = ficha.embedding.is_some();
    Self { ficha, has_embedding }
  }
}

/// Fetch a ficha of `owner` or fail with 404.
pub(crate) async fn owned_ficha<S>(store: &S, owner: Uuid, id: Uuid) -> Result<Ficha, ApiError>
where
  S: VisionStore,
{
  store
    .get_ficha(owner, id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("ficha"))
}

/// Resolve `episode_id` for a ficha living in `world`, enforcing the
/// one-sinopse-per-episode rule. `ficha_id` is the ficha being edited.
async fn check_episode<S>(
  store: &S,
  owner: Uuid,
  category: &str,
  world: Option<&World>,
  episode_id: Option<Uuid>,
  ficha_id: Option<Uuid>,
) -> Result<Option<Episode>, ApiError>
where
  S: VisionStore,
{
  let is_sinopse = category == SINOPSE;
  let Some(episode_id) = episode_id else {
    if is_sinopse {
      return Err(ApiError::bad_request("a sinopse requires an episode"));
    }
    return Ok(None);
  };

  let episode = store
    .get_episode(owner, episode_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("episode"))?;
  if world.map(|w| w.id) != Some(episode.world_id) {
    return Err(ApiError::bad_request("episode belongs to another world"));
  }

  if is_sinopse {
    let existing = store
      .find_sinopse(owner, episode.world_id, episode.id)
      .await
      .map_err(ApiError::store)?;
    if existing.is_some_and(|f| Some(f.id) != ficha_id) {
      return Err(ApiError::bad_request("this episode already has a sinopse"));
    }
  }
  Ok(Some(episode))
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub universe_id: Option<Uuid>,
  pub world_id:    Option<Uuid>,
  pub category:    Option<String>,
  pub episode_id:  Option<Uuid>,
  pub tag:         Option<String>,
  pub q:           Option<String>,
  pub limit:       Option<usize>,
  pub offset:      Option<usize>,
}

/// `GET /fichas[?universe_id=..][&world_id=..][&category=..][&episode_id=..][&tag=..][&q=..]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  AppQuery(params): AppQuery<ListParams>,
) -> Result<Envelope, ApiError>
where
  S: VisionStore + 'static,
{
  let query = FichaQuery {
    universe_id: params.universe_id,
    world_id:    params.world_id,
    category:    params.category,
    episode_id:  params.episode_id,
    tag:         params.tag,
    text:        params.q,
    limit:       params.limit,
    offset:      params.offset,
  };
  let fichas = state
    .store
    .list_fichas(user.id, &query)
    .await
    .map_err(ApiError::store)?;
  let views: Vec<FichaView> = fichas.into_iter().map(FichaView::from).collect();
  Envelope::ok("fichas", views)
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub universe_id:    Uuid,
  pub world_id:       Option<Uuid>,
  pub category:       String,
  pub title:          String,
  pub summary:        Option<String>,
  pub content:        Option<String>,
  #[serde(default)]
  pub tags:           Vec<String>,
  pub diegetic_year:  Option<i32>,
  pub temporal_layer: Option<String>,
  pub episode_id:     Option<Uuid>,
  #[serde(default)]
  pub images:         Vec<String>,
}

/// `POST /fichas`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  AppJson(body): AppJson<CreateBody>,
) -> Result<Envelope, ApiError>
where
  S: VisionStore + 'static,
{
  let store = &*state.store;
  let title = require_name("title", &body.title)?.to_owned();
  owned_universe(store, user.id, body.universe_id).await?;

  let category = store
    .find_category(user.id, body.universe_id, body.category.clone())
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::bad_request(format!("unknown category {:?}", body.category)))?;

  // The world that names the code: the ficha's own, or the root world for
  // universe-wide fichas.
  let world = match body.world_id {
    Some(world_id) => {
      let world = owned_world(store, user.id, world_id).await?;
      if world.universe_id != body.universe_id {
        return Err(ApiError::bad_request("world belongs to another universe"));
      }
      Some(world)
    }
    None if is_universe_wide(&category.slug) => None,
    None => {
      return Err(ApiError::bad_request(format!(
        "world_id is required for {}",
        category.slug
      )));
    }
  };

  check_episode(
    store,
    user.id,
    &category.slug,
    world.as_ref(),
    body.episode_id,
    None,
  )
  .await?;

  let code_world = match &world {
    Some(world) => world.clone(),
    None => store
      .root_world(user.id, body.universe_id)
      .await
      .map_err(ApiError::store)?
      .ok_or_else(|| ApiError::internal("universe", "root world is missing"))?,
  };
  let stem = code_stem(&code_world.prefix, &category.prefix);
  let taken = store
    .codes_with_stem(user.id, stem.clone())
    .await
    .map_err(ApiError::store)?;
  let code = next_code(&stem, &taken);

  let ficha = store
    .create_ficha(user.id, NewFicha {
      universe_id: body.universe_id,
      world_id: body.world_id,
      category: category.slug,
      title,
      code,
      summary: body.summary,
      content: body.content,
      tags: normalize_tags(body.tags),
      diegetic_year: body.diegetic_year,
      temporal_layer: body.temporal_layer,
      episode_id: body.episode_id,
      images: body.images,
    })
    .await
    .map_err(ApiError::store)?;
  tracing::info!(ficha = %ficha.id, code = %ficha.code, "ficha created");

  Envelope::created("ficha", FichaView::from(ficha))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /fichas/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Envelope, ApiError>
where
  S: VisionStore + 'static,
{
  let ficha = owned_ficha(&*state.store, user.id, id).await?;
  Envelope::ok("ficha", FichaView::from(ficha))
}

// ─── Update ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
  pub title:          String,
  pub summary:        Option<String>,
  pub content:        Option<String>,
  #[serde(default)]
  pub tags:           Vec<String>,
  pub diegetic_year:  Option<i32>,
  pub temporal_layer: Option<String>,
  pub episode_id:     Option<Uuid>,
  /// Absent keeps the current album.
  pub images:         Option<Vec<String>>,
}

/// `PUT /fichas/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
  AppJson(body): AppJson<UpdateBody>,
) -> Result<Envelope, ApiError>
where
  S: VisionStore + 'static,
{
  let store = &*state.store;
  let title = require_name("title", &body.title)?.to_owned();
  let ficha = owned_ficha(store, user.id, id).await?;

  let world = match ficha.world_id {
    Some(world_id) => Some(owned_world(store, user.id, world_id).await?),
    None => None,
  };
  check_episode(
    store,
    user.id,
    &ficha.category,
    world.as_ref(),
    body.episode_id,
    Some(ficha.id),
  )
  .await?;

  let updated = store
    .update_ficha(user.id, id, FichaUpdate {
      title,
      summary: body.summary,
      content: body.content,
      tags: normalize_tags(body.tags),
      diegetic_year: body.diegetic_year,
      temporal_layer: body.temporal_layer,
      episode_id: body.episode_id,
      images: body.images.unwrap_or(ficha.images),
    })
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("ficha"))?;
  Envelope::ok("ficha", FichaView::from(updated))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /fichas/{id}`
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Envelope, ApiError>
where
  S: VisionStore + 'static,
{
  let deleted = state
    .store
    .delete_ficha(user.id, id)
    .await
    .map_err(ApiError::store)?;
  if !deleted {
    return Err(ApiError::not_found("ficha"));
  }
  Ok(Envelope::deleted())
}

// ─── Embedding ────────────────────────────────────────────────────────────────

/// `POST /fichas/{id}/embedding`
pub async fn embed<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Envelope, ApiError>
where
  S: VisionStore + 'static,
{
  let model = state.language_model()?;
  let mut ficha = owned_ficha(&*state.store, user.id, id).await?;

  let vector = model
    .embed(&ficha.embedding_text())
    .await
    .map_err(|e| ApiError::internal("embedding", e))?;
  state
    .store
    .set_embedding(user.id, id, vector.clone())
    .await
    .map_err(ApiError::store)?;
  tracing::debug!(ficha = %id, dims = vector.len(), "ficha embedded");

  ficha.embedding = Some(vector);
  Envelope::ok("ficha", FichaView::from(ficha))
}
