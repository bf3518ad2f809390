//! Handlers for `/worlds` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/worlds?universe_id=<id>` | By `order_index` |
//! | `POST`   | `/worlds` | Prefix generated from the name unless given |
//! | `PATCH`  | `/worlds/reorder` | Body: `{"universe_id","world_ids":[...]}` |
//! | `GET`    | `/worlds/{id}` | |
//! | `PUT`    | `/worlds/{id}` | An absent prefix keeps the current one |
//! | `DELETE` | `/worlds/{id}` | 400 for the root world |

use std::collections::HashSet;

use axum::extract::{Path, State};
use blake_core::{
  prefix::{PrefixScope, normalize_prefix, require_name, resolve_prefix},
  store::VisionStore,
  world::{NewWorld, World, WorldUpdate},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState,
  auth::CurrentUser,
  envelope::Envelope,
  error::ApiError,
  extract::{AppJson, AppQuery},
  universes::owned_universe,
};

/// Fetch a world of `owner` or fail with 404.
pub(crate) async fn owned_world<S>(store: &S, owner: Uuid, id: Uuid) -> Result<World, ApiError>
where
  S: VisionStore,
{
  store
    .get_world(owner, id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("world"))
}

/// Validate a caller-supplied world prefix and make sure nobody else in the
/// owner's scope holds it. `current` is the prefix the world already has.
pub(crate) async fn claim_world_prefix<S>(
  store: &S,
  owner: Uuid,
  raw: &str,
  current: Option<&str>,
) -> Result<String, ApiError>
where
  S: VisionStore,
{
  // Generated prefixes may fall outside the accepted shape ("X", "R2-");
  // sending one back unchanged keeps it.
  let unchanged = raw.trim().to_uppercase();
  if current == Some(unchanged.as_str()) {
    return Ok(unchanged);
  }
  let prefix = normalize_prefix(PrefixScope::World, raw)?;
  let taken = store.world_prefixes(owner).await.map_err(ApiError::store)?;
  if taken.contains(&prefix) {
    return Err(ApiError::bad_request("prefix already in use"));
  }
  Ok(prefix)
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub universe_id: Uuid,
}

/// `GET /worlds?universe_id=<id>`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  AppQuery(params): AppQuery<ListParams>,
) -> Result<Envelope, ApiError>
where
  S: VisionStore + 'static,
{
  owned_universe(&*state.store, user.id, params.universe_id).await?;
  let worlds = state
    .store
    .list_worlds(user.id, params.universe_id)
    .await
    .map_err(ApiError::store)?;
  Envelope::ok("worlds", worlds)
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub universe_id:  Uuid,
  pub name:         String,
  pub description:  Option<String>,
  #[serde(default)]
  pub has_episodes: bool,
  pub prefix:       Option<String>,
}

/// `POST /worlds`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  AppJson(body): AppJson<CreateBody>,
) -> Result<Envelope, ApiError>
where
  S: VisionStore + 'static,
{
  let name = require_name("name", &body.name)?.to_owned();
  owned_universe(&*state.store, user.id, body.universe_id).await?;

  let prefix = match body.prefix.as_deref() {
    Some(raw) => claim_world_prefix(&*state.store, user.id, raw, None).await?,
    None => {
      resolve_prefix(&name, || state.store.world_prefixes(user.id))
        .await
        .map_err(ApiError::store)?
    }
  };

  let world = state
    .store
    .create_world(user.id, NewWorld {
      universe_id: body.universe_id,
      name,
      description: body.description,
      has_episodes: body.has_episodes,
      prefix,
    })
    .await
    .map_err(ApiError::store)?;
  tracing::info!(world = %world.id, prefix = %world.prefix, "world created");

  Envelope::created("world", world)
}

// ─── Reorder ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ReorderBody {
  pub universe_id: Uuid,
  pub world_ids:   Vec<Uuid>,
}

/// `PATCH /worlds/reorder` — `world_ids` must name every world of the
/// universe exactly once.
pub async fn reorder<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  AppJson(body): AppJson<ReorderBody>,
) -> Result<Envelope, ApiError>
where
  S: VisionStore + 'static,
{
  owned_universe(&*state.store, user.id, body.universe_id).await?;
  let current = state
    .store
    .list_worlds(user.id, body.universe_id)
    .await
    .map_err(ApiError::store)?;

  let known: HashSet<Uuid> = current.iter().map(|w| w.id).collect();
  let requested: HashSet<Uuid> = body.world_ids.iter().copied().collect();
  if requested.len() != body.world_ids.len() {
    return Err(ApiError::bad_request("world_ids contains duplicates"));
  }
  if requested != known {
    return Err(ApiError::bad_request(
      "world_ids must list every world of the universe",
    ));
  }

  let worlds = state
    .store
    .reorder_worlds(user.id, body.universe_id, body.world_ids)
    .await
    .map_err(ApiError::store)?;
  Envelope::ok("worlds", worlds)
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /worlds/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Envelope, ApiError>
where
  S: VisionStore + 'static,
{
  Envelope::ok("world", owned_world(&*state.store, user.id, id).await?)
}

// ─── Update ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
  pub name:         String,
  pub description:  Option<String>,
  pub has_episodes: Option<bool>,
  pub prefix:       Option<String>,
}

/// `PUT /worlds/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
  AppJson(body): AppJson<UpdateBody>,
) -> Result<Envelope, ApiError>
where
  S: VisionStore + 'static,
{
  let name = require_name("name", &body.name)?.to_owned();
  let world = owned_world(&*state.store, user.id, id).await?;

  let prefix = match body.prefix.as_deref() {
    Some(raw) => {
      claim_world_prefix(&*state.store, user.id, raw, Some(&world.prefix)).await?
    }
    None => world.prefix.clone(),
  };

  let updated = state
    .store
    .update_world(user.id, id, WorldUpdate {
      name,
      description: body.description,
      has_episodes: body.has_episodes.unwrap_or(world.has_episodes),
      prefix,
    })
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("world"))?;
  Envelope::ok("world", updated)
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /worlds/{id}`
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Envelope, ApiError>
where
  S: VisionStore + 'static,
{
  let world = owned_world(&*state.store, user.id, id).await?;
  if world.is_root {
    return Err(ApiError::bad_request("the root world cannot be deleted"));
  }
  state
    .store
    .delete_world(user.id, id)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(world = %id, "world deleted");
  Ok(Envelope::deleted())
}
