//! Handlers for `/universes` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/universes` | The caller's universes |
//! | `POST`   | `/universes` | Body: `{"name","description"?,"prefix"?}`; also creates the root world |
//! | `GET`    | `/universes/{id}` | 404 if missing |
//! | `PUT`    | `/universes/{id}` | Body: `{"name","description"?}` |
//! | `DELETE` | `/universes/{id}` | Cascades to everything inside |

use axum::extract::{Path, State};
use blake_core::{
  prefix::{require_name, resolve_prefix},
  store::VisionStore,
  universe::{NewUniverse, Universe, UniverseUpdate},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState,
  auth::CurrentUser,
  envelope::Envelope,
  error::ApiError,
  extract::AppJson,
  worlds::claim_world_prefix,
};

/// Fetch a universe of `owner` or fail with 404.
pub(crate) async fn owned_universe<S>(
  store: &S,
  owner: Uuid,
  id: Uuid,
) -> Result<Universe, ApiError>
where
  S: VisionStore,
{
  store
    .get_universe(owner, id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("universe"))
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /universes`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
) -> Result<Envelope, ApiError>
where
  S: VisionStore + 'static,
{
  let universes = state
    .store
    .list_universes(user.id)
    .await
    .map_err(ApiError::store)?;
  Envelope::ok("universes", universes)
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub name:        String,
  pub description: Option<String>,
  /// Prefix for the root world; generated from `name` when absent.
  pub prefix:      Option<String>,
}

/// `POST /universes`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  AppJson(body): AppJson<CreateBody>,
) -> Result<Envelope, ApiError>
where
  S: VisionStore + 'static,
{
  let name = require_name("name", &body.name)?.to_owned();

  let root_world_prefix = match body.prefix.as_deref() {
    Some(raw) => claim_world_prefix(&*state.store, user.id, raw, None).await?,
    None => {
      resolve_prefix(&name, || state.store.world_prefixes(user.id))
        .await
        .map_err(ApiError::store)?
    }
  };

  let (universe, root) = state
    .store
    .create_universe(user.id, NewUniverse {
      name,
      description: body.description,
      root_world_prefix,
    })
    .await
    .map_err(ApiError::store)?;
  tracing::info!(universe = %universe.id, root_prefix = %root.prefix, "universe created");

  Envelope::created("universe", universe)
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /universes/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Envelope, ApiError>
where
  S: VisionStore + 'static,
{
  Envelope::ok("universe", owned_universe(&*state.store, user.id, id).await?)
}

// ─── Update ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
  pub name:        String,
  pub description: Option<String>,
}

/// `PUT /universes/{id}`
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
  let universe = state
    .store
    .update_universe(user.id, id, UniverseUpdate { name, description: body.description })
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("universe"))?;
  Envelope::ok("universe", universe)
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /universes/{id}`
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
    .delete_universe(user.id, id)
    .await
    .map_err(ApiError::store)?;
  if !deleted {
    return Err(ApiError::not_found("universe"));
  }
  tracing::info!(universe = %id, "universe deleted");
  Ok(Envelope::deleted())
}
