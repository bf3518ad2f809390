//! Handlers for `/episodes` endpoints.
//!
//! Episodes only exist in worlds with `has_episodes`; numbers start at 1 and
//! are unique per world.

use axum::extract::{Path, State};
use blake_core::{
  episode::{Episode, EpisodeUpdate, NewEpisode},
  store::VisionStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState,
  auth::CurrentUser,
  envelope::Envelope,
  error::ApiError,
  extract::{AppJson, AppQuery},
  worlds::owned_world,
};

async fn owned_episode<S>(store: &S, owner: Uuid, id: Uuid) -> Result<Episode, ApiError>
where
  S: VisionStore,
{
  store
    .get_episode(owner, id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("episode"))
}

/// Reject numbers below 1 and numbers another episode of the world holds.
async fn check_number<S>(
  store: &S,
  owner: Uuid,
  world_id: Uuid,
  number: i32,
  episode_id: Option<Uuid>,
) -> Result<(), ApiError>
where
  S: VisionStore,
{
  if number < 1 {
    return Err(ApiError::bad_request("episode number must be at least 1"));
  }
  let episodes = store
    .list_episodes(owner, world_id)
    .await
    .map_err(ApiError::store)?;
  if episodes
    .iter()
    .any(|e| e.number == number && Some(e.id) != episode_id)
  {
    return Err(ApiError::bad_request(format!("episode {number} already exists")));
  }
  Ok(())
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub world_id: Uuid,
}

/// `GET /episodes?world_id=<id>`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  AppQuery(params): AppQuery<ListParams>,
) -> Result<Envelope, ApiError>
where
  S: VisionStore + 'static,
{
  owned_world(&*state.store, user.id, params.world_id).await?;
  let episodes = state
    .store
    .list_episodes(user.id, params.world_id)
    .await
    .map_err(ApiError::store)?;
  Envelope::ok("episodes", episodes)
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub world_id: Uuid,
  pub number:   i32,
  pub title:    Option<String>,
}

/// `POST /episodes`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  AppJson(body): AppJson<CreateBody>,
) -> Result<Envelope, ApiError>
where
  S: VisionStore + 'static,
{
  let world = owned_world(&*state.store, user.id, body.world_id).await?;
  if !world.has_episodes {
    return Err(ApiError::bad_request("this world does not have episodes"));
  }
  check_number(&*state.store, user.id, world.id, body.number, None).await?;

  let episode = state
    .store
    .create_episode(user.id, NewEpisode {
      world_id: world.id,
      number:   body.number,
      title:    body.title,
    })
    .await
    .map_err(ApiError::store)?;
  Envelope::created("episode", episode)
}

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
  pub number: i32,
  pub title:  Option<String>,
}

/// `PUT /episodes/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
  AppJson(body): AppJson<UpdateBody>,
) -> Result<Envelope, ApiError>
where
  S: VisionStore + 'static,
{
  let episode = owned_episode(&*state.store, user.id, id).await?;
  check_number(&*state.store, user.id, episode.world_id, body.number, Some(id)).await?;

  let updated = state
    .store
    .update_episode(user.id, id, EpisodeUpdate { number: body.number, title: body.title })
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("episode"))?;
  Envelope::ok("episode", updated)
}

/// `DELETE /episodes/{id}` — fichas of the episode stay, unlinked. Refused
/// while the episode has a sinopse, which cannot exist without one.
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Envelope, ApiError>
where
  S: VisionStore + 'static,
{
  let episode = owned_episode(&*state.store, user.id, id).await?;
  let sinopse = state
    .store
    .find_sinopse(user.id, episode.world_id, episode.id)
    .await
    .map_err(ApiError::store)?;
  if let Some(sinopse) = sinopse {
    return Err(ApiError::bad_request(format!(
      "episode {} still has a sinopse ({}); delete it first",
      episode.number, sinopse.code
    )));
  }

  let deleted = state
    .store
    .delete_episode(user.id, id)
    .await
    .map_err(ApiError::store)?;
  if !deleted {
    return Err(ApiError::not_found("episode"));
  }
  Ok(Envelope::deleted())
}
