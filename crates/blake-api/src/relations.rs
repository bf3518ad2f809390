//! Handlers for `/relations` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/relations?ficha_id=<id>` | Both directions |
//! | `GET`    | `/relations/types` | The relation vocabulary |
//! | `POST`   | `/relations` | No self-relations, no duplicate triples |
//! | `PATCH`  | `/relations/{id}` | Body: `{"relation_type"?,"description"?}` |
//! | `DELETE` | `/relations/{id}` | |

use axum::extract::{Path, State};
use blake_core::{
  relation::{NewRelation, Relation, RelationType, RelationUpdate},
  store::VisionStore,
};
use serde::{Deserialize, Deserializer};
use uuid::Uuid;

use crate::{
  AppState,
  auth::CurrentUser,
  envelope::Envelope,
  error::ApiError,
  extract::{AppJson, AppQuery},
  fichas::owned_ficha,
};

async fn owned_relation<S>(store: &S, owner: Uuid, id: Uuid) -> Result<Relation, ApiError>
where
  S: VisionStore,
{
  store
    .get_relation(owner, id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("relation"))
}

async fn ensure_unique<S>(
  store: &S,
  owner: Uuid,
  source_id: Uuid,
  target_id: Uuid,
  relation_type: RelationType,
) -> Result<(), ApiError>
where
  S: VisionStore,
{
  let existing = store
    .find_relation(owner, source_id, target_id, relation_type)
    .await
    .map_err(ApiError::store)?;
  if existing.is_some() {
    return Err(ApiError::bad_request("relation already exists"));
  }
  Ok(())
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub ficha_id: Uuid,
}

/// `GET /relations?ficha_id=<id>`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  AppQuery(params): AppQuery<ListParams>,
) -> Result<Envelope, ApiError>
where
  S: VisionStore + 'static,
{
  owned_ficha(&*state.store, user.id, params.ficha_id).await?;
  let relations = state
    .store
    .list_relations(user.id, params.ficha_id)
    .await
    .map_err(ApiError::store)?;
  Envelope::ok("relations", relations)
}

/// `GET /relations/types`
pub async fn types<S>(_user: CurrentUser) -> Result<Envelope, ApiError>
where
  S: VisionStore + 'static,
{
  Envelope::ok("relation_types", RelationType::all())
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub source_id:     Uuid,
  pub target_id:     Uuid,
  pub relation_type: RelationType,
  pub description:   Option<String>,
}

/// `POST /relations`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  AppJson(body): AppJson<CreateBody>,
) -> Result<Envelope, ApiError>
where
  S: VisionStore + 'static,
{
  let input = NewRelation {
    source_id:     body.source_id,
    target_id:     body.target_id,
    relation_type: body.relation_type,
    description:   body.description,
  };
  input.validate()?;

  let store = &*state.store;
  owned_ficha(store, user.id, input.source_id).await?;
  owned_ficha(store, user.id, input.target_id).await?;
  ensure_unique(store, user.id, input.source_id, input.target_id, input.relation_type).await?;

  let relation = store
    .create_relation(user.id, input)
    .await
    .map_err(ApiError::store)?;
  Envelope::created("relation", relation)
}

/// Absent stays `None`; an explicit `null` becomes `Some(None)`.
fn nullable<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de>,
{
  Option::<T>::deserialize(de).map(Some)
}

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
  pub relation_type: Option<RelationType>,
  /// `null` clears the description; absent keeps it.
  #[serde(default, deserialize_with = "nullable")]
  pub description:   Option<Option<String>>,
}

/// `PATCH /relations/{id}`
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
  let relation = owned_relation(store, user.id, id).await?;

  let relation_type = body.relation_type.unwrap_or(relation.relation_type);
  if relation_type != relation.relation_type {
    ensure_unique(store, user.id, relation.source_id, relation.target_id, relation_type).await?;
  }

  let updated = store
    .update_relation(user.id, id, RelationUpdate {
      relation_type,
      description: body.description.unwrap_or(relation.description),
    })
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("relation"))?;
  Envelope::ok("relation", updated)
}

/// `DELETE /relations/{id}`
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
    .delete_relation(user.id, id)
    .await
    .map_err(ApiError::store)?;
  if !deleted {
    return Err(ApiError::not_found("relation"));
  }
  Ok(Envelope::deleted())
}
