//! Handlers for `/categories` endpoints.
//!
//! Base categories are visible to everyone and belong to nobody; editing or
//! deleting one is answered with 403.

use axum::extract::{Path, State};
use blake_core::{
  category::{Category, CategoryUpdate, NewCategory, slugify},
  ficha::FichaQuery,
  prefix::{PrefixScope, normalize_prefix, require_name, resolve_prefix},
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
  universes::owned_universe,
};

/// Fetch a user-defined category of `owner`; base categories yield 403.
async fn editable_category<S>(store: &S, owner: Uuid, id: Uuid) -> Result<Category, ApiError>
where
  S: VisionStore,
{
  let category = store
    .get_category(owner, id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("category"))?;
  if category.is_base() {
    return Err(ApiError::Forbidden("base categories cannot be modified".into()));
  }
  Ok(category)
}

async fn claim_category_prefix<S>(
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
  let prefix = normalize_prefix(PrefixScope::Category, raw)?;
  let taken = store.category_prefixes(owner).await.map_err(ApiError::store)?;
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

/// `GET /categories?universe_id=<id>` — base categories first.
pub async fn list<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  AppQuery(params): AppQuery<ListParams>,
) -> Result<Envelope, ApiError>
where
  S: VisionStore + 'static,
{
  owned_universe(&*state.store, user.id, params.universe_id).await?;
  let categories = state
    .store
    .list_categories(user.id, params.universe_id)
    .await
    .map_err(ApiError::store)?;
  Envelope::ok("categories", categories)
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub universe_id: Uuid,
  pub label:       String,
  /// Derived from `label` when absent.
  pub slug:        Option<String>,
  pub description: Option<String>,
  pub prefix:      Option<String>,
}

/// `POST /categories`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  AppJson(body): AppJson<CreateBody>,
) -> Result<Envelope, ApiError>
where
  S: VisionStore + 'static,
{
  let label = require_name("label", &body.label)?.to_owned();
  owned_universe(&*state.store, user.id, body.universe_id).await?;

  let slug = slugify(body.slug.as_deref().unwrap_or(&label))?;
  let clash = state
    .store
    .find_category(user.id, body.universe_id, slug.clone())
    .await
    .map_err(ApiError::store)?;
  if clash.is_some() {
    return Err(ApiError::bad_request(format!("category {slug:?} already exists")));
  }

  let prefix = match body.prefix.as_deref() {
    Some(raw) => claim_category_prefix(&*state.store, user.id, raw, None).await?,
    None => {
      resolve_prefix(&label, || state.store.category_prefixes(user.id))
        .await
        .map_err(ApiError::store)?
    }
  };

  let category = state
    .store
    .create_category(user.id, NewCategory {
      universe_id: body.universe_id,
      slug,
      label,
      description: body.description,
      prefix,
    })
    .await
    .map_err(ApiError::store)?;
  tracing::info!(category = %category.slug, prefix = %category.prefix, "category created");

  Envelope::created("category", category)
}

// ─── Update ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
  pub label:       String,
  pub description: Option<String>,
  pub prefix:      Option<String>,
}

/// `PUT /categories/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
  AppJson(body): AppJson<UpdateBody>,
) -> Result<Envelope, ApiError>
where
  S: VisionStore + 'static,
{
  let category = editable_category(&*state.store, user.id, id).await?;
  let label = require_name("label", &body.label)?.to_owned();

  let prefix = match body.prefix.as_deref() {
    Some(raw) => {
      claim_category_prefix(&*state.store, user.id, raw, Some(&category.prefix)).await?
    }
    None => category.prefix.clone(),
  };

  let updated = state
    .store
    .update_category(user.id, id, CategoryUpdate {
      label,
      description: body.description,
      prefix,
    })
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("category"))?;
  Envelope::ok("category", updated)
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /categories/{id}` — refused while fichas still use the category.
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Envelope, ApiError>
where
  S: VisionStore + 'static,
{
  let category = editable_category(&*state.store, user.id, id).await?;

  let query = FichaQuery {
    universe_id: category.universe_id,
    category: Some(category.slug.clone()),
    limit: Some(1),
    ..Default::default()
  };
  let in_use = state
    .store
    .list_fichas(user.id, &query)
    .await
    .map_err(ApiError::store)?;
  if !in_use.is_empty() {
    return Err(ApiError::bad_request("category is still used by fichas"));
  }

  state
    .store
    .delete_category(user.id, id)
    .await
    .map_err(ApiError::store)?;
  Ok(Envelope::deleted())
}
