//! The `VisionStore` trait.
//!
//! Implemented by storage backends (e.g. `blake-store-sqlite`). The API
//! depends on this abstraction, not on any concrete backend.
//!
//! Every entity method takes the caller's `owner` id and only ever sees rows
//! belonging to that owner (plus base categories, which belong to nobody).
//! A row owned by someone else behaves exactly like a missing row.

use std::{collections::HashSet, future::Future};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  category::{Category, CategoryUpdate, NewCategory},
  episode::{Episode, EpisodeUpdate, NewEpisode},
  ficha::{Ficha, FichaQuery, FichaUpdate, NewFicha},
  relation::{NewRelation, Relation, RelationType, RelationUpdate},
  session::{Credentials, SessionRecord, User},
  universe::{NewUniverse, Universe, UniverseUpdate},
  world::{NewWorld, World, WorldUpdate},
};

/// Abstraction over a Blake Vision store backend.
///
/// Uniqueness and referential integrity are the backend's job; callers check
/// the invariants they can report nicely and rely on the backend for the
/// rest. All methods return `Send` futures so the trait can be used from
/// axum handlers.
pub trait VisionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Accounts ──────────────────────────────────────────────────────────

  fn create_user(
    &self,
    email: String,
    password_hash: String,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn find_credentials(
    &self,
    email: String,
  ) -> impl Future<Output = Result<Option<Credentials>, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn create_session(
    &self,
    session: SessionRecord,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// The user behind an unexpired session, if any.
  fn session_user(
    &self,
    token_hash: String,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Uuid>, Self::Error>> + Send + '_;

  fn delete_session(
    &self,
    token_hash: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Universes ─────────────────────────────────────────────────────────

  fn list_universes(
    &self,
    owner: Uuid,
  ) -> impl Future<Output = Result<Vec<Universe>, Self::Error>> + Send + '_;

  fn get_universe(
    &self,
    owner: Uuid,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Universe>, Self::Error>> + Send + '_;

  /// Create a universe together with its root world, atomically.
  fn create_universe(
    &self,
    owner: Uuid,
    input: NewUniverse,
  ) -> impl Future<Output = Result<(Universe, World), Self::Error>> + Send + '_;

  fn update_universe(
    &self,
    owner: Uuid,
    id: Uuid,
    update: UniverseUpdate,
  ) -> impl Future<Output = Result<Option<Universe>, Self::Error>> + Send + '_;

  /// Delete a universe and everything inside it. Returns `false` if nothing
  /// was deleted.
  fn delete_universe(
    &self,
    owner: Uuid,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Worlds ────────────────────────────────────────────────────────────

  /// Worlds of a universe, by `order_index`.
  fn list_worlds(
    &self,
    owner: Uuid,
    universe_id: Uuid,
  ) -> impl Future<Output = Result<Vec<World>, Self::Error>> + Send + '_;

  fn get_world(
    &self,
    owner: Uuid,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<World>, Self::Error>> + Send + '_;

  fn root_world(
    &self,
    owner: Uuid,
    universe_id: Uuid,
  ) -> impl Future<Output = Result<Option<World>, Self::Error>> + Send + '_;

  /// Every world prefix in use by `owner`, across all universes.
  fn world_prefixes(
    &self,
    owner: Uuid,
  ) -> impl Future<Output = Result<HashSet<String>, Self::Error>> + Send + '_;

  fn create_world(
    &self,
    owner: Uuid,
    input: NewWorld,
  ) -> impl Future<Output = Result<World, Self::Error>> + Send + '_;

  fn update_world(
    &self,
    owner: Uuid,
    id: Uuid,
    update: WorldUpdate,
  ) -> impl Future<Output = Result<Option<World>, Self::Error>> + Send + '_;

  /// Assign `order_index` by position in `world_ids`. Every id must be a
  /// world of the universe; the caller checks this.
  fn reorder_worlds(
    &self,
    owner: Uuid,
    universe_id: Uuid,
    world_ids: Vec<Uuid>,
  ) -> impl Future<Output = Result<Vec<World>, Self::Error>> + Send + '_;

  fn delete_world(
    &self,
    owner: Uuid,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Categories ────────────────────────────────────────────────────────

  /// Base categories followed by the universe's own.
  fn list_categories(
    &self,
    owner: Uuid,
    universe_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Category>, Self::Error>> + Send + '_;

  /// A base category or one of the owner's.
  fn get_category(
    &self,
    owner: Uuid,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Category>, Self::Error>> + Send + '_;

  /// Resolve a slug inside a universe, base categories included.
  fn find_category(
    &self,
    owner: Uuid,
    universe_id: Uuid,
    slug: String,
  ) -> impl Future<Output = Result<Option<Category>, Self::Error>> + Send + '_;

  /// Prefixes of base categories plus every category of `owner`.
  fn category_prefixes(
    &self,
    owner: Uuid,
  ) -> impl Future<Output = Result<HashSet<String>, Self::Error>> + Send + '_;

  fn create_category(
    &self,
    owner: Uuid,
    input: NewCategory,
  ) -> impl Future<Output = Result<Category, Self::Error>> + Send + '_;

  /// Only categories owned by `owner` are updated; base categories are left
  /// untouched and yield `None`.
  fn update_category(
    &self,
    owner: Uuid,
    id: Uuid,
    update: CategoryUpdate,
  ) -> impl Future<Output = Result<Option<Category>, Self::Error>> + Send + '_;

  fn delete_category(
    &self,
    owner: Uuid,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Fichas ────────────────────────────────────────────────────────────

  fn list_fichas<'a>(
    &'a self,
    owner: Uuid,
    query: &'a FichaQuery,
  ) -> impl Future<Output = Result<Vec<Ficha>, Self::Error>> + Send + 'a;

  fn get_ficha(
    &self,
    owner: Uuid,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Ficha>, Self::Error>> + Send + '_;

  /// Codes of the owner's fichas starting with `stem`.
  fn codes_with_stem(
    &self,
    owner: Uuid,
    stem: String,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  fn create_ficha(
    &self,
    owner: Uuid,
    input: NewFicha,
  ) -> impl Future<Output = Result<Ficha, Self::Error>> + Send + '_;

  fn update_ficha(
    &self,
    owner: Uuid,
    id: Uuid,
    update: FichaUpdate,
  ) -> impl Future<Output = Result<Option<Ficha>, Self::Error>> + Send + '_;

  fn set_embedding(
    &self,
    owner: Uuid,
    id: Uuid,
    embedding: Vec<f32>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Fichas of a universe that carry an embedding.
  fn embedded_fichas(
    &self,
    owner: Uuid,
    universe_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Ficha>, Self::Error>> + Send + '_;

  /// The sinopse ficha of an episode, if one exists.
  fn find_sinopse(
    &self,
    owner: Uuid,
    world_id: Uuid,
    episode_id: Uuid,
  ) -> impl Future<Output = Result<Option<Ficha>, Self::Error>> + Send + '_;

  fn delete_ficha(
    &self,
    owner: Uuid,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Episodes ──────────────────────────────────────────────────────────

  /// Episodes of a world, by number.
  fn list_episodes(
    &self,
    owner: Uuid,
    world_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Episode>, Self::Error>> + Send + '_;

  fn get_episode(
    &self,
    owner: Uuid,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Episode>, Self::Error>> + Send + '_;

  fn create_episode(
    &self,
    owner: Uuid,
    input: NewEpisode,
  ) -> impl Future<Output = Result<Episode, Self::Error>> + Send + '_;

  fn update_episode(
    &self,
    owner: Uuid,
    id: Uuid,
    update: EpisodeUpdate,
  ) -> impl Future<Output = Result<Option<Episode>, Self::Error>> + Send + '_;

  /// Delete an episode; fichas pointing at it lose the link.
  fn delete_episode(
    &self,
    owner: Uuid,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Relations ─────────────────────────────────────────────────────────

  /// Relations where the ficha is either the source or the target.
  fn list_relations(
    &self,
    owner: Uuid,
    ficha_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Relation>, Self::Error>> + Send + '_;

  fn get_relation(
    &self,
    owner: Uuid,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Relation>, Self::Error>> + Send + '_;

  fn find_relation(
    &self,
    owner: Uuid,
    source_id: Uuid,
    target_id: Uuid,
    relation_type: RelationType,
  ) -> impl Future<Output = Result<Option<Relation>, Self::Error>> + Send + '_;

  fn create_relation(
    &self,
    owner: Uuid,
    input: NewRelation,
  ) -> impl Future<Output = Result<Relation, Self::Error>> + Send + '_;

  fn update_relation(
    &self,
    owner: Uuid,
    id: Uuid,
    update: RelationUpdate,
  ) -> impl Future<Output = Result<Option<Relation>, Self::Error>> + Send + '_;

  fn delete_relation(
    &self,
    owner: Uuid,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
