//! [`SqliteStore`] — the SQLite implementation of [`VisionStore`].

use std::{collections::HashSet, path::Path};

use blake_core::{
  category::{BASE_CATEGORIES, Category, CategoryUpdate, NewCategory, SINOPSE},
  episode::{Episode, EpisodeUpdate, NewEpisode},
  ficha::{Ficha, FichaQuery, FichaUpdate, NewFicha},
  relation::{NewRelation, Relation, RelationType, RelationUpdate},
  session::{Credentials, SessionRecord, User},
  store::VisionStore,
  universe::{NewUniverse, ROOT_WORLD_NAME, Universe, UniverseUpdate},
  world::{NewWorld, World, WorldUpdate},
};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    CATEGORY_COLUMNS, EPISODE_COLUMNS, FICHA_COLUMNS, RELATION_COLUMNS,
    RawCategory, RawEpisode, RawFicha, RawRelation, RawUniverse, RawWorld,
    UNIVERSE_COLUMNS, WORLD_COLUMNS, decode_dt, decode_uuid, encode_dt,
    encode_embedding, encode_list, encode_uuid,
  },
  schema::{SCHEMA, SEED_BASE_CATEGORY},
};

/// Default page size for [`VisionStore::list_fichas`].
const DEFAULT_LIMIT: usize = 100;

type RowMapper<T> = fn(&rusqlite::Row<'_>) -> rusqlite::Result<T>;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Blake Vision store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    let seeded_at = encode_dt(Utc::now());
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(SCHEMA)?;
        for (i, base) in BASE_CATEGORIES.iter().enumerate() {
          conn.execute(
            SEED_BASE_CATEGORY,
            rusqlite::params![
              encode_uuid(Uuid::from_u128(i as u128 + 1)),
              base.slug,
              base.label,
              base.description,
              base.prefix,
              seeded_at,
            ],
          )?;
        }
        Ok(())
      })
      .await?;
    tracing::debug!("schema initialised");
    Ok(())
  }

  /// Run a query with owned parameters and map every row.
  async fn select<T>(
    &self,
    sql: String,
    params: Vec<Value>,
    map: RowMapper<T>,
  ) -> Result<Vec<T>>
  where
    T: Send + 'static,
  {
    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), map)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  async fn select_one<T>(
    &self,
    sql: String,
    params: Vec<Value>,
    map: RowMapper<T>,
  ) -> Result<Option<T>>
  where
    T: Send + 'static,
  {
    Ok(self.select(sql, params, map).await?.into_iter().next())
  }

  /// Run a statement and return the number of affected rows.
  async fn execute(&self, sql: &'static str, params: Vec<Value>) -> Result<usize> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(sql, rusqlite::params_from_iter(params.iter()))?)
      })
      .await?;
    Ok(changed)
  }

  async fn fetch_universe(&self, owner: Uuid, id: Uuid) -> Result<Option<Universe>> {
    self
      .select_one(
        format!(
          "SELECT {UNIVERSE_COLUMNS} FROM universes
           WHERE owner_id = ?1 AND universe_id = ?2"
        ),
        vec![encode_uuid(owner).into(), encode_uuid(id).into()],
        RawUniverse::from_row,
      )
      .await?
      .map(RawUniverse::into_universe)
      .transpose()
  }

  async fn fetch_world(&self, owner: Uuid, id: Uuid) -> Result<Option<World>> {
    self
      .select_one(
        format!(
          "SELECT {WORLD_COLUMNS} FROM worlds
           WHERE owner_id = ?1 AND world_id = ?2"
        ),
        vec![encode_uuid(owner).into(), encode_uuid(id).into()],
        RawWorld::from_row,
      )
      .await?
      .map(RawWorld::into_world)
      .transpose()
  }

  async fn fetch_worlds(&self, owner: Uuid, universe_id: Uuid) -> Result<Vec<World>> {
    self
      .select(
        format!(
          "SELECT {WORLD_COLUMNS} FROM worlds
           WHERE owner_id = ?1 AND universe_id = ?2
           ORDER BY order_index, created_at"
        ),
        vec![encode_uuid(owner).into(), encode_uuid(universe_id).into()],
        RawWorld::from_row,
      )
      .await?
      .into_iter()
      .map(RawWorld::into_world)
      .collect()
  }

  async fn fetch_category(&self, owner: Uuid, id: Uuid) -> Result<Option<Category>> {
    self
      .select_one(
        format!(
          "SELECT {CATEGORY_COLUMNS} FROM categories
           WHERE category_id = ?2 AND (owner_id IS NULL OR owner_id = ?1)"
        ),
        vec![encode_uuid(owner).into(), encode_uuid(id).into()],
        RawCategory::from_row,
      )
      .await?
      .map(RawCategory::into_category)
      .transpose()
  }

  async fn fetch_ficha(&self, owner: Uuid, id: Uuid) -> Result<Option<Ficha>> {
    self
      .select_one(
        format!(
          "SELECT {FICHA_COLUMNS} FROM fichas
           WHERE owner_id = ?1 AND ficha_id = ?2"
        ),
        vec![encode_uuid(owner).into(), encode_uuid(id).into()],
        RawFicha::from_row,
      )
      .await?
      .map(RawFicha::into_ficha)
      .transpose()
  }

  async fn fetch_episode(&self, owner: Uuid, id: Uuid) -> Result<Option<Episode>> {
    self
      .select_one(
        format!(
          "SELECT {EPISODE_COLUMNS} FROM episodes
           WHERE owner_id = ?1 AND episode_id = ?2"
        ),
        vec![encode_uuid(owner).into(), encode_uuid(id).into()],
        RawEpisode::from_row,
      )
      .await?
      .map(RawEpisode::into_episode)
      .transpose()
  }

  async fn fetch_relation(&self, owner: Uuid, id: Uuid) -> Result<Option<Relation>> {
    self
      .select_one(
        format!(
          "SELECT {RELATION_COLUMNS} FROM relations
           WHERE owner_id = ?1 AND relation_id = ?2"
        ),
        vec![encode_uuid(owner).into(), encode_uuid(id).into()],
        RawRelation::from_row,
      )
      .await?
      .map(RawRelation::into_relation)
      .transpose()
  }

  async fn fetch_user(&self, id: Uuid) -> Result<Option<User>> {
    let raw = self
      .select_one(
        "SELECT user_id, email, created_at FROM users WHERE user_id = ?1".into(),
        vec![encode_uuid(id).into()],
        |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?)),
      )
      .await?;
    raw
      .map(|(id, email, created_at)| {
        Ok(User {
          id: decode_uuid(&id)?,
          email,
          created_at: decode_dt(&created_at)?,
        })
      })
      .transpose()
  }

  async fn prefixes(&self, sql: &str, owner: Uuid) -> Result<HashSet<String>> {
    let prefixes: Vec<String> = self
      .select(sql.to_owned(), vec![encode_uuid(owner).into()], |row| row.get(0))
      .await?;
    Ok(prefixes.into_iter().collect())
  }
}

// ─── VisionStore impl ────────────────────────────────────────────────────────

impl VisionStore for SqliteStore {
  type Error = Error;

  // ── Accounts ──────────────────────────────────────────────────────────────

  async fn create_user(&self, email: String, password_hash: String) -> Result<User> {
    let user = User {
      id: Uuid::new_v4(),
      email,
      created_at: Utc::now(),
    };
    self
      .execute(
        "INSERT INTO users (user_id, email, password_hash, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        vec![
          encode_uuid(user.id).into(),
          user.email.clone().into(),
          password_hash.into(),
          encode_dt(user.created_at).into(),
        ],
      )
      .await?;
    Ok(user)
  }

  async fn find_credentials(&self, email: String) -> Result<Option<Credentials>> {
    let raw = self
      .select_one(
        "SELECT user_id, email, password_hash, created_at FROM users WHERE email = ?1"
          .into(),
        vec![email.into()],
        |row| {
          Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
          ))
        },
      )
      .await?;

    raw
      .map(|(id, email, password_hash, created_at)| {
        Ok(Credentials {
          user: User {
            id: decode_uuid(&id)?,
            email,
            created_at: decode_dt(&created_at)?,
          },
          password_hash,
        })
      })
      .transpose()
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> { self.fetch_user(id).await }

  async fn create_session(&self, session: SessionRecord) -> Result<()> {
    self
      .execute(
        "INSERT INTO sessions (token_hash, user_id, created_at, expires_at)
         VALUES (?1, ?2, ?3, ?4)",
        vec![
          session.token_hash.into(),
          encode_uuid(session.user_id).into(),
          encode_dt(session.created_at).into(),
          encode_dt(session.expires_at).into(),
        ],
      )
      .await?;
    Ok(())
  }

  async fn session_user(
    &self,
    token_hash: String,
    now: DateTime<Utc>,
  ) -> Result<Option<Uuid>> {
    let raw = self
      .select_one(
        "SELECT user_id, expires_at FROM sessions WHERE token_hash = ?1".into(),
        vec![token_hash.into()],
        |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
      )
      .await?;

    let Some((user_id, expires_at)) = raw else {
      return Ok(None);
    };
    if decode_dt(&expires_at)? <= now {
      return Ok(None);
    }
    Ok(Some(decode_uuid(&user_id)?))
  }

  async fn delete_session(&self, token_hash: String) -> Result<()> {
    self
      .execute(
        "DELETE FROM sessions WHERE token_hash = ?1",
        vec![token_hash.into()],
      )
      .await?;
    Ok(())
  }

  // ── Universes ─────────────────────────────────────────────────────────────

  async fn list_universes(&self, owner: Uuid) -> Result<Vec<Universe>> {
    self
      .select(
        format!(
          "SELECT {UNIVERSE_COLUMNS} FROM universes
           WHERE owner_id = ?1 ORDER BY created_at, name"
        ),
        vec![encode_uuid(owner).into()],
        RawUniverse::from_row,
      )
      .await?
      .into_iter()
      .map(RawUniverse::into_universe)
      .collect()
  }

  async fn get_universe(&self, owner: Uuid, id: Uuid) -> Result<Option<Universe>> {
    self.fetch_universe(owner, id).await
  }

  async fn create_universe(
    &self,
    owner: Uuid,
    input: NewUniverse,
  ) -> Result<(Universe, World)> {
    let now = Utc::now();
    let universe = Universe {
      id: Uuid::new_v4(),
      owner_id: owner,
      name: input.name,
      description: input.description,
      created_at: now,
      updated_at: now,
    };
    let root = World {
      id:           Uuid::new_v4(),
      universe_id:  universe.id,
      owner_id:     owner,
      name:         ROOT_WORLD_NAME.to_owned(),
      description:  None,
      is_root:      true,
      has_episodes: false,
      prefix:       input.root_world_prefix,
      order_index:  0,
      created_at:   now,
      updated_at:   now,
    };

    let universe_id = encode_uuid(universe.id);
    let world_id    = encode_uuid(root.id);
    let owner_str   = encode_uuid(owner);
    let name        = universe.name.clone();
    let description = universe.description.clone();
    let root_name   = root.name.clone();
    let prefix      = root.prefix.clone();
    let at          = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO universes
             (universe_id, owner_id, name, description, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
          rusqlite::params![universe_id, owner_str, name, description, at],
        )?;
        tx.execute(
          "INSERT INTO worlds
             (world_id, universe_id, owner_id, name, description, is_root,
              has_episodes, prefix, order_index, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, NULL, 1, 0, ?5, 0, ?6, ?6)",
          rusqlite::params![world_id, universe_id, owner_str, root_name, prefix, at],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    tracing::debug!(universe = %universe.id, prefix = %root.prefix, "universe created");
    Ok((universe, root))
  }

  async fn update_universe(
    &self,
    owner: Uuid,
    id: Uuid,
    update: UniverseUpdate,
  ) -> Result<Option<Universe>> {
    let changed = self
      .execute(
        "UPDATE universes SET name = ?3, description = ?4, updated_at = ?5
         WHERE owner_id = ?1 AND universe_id = ?2",
        vec![
          encode_uuid(owner).into(),
          encode_uuid(id).into(),
          update.name.into(),
          update.description.into(),
          encode_dt(Utc::now()).into(),
        ],
      )
      .await?;
    if changed == 0 {
      return Ok(None);
    }
    self.fetch_universe(owner, id).await
  }

  async fn delete_universe(&self, owner: Uuid, id: Uuid) -> Result<bool> {
    let changed = self
      .execute(
        "DELETE FROM universes WHERE owner_id = ?1 AND universe_id = ?2",
        vec![encode_uuid(owner).into(), encode_uuid(id).into()],
      )
      .await?;
    Ok(changed > 0)
  }

  // ── Worlds ────────────────────────────────────────────────────────────────

  async fn list_worlds(&self, owner: Uuid, universe_id: Uuid) -> Result<Vec<World>> {
    self.fetch_worlds(owner, universe_id).await
  }

  async fn get_world(&self, owner: Uuid, id: Uuid) -> Result<Option<World>> {
    self.fetch_world(owner, id).await
  }

  async fn root_world(&self, owner: Uuid, universe_id: Uuid) -> Result<Option<World>> {
    self
      .select_one(
        format!(
          "SELECT {WORLD_COLUMNS} FROM worlds
           WHERE owner_id = ?1 AND universe_id = ?2 AND is_root = 1"
        ),
        vec![encode_uuid(owner).into(), encode_uuid(universe_id).into()],
        RawWorld::from_row,
      )
      .await?
      .map(RawWorld::into_world)
      .transpose()
  }

  async fn world_prefixes(&self, owner: Uuid) -> Result<HashSet<String>> {
    self
      .prefixes("SELECT prefix FROM worlds WHERE owner_id = ?1", owner)
      .await
  }

  async fn create_world(&self, owner: Uuid, input: NewWorld) -> Result<World> {
    let now = Utc::now();
    let id = Uuid::new_v4();

    let world_id     = encode_uuid(id);
    let universe_id  = encode_uuid(input.universe_id);
    let owner_str    = encode_uuid(owner);
    let name         = input.name.clone();
    let description  = input.description.clone();
    let prefix       = input.prefix.clone();
    let has_episodes = input.has_episodes;
    let at           = encode_dt(now);

    let order_index: i64 = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let next: i64 = tx.query_row(
          "SELECT COALESCE(MAX(order_index) + 1, 0) FROM worlds WHERE universe_id = ?1",
          rusqlite::params![universe_id],
          |r| r.get(0),
        )?;
        tx.execute(
          "INSERT INTO worlds
             (world_id, universe_id, owner_id, name, description, is_root,
              has_episodes, prefix, order_index, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7, ?8, ?9, ?9)",
          rusqlite::params![
            world_id,
            universe_id,
            owner_str,
            name,
            description,
            has_episodes,
            prefix,
            next,
            at,
          ],
        )?;
        tx.commit()?;
        Ok(next)
      })
      .await?;

    Ok(World {
      id,
      universe_id: input.universe_id,
      owner_id: owner,
      name: input.name,
      description: input.description,
      is_root: false,
      has_episodes: input.has_episodes,
      prefix: input.prefix,
      order_index,
      created_at: now,
      updated_at: now,
    })
  }

  async fn update_world(
    &self,
    owner: Uuid,
    id: Uuid,
    update: WorldUpdate,
  ) -> Result<Option<World>> {
    let changed = self
      .execute(
        "UPDATE worlds
         SET name = ?3, description = ?4, has_episodes = ?5, prefix = ?6, updated_at = ?7
         WHERE owner_id = ?1 AND world_id = ?2",
        vec![
          encode_uuid(owner).into(),
          encode_uuid(id).into(),
          update.name.into(),
          update.description.into(),
          update.has_episodes.into(),
          update.prefix.into(),
          encode_dt(Utc::now()).into(),
        ],
      )
      .await?;
    if changed == 0 {
      return Ok(None);
    }
    self.fetch_world(owner, id).await
  }

  async fn reorder_worlds(
    &self,
    owner: Uuid,
    universe_id: Uuid,
    world_ids: Vec<Uuid>,
  ) -> Result<Vec<World>> {
    let owner_str    = encode_uuid(owner);
    let universe_str = encode_uuid(universe_id);
    let ids: Vec<String> = world_ids.into_iter().map(encode_uuid).collect();
    let at = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for (position, id) in ids.iter().enumerate() {
          tx.execute(
            "UPDATE worlds SET order_index = ?4, updated_at = ?5
             WHERE owner_id = ?1 AND universe_id = ?2 AND world_id = ?3",
            rusqlite::params![owner_str, universe_str, id, position as i64, at],
          )?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    self.fetch_worlds(owner, universe_id).await
  }

  async fn delete_world(&self, owner: Uuid, id: Uuid) -> Result<bool> {
    let changed = self
      .execute(
        "DELETE FROM worlds WHERE owner_id = ?1 AND world_id = ?2 AND is_root = 0",
        vec![encode_uuid(owner).into(), encode_uuid(id).into()],
      )
      .await?;
    Ok(changed > 0)
  }

  // ── Categories ────────────────────────────────────────────────────────────

  async fn list_categories(&self, owner: Uuid, universe_id: Uuid) -> Result<Vec<Category>> {
    self
      .select(
        format!(
          "SELECT {CATEGORY_COLUMNS} FROM categories
           WHERE owner_id IS NULL OR (owner_id = ?1 AND universe_id = ?2)
           ORDER BY owner_id IS NOT NULL, rowid"
        ),
        vec![encode_uuid(owner).into(), encode_uuid(universe_id).into()],
        RawCategory::from_row,
      )
      .await?
      .into_iter()
      .map(RawCategory::into_category)
      .collect()
  }

  async fn get_category(&self, owner: Uuid, id: Uuid) -> Result<Option<Category>> {
    self.fetch_category(owner, id).await
  }

  async fn find_category(
    &self,
    owner: Uuid,
    universe_id: Uuid,
    slug: String,
  ) -> Result<Option<Category>> {
    self
      .select_one(
        format!(
          "SELECT {CATEGORY_COLUMNS} FROM categories
           WHERE slug = ?3
             AND (owner_id IS NULL OR (owner_id = ?1 AND universe_id = ?2))
           ORDER BY owner_id IS NOT NULL
           LIMIT 1"
        ),
        vec![
          encode_uuid(owner).into(),
          encode_uuid(universe_id).into(),
          slug.into(),
        ],
        RawCategory::from_row,
      )
      .await?
      .map(RawCategory::into_category)
      .transpose()
  }

  async fn category_prefixes(&self, owner: Uuid) -> Result<HashSet<String>> {
    self
      .prefixes(
        "SELECT prefix FROM categories WHERE owner_id IS NULL OR owner_id = ?1",
        owner,
      )
      .await
  }

  async fn create_category(&self, owner: Uuid, input: NewCategory) -> Result<Category> {
    let category = Category {
      id:          Uuid::new_v4(),
      universe_id: Some(input.universe_id),
      owner_id:    Some(owner),
      slug:        input.slug,
      label:       input.label,
      description: input.description,
      prefix:      input.prefix,
      created_at:  Utc::now(),
    };
    self
      .execute(
        "INSERT INTO categories
           (category_id, universe_id, owner_id, slug, label, description, prefix, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        vec![
          encode_uuid(category.id).into(),
          encode_uuid(input.universe_id).into(),
          encode_uuid(owner).into(),
          category.slug.clone().into(),
          category.label.clone().into(),
          category.description.clone().into(),
          category.prefix.clone().into(),
          encode_dt(category.created_at).into(),
        ],
      )
      .await?;
    Ok(category)
  }

  async fn update_category(
    &self,
    owner: Uuid,
    id: Uuid,
    update: CategoryUpdate,
  ) -> Result<Option<Category>> {
    let changed = self
      .execute(
        "UPDATE categories SET label = ?3, description = ?4, prefix = ?5
         WHERE owner_id = ?1 AND category_id = ?2",
        vec![
          encode_uuid(owner).into(),
          encode_uuid(id).into(),
          update.label.into(),
          update.description.into(),
          update.prefix.into(),
        ],
      )
      .await?;
    if changed == 0 {
      return Ok(None);
    }
    self.fetch_category(owner, id).await
  }

  async fn delete_category(&self, owner: Uuid, id: Uuid) -> Result<bool> {
    let changed = self
      .execute(
        "DELETE FROM categories WHERE owner_id = ?1 AND category_id = ?2",
        vec![encode_uuid(owner).into(), encode_uuid(id).into()],
      )
      .await?;
    Ok(changed > 0)
  }

  // ── Fichas ────────────────────────────────────────────────────────────────

  async fn list_fichas(&self, owner: Uuid, query: &FichaQuery) -> Result<Vec<Ficha>> {
    let mut conds: Vec<String> = vec!["owner_id = ?1".into()];
    let mut params: Vec<Value> = vec![encode_uuid(owner).into()];

    let mut push = |cond: &str, value: Value| {
      params.push(value);
      conds.push(cond.replace('?', &format!("?{}", params.len())));
    };

    if let Some(id) = query.universe_id {
      push("universe_id = ?", encode_uuid(id).into());
    }
    if let Some(id) = query.world_id {
      push("world_id = ?", encode_uuid(id).into());
    }
    if let Some(category) = &query.category {
      push("category = ?", category.clone().into());
    }
    if let Some(id) = query.episode_id {
      push("episode_id = ?", encode_uuid(id).into());
    }
    if let Some(tag) = &query.tag {
      push(
        "EXISTS (SELECT 1 FROM json_each(fichas.tags) WHERE json_each.value = ?)",
        tag.clone().into(),
      );
    }
    if let Some(text) = query.text.as_deref().filter(|t| !t.trim().is_empty()) {
      push(
        "(title LIKE ? OR COALESCE(summary, '') LIKE ? OR COALESCE(content, '') LIKE ?)",
        format!("%{}%", text.trim()).into(),
      );
    }

    // SQLite reads a negative LIMIT as "no limit".
    let limit  = i64::try_from(query.limit.unwrap_or(DEFAULT_LIMIT)).unwrap_or(i64::MAX);
    let offset = i64::try_from(query.offset.unwrap_or(0)).unwrap_or(i64::MAX);
    let sql = format!(
      "SELECT {FICHA_COLUMNS} FROM fichas
       WHERE {}
       ORDER BY created_at, rowid
       LIMIT {limit} OFFSET {offset}",
      conds.join(" AND ")
    );

    self
      .select(sql, params, RawFicha::from_row)
      .await?
      .into_iter()
      .map(RawFicha::into_ficha)
      .collect()
  }

  async fn get_ficha(&self, owner: Uuid, id: Uuid) -> Result<Option<Ficha>> {
    self.fetch_ficha(owner, id).await
  }

  async fn codes_with_stem(&self, owner: Uuid, stem: String) -> Result<Vec<String>> {
    self
      .select(
        "SELECT code FROM fichas
         WHERE owner_id = ?1 AND substr(code, 1, length(?2)) = ?2"
          .into(),
        vec![encode_uuid(owner).into(), stem.into()],
        |row| row.get(0),
      )
      .await
  }

  async fn create_ficha(&self, owner: Uuid, input: NewFicha) -> Result<Ficha> {
    let now = Utc::now();
    let ficha = Ficha {
      id:             Uuid::new_v4(),
      owner_id:       owner,
      universe_id:    input.universe_id,
      world_id:       input.world_id,
      category:       input.category,
      title:          input.title,
      code:           input.code,
      summary:        input.summary,
      content:        input.content,
      tags:           input.tags,
      diegetic_year:  input.diegetic_year,
      temporal_layer: input.temporal_layer,
      episode_id:     input.episode_id,
      images:         input.images,
      embedding:      None,
      created_at:     now,
      updated_at:     now,
    };

    self
      .execute(
        "INSERT INTO fichas (
           ficha_id, owner_id, universe_id, world_id, category, title, code,
           summary, content, tags, diegetic_year, temporal_layer, episode_id,
           images, embedding, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, NULL, ?15, ?15)",
        vec![
          encode_uuid(ficha.id).into(),
          encode_uuid(owner).into(),
          encode_uuid(ficha.universe_id).into(),
          ficha.world_id.map(encode_uuid).into(),
          ficha.category.clone().into(),
          ficha.title.clone().into(),
          ficha.code.clone().into(),
          ficha.summary.clone().into(),
          ficha.content.clone().into(),
          encode_list(&ficha.tags)?.into(),
          ficha.diegetic_year.into(),
          ficha.temporal_layer.clone().into(),
          ficha.episode_id.map(encode_uuid).into(),
          encode_list(&ficha.images)?.into(),
          encode_dt(now).into(),
        ],
      )
      .await?;

    Ok(ficha)
  }

  async fn update_ficha(
    &self,
    owner: Uuid,
    id: Uuid,
    update: FichaUpdate,
  ) -> Result<Option<Ficha>> {
    let changed = self
      .execute(
        "UPDATE fichas SET
           title = ?3, summary = ?4, content = ?5, tags = ?6, diegetic_year = ?7,
           temporal_layer = ?8, episode_id = ?9, images = ?10, updated_at = ?11
         WHERE owner_id = ?1 AND ficha_id = ?2",
        vec![
          encode_uuid(owner).into(),
          encode_uuid(id).into(),
          update.title.into(),
          update.summary.into(),
          update.content.into(),
          encode_list(&update.tags)?.into(),
          update.diegetic_year.into(),
          update.temporal_layer.into(),
          update.episode_id.map(encode_uuid).into(),
          encode_list(&update.images)?.into(),
          encode_dt(Utc::now()).into(),
        ],
      )
      .await?;
    if changed == 0 {
      return Ok(None);
    }
    self.fetch_ficha(owner, id).await
  }

  async fn set_embedding(&self, owner: Uuid, id: Uuid, embedding: Vec<f32>) -> Result<bool> {
    let changed = self
      .execute(
        "UPDATE fichas SET embedding = ?3 WHERE owner_id = ?1 AND ficha_id = ?2",
        vec![
          encode_uuid(owner).into(),
          encode_uuid(id).into(),
          encode_embedding(&embedding)?.into(),
        ],
      )
      .await?;
    Ok(changed > 0)
  }

  async fn embedded_fichas(&self, owner: Uuid, universe_id: Uuid) -> Result<Vec<Ficha>> {
    self
      .select(
        format!(
          "SELECT {FICHA_COLUMNS} FROM fichas
           WHERE owner_id = ?1 AND universe_id = ?2 AND embedding IS NOT NULL"
        ),
        vec![encode_uuid(owner).into(), encode_uuid(universe_id).into()],
        RawFicha::from_row,
      )
      .await?
      .into_iter()
      .map(RawFicha::into_ficha)
      .collect()
  }

  async fn find_sinopse(
    &self,
    owner: Uuid,
    world_id: Uuid,
    episode_id: Uuid,
  ) -> Result<Option<Ficha>> {
    self
      .select_one(
        format!(
          "SELECT {FICHA_COLUMNS} FROM fichas
           WHERE owner_id = ?1 AND world_id = ?2 AND episode_id = ?3 AND category = ?4"
        ),
        vec![
          encode_uuid(owner).into(),
          encode_uuid(world_id).into(),
          encode_uuid(episode_id).into(),
          SINOPSE.to_owned().into(),
        ],
        RawFicha::from_row,
      )
      .await?
      .map(RawFicha::into_ficha)
      .transpose()
  }

  async fn delete_ficha(&self, owner: Uuid, id: Uuid) -> Result<bool> {
    let changed = self
      .execute(
        "DELETE FROM fichas WHERE owner_id = ?1 AND ficha_id = ?2",
        vec![encode_uuid(owner).into(), encode_uuid(id).into()],
      )
      .await?;
    Ok(changed > 0)
  }

  // ── Episodes ──────────────────────────────────────────────────────────────

  async fn list_episodes(&self, owner: Uuid, world_id: Uuid) -> Result<Vec<Episode>> {
    self
      .select(
        format!(
          "SELECT {EPISODE_COLUMNS} FROM episodes
           WHERE owner_id = ?1 AND world_id = ?2 ORDER BY number"
        ),
        vec![encode_uuid(owner).into(), encode_uuid(world_id).into()],
        RawEpisode::from_row,
      )
      .await?
      .into_iter()
      .map(RawEpisode::into_episode)
      .collect()
  }

  async fn get_episode(&self, owner: Uuid, id: Uuid) -> Result<Option<Episode>> {
    self.fetch_episode(owner, id).await
  }

  async fn create_episode(&self, owner: Uuid, input: NewEpisode) -> Result<Episode> {
    let episode = Episode {
      id:         Uuid::new_v4(),
      owner_id:   owner,
      world_id:   input.world_id,
      number:     input.number,
      title:      input.title,
      created_at: Utc::now(),
    };
    self
      .execute(
        "INSERT INTO episodes (episode_id, owner_id, world_id, number, title, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        vec![
          encode_uuid(episode.id).into(),
          encode_uuid(owner).into(),
          encode_uuid(episode.world_id).into(),
          episode.number.into(),
          episode.title.clone().into(),
          encode_dt(episode.created_at).into(),
        ],
      )
      .await?;
    Ok(episode)
  }

  async fn update_episode(
    &self,
    owner: Uuid,
    id: Uuid,
    update: EpisodeUpdate,
  ) -> Result<Option<Episode>> {
    let changed = self
      .execute(
        "UPDATE episodes SET number = ?3, title = ?4
         WHERE owner_id = ?1 AND episode_id = ?2",
        vec![
          encode_uuid(owner).into(),
          encode_uuid(id).into(),
          update.number.into(),
          update.title.into(),
        ],
      )
      .await?;
    if changed == 0 {
      return Ok(None);
    }
    self.fetch_episode(owner, id).await
  }

  async fn delete_episode(&self, owner: Uuid, id: Uuid) -> Result<bool> {
    let changed = self
      .execute(
        "DELETE FROM episodes WHERE owner_id = ?1 AND episode_id = ?2",
        vec![encode_uuid(owner).into(), encode_uuid(id).into()],
      )
      .await?;
    Ok(changed > 0)
  }

  // ── Relations ─────────────────────────────────────────────────────────────

  async fn list_relations(&self, owner: Uuid, ficha_id: Uuid) -> Result<Vec<Relation>> {
    self
      .select(
        format!(
          "SELECT {RELATION_COLUMNS} FROM relations
           WHERE owner_id = ?1 AND (source_id = ?2 OR target_id = ?2)
           ORDER BY created_at, rowid"
        ),
        vec![encode_uuid(owner).into(), encode_uuid(ficha_id).into()],
        RawRelation::from_row,
      )
      .await?
      .into_iter()
      .map(RawRelation::into_relation)
      .collect()
  }

  async fn get_relation(&self, owner: Uuid, id: Uuid) -> Result<Option<Relation>> {
    self.fetch_relation(owner, id).await
  }

  async fn find_relation(
    &self,
    owner: Uuid,
    source_id: Uuid,
    target_id: Uuid,
    relation_type: RelationType,
  ) -> Result<Option<Relation>> {
    self
      .select_one(
        format!(
          "SELECT {RELATION_COLUMNS} FROM relations
           WHERE owner_id = ?1 AND source_id = ?2 AND target_id = ?3
             AND relation_type = ?4"
        ),
        vec![
          encode_uuid(owner).into(),
          encode_uuid(source_id).into(),
          encode_uuid(target_id).into(),
          relation_type.as_str().to_owned().into(),
        ],
        RawRelation::from_row,
      )
      .await?
      .map(RawRelation::into_relation)
      .transpose()
  }

  async fn create_relation(&self, owner: Uuid, input: NewRelation) -> Result<Relation> {
    input.validate()?;
    let relation = Relation {
      id:            Uuid::new_v4(),
      owner_id:      owner,
      source_id:     input.source_id,
      target_id:     input.target_id,
      relation_type: input.relation_type,
      description:   input.description,
      created_at:    Utc::now(),
    };
    self
      .execute(
        "INSERT INTO relations
           (relation_id, owner_id, source_id, target_id, relation_type, description, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        vec![
          encode_uuid(relation.id).into(),
          encode_uuid(owner).into(),
          encode_uuid(relation.source_id).into(),
          encode_uuid(relation.target_id).into(),
          relation.relation_type.as_str().to_owned().into(),
          relation.description.clone().into(),
          encode_dt(relation.created_at).into(),
        ],
      )
      .await?;
    Ok(relation)
  }

  async fn update_relation(
    &self,
    owner: Uuid,
    id: Uuid,
    update: RelationUpdate,
  ) -> Result<Option<Relation>> {
    let changed = self
      .execute(
        "UPDATE relations SET relation_type = ?3, description = ?4
         WHERE owner_id = ?1 AND relation_id = ?2",
        vec![
          encode_uuid(owner).into(),
          encode_uuid(id).into(),
          update.relation_type.as_str().to_owned().into(),
          update.description.into(),
        ],
      )
      .await?;
    if changed == 0 {
      return Ok(None);
    }
    self.fetch_relation(owner, id).await
  }

  async fn delete_relation(&self, owner: Uuid, id: Uuid) -> Result<bool> {
    let changed = self
      .execute(
        "DELETE FROM relations WHERE owner_id = ?1 AND relation_id = ?2",
        vec![encode_uuid(owner).into(), encode_uuid(id).into()],
      )
      .await?;
    Ok(changed > 0)
  }
}
