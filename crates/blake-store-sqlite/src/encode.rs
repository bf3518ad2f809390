//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs hyphenated lowercase strings, and
//! list-valued fields (tags, images, embeddings) compact JSON.

use blake_core::{
  category::Category,
  episode::Episode,
  ficha::Ficha,
  relation::{Relation, RelationType},
  universe::Universe,
  world::World,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Timestamp(e.to_string()))
}

pub fn encode_list(items: &[String]) -> Result<String> {
  Ok(serde_json::to_string(items)?)
}

fn decode_list(s: &str) -> Result<Vec<String>> { Ok(serde_json::from_str(s)?) }

pub fn encode_embedding(v: &[f32]) -> Result<String> {
  Ok(serde_json::to_string(v)?)
}

fn decode_embedding(s: Option<String>) -> Result<Option<Vec<f32>>> {
  s.as_deref()
    .map(serde_json::from_str::<Vec<f32>>)
    .transpose()
    .map_err(Error::Json)
}

// ─── Column lists ────────────────────────────────────────────────────────────

pub const UNIVERSE_COLUMNS: &str =
  "universe_id, owner_id, name, description, created_at, updated_at";

pub const WORLD_COLUMNS: &str = "world_id, universe_id, owner_id, name, \
  description, is_root, has_episodes, prefix, order_index, created_at, \
  updated_at";

pub const CATEGORY_COLUMNS: &str = "category_id, universe_id, owner_id, slug, \
  label, description, prefix, created_at";

pub const FICHA_COLUMNS: &str = "ficha_id, owner_id, universe_id, world_id, \
  category, title, code, summary, content, tags, diegetic_year, \
  temporal_layer, episode_id, images, embedding, created_at, updated_at";

pub const EPISODE_COLUMNS: &str =
  "episode_id, owner_id, world_id, number, title, created_at";

pub const RELATION_COLUMNS: &str = "relation_id, owner_id, source_id, \
  target_id, relation_type, description, created_at";

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `universes` row.
pub struct RawUniverse {
  pub universe_id: String,
  pub owner_id:    String,
  pub name:        String,
  pub description: Option<String>,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawUniverse {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      universe_id: row.get(0)?,
      owner_id:    row.get(1)?,
      name:        row.get(2)?,
      description: row.get(3)?,
      created_at:  row.get(4)?,
      updated_at:  row.get(5)?,
    })
  }

  pub fn into_universe(self) -> Result<Universe> {
    Ok(Universe {
      id:          decode_uuid(&self.universe_id)?,
      owner_id:    decode_uuid(&self.owner_id)?,
      name:        self.name,
      description: self.description,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

pub struct RawWorld {
  pub world_id:     String,
  pub universe_id:  String,
  pub owner_id:     String,
  pub name:         String,
  pub description:  Option<String>,
  pub is_root:      bool,
  pub has_episodes: bool,
  pub prefix:       String,
  pub order_index:  i64,
  pub created_at:   String,
  pub updated_at:   String,
}

impl RawWorld {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      world_id:     row.get(0)?,
      universe_id:  row.get(1)?,
      owner_id:     row.get(2)?,
      name:         row.get(3)?,
      description:  row.get(4)?,
      is_root:      row.get(5)?,
      has_episodes: row.get(6)?,
      prefix:       row.get(7)?,
      order_index:  row.get(8)?,
      created_at:   row.get(9)?,
      updated_at:   row.get(10)?,
    })
  }

  pub fn into_world(self) -> Result<World> {
    Ok(World {
      id:           decode_uuid(&self.world_id)?,
      universe_id:  decode_uuid(&self.universe_id)?,
      owner_id:     decode_uuid(&self.owner_id)?,
      name:         self.name,
      description:  self.description,
      is_root:      self.is_root,
      has_episodes: self.has_episodes,
      prefix:       self.prefix,
      order_index:  self.order_index,
      created_at:   decode_dt(&self.created_at)?,
      updated_at:   decode_dt(&self.updated_at)?,
    })
  }
}

pub struct RawCategory {
  pub category_id: String,
  pub universe_id: Option<String>,
  pub owner_id:    Option<String>,
  pub slug:        String,
  pub label:       String,
  pub description: Option<String>,
  pub prefix:      String,
  pub created_at:  String,
}

impl RawCategory {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      category_id: row.get(0)?,
      universe_id: row.get(1)?,
      owner_id:    row.get(2)?,
      slug:        row.get(3)?,
      label:       row.get(4)?,
      description: row.get(5)?,
      prefix:      row.get(6)?,
      created_at:  row.get(7)?,
    })
  }

  pub fn into_category(self) -> Result<Category> {
    Ok(Category {
      id:          decode_uuid(&self.category_id)?,
      universe_id: decode_opt_uuid(self.universe_id)?,
      owner_id:    decode_opt_uuid(self.owner_id)?,
      slug:        self.slug,
      label:       self.label,
      description: self.description,
      prefix:      self.prefix,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawFicha {
  pub ficha_id:       String,
  pub owner_id:       String,
  pub universe_id:    String,
  pub world_id:       Option<String>,
  pub category:       String,
  pub title:          String,
  pub code:           String,
  pub summary:        Option<String>,
  pub content:        Option<String>,
  pub tags:           String,
  pub diegetic_year:  Option<i32>,
  pub temporal_layer: Option<String>,
  pub episode_id:     Option<String>,
  pub images:         String,
  pub embedding:      Option<String>,
  pub created_at:     String,
  pub updated_at:     String,
}

impl RawFicha {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      ficha_id:       row.get(0)?,
      owner_id:       row.get(1)?,
      universe_id:    row.get(2)?,
      world_id:       row.get(3)?,
      category:       row.get(4)?,
      title:          row.get(5)?,
      code:           row.get(6)?,
      summary:        row.get(7)?,
      content:        row.get(8)?,
      tags:           row.get(9)?,
      diegetic_year:  row.get(10)?,
      temporal_layer: row.get(11)?,
      episode_id:     row.get(12)?,
      images:         row.get(13)?,
      embedding:      row.get(14)?,
      created_at:     row.get(15)?,
      updated_at:     row.get(16)?,
    })
  }

  pub fn into_ficha(self) -> Result<Ficha> {
    Ok(Ficha {
      id:             decode_uuid(&self.ficha_id)?,
      owner_id:       decode_uuid(&self.owner_id)?,
      universe_id:    decode_uuid(&self.universe_id)?,
      world_id:       decode_opt_uuid(self.world_id)?,
      category:       self.category,
      title:          self.title,
      code:           self.code,
      summary:        self.summary,
      content:        self.content,
      tags:           decode_list(&self.tags)?,
      diegetic_year:  self.diegetic_year,
      temporal_layer: self.temporal_layer,
      episode_id:     decode_opt_uuid(self.episode_id)?,
      images:         decode_list(&self.images)?,
      embedding:      decode_embedding(self.embedding)?,
      created_at:     decode_dt(&self.created_at)?,
      updated_at:     decode_dt(&self.updated_at)?,
    })
  }
}

pub struct RawEpisode {
  pub episode_id: String,
  pub owner_id:   String,
  pub world_id:   String,
  pub number:     i32,
  pub title:      Option<String>,
  pub created_at: String,
}

impl RawEpisode {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      episode_id: row.get(0)?,
      owner_id:   row.get(1)?,
      world_id:   row.get(2)?,
      number:     row.get(3)?,
      title:      row.get(4)?,
      created_at: row.get(5)?,
    })
  }

  pub fn into_episode(self) -> Result<Episode> {
    Ok(Episode {
      id:         decode_uuid(&self.episode_id)?,
      owner_id:   decode_uuid(&self.owner_id)?,
      world_id:   decode_uuid(&self.world_id)?,
      number:     self.number,
      title:      self.title,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawRelation {
  pub relation_id:   String,
  pub owner_id:      String,
  pub source_id:     String,
  pub target_id:     String,
  pub relation_type: String,
  pub description:   Option<String>,
  pub created_at:    String,
}

impl RawRelation {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      relation_id:   row.get(0)?,
      owner_id:      row.get(1)?,
      source_id:     row.get(2)?,
      target_id:     row.get(3)?,
      relation_type: row.get(4)?,
      description:   row.get(5)?,
      created_at:    row.get(6)?,
    })
  }

  pub fn into_relation(self) -> Result<Relation> {
    Ok(Relation {
      id:            decode_uuid(&self.relation_id)?,
      owner_id:      decode_uuid(&self.owner_id)?,
      source_id:     decode_uuid(&self.source_id)?,
      target_id:     decode_uuid(&self.target_id)?,
      relation_type: RelationType::parse(&self.relation_type)
        .map_err(|_| Error::UnknownRelationType(self.relation_type.clone()))?,
      description:   self.description,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}
