//! Ficha — a typed content record scoped to a world or, for universe-wide
//! types, to the universe itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ficha {
  pub id:             Uuid,
  pub owner_id:       Uuid,
  pub universe_id:    Uuid,
  /// `None` only for universe-wide types (`conceito`, `regra`).
  pub world_id:       Option<Uuid>,
  /// Slug of the ficha's category.
  pub category:       String,
  pub title:          String,
  /// Human-readable code, e.g. `TAT-PER-004`.
  pub code:           String,
  pub summary:        Option<String>,
  pub content:        Option<String>,
  pub tags:           Vec<String>,
  /// Year inside the story's own calendar.
  pub diegetic_year:  Option<i32>,
  pub temporal_layer: Option<String>,
  pub episode_id:     Option<Uuid>,
  /// Public URLs of the ficha's images, in album order.
  pub images:         Vec<String>,
  /// Vector used by semantic search; never sent over the API.
  #[serde(skip)]
  pub embedding:      Option<Vec<f32>>,
  pub created_at:     DateTime<Utc>,
  pub updated_at:     DateTime<Utc>,
}

impl Ficha {
  /// The text that gets embedded for semantic search.
  pub fn embedding_text(&self) -> String {
    [
      Some(self.title.as_str()),
      self.summary.as_deref(),
      self.content.as_deref(),
    ]
    .into_iter()
    .flatten()
    .filter(|part| !part.trim().is_empty())
    .collect::<Vec<_>>()
    .join("\n\n")
  }
}

/// Input to [`crate::store::VisionStore::create_ficha`].
#[derive(Debug, Clone)]
pub struct NewFicha {
  pub universe_id:    Uuid,
  pub world_id:       Option<Uuid>,
  pub category:       String,
  pub title:          String,
  pub code:           String,
  pub summary:        Option<String>,
  pub content:        Option<String>,
  pub tags:           Vec<String>,
  pub diegetic_year:  Option<i32>,
  pub temporal_layer: Option<String>,
  pub episode_id:     Option<Uuid>,
  pub images:         Vec<String>,
}

/// Replacement values for the editable fields of a ficha. The universe,
/// world, category and code never change after creation.
#[derive(Debug, Clone)]
pub struct FichaUpdate {
  pub title:          String,
  pub summary:        Option<String>,
  pub content:        Option<String>,
  pub tags:           Vec<String>,
  pub diegetic_year:  Option<i32>,
  pub temporal_layer: Option<String>,
  pub episode_id:     Option<Uuid>,
  pub images:         Vec<String>,
}

/// Parameters for [`crate::store::VisionStore::list_fichas`].
#[derive(Debug, Clone, Default)]
pub struct FichaQuery {
  pub universe_id: Option<Uuid>,
  pub world_id:    Option<Uuid>,
  pub category:    Option<String>,
  pub episode_id:  Option<Uuid>,
  /// The ficha must carry this tag.
  pub tag:         Option<String>,
  /// Free-text filter over title, summary and content.
  pub text:        Option<String>,
  pub limit:       Option<usize>,
  pub offset:      Option<usize>,
}

/// Collapse user-entered tags: trimmed, no blanks, no repeats, first
/// occurrence wins.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
  let mut out: Vec<String> = Vec::with_capacity(tags.len());
  for tag in tags {
    let tag = tag.trim();
    if !tag.is_empty() && !out.iter().any(|t| t == tag) {
      out.push(tag.to_owned());
    }
  }
  out
}
