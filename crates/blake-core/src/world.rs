//! World — a sub-division of a universe.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct World {
  pub id:           Uuid,
  pub universe_id:  Uuid,
  pub owner_id:     Uuid,
  pub name:         String,
  pub description:  Option<String>,
  /// The auto-created "Global" world; exactly one per universe.
  pub is_root:      bool,
  pub has_episodes: bool,
  /// Unique among all worlds of the owner.
  pub prefix:       String,
  pub order_index:  i64,
  pub created_at:   DateTime<Utc>,
  pub updated_at:   DateTime<Utc>,
}

/// Input to [`crate::store::VisionStore::create_world`].
/// `order_index` is assigned by the store (last position in the universe).
#[derive(Debug, Clone)]
pub struct NewWorld {
  pub universe_id:  Uuid,
  pub name:         String,
  pub description:  Option<String>,
  pub has_episodes: bool,
  pub prefix:       String,
}

#[derive(Debug, Clone)]
pub struct WorldUpdate {
  pub name:         String,
  pub description:  Option<String>,
  pub has_episodes: bool,
  pub prefix:       String,
}
