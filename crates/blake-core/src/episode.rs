//! Episode — a numbered narrative unit inside a world that has episodes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
  pub id:         Uuid,
  pub owner_id:   Uuid,
  pub world_id:   Uuid,
  /// Unique within the world, starting at 1.
  pub number:     i32,
  pub title:      Option<String>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewEpisode {
  pub world_id: Uuid,
  pub number:   i32,
  pub title:    Option<String>,
}

#[derive(Debug, Clone)]
pub struct EpisodeUpdate {
  pub number: i32,
  pub title:  Option<String>,
}
