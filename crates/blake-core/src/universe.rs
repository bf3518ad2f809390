//! Universe — the top-level container owned by a user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name given to the root world created alongside every universe.
pub const ROOT_WORLD_NAME: &str = "Global";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Universe {
  pub id:          Uuid,
  pub owner_id:    Uuid,
  pub name:        String,
  pub description: Option<String>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

/// Input to [`crate::store::VisionStore::create_universe`].
#[derive(Debug, Clone)]
pub struct NewUniverse {
  pub name:              String,
  pub description:       Option<String>,
  /// Prefix for the root world, resolved by the caller against the owner's
  /// world scope.
  pub root_world_prefix: String,
}

/// Replacement values for the editable fields of a universe.
#[derive(Debug, Clone)]
pub struct UniverseUpdate {
  pub name:        String,
  pub description: Option<String>,
}
