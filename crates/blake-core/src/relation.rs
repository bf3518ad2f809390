//! Relation — a directed, typed edge between two fichas.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator as _, IntoStaticStr};
use uuid::Uuid;

use crate::{Error, Result};

/// The closed vocabulary of relation types. The snake_case name is both the
/// wire format and the value stored in the database.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  EnumIter,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RelationType {
  // ── Kinship and bonds ────────────────────────────────────────────────────
  ParentOf,
  ChildOf,
  SiblingOf,
  SpouseOf,
  FriendOf,
  EnemyOf,
  AllyOf,
  MentorOf,
  StudentOf,

  // ── Organisation ─────────────────────────────────────────────────────────
  MemberOf,
  LeaderOf,
  WorksFor,

  // ── Place ────────────────────────────────────────────────────────────────
  BornIn,
  LivesIn,
  LocatedIn,
  PartOf,

  // ── Events and causality ─────────────────────────────────────────────────
  ParticipatedIn,
  Caused,
  CausedBy,
  Precedes,
  Follows,

  // ── Misc ─────────────────────────────────────────────────────────────────
  Owns,
  Created,
  RelatedTo,
}

impl RelationType {
  pub fn as_str(self) -> &'static str { self.into() }

  pub fn parse(s: &str) -> Result<Self> {
    Self::from_str(s).map_err(|_| Error::UnknownRelationType(s.to_owned()))
  }

  pub fn all() -> Vec<Self> { Self::iter().collect() }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
  pub id:            Uuid,
  pub owner_id:      Uuid,
  pub source_id:     Uuid,
  pub target_id:     Uuid,
  pub relation_type: RelationType,
  pub description:   Option<String>,
  pub created_at:    DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRelation {
  pub source_id:     Uuid,
  pub target_id:     Uuid,
  pub relation_type: RelationType,
  pub description:   Option<String>,
}

impl NewRelation {
  /// Reject edges from a ficha to itself.
  pub fn validate(&self) -> Result<()> {
    if self.source_id == self.target_id {
      return Err(Error::validation("a ficha cannot be related to itself"));
    }
    Ok(())
  }
}

#[derive(Debug, Clone)]
pub struct RelationUpdate {
  pub relation_type: RelationType,
  pub description:   Option<String>,
}
