//! Category — the type taxonomy for fichas.
//!
//! Base categories ship with the system (`owner_id` is `None`) and are
//! visible to every user; users add their own per universe.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

pub const PERSONAGEM: &str = "personagem";
pub const LOCAL: &str = "local";
pub const EVENTO: &str = "evento";
pub const CONCEITO: &str = "conceito";
pub const REGRA: &str = "regra";
pub const ROTEIRO: &str = "roteiro";
pub const SINOPSE: &str = "sinopse";

/// A system-provided category, seeded by every store backend.
#[derive(Debug, Clone, Copy)]
pub struct BaseCategory {
  pub slug:        &'static str,
  pub label:       &'static str,
  pub prefix:      &'static str,
  pub description: &'static str,
}

pub const BASE_CATEGORIES: &[BaseCategory] = &[
  BaseCategory {
    slug:        PERSONAGEM,
    label:       "Personagem",
    prefix:      "PER",
    description: "Pessoas, criaturas e entidades com agência na narrativa.",
  },
  BaseCategory {
    slug:        LOCAL,
    label:       "Local",
    prefix:      "LOC",
    description: "Lugares físicos ou imaginários onde a história acontece.",
  },
  BaseCategory {
    slug:        EVENTO,
    label:       "Evento",
    prefix:      "EVE",
    description: "Acontecimentos situados no tempo da narrativa.",
  },
  BaseCategory {
    slug:        CONCEITO,
    label:       "Conceito",
    prefix:      "CON",
    description: "Ideias, tecnologias, magias ou instituições do universo.",
  },
  BaseCategory {
    slug:        REGRA,
    label:       "Regra",
    prefix:      "REG",
    description: "Leis internas que o universo nunca quebra.",
  },
  BaseCategory {
    slug:        ROTEIRO,
    label:       "Roteiro",
    prefix:      "ROT",
    description: "Cenas e roteiros escritos.",
  },
  BaseCategory {
    slug:        SINOPSE,
    label:       "Sinopse",
    prefix:      "SIN",
    description: "Sinopse de um episódio; no máximo uma por episódio.",
  },
];

/// Types whose fichas may live at universe level, without a world.
pub const UNIVERSE_WIDE: &[&str] = &[CONCEITO, REGRA];

pub fn is_universe_wide(slug: &str) -> bool { UNIVERSE_WIDE.contains(&slug) }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
  pub id:          Uuid,
  /// `None` for base categories.
  pub universe_id: Option<Uuid>,
  /// `None` for base categories.
  pub owner_id:    Option<Uuid>,
  pub slug:        String,
  pub label:       String,
  pub description: Option<String>,
  pub prefix:      String,
  pub created_at:  DateTime<Utc>,
}

impl Category {
  pub fn is_base(&self) -> bool { self.owner_id.is_none() }
}

#[derive(Debug, Clone)]
pub struct NewCategory {
  pub universe_id: Uuid,
  pub slug:        String,
  pub label:       String,
  pub description: Option<String>,
  pub prefix:      String,
}

#[derive(Debug, Clone)]
pub struct CategoryUpdate {
  pub label:       String,
  pub description: Option<String>,
  pub prefix:      String,
}

/// Derive a slug from a label: lowercase, runs of anything that is not a
/// letter or digit collapse into a single `-`.
pub fn slugify(label: &str) -> Result<String> {
  let mut slug = String::with_capacity(label.len());
  for c in label.trim().chars().flat_map(char::to_lowercase) {
    if c.is_alphanumeric() {
      slug.push(c);
    } else if !slug.is_empty() && !slug.ends_with('-') {
      slug.push('-');
    }
  }
  while slug.ends_with('-') {
    slug.pop();
  }
  if slug.is_empty() {
    return Err(Error::validation("slug must contain a letter or digit"));
  }
  Ok(slug)
}
