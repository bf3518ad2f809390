//! Entity extraction — the shapes exchanged with the language model.
//!
//! The model receives narrative text plus the categories it may use and
//! answers with entities and relations between them. Nothing here validates
//! the answer beyond its structure: relation types and categories stay
//! strings, and the caller decides what to keep.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::category::Category;

/// A category as described to the model.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryHint {
  pub slug:        String,
  pub label:       String,
  pub description: Option<String>,
}

impl From<&Category> for CategoryHint {
  fn from(c: &Category) -> Self {
    Self {
      slug:        c.slug.clone(),
      label:       c.label.clone(),
      description: c.description.clone(),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractedEntity {
  pub name:     String,
  /// Category slug chosen by the model.
  pub category: String,
  #[serde(default)]
  pub summary:  Option<String>,
  #[serde(default)]
  pub content:  Option<String>,
  #[serde(default)]
  pub tags:     Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractedRelation {
  /// Name of the source entity.
  pub source:        String,
  /// Name of the target entity.
  pub target:        String,
  pub relation_type: String,
  #[serde(default)]
  pub description:   Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExtractionResult {
  #[serde(default)]
  pub entities:  Vec<ExtractedEntity>,
  #[serde(default)]
  pub relations: Vec<ExtractedRelation>,
}

/// A language-model service. One request per call: no retries, no partial
/// results.
#[async_trait]
pub trait LanguageModel: Send + Sync + 'static {
  async fn extract_entities(
    &self,
    text: &str,
    categories: &[CategoryHint],
  ) -> Result<ExtractionResult, Box<dyn std::error::Error + Send + Sync>>;

  async fn embed(
    &self,
    text: &str,
  ) -> Result<Vec<f32>, Box<dyn std::error::Error + Send + Sync>>;
}
