//! Cosine-similarity ranking for semantic search.

use serde::Serialize;

use crate::ficha::Ficha;

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
  if a.len() != b.len() || a.is_empty() {
    return None;
  }
  let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
  for (x, y) in a.iter().zip(b) {
    dot += x * y;
    norm_a += x * x;
    norm_b += y * y;
  }
  if norm_a == 0.0 || norm_b == 0.0 {
    return None;
  }
  Some(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoredFicha {
  pub ficha: Ficha,
  pub score: f32,
}

/// Rank embedded fichas by similarity to `query`, best first, keeping at most
/// `limit`. Fichas without an embedding, or whose embedding has a different
/// dimension, are skipped.
pub fn rank(query: &[f32], fichas: Vec<Ficha>, limit: usize) -> Vec<ScoredFicha> {
  let mut scored: Vec<ScoredFicha> = fichas
    .into_iter()
    .filter_map(|ficha| {
      let score = cosine_similarity(query, ficha.embedding.as_deref()?)?;
      Some(ScoredFicha { ficha, score })
    })
    .collect();
  scored.sort_by(|a, b| b.score.total_cmp(&a.score));
  scored.truncate(limit);
  scored
}
