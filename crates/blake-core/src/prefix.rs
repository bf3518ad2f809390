//! Prefix generation — short uppercase codes identifying worlds and
//! categories.
//!
//! A prefix is derived from the entity's name and must not collide with the
//! prefixes already in use in its scope (all worlds of one owner, or the base
//! categories plus the owner's own). Collisions escalate deterministically:
//!
//! 1. single-word names try longer leading substrings of the word;
//! 2. everything else (and exhausted words) appends `2`, `3`, … to the base.
//!
//! The scope is a snapshot: nothing here locks it, so two concurrent creations
//! may still compute the same prefix and the store's unique index rejects the
//! second insert.

use std::{collections::HashSet, future::Future};

use crate::{Error, Result};

/// Characters taken from a single-word name for the base candidate.
const SINGLE_WORD_LEN: usize = 3;

/// Upper bound for initials and for lengthening a single word.
const MAX_GENERATED_LEN: usize = 4;

/// First integer suffix appended once lengthening is exhausted.
const FIRST_SUFFIX: u32 = 2;

/// Which kind of entity a prefix belongs to. Only affects validation of
/// caller-supplied prefixes; generation is identical for both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixScope {
  World,
  Category,
}

impl PrefixScope {
  /// Longest alphabetic part a caller-supplied prefix may carry.
  pub fn max_letters(self) -> usize {
    match self {
      Self::World => 5,
      Self::Category => 4,
    }
  }
}

fn upper(chars: impl Iterator<Item = char>) -> String {
  chars.flat_map(char::to_uppercase).collect()
}

/// The collision-free starting point for `name`: the first three characters
/// of a single word, or the initials (at most four) of several words.
pub fn base_candidate(name: &str) -> String {
  let tokens: Vec<&str> = name.split_whitespace().collect();
  match tokens.as_slice() {
    [word] => upper(word.chars().take(SINGLE_WORD_LEN)),
    words => upper(
      words
        .iter()
        .filter_map(|w| w.chars().next())
        .take(MAX_GENERATED_LEN),
    ),
  }
}

/// Derive a prefix for `name` that is not a member of `existing`.
///
/// `name` must contain at least one non-whitespace character; callers reject
/// blank names before getting here (see [`require_name`]).
pub fn generate_prefix(name: &str, existing: &HashSet<String>) -> String {
  let base = base_candidate(name);
  if !existing.contains(&base) {
    return base;
  }

  let tokens: Vec<&str> = name.split_whitespace().collect();
  if let [word] = tokens.as_slice() {
    let word_len = word.chars().count();
    let base_len = word_len.min(SINGLE_WORD_LEN);
    for len in (base_len + 1)..=word_len.min(MAX_GENERATED_LEN) {
      let candidate = upper(word.chars().take(len));
      if !existing.contains(&candidate) {
        return candidate;
      }
    }
  }

  let mut suffix = FIRST_SUFFIX;
  loop {
    let candidate = format!("{base}{suffix}");
    if !existing.contains(&candidate) {
      return candidate;
    }
    suffix += 1;
  }
}

/// Read the scope through `lookup` and generate a prefix against it.
///
/// Lookup failures propagate unchanged; there is no fallback prefix.
pub async fn resolve_prefix<F, Fut, E>(name: &str, lookup: F) -> Result<String, E>
where
  F: FnOnce() -> Fut,
  Fut: Future<Output = Result<HashSet<String>, E>>,
{
  let existing = lookup().await?;
  Ok(generate_prefix(name, &existing))
}

/// Trim `name` and reject it when nothing is left.
pub fn require_name<'a>(field: &str, name: &'a str) -> Result<&'a str> {
  let trimmed = name.trim();
  if trimmed.is_empty() {
    return Err(Error::validation(format!("{field} is required")));
  }
  Ok(trimmed)
}

/// Normalise a caller-supplied prefix to uppercase and check its shape:
/// 2 to [`PrefixScope::max_letters`] letters, optionally followed by digits.
pub fn normalize_prefix(scope: PrefixScope, raw: &str) -> Result<String> {
  let prefix = raw.trim().to_uppercase();
  let letters = prefix.chars().take_while(|c| c.is_alphabetic()).count();
  let rest_is_digits = prefix
    .chars()
    .skip(letters)
    .all(|c| c.is_ascii_digit());

  if letters < 2 || letters > scope.max_letters() || !rest_is_digits {
    return Err(Error::validation(format!(
      "prefix must be 2 to {} letters, optionally followed by digits",
      scope.max_letters()
    )));
  }
  Ok(prefix)
}
