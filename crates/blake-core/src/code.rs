//! Human-readable ficha codes: `<WORLD>-<CATEGORY>-<NNN>`.

/// The part of a code shared by every ficha of one category in one world.
pub fn code_stem(world_prefix: &str, category_prefix: &str) -> String {
  format!("{world_prefix}-{category_prefix}-")
}

/// The next code under `stem`, one above the highest number in `existing`.
///
/// Codes in `existing` that do not start with `stem` or do not end in a
/// number are ignored. Gaps left by deleted fichas are never reused.
pub fn next_code<S: AsRef<str>>(stem: &str, existing: &[S]) -> String {
  let highest = existing
    .iter()
    .filter_map(|code| code.as_ref().strip_prefix(stem))
    .filter_map(|n| n.parse::<u32>().ok())
    .max()
    .unwrap_or(0);
  format!("{stem}{:03}", highest + 1)
}
