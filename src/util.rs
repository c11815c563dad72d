//! Small utility helpers used across modules.

use std::collections::HashSet;
use std::hash::Hash;

use crate::error::AppError;

/// Max length for titles and names, in characters.
pub const MAX_NAME_CHARS: usize = 255;

/// Keep the first occurrence of every item, in input order.
pub fn dedup_preserving_order<T: Eq + Hash + Clone>(items: impl IntoIterator<Item = T>) -> Vec<T> {
  let mut seen = HashSet::new();
  items.into_iter().filter(|x| seen.insert(x.clone())).collect()
}

/// Reject blank values and, when `max_chars` is given, overly long ones.
pub fn require_text(field: &str, value: &str, max_chars: Option<usize>) -> Result<(), AppError> {
  if value.trim().is_empty() {
    return Err(AppError::invalid(format!("{field} must not be empty")));
  }
  if let Some(max) = max_chars {
    if value.chars().count() > max {
      return Err(AppError::invalid(format!("{field} must be at most {max} characters")));
    }
  }
  Ok(())
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with whole exercise bodies or transcripts.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  match s.char_indices().nth(max) {
    None => s.to_string(),
    Some((cut, _)) => format!("{}… ({} bytes total)", &s[..cut], s.len()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dedup_keeps_first_seen_order() {
    assert_eq!(dedup_preserving_order([3, 1, 3, 2, 1]), vec![3, 1, 2]);
  }

  #[test]
  fn require_text_rejects_blank_and_long() {
    assert!(require_text("title", "   ", None).is_err());
    assert!(require_text("title", &"x".repeat(256), Some(MAX_NAME_CHARS)).is_err());
    assert!(require_text("title", "Git basics", Some(MAX_NAME_CHARS)).is_ok());
  }

  #[test]
  fn trunc_respects_char_boundaries() {
    assert_eq!(trunc_for_log("héllo", 10), "héllo");
    assert!(trunc_for_log("héllo wörld", 2).starts_with("hé…"));
  }
}
