//! Word-overlap similarity between a recall attempt and the reference text.
//!
//! Tokens are lowercased, whitespace-separated words; punctuation stays attached.
//! Word order is ignored: a learner is graded on recalling the content, not the phrasing.

use std::collections::HashSet;

use serde::Serialize;

/// Maximum number of missing-word hints returned.
pub const MAX_SUGGESTIONS: usize = 5;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Similarity {
  /// 0..=100, rounded.
  pub score: u32,
  /// Distinct reference words found in the attempt, in attempt order.
  pub matched_words: Vec<String>,
  /// Reference word count, duplicates included.
  pub total_words: usize,
  /// First unmatched reference words, in reference order.
  pub suggestions: Vec<String>,
}

pub fn tokenize(text: &str) -> Vec<String> {
  text.to_lowercase().split_whitespace().map(str::to_owned).collect()
}

/// Score `attempt` against `reference`. Pure and deterministic.
pub fn compare(attempt: &str, reference: &str) -> Similarity {
  let attempt_tokens = tokenize(attempt);
  let reference_tokens = tokenize(reference);
  let reference_set: HashSet<&str> = reference_tokens.iter().map(String::as_str).collect();

  let mut matched: HashSet<&str> = HashSet::new();
  let mut matched_words = Vec::new();
  for word in &attempt_tokens {
    if reference_set.contains(word.as_str()) && matched.insert(word.as_str()) {
      matched_words.push(word.clone());
    }
  }

  let total_words = reference_tokens.len();
  let score = if total_words == 0 {
    0
  } else {
    ((matched_words.len() as f64 / total_words as f64) * 100.0).round() as u32
  };

  let suggestions = reference_tokens
    .iter()
    .filter(|w| !matched.contains(w.as_str()))
    .take(MAX_SUGGESTIONS)
    .cloned()
    .collect();

  Similarity { score, matched_words, total_words, suggestions }
}
