//! Exercise selection for new tests and previews, and the random-subject draw.
//!
//! Selection is pure: callers hand in the candidate pool read from the store
//! and an RNG, and get back the ordered picks. Persisting memberships is the
//! store's job (see `Tables::insert_test`).

use rand::seq::SliceRandom;
use rand::Rng;

use crate::domain::Exercise;
use crate::error::AppError;
use crate::util::dedup_preserving_order;

/// How the exercises of a test are chosen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
  /// Exactly these ids, in caller order; unknown ids are skipped.
  Explicit(Vec<i64>),
  /// Uniform sample among exercises carrying any of the tags (all when empty).
  Random { tags: Vec<String> },
}

impl Selection {
  /// Explicit ids win over tags when both are supplied.
  pub fn from_request(explicit_ids: Option<&[i64]>, tags: &[String]) -> Self {
    match explicit_ids {
      Some(ids) if !ids.is_empty() => Selection::Explicit(ids.to_vec()),
      _ => Selection::Random { tags: tags.to_vec() },
    }
  }

  /// Short label for logs.
  pub fn mode(&self) -> &'static str {
    match self {
      Selection::Explicit(_) => "explicit",
      Selection::Random { .. } => "random",
    }
  }
}

/// Convert a requested count into a usable size, rejecting non-positive values.
pub fn requested_count(count: i32) -> Result<usize, AppError> {
  if count <= 0 {
    return Err(AppError::invalid(format!("exerciseCount must be greater than 0 (got {count})")));
  }
  Ok(count as usize)
}

/// Uniformly shuffle the pool (Fisher–Yates) and keep at most `count` items.
pub fn sample_uniform<T, R: Rng + ?Sized>(mut pool: Vec<T>, count: usize, rng: &mut R) -> Vec<T> {
  pool.shuffle(rng);
  pool.truncate(count);
  pool
}

/// Pick exercises for a test from `exercises` (the whole catalogue, any order).
pub fn select_exercises<R: Rng + ?Sized>(
  exercises: &[Exercise],
  selection: &Selection,
  count: usize,
  rng: &mut R,
) -> Result<Vec<Exercise>, AppError> {
  let picked = match selection {
    Selection::Explicit(ids) => dedup_preserving_order(ids.iter().copied())
      .into_iter()
      .filter_map(|id| exercises.iter().find(|e| e.id == id).cloned())
      .take(count)
      .collect::<Vec<_>>(),
    Selection::Random { tags } => {
      let pool: Vec<Exercise> = exercises.iter().filter(|e| e.matches_any_tag(tags)).cloned().collect();
      sample_uniform(pool, count, rng)
    }
  };

  if picked.is_empty() {
    let what = match selection {
      Selection::Explicit(ids) => format!("none of the exercise ids {ids:?} exist"),
      Selection::Random { tags } if tags.is_empty() => "the exercise catalogue is empty".to_string(),
      Selection::Random { tags } => format!("no exercise is tagged with any of {tags:?}"),
    };
    return Err(AppError::EmptySelection(what));
  }
  Ok(picked)
}

/// Distinct subjects, first-seen order. Returns all of them when `count` covers
/// the pool, otherwise a uniform sample of exactly `count`.
pub fn random_subjects<R: Rng + ?Sized>(
  subjects: impl IntoIterator<Item = String>,
  count: i32,
  rng: &mut R,
) -> Result<Vec<String>, AppError> {
  if count <= 0 {
    return Err(AppError::invalid("Count must be greater than 0"));
  }
  let all = dedup_preserving_order(subjects);
  let count = count as usize;
  if count >= all.len() {
    return Ok(all);
  }
  Ok(sample_uniform(all, count, rng))
}
