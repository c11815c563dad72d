//! Practice session: walk a fixed list of exercises, score each recall attempt.
//!
//! A session is owned by exactly one connection and dropped with it; nothing
//! here is persisted.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::domain::Exercise;
use crate::error::AppError;
use crate::similarity::{self, Similarity};

/// Score at or above which an exercise counts as completed.
pub const PASS_THRESHOLD: u32 = 70;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
  /// Content hidden, collecting input.
  AwaitingInput,
  /// Content revealed with a score; a next exercise exists.
  Compared,
  /// The last exercise has been compared.
  Finished,
}

#[derive(Debug)]
pub struct PracticeSession {
  exercises: Vec<Exercise>,
  current: usize,
  completed: BTreeSet<usize>,
  attempt: String,
  last: Option<Similarity>,
  phase: Phase,
}

impl PracticeSession {
  pub fn start(exercises: Vec<Exercise>) -> Result<Self, AppError> {
    if exercises.is_empty() {
      return Err(AppError::EmptySelection("nothing to practice".into()));
    }
    Ok(Self {
      exercises,
      current: 0,
      completed: BTreeSet::new(),
      attempt: String::new(),
      last: None,
      phase: Phase::AwaitingInput,
    })
  }

  pub fn phase(&self) -> Phase { self.phase }
  pub fn current_index(&self) -> usize { self.current }
  pub fn total(&self) -> usize { self.exercises.len() }
  pub fn attempt(&self) -> &str { &self.attempt }
  pub fn last_comparison(&self) -> Option<&Similarity> { self.last.as_ref() }

  pub fn current_exercise(&self) -> &Exercise {
    &self.exercises[self.current]
  }

  pub fn is_completed(&self, index: usize) -> bool {
    self.completed.contains(&index)
  }

  pub fn completed_count(&self) -> usize {
    self.completed.len()
  }

  /// Completed share of the session, 0.0..=1.0.
  pub fn progress(&self) -> f64 {
    self.completed.len() as f64 / self.exercises.len() as f64
  }

  pub fn has_next(&self) -> bool {
    self.current + 1 < self.exercises.len()
  }

  /// Append a speech-to-text fragment to the pending attempt.
  pub fn append_transcript(&mut self, fragment: &str) {
    let fragment = fragment.trim();
    if fragment.is_empty() {
      return;
    }
    if !self.attempt.is_empty() {
      self.attempt.push(' ');
    }
    self.attempt.push_str(fragment);
  }

  /// Score `attempt` (or the pending transcript when `None`) against the current exercise.
  pub fn compare(&mut self, attempt: Option<&str>) -> Result<&Similarity, AppError> {
    let text = attempt.unwrap_or(self.attempt.as_str()).trim().to_string();
    if text.is_empty() {
      return Err(AppError::invalid("attempt text must not be empty"));
    }
    let result = similarity::compare(&text, &self.current_exercise().content);
    if result.score >= PASS_THRESHOLD {
      self.completed.insert(self.current);
    }
    self.attempt = text;
    self.phase = if self.has_next() { Phase::Compared } else { Phase::Finished };
    Ok(self.last.insert(result))
  }

  /// Advance to the next exercise. Only after a comparison, and only if one remains.
  pub fn next(&mut self) -> Result<(), AppError> {
    match self.phase {
      Phase::Compared if self.has_next() => {
        self.current += 1;
        self.clear();
        Ok(())
      }
      Phase::Finished => Err(AppError::invalid("session finished: no next exercise")),
      _ => Err(AppError::invalid("compare an attempt before moving on")),
    }
  }

  /// Clear input and any shown comparison; stay on the same exercise.
  pub fn reset(&mut self) {
    self.clear();
  }

  fn clear(&mut self) {
    self.attempt.clear();
    self.last = None;
    self.phase = Phase::AwaitingInput;
  }
}
