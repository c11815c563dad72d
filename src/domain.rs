//! Domain records held by the store: exercises, tests, their ordered memberships, and documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A short text the learner practices reproducing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
  pub id: i64,
  pub title: String,
  pub content: String,
  #[serde(default)] pub description: Option<String>,
  /// Duplicates allowed; matching only cares about membership.
  #[serde(default)] pub tags: Vec<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Exercise {
  /// True when the filter is empty or any filter tag is one of ours.
  pub fn matches_any_tag(&self, filter: &[String]) -> bool {
    filter.is_empty() || filter.iter().any(|t| self.tags.contains(t))
  }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Test {
  pub id: i64,
  pub name: String,
  #[serde(default)] pub description: Option<String>,
  /// Requested size. Actual membership may be smaller.
  pub exercise_count: i32,
  #[serde(default)] pub tags: Vec<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Join row between a test and one of its exercises. `order` is 1-based.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestMembership {
  pub test_id: i64,
  pub exercise_id: i64,
  pub order: u32,
  pub added_at: DateTime<Utc>,
}

/// Free text with a list of subjects; the pool for random-subject draws.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
  pub id: i64,
  pub name: String,
  pub content: String,
  #[serde(default)] pub subjects: Vec<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Fields for a new exercise, before the store assigns id and timestamps.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExercise {
  pub title: String,
  pub content: String,
  #[serde(default)] pub description: Option<String>,
  #[serde(default)] pub tags: Vec<String>,
}

/// Partial update; `None` leaves the field untouched.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExercisePatch {
  #[serde(default)] pub title: Option<String>,
  #[serde(default)] pub content: Option<String>,
  /// `Some(None)` (explicit `null`) clears the description.
  #[serde(default, deserialize_with = "present")] pub description: Option<Option<String>>,
  #[serde(default)] pub tags: Option<Vec<String>>,
  /// Optimistic concurrency check against the stored `updatedAt`.
  #[serde(default)] pub expected_updated_at: Option<DateTime<Utc>>,
}

/// Marks a field as present, so `null` becomes `Some(None)` while an absent field stays `None`.
fn present<'de, D, T>(d: D) -> Result<Option<Option<T>>, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de>,
{
  Option::<T>::deserialize(d).map(Some)
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTest {
  pub name: String,
  #[serde(default)] pub description: Option<String>,
  pub exercise_count: i32,
  #[serde(default)] pub tags: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDocument {
  pub name: String,
  pub content: String,
  #[serde(default)] pub subjects: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPatch {
  #[serde(default)] pub name: Option<String>,
  #[serde(default)] pub content: Option<String>,
  #[serde(default)] pub subjects: Option<Vec<String>>,
}
