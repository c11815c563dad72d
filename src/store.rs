//! Relational-shaped in-memory store with an optional JSON snapshot.
//!
//! All tables live behind a single `RwLock`. Mutations go through
//! [`Store::transact`]: the closure edits a draft copy, the draft is flushed to
//! the snapshot file (when configured), and only then replaces the live tables.
//! A failed closure or a failed flush leaves the visible state untouched, so a
//! test is never observable with only part of its memberships.
//!
//! Cascades are explicit: deleting an exercise or a test removes the dependent
//! membership rows inside the same transaction.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::domain::{
  Document, DocumentPatch, Exercise, ExercisePatch, NewDocument, NewExercise, NewTest, Test, TestMembership,
};
use crate::error::AppError;
use crate::util::{require_text, MAX_NAME_CHARS};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tables {
  #[serde(default)] next_exercise_id: i64,
  #[serde(default)] next_test_id: i64,
  #[serde(default)] next_document_id: i64,
  #[serde(default)] exercises: BTreeMap<i64, Exercise>,
  #[serde(default)] tests: BTreeMap<i64, Test>,
  #[serde(default)] memberships: Vec<TestMembership>,
  #[serde(default)] documents: BTreeMap<i64, Document>,
}

fn bump(counter: &mut i64) -> i64 {
  *counter += 1;
  *counter
}

impl Tables {
  // ---------- exercises ----------

  /// All exercises, ascending id.
  pub fn exercises(&self) -> Vec<Exercise> {
    self.exercises.values().cloned().collect()
  }

  pub fn exercise_count(&self) -> usize {
    self.exercises.len()
  }

  pub fn exercise(&self, id: i64) -> Result<&Exercise, AppError> {
    self.exercises.get(&id).ok_or_else(|| AppError::not_found("exercise", id))
  }

  pub fn insert_exercise(&mut self, new: NewExercise) -> Result<Exercise, AppError> {
    require_text("title", &new.title, Some(MAX_NAME_CHARS))?;
    require_text("content", &new.content, None)?;
    let now = Utc::now();
    let ex = Exercise {
      id: bump(&mut self.next_exercise_id),
      title: new.title,
      content: new.content,
      description: new.description,
      tags: new.tags,
      created_at: now,
      updated_at: now,
    };
    self.exercises.insert(ex.id, ex.clone());
    Ok(ex)
  }

  pub fn update_exercise(&mut self, id: i64, patch: ExercisePatch) -> Result<Exercise, AppError> {
    if let Some(title) = &patch.title {
      require_text("title", title, Some(MAX_NAME_CHARS))?;
    }
    if let Some(content) = &patch.content {
      require_text("content", content, None)?;
    }
    let ex = self.exercises.get_mut(&id).ok_or_else(|| AppError::not_found("exercise", id))?;
    if let Some(expected) = patch.expected_updated_at {
      if expected != ex.updated_at {
        return Err(AppError::Conflict(format!(
          "exercise {id} was modified at {} (expected {expected})",
          ex.updated_at.to_rfc3339()
        )));
      }
    }
    if let Some(title) = patch.title { ex.title = title; }
    if let Some(content) = patch.content { ex.content = content; }
    if let Some(description) = patch.description { ex.description = description; }
    if let Some(tags) = patch.tags { ex.tags = tags; }
    ex.updated_at = Utc::now();
    Ok(ex.clone())
  }

  /// Delete an exercise and its memberships; affected tests are renumbered 1..k.
  pub fn delete_exercise(&mut self, id: i64) -> Result<(), AppError> {
    self.exercises.remove(&id).ok_or_else(|| AppError::not_found("exercise", id))?;
    let mut touched: Vec<i64> = Vec::new();
    self.memberships.retain(|m| {
      if m.exercise_id == id {
        touched.push(m.test_id);
        false
      } else {
        true
      }
    });
    for test_id in touched {
      self.renumber(test_id);
    }
    Ok(())
  }

  /// Substring match on title/content (case-sensitive) and tag intersection.
  pub fn search_exercises(&self, query: Option<&str>, tags: &[String]) -> Vec<Exercise> {
    self
      .exercises
      .values()
      .filter(|e| match query {
        Some(q) if !q.is_empty() => e.title.contains(q) || e.content.contains(q),
        _ => true,
      })
      .filter(|e| e.matches_any_tag(tags))
      .cloned()
      .collect()
  }

  // ---------- tests ----------

  pub fn tests(&self) -> Vec<Test> {
    self.tests.values().cloned().collect()
  }

  pub fn test(&self, id: i64) -> Result<&Test, AppError> {
    self.tests.get(&id).ok_or_else(|| AppError::not_found("test", id))
  }

  /// Memberships of a test sorted by `order`.
  pub fn memberships_of(&self, test_id: i64) -> Vec<&TestMembership> {
    let mut rows: Vec<&TestMembership> = self.memberships.iter().filter(|m| m.test_id == test_id).collect();
    rows.sort_by_key(|m| m.order);
    rows
  }

  /// Exercises of a test in practice order.
  pub fn test_exercises(&self, test_id: i64) -> Vec<Exercise> {
    self
      .memberships_of(test_id)
      .into_iter()
      .filter_map(|m| self.exercises.get(&m.exercise_id).cloned())
      .collect()
  }

  /// Insert the test row and one membership per selected exercise, `order` = 1-based position.
  pub fn insert_test(&mut self, new: NewTest, selected: &[Exercise]) -> Result<Test, AppError> {
    require_text("name", &new.name, Some(MAX_NAME_CHARS))?;
    if selected.is_empty() {
      return Err(AppError::EmptySelection("a test needs at least one exercise".into()));
    }
    if let Some(missing) = selected.iter().find(|e| !self.exercises.contains_key(&e.id)) {
      return Err(AppError::not_found("exercise", missing.id));
    }
    let mut seen = HashSet::new();
    if let Some(dup) = selected.iter().find(|e| !seen.insert(e.id)) {
      return Err(AppError::invalid(format!("exercise {} listed twice", dup.id)));
    }
    let now = Utc::now();
    let test = Test {
      id: bump(&mut self.next_test_id),
      name: new.name,
      description: new.description,
      exercise_count: new.exercise_count,
      tags: new.tags,
      created_at: now,
      updated_at: now,
    };
    for (i, ex) in selected.iter().enumerate() {
      self.memberships.push(TestMembership {
        test_id: test.id,
        exercise_id: ex.id,
        order: (i + 1) as u32,
        added_at: now,
      });
    }
    self.tests.insert(test.id, test.clone());
    Ok(test)
  }

  pub fn delete_test(&mut self, id: i64) -> Result<(), AppError> {
    self.tests.remove(&id).ok_or_else(|| AppError::not_found("test", id))?;
    self.memberships.retain(|m| m.test_id != id);
    Ok(())
  }

  fn renumber(&mut self, test_id: i64) {
    let mut rows: Vec<&mut TestMembership> = self.memberships.iter_mut().filter(|m| m.test_id == test_id).collect();
    rows.sort_by_key(|m| m.order);
    for (i, m) in rows.into_iter().enumerate() {
      m.order = (i + 1) as u32;
    }
  }

  // ---------- documents ----------

  pub fn documents(&self) -> Vec<Document> {
    self.documents.values().cloned().collect()
  }

  pub fn document(&self, id: i64) -> Result<&Document, AppError> {
    self.documents.get(&id).ok_or_else(|| AppError::not_found("document", id))
  }

  pub fn insert_document(&mut self, new: NewDocument) -> Result<Document, AppError> {
    require_text("name", &new.name, Some(MAX_NAME_CHARS))?;
    require_text("content", &new.content, None)?;
    let now = Utc::now();
    let doc = Document {
      id: bump(&mut self.next_document_id),
      name: new.name,
      content: new.content,
      subjects: new.subjects,
      created_at: now,
      updated_at: now,
    };
    self.documents.insert(doc.id, doc.clone());
    Ok(doc)
  }

  pub fn update_document(&mut self, id: i64, patch: DocumentPatch) -> Result<Document, AppError> {
    if let Some(name) = &patch.name {
      require_text("name", name, Some(MAX_NAME_CHARS))?;
    }
    if let Some(content) = &patch.content {
      require_text("content", content, None)?;
    }
    let doc = self.documents.get_mut(&id).ok_or_else(|| AppError::not_found("document", id))?;
    if let Some(name) = patch.name { doc.name = name; }
    if let Some(content) = patch.content { doc.content = content; }
    if let Some(subjects) = patch.subjects { doc.subjects = subjects; }
    doc.updated_at = Utc::now();
    Ok(doc.clone())
  }

  pub fn delete_document(&mut self, id: i64) -> Result<(), AppError> {
    self.documents.remove(&id).map(|_| ()).ok_or_else(|| AppError::not_found("document", id))
  }

  /// Subjects of the selected documents (all when `ids` is empty), document id order.
  pub fn subjects(&self, ids: &[i64]) -> Vec<String> {
    self
      .documents
      .values()
      .filter(|d| ids.is_empty() || ids.contains(&d.id))
      .flat_map(|d| d.subjects.iter().cloned())
      .collect()
  }
}

pub struct Store {
  tables: RwLock<Tables>,
  snapshot: Option<PathBuf>,
}

impl Store {
  /// Volatile store; nothing is written to disk.
  pub fn in_memory() -> Self {
    Self { tables: RwLock::new(Tables::default()), snapshot: None }
  }

  /// Open a store backed by `snapshot`, creating its parent directory if needed.
  /// A missing file starts empty; an unreadable or corrupt one is an error rather
  /// than being silently overwritten.
  #[instrument(level = "info")]
  pub async fn open(snapshot: PathBuf) -> Result<Self, AppError> {
    if let Some(parent) = snapshot.parent().filter(|p| !p.as_os_str().is_empty()) {
      tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| AppError::Persistence(format!("create {}: {e}", parent.display())))?;
    }
    let tables = match tokio::fs::read(&snapshot).await {
      Ok(bytes) => {
        let t: Tables = serde_json::from_slice(&bytes)
          .map_err(|e| AppError::Persistence(format!("corrupt snapshot {}: {e}", snapshot.display())))?;
        info!(target: "recall_backend", path = %snapshot.display(), exercises = t.exercises.len(), tests = t.tests.len(), documents = t.documents.len(), "Loaded snapshot");
        t
      }
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        info!(target: "recall_backend", path = %snapshot.display(), "No snapshot yet; starting empty");
        Tables::default()
      }
      Err(e) => return Err(AppError::Persistence(format!("read {}: {e}", snapshot.display()))),
    };
    Ok(Self { tables: RwLock::new(tables), snapshot: Some(snapshot) })
  }

  /// Run `f` against a shared view of the tables.
  pub async fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> R {
    let guard = self.tables.read().await;
    f(&guard)
  }

  /// Apply `f` to a draft, flush it, then publish it. All-or-nothing.
  pub async fn transact<R>(&self, f: impl FnOnce(&mut Tables) -> Result<R, AppError>) -> Result<R, AppError> {
    let mut guard = self.tables.write().await;
    let mut draft = guard.clone();
    let out = f(&mut draft)?;
    if let Some(path) = &self.snapshot {
      write_snapshot(path, &draft).await?;
    }
    *guard = draft;
    Ok(out)
  }
}

async fn write_snapshot(path: &Path, tables: &Tables) -> Result<(), AppError> {
  let bytes = serde_json::to_vec_pretty(tables).map_err(|e| AppError::Persistence(format!("encode snapshot: {e}")))?;
  let mut tmp = path.as_os_str().to_owned();
  tmp.push(".tmp");
  let tmp = PathBuf::from(tmp);
  tokio::fs::write(&tmp, &bytes)
    .await
    .map_err(|e| AppError::Persistence(format!("write {}: {e}", tmp.display())))?;
  tokio::fs::rename(&tmp, path)
    .await
    .map_err(|e| AppError::Persistence(format!("rename onto {}: {e}", path.display())))?;
  debug!(target: "recall_backend", path = %path.display(), bytes = bytes.len(), "Snapshot flushed");
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn new_ex(title: &str, tags: &[&str]) -> NewExercise {
    NewExercise {
      title: title.into(),
      content: format!("{title} content"),
      description: None,
      tags: tags.iter().map(|t| t.to_string()).collect(),
    }
  }

  fn new_test(name: &str, count: i32) -> NewTest {
    NewTest { name: name.into(), description: None, exercise_count: count, tags: vec![] }
  }

  fn orders(t: &Tables, test_id: i64) -> Vec<u32> {
    t.memberships_of(test_id).iter().map(|m| m.order).collect()
  }

  #[test]
  fn ids_are_assigned_sequentially() {
    let mut t = Tables::default();
    let a = t.insert_exercise(new_ex("a", &[])).unwrap();
    let b = t.insert_exercise(new_ex("b", &[])).unwrap();
    assert_eq!((a.id, b.id), (1, 2));
  }

  #[test]
  fn blank_title_is_rejected() {
    let mut t = Tables::default();
    assert!(matches!(t.insert_exercise(new_ex("  ", &[])), Err(AppError::InvalidArgument(_))));
  }

  #[test]
  fn memberships_follow_selection_order() {
    let mut t = Tables::default();
    let a = t.insert_exercise(new_ex("a", &[])).unwrap();
    let b = t.insert_exercise(new_ex("b", &[])).unwrap();
    let c = t.insert_exercise(new_ex("c", &[])).unwrap();
    let test = t.insert_test(new_test("t", 5), &[c.clone(), a.clone(), b.clone()]).unwrap();
    assert_eq!(orders(&t, test.id), vec![1, 2, 3]);
    let ids: Vec<i64> = t.test_exercises(test.id).iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![c.id, a.id, b.id]);
    assert_eq!(t.test(test.id).unwrap().exercise_count, 5);
  }

  #[test]
  fn deleting_an_exercise_cascades_and_renumbers() {
    let mut t = Tables::default();
    let a = t.insert_exercise(new_ex("a", &[])).unwrap();
    let b = t.insert_exercise(new_ex("b", &[])).unwrap();
    let c = t.insert_exercise(new_ex("c", &[])).unwrap();
    let test = t.insert_test(new_test("t", 3), &[a.clone(), b.clone(), c.clone()]).unwrap();

    t.delete_exercise(b.id).unwrap();

    assert!(t.memberships.iter().all(|m| m.exercise_id != b.id));
    assert_eq!(orders(&t, test.id), vec![1, 2]);
    let ids: Vec<i64> = t.test_exercises(test.id).iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![a.id, c.id]);
  }

  #[test]
  fn deleting_a_test_drops_its_memberships_only() {
    let mut t = Tables::default();
    let a = t.insert_exercise(new_ex("a", &[])).unwrap();
    let t1 = t.insert_test(new_test("one", 1), &[a.clone()]).unwrap();
    let t2 = t.insert_test(new_test("two", 1), &[a.clone()]).unwrap();
    t.delete_test(t1.id).unwrap();
    assert!(t.memberships_of(t1.id).is_empty());
    assert_eq!(t.memberships_of(t2.id).len(), 1);
    assert!(t.exercise(a.id).is_ok());
  }

  #[test]
  fn duplicate_exercise_in_one_test_is_rejected() {
    let mut t = Tables::default();
    let a = t.insert_exercise(new_ex("a", &[])).unwrap();
    let err = t.insert_test(new_test("t", 2), &[a.clone(), a.clone()]).unwrap_err();
    assert!(matches!(err, AppError::InvalidArgument(_)));
  }

  #[test]
  fn missing_ids_are_not_found() {
    let mut t = Tables::default();
    assert!(matches!(t.delete_exercise(9), Err(AppError::NotFound { entity: "exercise", id: 9 })));
    assert!(matches!(t.test(4), Err(AppError::NotFound { entity: "test", .. })));
    assert!(matches!(t.delete_document(1), Err(AppError::NotFound { entity: "document", .. })));
  }

  #[test]
  fn stale_update_is_a_conflict() {
    let mut t = Tables::default();
    let a = t.insert_exercise(new_ex("a", &[])).unwrap();
    let stale = a.updated_at - chrono::Duration::seconds(5);
    let patch = ExercisePatch { title: Some("new".into()), expected_updated_at: Some(stale), ..Default::default() };
    assert!(matches!(t.update_exercise(a.id, patch), Err(AppError::Conflict(_))));
    assert_eq!(t.exercise(a.id).unwrap().title, "a");

    let fresh = ExercisePatch { title: Some("new".into()), expected_updated_at: Some(a.updated_at), ..Default::default() };
    assert_eq!(t.update_exercise(a.id, fresh).unwrap().title, "new");
  }

  #[test]
  fn search_combines_query_and_tags() {
    let mut t = Tables::default();
    t.insert_exercise(new_ex("Git flow", &["git"])).unwrap();
    t.insert_exercise(new_ex("Git rebase", &["advanced"])).unwrap();
    t.insert_exercise(new_ex("SQL joins", &["sql"])).unwrap();
    let hits = t.search_exercises(Some("Git"), &["git".to_string()]);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "Git flow");
    assert_eq!(t.search_exercises(None, &[]).len(), 3);
    assert!(t.search_exercises(Some("git"), &[]).is_empty());
  }

  #[test]
  fn subjects_filter_by_document_ids() {
    let mut t = Tables::default();
    let d1 = t
      .insert_document(NewDocument { name: "a".into(), content: "x".into(), subjects: vec!["s1".into(), "s2".into()] })
      .unwrap();
    t.insert_document(NewDocument { name: "b".into(), content: "y".into(), subjects: vec!["s3".into()] })
      .unwrap();
    assert_eq!(t.subjects(&[d1.id]), vec!["s1", "s2"]);
    assert_eq!(t.subjects(&[]).len(), 3);
  }

  #[tokio::test]
  async fn failed_closure_leaves_state_untouched() {
    let store = Store::in_memory();
    let res: Result<(), AppError> = store
      .transact(|t| {
        t.insert_exercise(new_ex("a", &[]))?;
        Err(AppError::EmptySelection("nothing".into()))
      })
      .await;
    assert!(res.is_err());
    assert_eq!(store.read(|t| t.exercise_count()).await, 0);
  }

  #[tokio::test]
  async fn failed_flush_discards_the_whole_transaction() {
    let dir = tempfile::tempdir().unwrap();
    let parent = dir.path().join("data");
    let store = Store::open(parent.join("db.json")).await.unwrap();
    // Swap the snapshot directory for a plain file so the flush cannot land.
    std::fs::remove_dir(&parent).unwrap();
    std::fs::write(&parent, b"").unwrap();

    let res = store
      .transact(|t| {
        let a = t.insert_exercise(new_ex("a", &[]))?;
        t.insert_test(new_test("t", 1), &[a])
      })
      .await;

    assert!(matches!(res, Err(AppError::Persistence(_))));
    store
      .read(|t| {
        assert_eq!(t.exercise_count(), 0);
        assert!(t.tests().is_empty());
        assert!(t.memberships.is_empty());
      })
      .await;
  }

  #[tokio::test]
  async fn open_creates_missing_snapshot_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("data").join("db.json");
    let store = Store::open(path.clone()).await.unwrap();
    store.transact(|t| t.insert_exercise(new_ex("a", &[]))).await.unwrap();
    assert!(path.is_file());
  }

  #[test]
  fn null_description_clears_it() {
    let mut t = Tables::default();
    let mut new = new_ex("a", &[]);
    new.description = Some("old".into());
    let a = t.insert_exercise(new).unwrap();

    let keep: ExercisePatch = serde_json::from_str(r#"{"title":"b"}"#).unwrap();
    assert_eq!(t.update_exercise(a.id, keep).unwrap().description.as_deref(), Some("old"));

    let clear: ExercisePatch = serde_json::from_str(r#"{"description":null}"#).unwrap();
    assert_eq!(t.update_exercise(a.id, clear).unwrap().description, None);
  }

  #[tokio::test]
  async fn snapshot_round_trips_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.json");
    {
      let store = Store::open(path.clone()).await.unwrap();
      store
        .transact(|t| {
          let a = t.insert_exercise(new_ex("a", &["x"]))?;
          t.insert_test(new_test("t", 1), &[a])
        })
        .await
        .unwrap();
    }
    let reopened = Store::open(path).await.unwrap();
    reopened
      .read(|t| {
        assert_eq!(t.exercise_count(), 1);
        assert_eq!(t.test_exercises(1).len(), 1);
      })
      .await;
    // Counters survive too: the next id continues after the stored one.
    let b = reopened.transact(|t| t.insert_exercise(new_ex("b", &[]))).await.unwrap();
    assert_eq!(b.id, 2);
  }

  #[tokio::test]
  async fn corrupt_snapshot_refuses_to_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.json");
    std::fs::write(&path, b"{not json").unwrap();
    assert!(matches!(Store::open(path).await, Err(AppError::Persistence(_))));
  }
}
