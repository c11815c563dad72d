//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Exercise CRUD, search, plain-text import and one-off comparison
//!   - Test generation (persisted or preview) and retrieval in practice order
//!   - Document CRUD and random subject draws
//!   - Building practice sessions for the WebSocket loop

use chrono::Utc;
use tracing::{debug, info, instrument};

use crate::domain::{Document, DocumentPatch, Exercise, ExercisePatch, NewDocument, NewExercise, NewTest};
use crate::error::AppError;
use crate::generator::{random_subjects, requested_count, select_exercises, Selection};
use crate::import::parse_exercises;
use crate::practice::PracticeSession;
use crate::protocol::{to_out, CompareOut, CreateTestIn, PreviewOut, RandomSubjectsIn, TestOut};
use crate::similarity;
use crate::state::AppState;
use crate::util::trunc_for_log;

//
// Exercises
//

pub async fn list_exercises(state: &AppState) -> Vec<Exercise> {
  state.store.read(|t| t.exercises()).await
}

pub async fn get_exercise(state: &AppState, id: i64) -> Result<Exercise, AppError> {
  state.store.read(|t| t.exercise(id).cloned()).await
}

#[instrument(level = "info", skip(state, new), fields(title = %trunc_for_log(&new.title, 40)))]
pub async fn create_exercise(state: &AppState, new: NewExercise) -> Result<Exercise, AppError> {
  let ex = state.store.transact(|t| t.insert_exercise(new)).await?;
  info!(target: "recall_backend", id = ex.id, "Exercise created");
  Ok(ex)
}

#[instrument(level = "info", skip(state, patch))]
pub async fn update_exercise(state: &AppState, id: i64, patch: ExercisePatch) -> Result<Exercise, AppError> {
  let ex = state.store.transact(|t| t.update_exercise(id, patch)).await?;
  info!(target: "recall_backend", id, "Exercise updated");
  Ok(ex)
}

#[instrument(level = "info", skip(state))]
pub async fn delete_exercise(state: &AppState, id: i64) -> Result<(), AppError> {
  state.store.transact(|t| t.delete_exercise(id)).await?;
  info!(target: "recall_backend", id, "Exercise deleted with its memberships");
  Ok(())
}

pub async fn search_exercises(state: &AppState, query: Option<&str>, tags: &[String]) -> Vec<Exercise> {
  let hits = state.store.read(|t| t.search_exercises(query, tags)).await;
  debug!(target: "recall_backend", query = ?query, ?tags, hits = hits.len(), "Exercise search");
  hits
}

/// Parse an uploaded text file and create every exercise in it, all or none.
#[instrument(level = "info", skip(state, content), fields(content_len = content.len()))]
pub async fn import_exercises(state: &AppState, filename: &str, content: &str) -> Result<Vec<Exercise>, AppError> {
  let parsed = parse_exercises(filename, content)?;
  let created = state
    .store
    .transact(|t| parsed.into_iter().map(|new| t.insert_exercise(new)).collect::<Result<Vec<_>, _>>())
    .await?;
  info!(target: "recall_backend", %filename, count = created.len(), "Exercises imported");
  Ok(created)
}

/// Score a free attempt against one stored exercise, outside any session.
#[instrument(level = "info", skip(state, attempt), fields(attempt_len = attempt.len()))]
pub async fn compare_exercise(state: &AppState, exercise_id: i64, attempt: &str) -> Result<CompareOut, AppError> {
  let reference = state.store.read(|t| t.exercise(exercise_id).map(|e| e.content.clone())).await?;
  let out = CompareOut::from(similarity::compare(attempt, &reference));
  info!(target: "practice", exercise_id, score = out.result.score, passed = out.passed, "Attempt compared");
  Ok(out)
}

//
// Tests
//

pub async fn list_tests(state: &AppState) -> Vec<TestOut> {
  state
    .store
    .read(|t| t.tests().iter().map(|test| to_out(test, t.test_exercises(test.id))).collect::<Vec<_>>())
    .await
}

pub async fn get_test(state: &AppState, id: i64) -> Result<TestOut, AppError> {
  state
    .store
    .read(|t| t.test(id).map(|test| to_out(test, t.test_exercises(id))))
    .await
}

/// Select exercises and persist the test with its ordered memberships in one transaction.
#[instrument(level = "info", skip(state, req), fields(name = %trunc_for_log(&req.name, 40), count = req.exercise_count))]
pub async fn create_test(state: &AppState, req: CreateTestIn) -> Result<TestOut, AppError> {
  let count = requested_count(req.exercise_count)?;
  let selection = Selection::from_request(req.exercise_ids.as_deref(), &req.tags);
  let new = NewTest {
    name: req.name,
    description: req.description,
    exercise_count: req.exercise_count,
    tags: req.tags,
  };

  let (test, exercises) = state
    .store
    .transact(|t| {
      let picked = select_exercises(&t.exercises(), &selection, count, &mut rand::thread_rng())?;
      let test = t.insert_test(new, &picked)?;
      Ok((test, picked))
    })
    .await?;

  info!(
    target: "tests",
    id = test.id,
    requested = count,
    selected = exercises.len(),
    mode = selection.mode(),
    "Test created"
  );
  Ok(to_out(&test, exercises))
}

/// Same selection as [`create_test`], nothing written.
#[instrument(level = "info", skip(state, req), fields(count = req.exercise_count))]
pub async fn preview_test(state: &AppState, req: CreateTestIn) -> Result<PreviewOut, AppError> {
  let exercises = select_for(state, &req).await?;
  info!(target: "tests", selected = exercises.len(), "Test preview generated");
  Ok(PreviewOut {
    id: 0,
    name: req.name,
    description: req.description,
    created_at: Utc::now(),
    exercises,
  })
}

async fn select_for(state: &AppState, req: &CreateTestIn) -> Result<Vec<Exercise>, AppError> {
  let count = requested_count(req.exercise_count)?;
  let selection = Selection::from_request(req.exercise_ids.as_deref(), &req.tags);
  state
    .store
    .read(|t| select_exercises(&t.exercises(), &selection, count, &mut rand::thread_rng()))
    .await
}

#[instrument(level = "info", skip(state))]
pub async fn delete_test(state: &AppState, id: i64) -> Result<(), AppError> {
  state.store.transact(|t| t.delete_test(id)).await?;
  info!(target: "tests", id, "Test deleted");
  Ok(())
}

//
// Documents
//

pub async fn list_documents(state: &AppState) -> Vec<Document> {
  state.store.read(|t| t.documents()).await
}

pub async fn get_document(state: &AppState, id: i64) -> Result<Document, AppError> {
  state.store.read(|t| t.document(id).cloned()).await
}

#[instrument(level = "info", skip(state, new), fields(name = %trunc_for_log(&new.name, 40)))]
pub async fn create_document(state: &AppState, new: NewDocument) -> Result<Document, AppError> {
  let doc = state.store.transact(|t| t.insert_document(new)).await?;
  info!(target: "recall_backend", id = doc.id, subjects = doc.subjects.len(), "Document created");
  Ok(doc)
}

#[instrument(level = "info", skip(state, patch))]
pub async fn update_document(state: &AppState, id: i64, patch: DocumentPatch) -> Result<Document, AppError> {
  state.store.transact(|t| t.update_document(id, patch)).await
}

#[instrument(level = "info", skip(state))]
pub async fn delete_document(state: &AppState, id: i64) -> Result<(), AppError> {
  state.store.transact(|t| t.delete_document(id)).await
}

#[instrument(level = "info", skip(state, req), fields(count = req.count))]
pub async fn draw_random_subjects(state: &AppState, req: RandomSubjectsIn) -> Result<Vec<String>, AppError> {
  let ids = req.filter_ids.unwrap_or_default();
  let pool = state.store.read(|t| t.subjects(&ids)).await;
  let drawn = random_subjects(pool, req.count, &mut rand::thread_rng())?;
  debug!(target: "recall_backend", drawn = drawn.len(), "Random subjects drawn");
  Ok(drawn)
}

//
// Practice
//

/// Session over a stored test, exercises in membership order. Returns the session and the test name.
#[instrument(level = "info", skip(state))]
pub async fn start_practice(state: &AppState, test_id: i64) -> Result<(PracticeSession, String), AppError> {
  let (name, exercises) = state
    .store
    .read(|t| t.test(test_id).map(|test| (test.name.clone(), t.test_exercises(test_id))))
    .await?;
  let session = PracticeSession::start(exercises)?;
  info!(target: "practice", test_id, total = session.total(), "Practice started");
  Ok((session, name))
}

/// Session over an unsaved selection.
#[instrument(level = "info", skip(state, req), fields(count = req.exercise_count))]
pub async fn start_preview_practice(state: &AppState, req: CreateTestIn) -> Result<(PracticeSession, String), AppError> {
  let exercises = select_for(state, &req).await?;
  let session = PracticeSession::start(exercises)?;
  info!(target: "practice", total = session.total(), "Preview practice started");
  let name = if req.name.trim().is_empty() { "Practice".to_string() } else { req.name };
  Ok((session, name))
}
