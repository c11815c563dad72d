//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Errors surface as `AppError`, which renders the `{error, message}` envelope.

use std::sync::Arc;
use axum::{
  extract::State,
  http::StatusCode,
  response::IntoResponse,
  Json,
};
use tracing::{info, instrument};

use crate::domain::{Document, DocumentPatch, Exercise, ExercisePatch, NewDocument, NewExercise};
use crate::error::AppError;
use crate::logic;
use crate::protocol::*;
use crate::routes::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

type ApiResult<T> = Result<T, AppError>;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

//
// Exercises
//

#[instrument(level = "info", skip(state))]
pub async fn http_list_exercises(State(state): State<Arc<AppState>>) -> Json<Vec<Exercise>> {
  Json(logic::list_exercises(&state).await)
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_exercise(
  State(state): State<Arc<AppState>>,
  ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Exercise>> {
  Ok(Json(logic::get_exercise(&state, id).await?))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_create_exercise(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<NewExercise>,
) -> ApiResult<(StatusCode, Json<Exercise>)> {
  let ex = logic::create_exercise(&state, body).await?;
  Ok((StatusCode::CREATED, Json(ex)))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_update_exercise(
  State(state): State<Arc<AppState>>,
  ApiPath(id): ApiPath<i64>,
  ApiJson(body): ApiJson<ExercisePatch>,
) -> ApiResult<Json<Exercise>> {
  Ok(Json(logic::update_exercise(&state, id, body).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_exercise(State(state): State<Arc<AppState>>, ApiPath(id): ApiPath<i64>) -> ApiResult<StatusCode> {
  logic::delete_exercise(&state, id).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[instrument(level = "info", skip(state))]
pub async fn http_search_exercises(
  State(state): State<Arc<AppState>>,
  ApiQuery(params): ApiQuery<Vec<(String, String)>>,
) -> Json<Vec<Exercise>> {
  let q = SearchQuery::from_pairs(params);
  Json(logic::search_exercises(&state, q.query.as_deref(), &q.tags).await)
}

#[instrument(level = "info", skip(state, body), fields(%body.filename, content_len = body.content.len()))]
pub async fn http_import_exercises(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<ImportIn>,
) -> ApiResult<(StatusCode, Json<Vec<Exercise>>)> {
  let created = logic::import_exercises(&state, &body.filename, &body.content).await?;
  Ok((StatusCode::CREATED, Json(created)))
}

#[instrument(level = "info", skip(state, body), fields(%body.exercise_id, attempt_len = body.attempt.len()))]
pub async fn http_compare(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<CompareIn>,
) -> ApiResult<Json<CompareOut>> {
  Ok(Json(logic::compare_exercise(&state, body.exercise_id, &body.attempt).await?))
}

//
// Tests
//

#[instrument(level = "info", skip(state))]
pub async fn http_list_tests(State(state): State<Arc<AppState>>) -> Json<Vec<TestOut>> {
  Json(logic::list_tests(&state).await)
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_test(State(state): State<Arc<AppState>>, ApiPath(id): ApiPath<i64>) -> ApiResult<Json<TestOut>> {
  Ok(Json(logic::get_test(&state, id).await?))
}

#[instrument(level = "info", skip(state, body), fields(count = body.exercise_count, tags = ?body.tags))]
pub async fn http_create_test(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<CreateTestIn>,
) -> ApiResult<(StatusCode, Json<TestOut>)> {
  let out = logic::create_test(&state, body).await?;
  info!(target: "tests", id = out.id, exercises = out.exercises.len(), "HTTP test created");
  Ok((StatusCode::CREATED, Json(out)))
}

#[instrument(level = "info", skip(state, body), fields(count = body.exercise_count, tags = ?body.tags))]
pub async fn http_generate_test(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<CreateTestIn>,
) -> ApiResult<Json<PreviewOut>> {
  Ok(Json(logic::preview_test(&state, body).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_test(State(state): State<Arc<AppState>>, ApiPath(id): ApiPath<i64>) -> ApiResult<StatusCode> {
  logic::delete_test(&state, id).await?;
  Ok(StatusCode::NO_CONTENT)
}

//
// Documents
//

#[instrument(level = "info", skip(state))]
pub async fn http_list_documents(State(state): State<Arc<AppState>>) -> Json<Vec<Document>> {
  Json(logic::list_documents(&state).await)
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_document(State(state): State<Arc<AppState>>, ApiPath(id): ApiPath<i64>) -> ApiResult<Json<Document>> {
  Ok(Json(logic::get_document(&state, id).await?))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_create_document(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<NewDocument>,
) -> ApiResult<(StatusCode, Json<Document>)> {
  let doc = logic::create_document(&state, body).await?;
  Ok((StatusCode::CREATED, Json(doc)))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_update_document(
  State(state): State<Arc<AppState>>,
  ApiPath(id): ApiPath<i64>,
  ApiJson(body): ApiJson<DocumentPatch>,
) -> ApiResult<Json<Document>> {
  Ok(Json(logic::update_document(&state, id, body).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_document(State(state): State<Arc<AppState>>, ApiPath(id): ApiPath<i64>) -> ApiResult<StatusCode> {
  logic::delete_document(&state, id).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[instrument(level = "info", skip(state, body), fields(count = body.count))]
pub async fn http_random_subjects(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<RandomSubjectsIn>,
) -> ApiResult<Json<Vec<String>>> {
  Ok(Json(logic::draw_random_subjects(&state, body).await?))
}
