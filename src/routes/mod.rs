//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod extract;
pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket practice sessions at `/ws`
/// - JSON API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    // Static files with SPA fallback
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // HTTP API
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/exercises", get(http::http_list_exercises).post(http::http_create_exercise))
        .route("/api/v1/exercises/search", get(http::http_search_exercises))
        .route("/api/v1/exercises/import", post(http::http_import_exercises))
        .route(
            "/api/v1/exercises/:id",
            get(http::http_get_exercise)
                .put(http::http_update_exercise)
                .delete(http::http_delete_exercise),
        )
        .route("/api/v1/compare", post(http::http_compare))
        .route("/api/v1/tests", get(http::http_list_tests).post(http::http_create_test))
        .route("/api/v1/tests/generate", post(http::http_generate_test))
        .route("/api/v1/tests/:id", get(http::http_get_test).delete(http::http_delete_test))
        .route("/api/v1/documents", get(http::http_list_documents).post(http::http_create_document))
        .route("/api/v1/documents/random-subjects", post(http::http_random_subjects))
        .route(
            "/api/v1/documents/:id",
            get(http::http_get_document)
                .put(http::http_update_document)
                .delete(http::http_delete_document),
        )
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}
