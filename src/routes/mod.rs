use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{StatusCode, Uri},
    routing::{any, get},
};
use tower_http::services::ServeDir;

use crate::{response::ErrorBody, state::AppState};

pub mod demo;
pub mod doc;
pub mod health;
pub mod params;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new().route("/demo/{endpoint}", any(demo::handle))
}

/// Full application: API, health, docs and the uploads directory.
pub fn create_app(state: AppState) -> Router {
    let uploads = ServeDir::new(state.uploads.root());
    let uploads_prefix = state.config.uploads_url_prefix.clone();
    let max_body_bytes = state.config.max_body_bytes;

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", create_api_router())
        .nest_service(&uploads_prefix, uploads)
        .merge(doc::scalar_docs())
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

async fn not_found(uri: Uri) -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody::new(format!("No route for {}", uri.path()))),
    )
}
