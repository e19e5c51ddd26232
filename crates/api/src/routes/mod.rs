//! HTTP routing

pub mod auth;
pub mod documents;
pub mod projects;

use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::state::AppState;

/// Assemble the full application router.
pub fn create_router(state: AppState) -> Router {
    let auth_state = state.auth_state();

    Router::new()
        .route("/health", get(health))
        .nest(
            "/api/auth",
            auth::router(state.clone(), auth_state.clone()),
        )
        .nest(
            "/api/projects",
            projects::router(state.clone(), auth_state.clone()),
        )
        .nest("/api/documents", documents::router(state, auth_state))
}

/// Liveness probe, unauthenticated.
async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
