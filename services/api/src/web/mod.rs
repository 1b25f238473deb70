pub mod protocol;
pub mod rest;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

pub use rest::ApiDoc;
pub use state::AppState;

/// Builds the API router. CORS and Swagger UI are layered on by the binary.
pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/generate", post(rest::generate_handler))
        .route("/session", get(rest::session_handler))
        .route("/session/plan", put(rest::set_plan_handler))
        .route("/usage", get(rest::usage_handler))
        .route("/presets", get(rest::presets_handler))
        .route("/history", get(rest::list_history_handler))
        .route("/history/unsaved", delete(rest::clear_unsaved_handler))
        .route("/history/export.txt", get(rest::export_text_handler))
        .route("/history/export.json", get(rest::export_json_handler))
        .route("/history/{id}", delete(rest::delete_history_handler))
        .route(
            "/history/{id}/toggle-saved",
            post(rest::toggle_saved_handler),
        )
        .layer(DefaultBodyLimit::max(64 * 1024))
        .with_state(app_state)
}
