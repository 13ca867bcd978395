pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use crate::session::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/sessions", post(handlers::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(handlers::handle_get_session).delete(handlers::handle_delete_session),
        )
        .route(
            "/api/v1/sessions/:id/files",
            delete(handlers::handle_reset_files),
        )
        // POST takes a role segment, DELETE a file index.
        .route(
            "/api/v1/sessions/:id/files/:item",
            post(handlers::handle_upload).delete(handlers::handle_remove_file),
        )
        .route("/api/v1/sessions/:id/prompt", get(handlers::handle_get_prompt))
        .route(
            "/api/v1/sessions/:id/report",
            get(handlers::handle_get_report).post(handlers::handle_generate_report),
        )
        .route(
            "/api/v1/sessions/:id/report/cancel",
            post(handlers::handle_cancel_report),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}
