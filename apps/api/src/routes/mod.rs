pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::screenplay::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Sessions
        .route("/api/v1/sessions", post(handlers::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(handlers::handle_get_session).delete(handlers::handle_delete_session),
        )
        // Generation
        .route(
            "/api/v1/sessions/:id/screenplay",
            post(handlers::handle_generate_screenplay),
        )
        .route(
            "/api/v1/sessions/:id/cover-image",
            get(handlers::handle_get_cover).post(handlers::handle_regenerate_cover),
        )
        .route(
            "/api/v1/sessions/:id/cover-images/:index",
            get(handlers::handle_get_retained_cover),
        )
        // Download
        .route(
            "/api/v1/sessions/:id/document",
            get(handlers::handle_download_document),
        )
        .with_state(state)
}
