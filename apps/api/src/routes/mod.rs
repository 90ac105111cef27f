pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::archive::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Archive API
        .route(
            "/api/v1/contracts/:id/archive",
            post(handlers::handle_archive_contract),
        )
        .route(
            "/api/v1/contracts/:id/restore",
            post(handlers::handle_restore_contract),
        )
        .route(
            "/api/v1/archive/contracts",
            get(handlers::handle_archived_contracts),
        )
        .route(
            "/api/v1/archive/analytics",
            get(handlers::handle_archive_analytics),
        )
        .route(
            "/api/v1/archive/purge",
            post(handlers::handle_purge_old_archived),
        )
        .with_state(state)
}
