use sqlx::PgPool;

use crate::archive::ArchiveManager;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Archive lifecycle manager over the shared pool.
    pub archive: ArchiveManager,
}
