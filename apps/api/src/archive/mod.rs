// Contract archive lifecycle: cascading soft delete, restore, role-scoped
// listing, analytics, and permanent purge of expired archives.
// All table access goes through the ArchiveStore trait; handlers and the
// manager never touch the pool directly.

pub mod analytics;
pub mod handlers;
pub mod manager;
pub mod store;

// Re-export the public API consumed by main and the error mapper.
pub use manager::{ArchiveConfig, ArchiveManager};
pub use store::PgArchiveStore;
