use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::db;
use crate::errors::AppError;
use crate::state::AppState;

/// GET /health
/// Verifies database connectivity and returns the service version.
pub async fn health_handler(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    db::health_check(&state.db).await?;

    Ok(Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "spazio-api"
    })))
}
