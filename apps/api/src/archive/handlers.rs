use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::archive::analytics::ArchiveAnalytics;
use crate::archive::manager::{ArchiveOutcome, PurgeOutcome, RestoreOutcome};
use crate::errors::AppError;
use crate::models::contract::ContractSummary;
use crate::models::role::UserRole;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ArchiveRequest {
    pub user_id: Uuid,
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct RestoreRequest {
    pub user_id: Uuid,
}

#[derive(Deserialize)]
pub struct ArchivedListQuery {
    pub role: UserRole,
    pub partner_uuid: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct AnalyticsQuery {
    pub partner_uuid: Uuid,
}

#[derive(Deserialize)]
pub struct PurgeRequest {
    pub days_old: Option<u32>,
    pub partner_uuid: Option<Uuid>,
}

/// POST /api/v1/contracts/:id/archive
pub async fn handle_archive_contract(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<ArchiveRequest>,
) -> Result<Json<ArchiveOutcome>, AppError> {
    let outcome = state
        .archive
        .archive_contract(id, req.user_id, req.reason.as_deref())
        .await?;
    Ok(Json(outcome))
}

/// POST /api/v1/contracts/:id/restore
pub async fn handle_restore_contract(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<RestoreRequest>,
) -> Result<Json<RestoreOutcome>, AppError> {
    let outcome = state.archive.restore_contract(id, req.user_id).await?;
    Ok(Json(outcome))
}

/// GET /api/v1/archive/contracts
pub async fn handle_archived_contracts(
    State(state): State<AppState>,
    Query(params): Query<ArchivedListQuery>,
) -> Result<Json<Vec<ContractSummary>>, AppError> {
    let contracts = state
        .archive
        .archived_contracts(params.partner_uuid, params.role, params.user_id)
        .await?;
    Ok(Json(contracts))
}

/// GET /api/v1/archive/analytics
pub async fn handle_archive_analytics(
    State(state): State<AppState>,
    Query(params): Query<AnalyticsQuery>,
) -> Result<Json<ArchiveAnalytics>, AppError> {
    let analytics = state.archive.archive_analytics(params.partner_uuid).await?;
    Ok(Json(analytics))
}

/// POST /api/v1/archive/purge
pub async fn handle_purge_old_archived(
    State(state): State<AppState>,
    Json(req): Json<PurgeRequest>,
) -> Result<Json<PurgeOutcome>, AppError> {
    let outcome = state
        .archive
        .purge_old_archived(req.days_old, req.partner_uuid)
        .await?;
    Ok(Json(outcome))
}
