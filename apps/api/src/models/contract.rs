use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A contract row joined with the customer and location display fields the
/// partner UI renders. Service fields live on the contract row itself.
///
/// The four archive fields (`is_archived`, `archived_at`,
/// `archived_by_user_id`, `archive_reason`) are jointly set or jointly
/// null; the schema CHECK rejects anything in between.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ContractSummary {
    pub id: i64,
    pub partner_uuid: Uuid,
    pub customer_id: i64,
    pub location_id: Option<i64>,
    pub service_name: String,
    pub service_type: String,
    pub service_cost: f64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_archived: bool,
    pub archived_at: Option<DateTime<Utc>>,
    pub archived_by_user_id: Option<Uuid>,
    pub archive_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub customer_name: String,
    pub customer_email: String,
    pub location_name: Option<String>,
}

/// Restore projection: the contract as it looks after the archive tuple is
/// cleared, plus the reason the restore discarded.
#[derive(Debug, Clone, FromRow)]
pub struct RestoredContract {
    #[sqlx(flatten)]
    pub contract: ContractSummary,
    pub discarded_reason: Option<String>,
}

/// The narrow projection archive analytics reduces over.
#[derive(Debug, Clone, FromRow)]
pub struct ArchivedContractStat {
    pub archived_at: Option<DateTime<Utc>>,
    pub service_cost: f64,
    pub service_type: String,
}
