//! Data-store surface for the archive lifecycle.
//!
//! Every operation the manager needs is a method on the `ArchiveStore`
//! trait, implemented for Postgres by `PgArchiveStore` over an injected
//! pool. Nothing in this crate reaches for an ambient client; tests swap
//! in an in-memory double.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::contract::{ArchivedContractStat, ContractSummary, RestoredContract};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// The two dependent tables an archive or restore cascades into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DependentKind {
    Bookings,
    PackageReservations,
}

impl DependentKind {
    pub const ALL: [DependentKind; 2] =
        [DependentKind::Bookings, DependentKind::PackageReservations];

    fn table(self) -> &'static str {
        match self {
            DependentKind::Bookings => "bookings",
            DependentKind::PackageReservations => "package_reservations",
        }
    }
}

impl std::fmt::Display for DependentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table())
    }
}

/// Listing scope resolved from the caller's role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveScope {
    Customer { customer_id: i64 },
    Partner { partner_uuid: Uuid },
    All,
}

/// Conditional updates, scoped reads, and id-list deletes over the
/// contract aggregate.
///
/// The archive/restore methods carry their precondition inside the same
/// atomic statement that writes the new values: `None` means no row
/// matched, which the manager maps to the appropriate precondition error.
#[async_trait]
pub trait ArchiveStore: Send + Sync {
    /// Sets the archive tuple on a contract gated on `is_archived = FALSE`,
    /// returning the updated row with its display fields, or `None` if the
    /// contract is missing or already archived.
    async fn archive_contract(
        &self,
        contract_id: i64,
        user_id: Uuid,
        reason: &str,
    ) -> Result<Option<ContractSummary>, StoreError>;

    /// Clears the archive tuple gated on `is_archived = TRUE`. Also returns
    /// the reason the update discarded, for audit logging.
    async fn restore_contract(
        &self,
        contract_id: i64,
    ) -> Result<Option<RestoredContract>, StoreError>;

    /// Sets the archive tuple on all still-active dependents of a contract.
    /// Idempotent: rows already archived are not matched, so a retry only
    /// touches what the previous attempt missed.
    async fn archive_dependents(
        &self,
        kind: DependentKind,
        contract_id: i64,
        user_id: Uuid,
        reason: &str,
    ) -> Result<u64, StoreError>;

    /// Clears the archive tuple on all archived dependents of a contract.
    async fn restore_dependents(
        &self,
        kind: DependentKind,
        contract_id: i64,
    ) -> Result<u64, StoreError>;

    /// Resolves the customer record belonging to an authenticated user.
    async fn customer_id_for_user(&self, user_id: Uuid) -> Result<Option<i64>, StoreError>;

    /// Archived contracts within a scope, most recently archived first.
    async fn list_archived(
        &self,
        scope: &ArchiveScope,
    ) -> Result<Vec<ContractSummary>, StoreError>;

    /// The analytics projection of a partner's archived contracts.
    async fn archived_stats(
        &self,
        partner_uuid: Uuid,
    ) -> Result<Vec<ArchivedContractStat>, StoreError>;

    /// Ids of archived contracts whose `archived_at` is older than `cutoff`.
    async fn purgeable_contract_ids(
        &self,
        cutoff: DateTime<Utc>,
        partner_uuid: Option<Uuid>,
    ) -> Result<Vec<i64>, StoreError>;

    async fn delete_package_reservations(&self, contract_ids: &[i64]) -> Result<u64, StoreError>;

    async fn delete_bookings(&self, contract_ids: &[i64]) -> Result<u64, StoreError>;

    async fn delete_contracts(&self, contract_ids: &[i64]) -> Result<u64, StoreError>;
}

const ARCHIVED_LIST_SELECT: &str = r#"
SELECT c.*,
       cu.first_name || ' ' || cu.last_name AS customer_name,
       cu.email AS customer_email,
       l.name AS location_name
FROM contracts c
JOIN customers cu ON cu.id = c.customer_id
LEFT JOIN locations l ON l.id = c.location_id
WHERE c.is_archived = TRUE
"#;

/// Postgres implementation of the archive store.
pub struct PgArchiveStore {
    pool: PgPool,
}

impl PgArchiveStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ArchiveStore for PgArchiveStore {
    async fn archive_contract(
        &self,
        contract_id: i64,
        user_id: Uuid,
        reason: &str,
    ) -> Result<Option<ContractSummary>, StoreError> {
        // The WHERE filter and the tuple write are one statement: under two
        // concurrent archive attempts, exactly one sees a matching row.
        let row = sqlx::query_as::<_, ContractSummary>(
            r#"
            WITH updated AS (
                UPDATE contracts
                SET is_archived = TRUE,
                    archived_at = NOW(),
                    archived_by_user_id = $2,
                    archive_reason = $3,
                    updated_at = NOW()
                WHERE id = $1 AND is_archived = FALSE
                RETURNING *
            )
            SELECT u.*,
                   cu.first_name || ' ' || cu.last_name AS customer_name,
                   cu.email AS customer_email,
                   l.name AS location_name
            FROM updated u
            JOIN customers cu ON cu.id = u.customer_id
            LEFT JOIN locations l ON l.id = u.location_id
            "#,
        )
        .bind(contract_id)
        .bind(user_id)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn restore_contract(
        &self,
        contract_id: i64,
    ) -> Result<Option<RestoredContract>, StoreError> {
        // `prior` locks the row and captures the reason before the update
        // clears it; a concurrent restore re-evaluates the filter after the
        // lock wait and matches nothing.
        let row = sqlx::query_as::<_, RestoredContract>(
            r#"
            WITH prior AS (
                SELECT id, archive_reason
                FROM contracts
                WHERE id = $1 AND is_archived = TRUE
                FOR UPDATE
            ),
            updated AS (
                UPDATE contracts c
                SET is_archived = FALSE,
                    archived_at = NULL,
                    archived_by_user_id = NULL,
                    archive_reason = NULL,
                    updated_at = NOW()
                FROM prior
                WHERE c.id = prior.id
                RETURNING c.*
            )
            SELECT u.*,
                   cu.first_name || ' ' || cu.last_name AS customer_name,
                   cu.email AS customer_email,
                   l.name AS location_name,
                   prior.archive_reason AS discarded_reason
            FROM updated u
            JOIN prior ON prior.id = u.id
            JOIN customers cu ON cu.id = u.customer_id
            LEFT JOIN locations l ON l.id = u.location_id
            "#,
        )
        .bind(contract_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn archive_dependents(
        &self,
        kind: DependentKind,
        contract_id: i64,
        user_id: Uuid,
        reason: &str,
    ) -> Result<u64, StoreError> {
        let sql = format!(
            r#"
            UPDATE {}
            SET is_archived = TRUE,
                archived_at = NOW(),
                archived_by_user_id = $2,
                archive_reason = $3,
                updated_at = NOW()
            WHERE contract_id = $1 AND is_archived = FALSE
            "#,
            kind.table()
        );

        let result = sqlx::query(&sql)
            .bind(contract_id)
            .bind(user_id)
            .bind(reason)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn restore_dependents(
        &self,
        kind: DependentKind,
        contract_id: i64,
    ) -> Result<u64, StoreError> {
        let sql = format!(
            r#"
            UPDATE {}
            SET is_archived = FALSE,
                archived_at = NULL,
                archived_by_user_id = NULL,
                archive_reason = NULL,
                updated_at = NOW()
            WHERE contract_id = $1 AND is_archived = TRUE
            "#,
            kind.table()
        );

        let result = sqlx::query(&sql)
            .bind(contract_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn customer_id_for_user(&self, user_id: Uuid) -> Result<Option<i64>, StoreError> {
        let id: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM customers WHERE user_id = $1 ORDER BY id LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(id)
    }

    async fn list_archived(
        &self,
        scope: &ArchiveScope,
    ) -> Result<Vec<ContractSummary>, StoreError> {
        let rows = match scope {
            ArchiveScope::Customer { customer_id } => {
                let sql = format!(
                    "{ARCHIVED_LIST_SELECT} AND c.customer_id = $1 ORDER BY c.archived_at DESC"
                );
                sqlx::query_as(&sql)
                    .bind(*customer_id)
                    .fetch_all(&self.pool)
                    .await?
            }
            ArchiveScope::Partner { partner_uuid } => {
                let sql = format!(
                    "{ARCHIVED_LIST_SELECT} AND c.partner_uuid = $1 ORDER BY c.archived_at DESC"
                );
                sqlx::query_as(&sql)
                    .bind(*partner_uuid)
                    .fetch_all(&self.pool)
                    .await?
            }
            ArchiveScope::All => {
                let sql = format!("{ARCHIVED_LIST_SELECT} ORDER BY c.archived_at DESC");
                sqlx::query_as(&sql).fetch_all(&self.pool).await?
            }
        };

        Ok(rows)
    }

    async fn archived_stats(
        &self,
        partner_uuid: Uuid,
    ) -> Result<Vec<ArchivedContractStat>, StoreError> {
        let rows = sqlx::query_as::<_, ArchivedContractStat>(
            r#"
            SELECT archived_at, service_cost, service_type
            FROM contracts
            WHERE partner_uuid = $1 AND is_archived = TRUE
            "#,
        )
        .bind(partner_uuid)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn purgeable_contract_ids(
        &self,
        cutoff: DateTime<Utc>,
        partner_uuid: Option<Uuid>,
    ) -> Result<Vec<i64>, StoreError> {
        let ids = match partner_uuid {
            Some(partner_uuid) => {
                sqlx::query_scalar(
                    r#"
                    SELECT id FROM contracts
                    WHERE is_archived = TRUE AND archived_at < $1 AND partner_uuid = $2
                    ORDER BY id
                    "#,
                )
                .bind(cutoff)
                .bind(partner_uuid)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_scalar(
                    r#"
                    SELECT id FROM contracts
                    WHERE is_archived = TRUE AND archived_at < $1
                    ORDER BY id
                    "#,
                )
                .bind(cutoff)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(ids)
    }

    async fn delete_package_reservations(&self, contract_ids: &[i64]) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM package_reservations WHERE contract_id = ANY($1)")
            .bind(contract_ids)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_bookings(&self, contract_ids: &[i64]) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM bookings WHERE contract_id = ANY($1)")
            .bind(contract_ids)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_contracts(&self, contract_ids: &[i64]) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM contracts WHERE id = ANY($1)")
            .bind(contract_ids)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
