//! The archive lifecycle manager.
//!
//! Owns the soft-delete/restore state machine for the contract aggregate:
//! a contract plus its dependent bookings and package reservations. Every
//! operation is a short, stateless request-response sequence against the
//! injected store; the manager itself holds no mutable state.
//!
//! The contract-level update is the authoritative step of an archive or
//! restore; the dependent cascade that follows is best-effort. Cascade
//! statements are idempotent, so they are retried a bounded number of
//! times, and a cascade that keeps failing becomes a warning in the
//! operation outcome rather than an overall failure.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::archive::analytics::{summarize, ArchiveAnalytics};
use crate::archive::store::{ArchiveScope, ArchiveStore, DependentKind, StoreError};
use crate::models::contract::ContractSummary;
use crate::models::role::UserRole;

/// Reason recorded when the caller does not supply one.
pub const DEFAULT_ARCHIVE_REASON: &str = "Deleted by user";

#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The conditional update matched no row: the contract does not exist
    /// or is already archived. A single statement cannot tell the two
    /// apart without a second, racy read, so the cases stay fused.
    #[error("contract {0} not found or already archived")]
    NotFoundOrAlreadyArchived(i64),

    #[error("contract {0} not found or not archived")]
    NotFoundOrNotArchived(i64),

    #[error("role '{role}' requires a {param}")]
    MissingScope { role: UserRole, param: &'static str },

    #[error("data store error: {0}")]
    Store(#[from] StoreError),
}

/// Tuning knobs for the archive lifecycle, loaded from the environment by
/// `Config`.
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    /// Attempts per dependent-cascade statement before a warning is surfaced.
    pub cascade_attempts: u32,
    /// Base delay between cascade attempts; doubles on every retry.
    pub cascade_backoff: Duration,
    /// Contracts deleted per purge round.
    pub purge_chunk_size: usize,
    /// `days_old` used by the purge when the caller passes none.
    pub default_retention_days: u32,
    /// Log the archive reason a restore is about to discard.
    pub log_discarded_reason: bool,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            cascade_attempts: 3,
            cascade_backoff: Duration::from_millis(100),
            purge_chunk_size: 500,
            default_retention_days: 365,
            log_discarded_reason: true,
        }
    }
}

/// A dependent-table cascade that kept failing after retries. Carried in
/// the operation outcome so callers see it; never escalated to an error.
#[derive(Debug, Clone, Serialize)]
pub struct CascadeWarning {
    pub target: DependentKind,
    pub detail: String,
}

#[derive(Debug, Serialize)]
pub struct ArchiveOutcome {
    pub contract: ContractSummary,
    pub warnings: Vec<CascadeWarning>,
}

#[derive(Debug, Serialize)]
pub struct RestoreOutcome {
    pub contract: ContractSummary,
    pub warnings: Vec<CascadeWarning>,
}

#[derive(Debug, Serialize)]
pub struct PurgeOutcome {
    pub deleted_count: u64,
}

enum CascadeAction<'a> {
    Archive { user_id: Uuid, reason: &'a str },
    Restore,
}

/// Archive/restore state machine over the injected store.
///
/// Held in `AppState` and cloned into handlers; the store sits behind an
/// `Arc<dyn ArchiveStore>` so tests can swap in a recording double.
#[derive(Clone)]
pub struct ArchiveManager {
    store: Arc<dyn ArchiveStore>,
    config: ArchiveConfig,
}

impl ArchiveManager {
    pub fn new(store: Arc<dyn ArchiveStore>, config: ArchiveConfig) -> Self {
        Self { store, config }
    }

    /// Archives a contract and cascades the archive tuple to its bookings
    /// and package reservations.
    ///
    /// The contract update is gated on `is_archived = FALSE` inside the
    /// statement itself: archiving an already-archived contract is
    /// rejected, not a no-op, so duplicate caller actions surface instead
    /// of silently succeeding. No cascade runs on rejection.
    pub async fn archive_contract(
        &self,
        contract_id: i64,
        user_id: Uuid,
        reason: Option<&str>,
    ) -> Result<ArchiveOutcome, ArchiveError> {
        // A blank reason is treated the same as an absent one.
        let reason = reason
            .filter(|r| !r.trim().is_empty())
            .unwrap_or(DEFAULT_ARCHIVE_REASON);

        let contract = self
            .store
            .archive_contract(contract_id, user_id, reason)
            .await?
            .ok_or(ArchiveError::NotFoundOrAlreadyArchived(contract_id))?;

        info!("Archived contract {contract_id} (user {user_id}): {reason}");

        let cascade_reason = format!("Contract archived: {reason}");
        let mut warnings = Vec::new();
        for kind in DependentKind::ALL {
            let action = CascadeAction::Archive {
                user_id,
                reason: &cascade_reason,
            };
            if let Some(warning) = self.cascade(kind, action, contract_id).await {
                warnings.push(warning);
            }
        }

        Ok(ArchiveOutcome { contract, warnings })
    }

    /// Restores an archived contract and cascades the clearing to its
    /// dependents. The stored archive reason is discarded by the restore;
    /// it is logged first when the config asks for it.
    pub async fn restore_contract(
        &self,
        contract_id: i64,
        user_id: Uuid,
    ) -> Result<RestoreOutcome, ArchiveError> {
        let restored = self
            .store
            .restore_contract(contract_id)
            .await?
            .ok_or(ArchiveError::NotFoundOrNotArchived(contract_id))?;

        if self.config.log_discarded_reason {
            if let Some(reason) = &restored.discarded_reason {
                info!("Restore of contract {contract_id} discards archive reason: {reason}");
            }
        }
        info!("Restored contract {contract_id} (user {user_id})");

        let mut warnings = Vec::new();
        for kind in DependentKind::ALL {
            if let Some(warning) = self.cascade(kind, CascadeAction::Restore, contract_id).await {
                warnings.push(warning);
            }
        }

        Ok(RestoreOutcome {
            contract: restored.contract,
            warnings,
        })
    }

    /// Archived contracts visible to the caller, most recently archived
    /// first.
    pub async fn archived_contracts(
        &self,
        partner_uuid: Option<Uuid>,
        role: UserRole,
        user_id: Option<Uuid>,
    ) -> Result<Vec<ContractSummary>, ArchiveError> {
        let scope = match role {
            UserRole::User => {
                let user_id = user_id.ok_or(ArchiveError::MissingScope {
                    role,
                    param: "user_id",
                })?;
                match self.store.customer_id_for_user(user_id).await? {
                    Some(customer_id) => ArchiveScope::Customer { customer_id },
                    // No customer record: the caller has no archived contracts.
                    None => return Ok(Vec::new()),
                }
            }
            UserRole::Admin => {
                let partner_uuid = partner_uuid.ok_or(ArchiveError::MissingScope {
                    role,
                    param: "partner_uuid",
                })?;
                ArchiveScope::Partner { partner_uuid }
            }
            // Platform-wide read: deliberately unscoped.
            UserRole::Superadmin => ArchiveScope::All,
        };

        Ok(self.store.list_archived(&scope).await?)
    }

    /// Dashboard summary of a partner's archived contracts.
    pub async fn archive_analytics(
        &self,
        partner_uuid: Uuid,
    ) -> Result<ArchiveAnalytics, ArchiveError> {
        let rows = self.store.archived_stats(partner_uuid).await?;
        Ok(summarize(&rows, Utc::now()))
    }

    /// Permanently deletes archived contracts older than `days_old` days
    /// (default from config), together with their bookings and package
    /// reservations. Irreversible.
    ///
    /// An empty candidate set short-circuits without issuing any delete
    /// statement. Otherwise rows are deleted in chunks, and in foreign-key
    /// order within each chunk: package reservations and bookings before
    /// the contracts they reference.
    pub async fn purge_old_archived(
        &self,
        days_old: Option<u32>,
        partner_uuid: Option<Uuid>,
    ) -> Result<PurgeOutcome, ArchiveError> {
        let days_old = days_old.unwrap_or(self.config.default_retention_days);
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(days_old));

        let ids = self
            .store
            .purgeable_contract_ids(cutoff, partner_uuid)
            .await?;
        if ids.is_empty() {
            info!("Purge found no archived contracts older than {days_old} days");
            return Ok(PurgeOutcome { deleted_count: 0 });
        }

        info!(
            "Purging {} archived contract(s) older than {days_old} days",
            ids.len()
        );

        let mut deleted_count = 0;
        for chunk in ids.chunks(self.config.purge_chunk_size.max(1)) {
            let reservations = self.store.delete_package_reservations(chunk).await?;
            let bookings = self.store.delete_bookings(chunk).await?;
            deleted_count += self.store.delete_contracts(chunk).await?;
            debug!(
                "Purge chunk removed {reservations} package reservation(s) and {bookings} booking(s)"
            );
        }

        Ok(PurgeOutcome { deleted_count })
    }

    /// Runs one dependent-table cascade with bounded retries and
    /// exponential backoff. Returns a warning when every attempt failed.
    async fn cascade(
        &self,
        kind: DependentKind,
        action: CascadeAction<'_>,
        contract_id: i64,
    ) -> Option<CascadeWarning> {
        let mut last_error: Option<StoreError> = None;

        for attempt in 0..self.config.cascade_attempts {
            if attempt > 0 {
                let delay = self.config.cascade_backoff * (1 << (attempt - 1));
                warn!(
                    "Cascade to {kind} for contract {contract_id} failed (attempt {attempt}), retrying after {}ms",
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let result = match &action {
                CascadeAction::Archive { user_id, reason } => {
                    self.store
                        .archive_dependents(kind, contract_id, *user_id, reason)
                        .await
                }
                CascadeAction::Restore => self.store.restore_dependents(kind, contract_id).await,
            };

            match result {
                Ok(rows) => {
                    debug!("Cascaded to {rows} {kind} row(s) for contract {contract_id}");
                    return None;
                }
                Err(e) => last_error = Some(e),
            }
        }

        let detail = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempts were made".to_string());
        warn!(
            "Cascade to {kind} for contract {contract_id} gave up after {} attempt(s): {detail}",
            self.config.cascade_attempts
        );

        Some(CascadeWarning {
            target: kind,
            detail,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::DateTime;

    use crate::models::contract::{ArchivedContractStat, RestoredContract};

    #[derive(Debug, Clone, PartialEq)]
    enum StoreCall {
        ArchiveContract {
            contract_id: i64,
            reason: String,
        },
        RestoreContract {
            contract_id: i64,
        },
        ArchiveDependents {
            kind: DependentKind,
            contract_id: i64,
            reason: String,
        },
        RestoreDependents {
            kind: DependentKind,
            contract_id: i64,
        },
        CustomerLookup {
            user_id: Uuid,
        },
        ListArchived {
            scope: ArchiveScope,
        },
        ArchivedStats {
            partner_uuid: Uuid,
        },
        PurgeableIds {
            cutoff: DateTime<Utc>,
            partner_uuid: Option<Uuid>,
        },
        DeletePackageReservations {
            contract_ids: Vec<i64>,
        },
        DeleteBookings {
            contract_ids: Vec<i64>,
        },
        DeleteContracts {
            contract_ids: Vec<i64>,
        },
    }

    /// In-memory store double: records every call, serves canned rows, and
    /// injects a configurable number of failures per dependent table.
    #[derive(Default)]
    struct MockStore {
        calls: Mutex<Vec<StoreCall>>,
        contract: Option<ContractSummary>,
        discarded_reason: Option<String>,
        dependent_faults: Mutex<HashMap<DependentKind, u32>>,
        customers: HashMap<Uuid, i64>,
        archived: Vec<ContractSummary>,
        stats: Vec<ArchivedContractStat>,
        purgeable: Vec<i64>,
    }

    impl MockStore {
        fn record(&self, call: StoreCall) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<StoreCall> {
            self.calls.lock().unwrap().clone()
        }

        fn db_error() -> StoreError {
            StoreError::Database(sqlx::Error::PoolTimedOut)
        }

        fn take_fault(&self, kind: DependentKind) -> Result<(), StoreError> {
            let mut faults = self.dependent_faults.lock().unwrap();
            if let Some(remaining) = faults.get_mut(&kind) {
                if *remaining > 0 {
                    *remaining = remaining.saturating_sub(1);
                    return Err(Self::db_error());
                }
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ArchiveStore for MockStore {
        async fn archive_contract(
            &self,
            contract_id: i64,
            _user_id: Uuid,
            reason: &str,
        ) -> Result<Option<ContractSummary>, StoreError> {
            self.record(StoreCall::ArchiveContract {
                contract_id,
                reason: reason.to_string(),
            });
            Ok(self.contract.clone())
        }

        async fn restore_contract(
            &self,
            contract_id: i64,
        ) -> Result<Option<RestoredContract>, StoreError> {
            self.record(StoreCall::RestoreContract { contract_id });
            // Like the real RETURNING row: the tuple is already cleared.
            Ok(self.contract.clone().map(|mut contract| {
                contract.is_archived = false;
                contract.archived_at = None;
                contract.archived_by_user_id = None;
                contract.archive_reason = None;
                RestoredContract {
                    contract,
                    discarded_reason: self.discarded_reason.clone(),
                }
            }))
        }

        async fn archive_dependents(
            &self,
            kind: DependentKind,
            contract_id: i64,
            _user_id: Uuid,
            reason: &str,
        ) -> Result<u64, StoreError> {
            self.record(StoreCall::ArchiveDependents {
                kind,
                contract_id,
                reason: reason.to_string(),
            });
            self.take_fault(kind)?;
            Ok(2)
        }

        async fn restore_dependents(
            &self,
            kind: DependentKind,
            contract_id: i64,
        ) -> Result<u64, StoreError> {
            self.record(StoreCall::RestoreDependents { kind, contract_id });
            self.take_fault(kind)?;
            Ok(2)
        }

        async fn customer_id_for_user(&self, user_id: Uuid) -> Result<Option<i64>, StoreError> {
            self.record(StoreCall::CustomerLookup { user_id });
            Ok(self.customers.get(&user_id).copied())
        }

        async fn list_archived(
            &self,
            scope: &ArchiveScope,
        ) -> Result<Vec<ContractSummary>, StoreError> {
            self.record(StoreCall::ListArchived {
                scope: scope.clone(),
            });
            let rows = self
                .archived
                .iter()
                .filter(|c| match scope {
                    ArchiveScope::Customer { customer_id } => c.customer_id == *customer_id,
                    ArchiveScope::Partner { partner_uuid } => c.partner_uuid == *partner_uuid,
                    ArchiveScope::All => true,
                })
                .cloned()
                .collect();
            Ok(rows)
        }

        async fn archived_stats(
            &self,
            partner_uuid: Uuid,
        ) -> Result<Vec<ArchivedContractStat>, StoreError> {
            self.record(StoreCall::ArchivedStats { partner_uuid });
            Ok(self.stats.clone())
        }

        async fn purgeable_contract_ids(
            &self,
            cutoff: DateTime<Utc>,
            partner_uuid: Option<Uuid>,
        ) -> Result<Vec<i64>, StoreError> {
            self.record(StoreCall::PurgeableIds {
                cutoff,
                partner_uuid,
            });
            Ok(self.purgeable.clone())
        }

        async fn delete_package_reservations(
            &self,
            contract_ids: &[i64],
        ) -> Result<u64, StoreError> {
            self.record(StoreCall::DeletePackageReservations {
                contract_ids: contract_ids.to_vec(),
            });
            Ok(contract_ids.len() as u64 * 2)
        }

        async fn delete_bookings(&self, contract_ids: &[i64]) -> Result<u64, StoreError> {
            self.record(StoreCall::DeleteBookings {
                contract_ids: contract_ids.to_vec(),
            });
            Ok(contract_ids.len() as u64 * 3)
        }

        async fn delete_contracts(&self, contract_ids: &[i64]) -> Result<u64, StoreError> {
            self.record(StoreCall::DeleteContracts {
                contract_ids: contract_ids.to_vec(),
            });
            Ok(contract_ids.len() as u64)
        }
    }

    fn summary(id: i64, partner_uuid: Uuid, customer_id: i64) -> ContractSummary {
        ContractSummary {
            id,
            partner_uuid,
            customer_id,
            location_id: None,
            service_name: "Postazione flex".to_string(),
            service_type: "abbonamento".to_string(),
            service_cost: 120.0,
            start_date: None,
            end_date: None,
            is_archived: true,
            archived_at: Some(Utc::now()),
            archived_by_user_id: Some(Uuid::new_v4()),
            archive_reason: Some(DEFAULT_ARCHIVE_REASON.to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            customer_name: "Ada Rossi".to_string(),
            customer_email: "ada@example.com".to_string(),
            location_name: None,
        }
    }

    fn manager(store: MockStore) -> (std::sync::Arc<MockStore>, ArchiveManager) {
        manager_with(store, ArchiveConfig::default())
    }

    fn manager_with(
        store: MockStore,
        config: ArchiveConfig,
    ) -> (std::sync::Arc<MockStore>, ArchiveManager) {
        let store = std::sync::Arc::new(store);
        let mgr = ArchiveManager::new(store.clone(), config);
        (store, mgr)
    }

    fn faults(kind: DependentKind, failures: u32) -> Mutex<HashMap<DependentKind, u32>> {
        Mutex::new(HashMap::from([(kind, failures)]))
    }

    #[tokio::test]
    async fn test_archive_rejects_already_archived_and_touches_no_dependents() {
        let (store, mgr) = manager(MockStore::default());

        let err = mgr
            .archive_contract(7, Uuid::new_v4(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, ArchiveError::NotFoundOrAlreadyArchived(7)));
        let calls = store.calls();
        assert_eq!(calls.len(), 1, "expected only the contract update, got {calls:?}");
    }

    #[tokio::test]
    async fn test_restore_rejects_active_contract() {
        let (store, mgr) = manager(MockStore::default());

        let err = mgr.restore_contract(7, Uuid::new_v4()).await.unwrap_err();

        assert!(matches!(err, ArchiveError::NotFoundOrNotArchived(7)));
        assert_eq!(store.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_archive_cascades_to_both_dependents_in_order() {
        let partner = Uuid::new_v4();
        let user = Uuid::new_v4();
        let (store, mgr) = manager(MockStore {
            contract: Some(summary(7, partner, 42)),
            ..Default::default()
        });

        let outcome = mgr
            .archive_contract(7, user, Some("Duplicate entry"))
            .await
            .unwrap();

        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.contract.id, 7);
        assert_eq!(
            store.calls(),
            vec![
                StoreCall::ArchiveContract {
                    contract_id: 7,
                    reason: "Duplicate entry".to_string(),
                },
                StoreCall::ArchiveDependents {
                    kind: DependentKind::Bookings,
                    contract_id: 7,
                    reason: "Contract archived: Duplicate entry".to_string(),
                },
                StoreCall::ArchiveDependents {
                    kind: DependentKind::PackageReservations,
                    contract_id: 7,
                    reason: "Contract archived: Duplicate entry".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_archive_without_reason_uses_default() {
        let (store, mgr) = manager(MockStore {
            contract: Some(summary(3, Uuid::new_v4(), 42)),
            ..Default::default()
        });

        mgr.archive_contract(3, Uuid::new_v4(), None).await.unwrap();

        let calls = store.calls();
        assert_eq!(
            calls[0],
            StoreCall::ArchiveContract {
                contract_id: 3,
                reason: "Deleted by user".to_string(),
            }
        );
        assert!(calls[1..].iter().all(|c| matches!(
            c,
            StoreCall::ArchiveDependents { reason, .. }
                if reason == "Contract archived: Deleted by user"
        )));
    }

    #[tokio::test]
    async fn test_archive_blank_reason_uses_default() {
        let (store, mgr) = manager(MockStore {
            contract: Some(summary(3, Uuid::new_v4(), 42)),
            ..Default::default()
        });

        mgr.archive_contract(3, Uuid::new_v4(), Some("   "))
            .await
            .unwrap();

        assert_eq!(
            store.calls()[0],
            StoreCall::ArchiveContract {
                contract_id: 3,
                reason: "Deleted by user".to_string(),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cascade_failure_is_a_warning_not_an_error() {
        let (store, mgr) = manager(MockStore {
            contract: Some(summary(7, Uuid::new_v4(), 42)),
            dependent_faults: faults(DependentKind::Bookings, u32::MAX),
            ..Default::default()
        });

        let outcome = mgr
            .archive_contract(7, Uuid::new_v4(), None)
            .await
            .unwrap();

        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].target, DependentKind::Bookings);
        // The other dependent table is still cascaded independently.
        assert!(store.calls().iter().any(|c| matches!(
            c,
            StoreCall::ArchiveDependents {
                kind: DependentKind::PackageReservations,
                ..
            }
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cascade_retries_through_transient_fault() {
        let (store, mgr) = manager(MockStore {
            contract: Some(summary(7, Uuid::new_v4(), 42)),
            dependent_faults: faults(DependentKind::Bookings, 1),
            ..Default::default()
        });

        let outcome = mgr
            .archive_contract(7, Uuid::new_v4(), None)
            .await
            .unwrap();

        assert!(outcome.warnings.is_empty());
        let booking_attempts = store
            .calls()
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    StoreCall::ArchiveDependents {
                        kind: DependentKind::Bookings,
                        ..
                    }
                )
            })
            .count();
        assert_eq!(booking_attempts, 2, "one failure, then one successful retry");
    }

    #[tokio::test]
    async fn test_restore_cascades_clearing_to_both_dependents() {
        let (store, mgr) = manager(MockStore {
            contract: Some(summary(9, Uuid::new_v4(), 42)),
            discarded_reason: Some("Wrong customer".to_string()),
            ..Default::default()
        });

        let outcome = mgr.restore_contract(9, Uuid::new_v4()).await.unwrap();

        assert!(outcome.warnings.is_empty());
        assert_eq!(
            store.calls(),
            vec![
                StoreCall::RestoreContract { contract_id: 9 },
                StoreCall::RestoreDependents {
                    kind: DependentKind::Bookings,
                    contract_id: 9,
                },
                StoreCall::RestoreDependents {
                    kind: DependentKind::PackageReservations,
                    contract_id: 9,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_restore_returns_contract_with_cleared_tuple() {
        let (_, mgr) = manager(MockStore {
            contract: Some(summary(9, Uuid::new_v4(), 42)),
            discarded_reason: Some("Wrong customer".to_string()),
            ..Default::default()
        });

        let outcome = mgr.restore_contract(9, Uuid::new_v4()).await.unwrap();

        let c = &outcome.contract;
        assert!(!c.is_archived);
        assert!(c.archived_at.is_none());
        assert!(c.archived_by_user_id.is_none());
        // The reason is discarded by the restore, not carried anywhere.
        assert!(c.archive_reason.is_none());
    }

    #[tokio::test]
    async fn test_purge_short_circuits_on_empty_selection() {
        let (store, mgr) = manager(MockStore::default());

        let outcome = mgr.purge_old_archived(None, None).await.unwrap();

        assert_eq!(outcome.deleted_count, 0);
        let calls = store.calls();
        assert_eq!(calls.len(), 1, "no delete may be issued, got {calls:?}");
        assert!(matches!(calls[0], StoreCall::PurgeableIds { .. }));
    }

    #[tokio::test]
    async fn test_purge_deletes_dependents_before_contracts() {
        let (store, mgr) = manager(MockStore {
            purgeable: vec![3, 9],
            ..Default::default()
        });

        let outcome = mgr.purge_old_archived(Some(30), None).await.unwrap();

        assert_eq!(outcome.deleted_count, 2);
        let calls = store.calls();
        assert_eq!(calls.len(), 4);
        assert!(matches!(calls[0], StoreCall::PurgeableIds { .. }));
        assert_eq!(
            calls[1],
            StoreCall::DeletePackageReservations {
                contract_ids: vec![3, 9],
            }
        );
        assert_eq!(
            calls[2],
            StoreCall::DeleteBookings {
                contract_ids: vec![3, 9],
            }
        );
        assert_eq!(
            calls[3],
            StoreCall::DeleteContracts {
                contract_ids: vec![3, 9],
            }
        );
    }

    #[tokio::test]
    async fn test_purge_chunks_preserve_order_within_each_chunk() {
        let config = ArchiveConfig {
            purge_chunk_size: 2,
            ..Default::default()
        };
        let (store, mgr) = manager_with(
            MockStore {
                purgeable: vec![1, 2, 3],
                ..Default::default()
            },
            config,
        );

        let outcome = mgr.purge_old_archived(Some(30), None).await.unwrap();

        assert_eq!(outcome.deleted_count, 3);
        let calls = store.calls();
        assert_eq!(
            calls[1..],
            vec![
                StoreCall::DeletePackageReservations {
                    contract_ids: vec![1, 2],
                },
                StoreCall::DeleteBookings {
                    contract_ids: vec![1, 2],
                },
                StoreCall::DeleteContracts {
                    contract_ids: vec![1, 2],
                },
                StoreCall::DeletePackageReservations {
                    contract_ids: vec![3],
                },
                StoreCall::DeleteBookings {
                    contract_ids: vec![3],
                },
                StoreCall::DeleteContracts {
                    contract_ids: vec![3],
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_purge_defaults_to_configured_retention() {
        let (store, mgr) = manager(MockStore::default());

        mgr.purge_old_archived(None, None).await.unwrap();

        let calls = store.calls();
        let StoreCall::PurgeableIds { cutoff, .. } = &calls[0] else {
            panic!("expected a purgeable-id selection, got {calls:?}");
        };
        assert_eq!((Utc::now() - *cutoff).num_days(), 365);
    }

    #[tokio::test]
    async fn test_listing_scopes_by_role() {
        let p1 = Uuid::new_v4();
        let p2 = Uuid::new_v4();
        let user_of_42 = Uuid::new_v4();
        let store = MockStore {
            customers: HashMap::from([(user_of_42, 42)]),
            archived: vec![summary(1, p1, 42), summary(2, p1, 99), summary(3, p2, 7)],
            ..Default::default()
        };
        let (_, mgr) = manager(store);

        let admin_view = mgr
            .archived_contracts(Some(p1), UserRole::Admin, None)
            .await
            .unwrap();
        assert_eq!(ids(&admin_view), vec![1, 2]);

        let customer_view = mgr
            .archived_contracts(Some(p1), UserRole::User, Some(user_of_42))
            .await
            .unwrap();
        assert_eq!(ids(&customer_view), vec![1]);

        let superadmin_view = mgr
            .archived_contracts(None, UserRole::Superadmin, None)
            .await
            .unwrap();
        assert_eq!(ids(&superadmin_view), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_listing_user_without_customer_record_is_empty() {
        let (store, mgr) = manager(MockStore::default());

        let rows = mgr
            .archived_contracts(None, UserRole::User, Some(Uuid::new_v4()))
            .await
            .unwrap();

        assert!(rows.is_empty());
        let calls = store.calls();
        assert_eq!(calls.len(), 1, "no listing should run, got {calls:?}");
        assert!(matches!(calls[0], StoreCall::CustomerLookup { .. }));
    }

    #[tokio::test]
    async fn test_listing_admin_without_partner_is_a_scope_error() {
        let (_, mgr) = manager(MockStore::default());

        let err = mgr
            .archived_contracts(None, UserRole::Admin, None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ArchiveError::MissingScope {
                role: UserRole::Admin,
                param: "partner_uuid",
            }
        ));
    }

    #[tokio::test]
    async fn test_listing_user_without_user_id_is_a_scope_error() {
        let (_, mgr) = manager(MockStore::default());

        let err = mgr
            .archived_contracts(None, UserRole::User, None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ArchiveError::MissingScope {
                role: UserRole::User,
                param: "user_id",
            }
        ));
    }

    #[tokio::test]
    async fn test_analytics_reduces_partner_stats() {
        let partner = Uuid::new_v4();
        let now = Utc::now();
        let store = MockStore {
            stats: vec![
                ArchivedContractStat {
                    archived_at: Some(now),
                    service_cost: 100.0,
                    service_type: "abbonamento".to_string(),
                },
                ArchivedContractStat {
                    archived_at: Some(now),
                    service_cost: 250.0,
                    service_type: "pacchetto".to_string(),
                },
            ],
            ..Default::default()
        };
        let (store, mgr) = manager_with(store, ArchiveConfig::default());

        let summary = mgr.archive_analytics(partner).await.unwrap();

        assert_eq!(summary.total_archived, 2);
        assert!((summary.total_archived_value - 350.0).abs() < f64::EPSILON);
        assert_eq!(store.calls(), vec![StoreCall::ArchivedStats { partner_uuid: partner }]);
    }

    fn ids(rows: &[ContractSummary]) -> Vec<i64> {
        rows.iter().map(|c| c.id).collect()
    }
}
