use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

use crate::models::contract::ArchivedContractStat;

/// Per-service-type counters. Only the three known service types are
/// broken out; anything else still counts toward the totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServiceTypeBreakdown {
    pub abbonamento: u64,
    pub pacchetto: u64,
    pub free_trial: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveAnalytics {
    pub total_archived: u64,
    pub archived_this_month: u64,
    pub archived_this_year: u64,
    pub total_archived_value: f64,
    pub by_service_type: ServiceTypeBreakdown,
}

/// Reduces a partner's archived contracts to the dashboard summary.
/// "This month" and "this year" are calendar buckets relative to `now`.
pub fn summarize(rows: &[ArchivedContractStat], now: DateTime<Utc>) -> ArchiveAnalytics {
    let mut summary = ArchiveAnalytics {
        total_archived: rows.len() as u64,
        archived_this_month: 0,
        archived_this_year: 0,
        total_archived_value: 0.0,
        by_service_type: ServiceTypeBreakdown::default(),
    };

    for row in rows {
        summary.total_archived_value += row.service_cost;

        if let Some(archived_at) = row.archived_at {
            if archived_at.year() == now.year() {
                summary.archived_this_year += 1;
                if archived_at.month() == now.month() {
                    summary.archived_this_month += 1;
                }
            }
        }

        match row.service_type.as_str() {
            "abbonamento" => summary.by_service_type.abbonamento += 1,
            "pacchetto" => summary.by_service_type.pacchetto += 1,
            "free_trial" => summary.by_service_type.free_trial += 1,
            _ => {} // unknown types stay out of the breakdown
        }
    }

    summary
}
