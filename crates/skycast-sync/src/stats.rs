//! Aggregate sync statistics.
//!
//! In-memory and process-wide; reset on restart. Only the engine writes
//! them, and a whole cycle's tallies land in one locked section so
//! readers never observe a half-applied cycle.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Mutable counters owned by the engine, guarded by its stats lock.
#[derive(Debug, Default)]
pub(crate) struct StatsInner {
    pub total_syncs: u64,
    pub successful_syncs: u64,
    pub failed_syncs: u64,
    pub last_sync_time: Option<DateTime<Utc>>,
}

/// Read-only view handed to health/status reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatsSnapshot {
    pub total_syncs: u64,
    pub successful_syncs: u64,
    pub failed_syncs: u64,
    pub last_sync_time: Option<DateTime<Utc>>,
    pub is_running: bool,
    pub interval_minutes: Option<u64>,
}
