//! Append-only weather snapshot log.
//!
//! Snapshots are immutable once written: the sync path appends them,
//! readers fetch the latest or a ranged history, and a retention sweep
//! drops entries older than thirty days. Deleting a location leaves its
//! snapshots in place with a dangling reference; readers then see the
//! reading without an attached location.

use chrono::{DateTime, Duration, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use skycast_provider::CurrentWeather;

use crate::db::Db;
use crate::error::StoreError;
use crate::locations::{self, Location};

/// Snapshots older than this are removed by the retention sweep.
const RETENTION_DAYS: i64 = 30;

/// Results per history query are capped at this many rows.
const HISTORY_LIMIT: u32 = 100;

/// A persisted weather reading, with the owning location's *current*
/// attributes attached when it still exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSnapshot {
    pub id: i64,
    pub location: Option<Location>,
    #[serde(flatten)]
    pub weather: CurrentWeather,
}

/// Snapshot log façade over the shared database handle.
#[derive(Clone)]
pub struct SnapshotStore {
    db: Db,
}

impl SnapshotStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Append one reading for the location. Never mutates existing rows.
    pub fn save(
        &self,
        location_id: i64,
        weather: &CurrentWeather,
    ) -> Result<StoredSnapshot, StoreError> {
        if location_id <= 0 {
            return Err(StoreError::Persistence(format!(
                "Invalid location reference: {}",
                location_id
            )));
        }

        let weather_json = serde_json::to_string(weather)?;
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO weather_snapshots (location_id, weather_json, fetched_at)
                 VALUES (?1, ?2, ?3)",
                params![
                    location_id,
                    weather_json,
                    weather.fetched_at.timestamp_millis()
                ],
            )?;

            let id = conn.last_insert_rowid();
            Ok(StoredSnapshot {
                id,
                location: locations::fetch_by_id(conn, location_id)?,
                weather: weather.clone(),
            })
        })
    }

    /// The most recent reading for the location, or `None` when nothing
    /// has been synced yet.
    pub fn latest(&self, location_id: i64) -> Result<Option<StoredSnapshot>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, weather_json FROM weather_snapshots
                 WHERE location_id = ?1 ORDER BY fetched_at DESC LIMIT 1",
            )?;
            let mut rows = stmt.query(params![location_id])?;
            let Some(row) = rows.next()? else {
                return Ok(None);
            };

            let id: i64 = row.get(0)?;
            let weather_json: String = row.get(1)?;
            Ok(Some(StoredSnapshot {
                id,
                location: locations::fetch_by_id(conn, location_id)?,
                weather: serde_json::from_str(&weather_json)?,
            }))
        })
    }

    /// Readings with `fetched_at` inclusively within `[start, end]`,
    /// newest first, capped at 100. An inverted range yields an empty
    /// result rather than an error.
    pub fn history(
        &self,
        location_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<StoredSnapshot>, StoreError> {
        self.db.with_conn(|conn| {
            let location = locations::fetch_by_id(conn, location_id)?;
            let mut stmt = conn.prepare(
                "SELECT id, weather_json FROM weather_snapshots
                 WHERE location_id = ?1 AND fetched_at >= ?2 AND fetched_at <= ?3
                 ORDER BY fetched_at DESC LIMIT ?4",
            )?;
            let mut rows = stmt.query(params![
                location_id,
                start.timestamp_millis(),
                end.timestamp_millis(),
                HISTORY_LIMIT,
            ])?;

            let mut snapshots = Vec::new();
            while let Some(row) = rows.next()? {
                let id: i64 = row.get(0)?;
                let weather_json: String = row.get(1)?;
                snapshots.push(StoredSnapshot {
                    id,
                    location: location.clone(),
                    weather: serde_json::from_str(&weather_json)?,
                });
            }
            Ok(snapshots)
        })
    }

    /// Retention sweep: delete readings older than thirty days. Invoked
    /// by the sync engine's timer task, not by API callers.
    pub fn purge_expired(&self) -> Result<usize, StoreError> {
        let cutoff = (Utc::now() - Duration::days(RETENTION_DAYS)).timestamp_millis();
        self.db.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM weather_snapshots WHERE fetched_at < ?1",
                params![cutoff],
            )?;
            if removed > 0 {
                tracing::info!("Expired {} weather snapshot(s)", removed);
            }
            Ok(removed)
        })
    }
}
