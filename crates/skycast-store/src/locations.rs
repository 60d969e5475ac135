//! Location registry: the source of truth for which places exist and
//! which are active (eligible for periodic sync).

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::Db;
use crate::error::StoreError;

/// A registered geographic location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: i64,
    pub name: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to register a location.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLocation {
    pub name: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: Option<String>,
}

/// Partial update; absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationUpdate {
    pub name: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timezone: Option<String>,
    pub is_active: Option<bool>,
}

/// Registry façade over the shared database handle.
#[derive(Clone)]
pub struct LocationStore {
    db: Db,
}

impl LocationStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Register a location. The `(latitude, longitude)` pair must be
    /// unique across all locations.
    pub fn create(&self, new: NewLocation) -> Result<Location, StoreError> {
        validate_required(&new.name, &new.country)?;
        validate_coordinates(new.latitude, new.longitude)?;

        self.db.with_conn(|conn| {
            let duplicate: i64 = conn.query_row(
                "SELECT COUNT(*) FROM locations WHERE latitude = ?1 AND longitude = ?2",
                params![new.latitude, new.longitude],
                |row| row.get(0),
            )?;
            if duplicate > 0 {
                return Err(StoreError::Validation(
                    "A location with these coordinates already exists".to_string(),
                ));
            }

            let now = Utc::now();
            conn.execute(
                "INSERT INTO locations (name, country, latitude, longitude, timezone, is_active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?7)",
                params![
                    new.name,
                    new.country,
                    new.latitude,
                    new.longitude,
                    new.timezone.as_deref().unwrap_or("UTC"),
                    now.to_rfc3339(),
                    now.to_rfc3339(),
                ],
            )?;

            let id = conn.last_insert_rowid();
            tracing::debug!("Registered location {} ({})", new.name, id);
            fetch_by_id(conn, id)?.ok_or_else(|| {
                StoreError::Persistence("Inserted location row disappeared".to_string())
            })
        })
    }

    pub fn find_by_id(&self, id: i64) -> Result<Option<Location>, StoreError> {
        self.db.with_conn(|conn| fetch_by_id(conn, id))
    }

    /// Locations eligible for periodic sync.
    pub fn find_active(&self) -> Result<Vec<Location>, StoreError> {
        self.db.with_conn(|conn| {
            collect_locations(
                conn,
                "SELECT * FROM locations WHERE is_active = 1 ORDER BY name ASC",
                params![],
            )
        })
    }

    /// All locations, optionally filtered by active flag, sorted by name.
    pub fn find_all(&self, is_active: Option<bool>) -> Result<Vec<Location>, StoreError> {
        self.db.with_conn(|conn| match is_active {
            Some(active) => collect_locations(
                conn,
                "SELECT * FROM locations WHERE is_active = ?1 ORDER BY name ASC",
                params![active],
            ),
            None => collect_locations(conn, "SELECT * FROM locations ORDER BY name ASC", params![]),
        })
    }

    /// Case-insensitive search over name and country, capped at 20 hits.
    pub fn search(&self, query: &str) -> Result<Vec<Location>, StoreError> {
        let pattern = format!("%{}%", query);
        self.db.with_conn(|conn| {
            collect_locations(
                conn,
                "SELECT * FROM locations
                 WHERE name LIKE ?1 COLLATE NOCASE OR country LIKE ?1 COLLATE NOCASE
                 ORDER BY name ASC LIMIT 20",
                params![pattern],
            )
        })
    }

    /// Apply a partial update; returns `None` for an unknown id.
    pub fn update(&self, id: i64, update: LocationUpdate) -> Result<Option<Location>, StoreError> {
        self.db.with_conn(|conn| {
            let Some(current) = fetch_by_id(conn, id)? else {
                return Ok(None);
            };

            let latitude = update.latitude.unwrap_or(current.latitude);
            let longitude = update.longitude.unwrap_or(current.longitude);
            validate_coordinates(latitude, longitude)?;

            conn.execute(
                "UPDATE locations
                 SET name = ?1, country = ?2, latitude = ?3, longitude = ?4,
                     timezone = ?5, is_active = ?6, updated_at = ?7
                 WHERE id = ?8",
                params![
                    update.name.unwrap_or(current.name),
                    update.country.unwrap_or(current.country),
                    latitude,
                    longitude,
                    update.timezone.unwrap_or(current.timezone),
                    update.is_active.unwrap_or(current.is_active),
                    Utc::now().to_rfc3339(),
                    id,
                ],
            )?;

            fetch_by_id(conn, id)
        })
    }

    /// Remove the location. Historical snapshots keep their (now
    /// dangling) reference on purpose.
    pub fn delete(&self, id: i64) -> Result<bool, StoreError> {
        self.db.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM locations WHERE id = ?1", params![id])?;
            Ok(deleted > 0)
        })
    }
}

fn validate_required(name: &str, country: &str) -> Result<(), StoreError> {
    if name.trim().is_empty() {
        return Err(StoreError::Validation("Name is required".to_string()));
    }
    if country.trim().is_empty() {
        return Err(StoreError::Validation("Country is required".to_string()));
    }
    Ok(())
}

fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), StoreError> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(StoreError::Validation(
            "Latitude must be between -90 and 90".to_string(),
        ));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(StoreError::Validation(
            "Longitude must be between -180 and 180".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn fetch_by_id(conn: &Connection, id: i64) -> Result<Option<Location>, StoreError> {
    let mut stmt = conn.prepare("SELECT * FROM locations WHERE id = ?1")?;
    let mut rows = stmt.query(params![id])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_location(row)?)),
        None => Ok(None),
    }
}

fn collect_locations(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Location>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut locations = Vec::new();
    while let Some(row) = rows.next()? {
        locations.push(row_to_location(row)?);
    }
    Ok(locations)
}

pub(crate) fn row_to_location(row: &Row) -> Result<Location, StoreError> {
    Ok(Location {
        id: row.get(0)?,
        name: row.get(1)?,
        country: row.get(2)?,
        latitude: row.get(3)?,
        longitude: row.get(4)?,
        timezone: row.get(5)?,
        is_active: row.get(6)?,
        created_at: parse_timestamp(&row.get::<_, String>(7)?)?,
        updated_at: parse_timestamp(&row.get::<_, String>(8)?)?,
    })
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Persistence(format!("Bad stored timestamp '{}': {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> LocationStore {
        LocationStore::new(Db::in_memory().unwrap())
    }

    fn testville() -> NewLocation {
        NewLocation {
            name: "Testville".to_string(),
            country: "Nowhere".to_string(),
            latitude: 10.0,
            longitude: 20.0,
            timezone: None,
        }
    }

    #[test]
    fn test_create_and_find() {
        let store = store();
        let created = store.create(testville()).unwrap();

        assert_eq!(created.name, "Testville");
        assert_eq!(created.timezone, "UTC");
        assert!(created.is_active);

        let found = store.find_by_id(created.id).unwrap().unwrap();
        assert_eq!(found, created);
    }

    #[test]
    fn test_duplicate_coordinates_rejected() {
        let store = store();
        store.create(testville()).unwrap();

        let mut dup = testville();
        dup.name = "Elsewhere".to_string();
        let err = store.create(dup).unwrap_err();

        assert!(matches!(err, StoreError::Validation(_)));
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_coordinate_range_validation() {
        let store = store();

        let mut bad = testville();
        bad.latitude = 90.5;
        assert!(matches!(store.create(bad), Err(StoreError::Validation(_))));

        let mut bad = testville();
        bad.longitude = -181.0;
        assert!(matches!(store.create(bad), Err(StoreError::Validation(_))));
    }

    #[test]
    fn test_required_fields() {
        let store = store();

        let mut bad = testville();
        bad.name = "  ".to_string();
        assert!(matches!(store.create(bad), Err(StoreError::Validation(_))));

        let mut bad = testville();
        bad.country = String::new();
        assert!(matches!(store.create(bad), Err(StoreError::Validation(_))));
    }

    #[test]
    fn test_find_active_filters_inactive() {
        let store = store();
        let a = store.create(testville()).unwrap();

        let mut other = testville();
        other.name = "Dormant".to_string();
        other.latitude = 11.0;
        let b = store.create(other).unwrap();

        store
            .update(
                b.id,
                LocationUpdate {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();

        let active = store.find_active().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, a.id);

        let all = store.find_all(None).unwrap();
        assert_eq!(all.len(), 2);
        let inactive = store.find_all(Some(false)).unwrap();
        assert_eq!(inactive.len(), 1);
        assert_eq!(inactive[0].id, b.id);
    }

    #[test]
    fn test_update_bumps_updated_at() {
        let store = store();
        let created = store.create(testville()).unwrap();

        let updated = store
            .update(
                created.id,
                LocationUpdate {
                    name: Some("Renamed".to_string()),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();

        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.country, "Nowhere");
        assert!(updated.updated_at >= created.updated_at);
    }

    #[test]
    fn test_update_unknown_id_is_none() {
        let store = store();
        let result = store.update(999, LocationUpdate::default()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_delete() {
        let store = store();
        let created = store.create(testville()).unwrap();

        assert!(store.delete(created.id).unwrap());
        assert!(store.find_by_id(created.id).unwrap().is_none());
        assert!(!store.delete(created.id).unwrap());
    }

    #[test]
    fn test_search_case_insensitive() {
        let store = store();
        store.create(testville()).unwrap();

        let hits = store.search("testv").unwrap();
        assert_eq!(hits.len(), 1);

        let hits = store.search("NOWHERE").unwrap();
        assert_eq!(hits.len(), 1);

        let hits = store.search("zzz").unwrap();
        assert!(hits.is_empty());
    }
}
