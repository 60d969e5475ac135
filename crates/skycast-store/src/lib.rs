//! SQLite-backed persistence for Skycast.
//!
//! Two façades over one database: the location registry (source of truth
//! for which places exist and are eligible for sync) and the append-only
//! weather snapshot log.

pub mod db;
pub mod error;
pub mod locations;
pub mod snapshots;

pub use db::Db;
pub use error::StoreError;
pub use locations::{Location, LocationStore, LocationUpdate, NewLocation};
pub use snapshots::{SnapshotStore, StoredSnapshot};
