//! Periodic synchronization engine for Skycast.
//!
//! Polls the weather provider for every active location on a timer,
//! isolates per-location failures, tracks aggregate statistics, and
//! supports an on-demand single-location refresh.

pub mod engine;
pub mod error;
pub mod stats;

pub use engine::SyncEngine;
pub use error::SyncError;
pub use stats::SyncStatsSnapshot;
