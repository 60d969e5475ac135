//! Skycast HTTP server: configuration and routing, consumed by the
//! binary and by the integration tests.

pub mod config;
pub mod routes;

pub use config::Config;
pub use routes::{router, AppState};
