//! OpenWeatherMap client for Skycast.
//!
//! Wraps the upstream current-weather, forecast, and geocoding endpoints,
//! normalizes provider JSON into the internal schema, and categorizes
//! upstream failures into a stable error taxonomy.

pub mod client;
pub mod error;
pub mod forecast;
pub mod types;

pub use client::{ProviderConfig, WeatherClient};
pub use error::ProviderError;
pub use types::*;
