//! Normalized weather vocabulary plus the raw OpenWeatherMap wire shapes.
//!
//! Normalized types serialize in camelCase so the HTTP surface and the
//! snapshot store share one stable JSON schema. The `Api*` structs mirror
//! the upstream payloads and never leave this crate's client boundary.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Tag recorded on every reading so stored data stays attributable to
/// the upstream source that produced it.
pub const API_SOURCE: &str = "openweathermap";

/// Temperature block of a current-weather reading, metric units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureBlock {
    pub current: f64,
    pub feels_like: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed: f64,
    pub direction: f64,
    pub gust: Option<f64>,
}

/// Categorized condition as reported upstream ("Rain", "light rain", "10d").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherDescriptor {
    pub main: String,
    pub description: String,
    pub icon: String,
}

/// One normalized current-weather reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentWeather {
    pub temperature: TemperatureBlock,
    pub humidity: u8,
    pub pressure: f64,
    pub wind: Wind,
    pub visibility: Option<u32>,
    pub clouds: u8,
    pub weather: WeatherDescriptor,
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
    pub fetched_at: DateTime<Utc>,
    pub api_source: String,
}

/// Result of resolving a city name to coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodedCity {
    pub name: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub state: Option<String>,
}

/// One aggregated forecast day. Derived transiently, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub temperature: ForecastTemperature,
    pub weather: WeatherDescriptor,
    pub humidity: i64,
    pub wind: ForecastWind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastTemperature {
    pub min: i64,
    pub max: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastWind {
    pub speed: f64,
}

/// City metadata echoed back with a forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastCity {
    pub name: String,
    pub country: String,
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
}

/// Up to five aggregated days plus city metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastResult {
    pub city: ForecastCity,
    pub forecast: Vec<ForecastDay>,
    pub fetched_at: DateTime<Utc>,
    pub api_source: String,
}

// ---------------------------------------------------------------------------
// Raw upstream shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ApiCurrentResponse {
    pub main: ApiMain,
    pub wind: ApiWind,
    #[serde(default)]
    pub visibility: Option<u32>,
    pub clouds: ApiClouds,
    pub weather: Vec<ApiWeatherDescriptor>,
    pub sys: ApiSys,
}

#[derive(Debug, Deserialize)]
pub struct ApiMain {
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub pressure: f64,
    pub humidity: u8,
}

#[derive(Debug, Deserialize)]
pub struct ApiWind {
    pub speed: f64,
    #[serde(default)]
    pub deg: f64,
    #[serde(default)]
    pub gust: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct ApiClouds {
    pub all: u8,
}

#[derive(Debug, Deserialize)]
pub struct ApiWeatherDescriptor {
    pub main: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiSys {
    pub sunrise: i64,
    pub sunset: i64,
}

#[derive(Debug, Deserialize)]
pub struct ApiForecastResponse {
    pub list: Vec<ApiForecastPoint>,
    pub city: ApiForecastCity,
}

/// One 3-hourly point of the upstream forecast feed.
#[derive(Debug, Deserialize)]
pub struct ApiForecastPoint {
    /// Unix timestamp (seconds) of the point.
    pub dt: i64,
    pub main: ApiForecastMain,
    pub wind: ApiWind,
    pub weather: Vec<ApiWeatherDescriptor>,
}

#[derive(Debug, Deserialize)]
pub struct ApiForecastMain {
    pub temp_min: f64,
    pub temp_max: f64,
    pub humidity: f64,
}

#[derive(Debug, Deserialize)]
pub struct ApiForecastCity {
    pub name: String,
    pub country: String,
    pub sunrise: i64,
    pub sunset: i64,
}

#[derive(Debug, Deserialize)]
pub struct ApiGeocodeResult {
    pub name: String,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub state: Option<String>,
}

/// Convert an upstream unix-seconds timestamp to UTC.
pub(crate) fn timestamp_to_utc(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

impl From<ApiWeatherDescriptor> for WeatherDescriptor {
    fn from(raw: ApiWeatherDescriptor) -> Self {
        Self {
            main: raw.main,
            description: raw.description,
            icon: raw.icon,
        }
    }
}
