//! HTTP client for the OpenWeatherMap API.

use std::time::Duration;

use chrono::Utc;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::forecast::reduce_forecast;
use crate::types::*;

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
const DEFAULT_GEOCODING_URL: &str = "https://api.openweathermap.org/geo/1.0";
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Upstream endpoint configuration. The current, forecast, and geocoding
/// base URLs can differ (they do on some OpenWeatherMap plans).
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    pub base_url: String,
    pub forecast_url: String,
    pub geocoding_url: String,
}

impl ProviderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            forecast_url: DEFAULT_BASE_URL.to_string(),
            geocoding_url: DEFAULT_GEOCODING_URL.to_string(),
        }
    }
}

/// Client over the upstream weather API. Cheap to clone; holds a pooled
/// reqwest client with a fixed request timeout.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    http: reqwest::Client,
    config: ProviderConfig,
}

impl WeatherClient {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProviderError::Unknown(e.to_string()))?;

        Ok(Self { http, config })
    }

    /// `"name,CC"` when a country code is present, bare name otherwise.
    fn city_query(name: &str, country_code: Option<&str>) -> String {
        match country_code {
            Some(code) if !code.is_empty() => format!("{},{}", name, code),
            _ => name.to_string(),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: String,
        query: &[(&str, String)],
        context: &str,
    ) -> Result<T, ProviderError> {
        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                let categorized = ProviderError::from_transport(&e);
                warn!("Upstream request failed ({}): {}", context, categorized);
                categorized
            })?;

        let status = response.status();
        if !status.is_success() {
            let categorized = ProviderError::from_status(status.as_u16(), context);
            warn!("Upstream returned {} ({}): {}", status, context, categorized);
            return Err(categorized);
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::Unknown(format!("Malformed upstream response: {}", e)))
    }

    /// Resolve a city name (optionally qualified with a country code) to
    /// coordinates. Zero results is a `NotFound` error.
    pub async fn geocode_city(
        &self,
        name: &str,
        country_code: Option<&str>,
    ) -> Result<GeocodedCity, ProviderError> {
        let query = Self::city_query(name, country_code);
        let results: Vec<ApiGeocodeResult> = self
            .get_json(
                format!("{}/direct", self.config.geocoding_url),
                &[
                    ("q", query),
                    ("limit", "1".to_string()),
                    ("appid", self.config.api_key.clone()),
                ],
                name,
            )
            .await?;

        let Some(hit) = results.into_iter().next() else {
            return Err(ProviderError::NotFound(format!("City '{}' not found", name)));
        };

        let city = GeocodedCity {
            name: hit.name,
            country: hit.country,
            latitude: hit.lat,
            longitude: hit.lon,
            state: hit.state,
        };
        debug!("Geocoded '{}' to ({}, {})", name, city.latitude, city.longitude);
        Ok(city)
    }

    /// Current weather for a coordinate pair. Callers are responsible for
    /// passing coordinates in valid ranges.
    pub async fn fetch_current_by_coords(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<CurrentWeather, ProviderError> {
        let context = format!("{},{}", lat, lon);
        let raw: ApiCurrentResponse = self
            .get_json(
                format!("{}/weather", self.config.base_url),
                &[
                    ("lat", lat.to_string()),
                    ("lon", lon.to_string()),
                    ("appid", self.config.api_key.clone()),
                    ("units", "metric".to_string()),
                ],
                &context,
            )
            .await?;

        transform_current(raw)
    }

    /// Current weather resolved by city name instead of coordinates.
    pub async fn fetch_current_by_city(
        &self,
        name: &str,
        country_code: Option<&str>,
    ) -> Result<CurrentWeather, ProviderError> {
        let raw: ApiCurrentResponse = self
            .get_json(
                format!("{}/weather", self.config.base_url),
                &[
                    ("q", Self::city_query(name, country_code)),
                    ("appid", self.config.api_key.clone()),
                    ("units", "metric".to_string()),
                ],
                name,
            )
            .await?;

        transform_current(raw)
    }

    /// Five-day forecast for a coordinate pair.
    pub async fn fetch_forecast_by_coords(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<ForecastResult, ProviderError> {
        let context = format!("{},{}", lat, lon);
        let raw: ApiForecastResponse = self
            .get_json(
                format!("{}/forecast", self.config.forecast_url),
                &[
                    ("lat", lat.to_string()),
                    ("lon", lon.to_string()),
                    ("appid", self.config.api_key.clone()),
                    ("units", "metric".to_string()),
                ],
                &context,
            )
            .await?;

        Ok(transform_forecast(raw))
    }

    /// Five-day forecast resolved by city name.
    pub async fn fetch_forecast_by_city(
        &self,
        name: &str,
        country_code: Option<&str>,
    ) -> Result<ForecastResult, ProviderError> {
        let raw: ApiForecastResponse = self
            .get_json(
                format!("{}/forecast", self.config.forecast_url),
                &[
                    ("q", Self::city_query(name, country_code)),
                    ("appid", self.config.api_key.clone()),
                    ("units", "metric".to_string()),
                ],
                name,
            )
            .await?;

        Ok(transform_forecast(raw))
    }
}

fn transform_current(raw: ApiCurrentResponse) -> Result<CurrentWeather, ProviderError> {
    let descriptor = raw
        .weather
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Unknown("Response missing weather descriptor".to_string()))?;

    Ok(CurrentWeather {
        temperature: TemperatureBlock {
            current: raw.main.temp,
            feels_like: raw.main.feels_like,
            min: raw.main.temp_min,
            max: raw.main.temp_max,
        },
        humidity: raw.main.humidity,
        pressure: raw.main.pressure,
        wind: Wind {
            speed: raw.wind.speed,
            direction: raw.wind.deg,
            gust: raw.wind.gust,
        },
        visibility: raw.visibility,
        clouds: raw.clouds.all,
        weather: descriptor.into(),
        sunrise: timestamp_to_utc(raw.sys.sunrise),
        sunset: timestamp_to_utc(raw.sys.sunset),
        fetched_at: Utc::now(),
        api_source: API_SOURCE.to_string(),
    })
}

fn transform_forecast(raw: ApiForecastResponse) -> ForecastResult {
    ForecastResult {
        forecast: reduce_forecast(&raw.list),
        city: ForecastCity {
            name: raw.city.name,
            country: raw.city.country,
            sunrise: timestamp_to_utc(raw.city.sunrise),
            sunset: timestamp_to_utc(raw.city.sunset),
        },
        fetched_at: Utc::now(),
        api_source: API_SOURCE.to_string(),
    }
}
