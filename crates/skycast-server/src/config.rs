//! Environment-driven configuration.

use anyhow::{bail, Context, Result};
use skycast_provider::ProviderConfig;

const DEFAULT_SYNC_INTERVAL_MINUTES: u64 = 15;
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DB_PATH: &str = "skycast.db";

/// Server configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    /// Upstream URL overrides; `None` keeps the OpenWeatherMap default.
    pub base_url: Option<String>,
    pub forecast_url: Option<String>,
    pub geocoding_url: Option<String>,
    pub sync_interval_minutes: u64,
    pub port: u16,
    pub db_path: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = get("WEATHER_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .context("WEATHER_API_KEY must be set")?;

        let sync_interval_minutes = match get("SYNC_INTERVAL_MINUTES") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("Invalid SYNC_INTERVAL_MINUTES: '{}'", raw))?,
            None => DEFAULT_SYNC_INTERVAL_MINUTES,
        };
        if sync_interval_minutes == 0 {
            bail!("SYNC_INTERVAL_MINUTES must be at least 1");
        }

        let port = match get("PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("Invalid PORT: '{}'", raw))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            api_key,
            base_url: get("WEATHER_API_BASE_URL"),
            forecast_url: get("WEATHER_API_FORECAST_URL"),
            geocoding_url: get("WEATHER_API_GEOCODING_URL"),
            sync_interval_minutes,
            port,
            db_path: get("SKYCAST_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
        })
    }

    /// Provider configuration with env overrides applied over the
    /// OpenWeatherMap defaults.
    pub fn provider_config(&self) -> ProviderConfig {
        let mut config = ProviderConfig::new(self.api_key.clone());
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        if let Some(url) = &self.forecast_url {
            config.forecast_url = url.clone();
        }
        if let Some(url) = &self.geocoding_url {
            config.geocoding_url = url.clone();
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<&str, &str> = vars.iter().copied().collect();
        move |key| map.get(key).map(|v| v.to_string())
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_lookup(lookup(&[("WEATHER_API_KEY", "abc")])).unwrap();

        assert_eq!(config.api_key, "abc");
        assert_eq!(config.sync_interval_minutes, 15);
        assert_eq!(config.port, 3000);
        assert_eq!(config.db_path, "skycast.db");
        assert!(config.base_url.is_none());

        let provider = config.provider_config();
        assert!(provider.base_url.contains("openweathermap.org"));
    }

    #[test]
    fn test_missing_api_key_is_an_error() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
        assert!(Config::from_lookup(lookup(&[("WEATHER_API_KEY", "  ")])).is_err());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("WEATHER_API_KEY", "abc"),
            ("WEATHER_API_BASE_URL", "http://localhost:9000"),
            ("SYNC_INTERVAL_MINUTES", "5"),
            ("PORT", "8080"),
            ("SKYCAST_DB_PATH", "/tmp/test.db"),
        ]))
        .unwrap();

        assert_eq!(config.sync_interval_minutes, 5);
        assert_eq!(config.port, 8080);
        assert_eq!(config.db_path, "/tmp/test.db");
        assert_eq!(config.provider_config().base_url, "http://localhost:9000");
    }

    #[test]
    fn test_invalid_numbers_rejected() {
        assert!(Config::from_lookup(lookup(&[
            ("WEATHER_API_KEY", "abc"),
            ("SYNC_INTERVAL_MINUTES", "soon"),
        ]))
        .is_err());

        assert!(Config::from_lookup(lookup(&[
            ("WEATHER_API_KEY", "abc"),
            ("SYNC_INTERVAL_MINUTES", "0"),
        ]))
        .is_err());

        assert!(Config::from_lookup(lookup(&[
            ("WEATHER_API_KEY", "abc"),
            ("PORT", "99999"),
        ]))
        .is_err());
    }
}
