use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::aggregate::DayGrouping;

pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";
pub const DEFAULT_CITY: &str = "Vadodara";

const GEOCODING_URL: &str = "http://api.openweathermap.org/geo/1.0/direct";
const WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
const FORECAST_URL: &str = "https://api.openweathermap.org/data/2.5/forecast";

/// Base URLs of the three OpenWeather endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub geocoding: String,
    pub weather: String,
    pub forecast: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            geocoding: GEOCODING_URL.to_string(),
            weather: WEATHER_URL.to_string(),
            forecast: FORECAST_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// All three endpoints under one base URL, as a mock server exposes them.
    pub fn under(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            geocoding: format!("{base}/geo/1.0/direct"),
            weather: format!("{base}/data/2.5/weather"),
            forecast: format!("{base}/data/2.5/forecast"),
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// default_city = "Vadodara"
/// day_grouping = "weekday"
///
/// [endpoints]
/// geocoding = "http://api.openweathermap.org/geo/1.0/direct"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub default_city: Option<String>,
    pub day_grouping: DayGrouping,
    /// Where the selected city is persisted; defaults to the platform data dir.
    pub state_file: Option<PathBuf>,
    pub endpoints: Endpoints,
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "cityweather", "cityweather")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Path to the persisted city record.
    pub fn state_file_path(&self) -> Result<PathBuf> {
        match &self.state_file {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::project_dirs()?.data_dir().join("saved_city.json")),
        }
    }

    /// API key from the environment, falling back to the config file.
    pub fn api_key(&self) -> Option<String> {
        self.api_key_with_env(std::env::var(API_KEY_ENV).ok())
    }

    pub fn api_key_with_env(&self, env_value: Option<String>) -> Option<String> {
        env_value
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.api_key.clone().filter(|k| !k.trim().is_empty()))
    }

    pub fn default_city(&self) -> &str {
        self.default_city
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(DEFAULT_CITY)
    }
}
