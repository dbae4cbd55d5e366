use serde::{Deserialize, Serialize};

/// Errors produced while resolving a city, fetching weather or touching the
/// persisted city record.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeatherError {
    #[error("Missing API key.\nHint: run `cityweather configure` or set OPENWEATHER_API_KEY.")]
    MissingCredential,

    #[error("City not found: {0}")]
    CityNotFound(String),

    #[error("Weather API error: {0}")]
    Api(String),

    #[error("Could not read saved city: {0}")]
    PersistenceRead(String),

    #[error("Could not save city: {0}")]
    PersistenceWrite(String),
}

/// Copyable discriminant of [`WeatherError`], carried in the provider status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingCredential,
    CityNotFound,
    Api,
    PersistenceRead,
    PersistenceWrite,
}

impl WeatherError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WeatherError::MissingCredential => ErrorKind::MissingCredential,
            WeatherError::CityNotFound(_) => ErrorKind::CityNotFound,
            WeatherError::Api(_) => ErrorKind::Api,
            WeatherError::PersistenceRead(_) => ErrorKind::PersistenceRead,
            WeatherError::PersistenceWrite(_) => ErrorKind::PersistenceWrite,
        }
    }
}
