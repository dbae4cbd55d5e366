use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

/// A resolved place. This is also the shape of the persisted city record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    #[serde(default)]
    pub state: Option<String>,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
}

/// Conditions "now" for the active location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temp_c: i32,
    pub humidity_pct: i32,
    /// Passed through as reported by the provider for metric units.
    pub wind_speed: f64,
    pub pressure_hpa: i32,
    pub condition: String,
    pub icon: String,
}

/// One raw 3-hour forecast sample, before daily aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSample {
    /// Sample time in the location's own UTC offset.
    pub at: DateTime<FixedOffset>,
    pub temp_c: f64,
    pub humidity_pct: f64,
    pub wind_speed: f64,
    pub pressure_hpa: f64,
    pub condition: String,
    pub icon: String,
}

/// One aggregated forecast day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyForecastEntry {
    /// Short weekday name, e.g. "Mon".
    pub day: String,
    pub temp_c: i32,
    pub wind_speed: i32,
    pub humidity_pct: i32,
    pub pressure_hpa: i32,
    /// Distinct conditions seen that day, comma-joined in first-seen order.
    pub condition: String,
    /// First icon seen that day.
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProviderStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Error { kind: ErrorKind, message: String },
}

/// Everything a rendering layer reads from the weather state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeatherSnapshot {
    /// Active city identifier, as last adopted by the user.
    pub city: String,
    pub location: Option<Location>,
    pub weather: Option<CurrentConditions>,
    pub forecast: Vec<DailyForecastEntry>,
    pub status: ProviderStatus,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl WeatherSnapshot {
    pub fn loading(&self) -> bool {
        self.status == ProviderStatus::Loading
    }

    /// User-visible error message, if the last fetch failed.
    pub fn error(&self) -> Option<&str> {
        match &self.status {
            ProviderStatus::Error { message, .. } => Some(message.as_str()),
            _ => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match &self.status {
            ProviderStatus::Error { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_without_state_deserializes() {
        let loc: Location =
            serde_json::from_str(r#"{"city":"Paris","country":"FR","lat":48.85,"lon":2.35}"#)
                .expect("valid location");
        assert_eq!(loc.state, None);
        assert_eq!(loc.city, "Paris");
    }

    #[test]
    fn snapshot_error_accessors() {
        let snap = WeatherSnapshot {
            status: ProviderStatus::Error {
                kind: ErrorKind::CityNotFound,
                message: "City not found: Nowhere".into(),
            },
            ..Default::default()
        };
        assert!(!snap.loading());
        assert_eq!(snap.error(), Some("City not found: Nowhere"));
        assert_eq!(snap.error_kind(), Some(ErrorKind::CityNotFound));
    }
}
