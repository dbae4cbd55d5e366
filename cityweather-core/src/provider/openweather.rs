use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    WeatherError,
    aggregate::round_half_up,
    config::Endpoints,
    model::{CurrentConditions, ForecastSample, Location},
};

use super::WeatherProvider;

const ICON_BASE: &str = "https://openweathermap.org/img/wn";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: Option<String>,
    endpoints: Endpoints,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_endpoints(api_key, Endpoints::default())
    }

    pub fn with_endpoints(api_key: Option<String>, endpoints: Endpoints) -> Self {
        Self {
            api_key,
            endpoints,
            http: Client::new(),
        }
    }

    fn key(&self) -> Result<&str, WeatherError> {
        self.api_key.as_deref().ok_or(WeatherError::MissingCredential)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        what: &str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, WeatherError> {
        tracing::debug!(endpoint = what, url, "OpenWeather request");

        let res = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| WeatherError::Api(format!("Failed to send {what} request: {e}")))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| WeatherError::Api(format!("Failed to read {what} response body: {e}")))?;

        if !status.is_success() {
            let detail = server_message(&body).unwrap_or_else(|| truncate_body(&body));
            return Err(WeatherError::Api(format!(
                "{what} request failed with status {status}: {detail}"
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| WeatherError::Api(format!("Failed to parse {what} JSON: {e}")))
    }

    fn coord_query(&self, lat: f64, lon: f64) -> Result<Vec<(&'static str, String)>, WeatherError> {
        Ok(vec![
            ("lat", lat.to_string()),
            ("lon", lon.to_string()),
            ("units", "metric".to_string()),
            ("appid", self.key()?.to_string()),
        ])
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn geocode(&self, query: &str, limit: u32) -> Result<Vec<Location>, WeatherError> {
        let params = [
            ("q", query.to_string()),
            ("limit", limit.to_string()),
            ("appid", self.key()?.to_string()),
        ];

        let places: Vec<OwPlace> =
            self.get_json("geocoding", &self.endpoints.geocoding, &params).await?;

        Ok(places
            .into_iter()
            .map(|p| Location {
                city: p.name,
                state: p.state,
                country: p.country,
                lat: p.lat,
                lon: p.lon,
            })
            .collect())
    }

    async fn current(&self, lat: f64, lon: f64) -> Result<CurrentConditions, WeatherError> {
        let params = self.coord_query(lat, lon)?;
        let parsed: OwCurrentResponse =
            self.get_json("current weather", &self.endpoints.weather, &params).await?;

        let (condition, icon) = describe(&parsed.weather);

        Ok(CurrentConditions {
            temp_c: round_half_up(parsed.main.temp),
            humidity_pct: round_half_up(parsed.main.humidity),
            wind_speed: parsed.wind.speed,
            pressure_hpa: round_half_up(parsed.main.pressure),
            condition,
            icon: icon.map(|i| format!("{ICON_BASE}/{i}@2x.png")).unwrap_or_default(),
        })
    }

    async fn forecast(&self, lat: f64, lon: f64) -> Result<Vec<ForecastSample>, WeatherError> {
        let params = self.coord_query(lat, lon)?;
        let parsed: OwForecastResponse =
            self.get_json("forecast", &self.endpoints.forecast, &params).await?;

        let offset_secs = parsed.city.and_then(|c| c.timezone).unwrap_or(0);
        let offset = FixedOffset::east_opt(offset_secs)
            .ok_or_else(|| WeatherError::Api(format!("Invalid timezone offset {offset_secs}")))?;

        parsed
            .list
            .into_iter()
            .map(|entry| {
                let at = unix_to_utc(entry.dt)
                    .ok_or_else(|| WeatherError::Api(format!("Invalid timestamp {}", entry.dt)))?
                    .with_timezone(&offset);
                let (condition, icon) = describe(&entry.weather);

                Ok(ForecastSample {
                    at,
                    temp_c: entry.main.temp,
                    humidity_pct: entry.main.humidity,
                    wind_speed: entry.wind.speed,
                    pressure_hpa: entry.main.pressure,
                    condition,
                    icon: icon.map(|i| format!("{ICON_BASE}/{i}.png")).unwrap_or_default(),
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct OwPlace {
    name: String,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    country: String,
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    humidity: f64,
    pressure: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
    #[serde(default)]
    icon: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct OwWind {
    #[serde(default)]
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    #[serde(default)]
    wind: OwWind,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    #[serde(default)]
    timezone: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    #[serde(default)]
    wind: OwWind,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    #[serde(default)]
    city: Option<OwCity>,
    list: Vec<OwForecastEntry>,
}

#[derive(Debug, Deserialize)]
struct OwErrorBody {
    message: String,
}

fn describe(weather: &[OwWeather]) -> (String, Option<&str>) {
    match weather.first() {
        Some(w) => (w.description.clone(), w.icon.as_deref()),
        None => ("Unknown".to_string(), None),
    }
}

fn server_message(body: &str) -> Option<String> {
    serde_json::from_str::<OwErrorBody>(body)
        .ok()
        .map(|b| b.message)
        .filter(|m| !m.is_empty())
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None if body.is_empty() => "no response body".to_string(),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        // Port 9 is discard; a request would fail with a transport error instead.
        let provider = OpenWeatherProvider::with_endpoints(None, Endpoints::under("http://127.0.0.1:9"));

        assert_eq!(provider.geocode("Paris", 1).await.unwrap_err(), WeatherError::MissingCredential);
        assert_eq!(provider.current(1.0, 2.0).await.unwrap_err(), WeatherError::MissingCredential);
        assert_eq!(provider.forecast(1.0, 2.0).await.unwrap_err(), WeatherError::MissingCredential);
    }

    #[test]
    fn server_message_is_extracted() {
        assert_eq!(
            server_message(r#"{"cod":401,"message":"Invalid API key."}"#).as_deref(),
            Some("Invalid API key.")
        );
        assert_eq!(server_message("<html>bad gateway</html>"), None);
    }

    #[test]
    fn truncate_body_limits_length() {
        let long = "x".repeat(500);
        let out = truncate_body(&long);
        assert_eq!(out.len(), 203);
        assert!(out.ends_with("..."));
        assert_eq!(truncate_body(""), "no response body");
    }

    #[test]
    fn empty_weather_array_is_unknown() {
        let (condition, icon) = describe(&[]);
        assert_eq!(condition, "Unknown");
        assert_eq!(icon, None);
    }
}
