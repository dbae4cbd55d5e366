use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    Config, WeatherError,
    model::{CurrentConditions, ForecastSample, Location},
    provider::openweather::OpenWeatherProvider,
};

pub mod openweather;

/// Candidates requested when resolving a city for a fetch.
pub const RESOLVE_LIMIT: u32 = 1;
/// Candidates requested when offering city suggestions.
pub const SUGGEST_LIMIT: u32 = 5;

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Resolve free text to at most `limit` places, best match first.
    async fn geocode(&self, query: &str, limit: u32) -> Result<Vec<Location>, WeatherError>;

    async fn current(&self, lat: f64, lon: f64) -> Result<CurrentConditions, WeatherError>;

    /// Raw multi-day sample window (3-hour cadence for OpenWeather).
    async fn forecast(&self, lat: f64, lon: f64) -> Result<Vec<ForecastSample>, WeatherError>;
}

/// Up to [`SUGGEST_LIMIT`] places matching a partially typed query.
pub async fn suggest_cities(
    provider: &dyn WeatherProvider,
    query: &str,
) -> Result<Vec<Location>, WeatherError> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(Vec::new());
    }
    provider.geocode(query, SUGGEST_LIMIT).await
}

/// Construct the OpenWeather provider from config.
///
/// A missing API key is not an error here: every request made through the
/// provider fails with [`WeatherError::MissingCredential`] instead.
pub fn provider_from_config(config: &Config) -> Box<dyn WeatherProvider> {
    let api_key = config.api_key();
    if api_key.is_none() {
        tracing::warn!("No OpenWeather API key configured");
    }
    Box::new(OpenWeatherProvider::with_endpoints(api_key, config.endpoints.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct RecordingProvider {
        queries: Mutex<Vec<(String, u32)>>,
    }

    #[async_trait]
    impl WeatherProvider for RecordingProvider {
        async fn geocode(&self, query: &str, limit: u32) -> Result<Vec<Location>, WeatherError> {
            self.queries.lock().expect("lock").push((query.to_string(), limit));
            Ok(Vec::new())
        }

        async fn current(&self, _lat: f64, _lon: f64) -> Result<CurrentConditions, WeatherError> {
            Err(WeatherError::Api("unused".into()))
        }

        async fn forecast(&self, _lat: f64, _lon: f64) -> Result<Vec<ForecastSample>, WeatherError> {
            Err(WeatherError::Api("unused".into()))
        }
    }

    #[tokio::test]
    async fn blank_suggestion_query_makes_no_request() {
        let provider = RecordingProvider::default();
        let found = suggest_cities(&provider, "   ").await.expect("ok");

        assert!(found.is_empty());
        assert!(provider.queries.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn suggestions_ask_for_five_candidates() {
        let provider = RecordingProvider::default();
        suggest_cities(&provider, " Lon ").await.expect("ok");

        let queries = provider.queries.lock().expect("lock");
        assert_eq!(queries.as_slice(), &[("Lon".to_string(), SUGGEST_LIMIT)]);
    }
}
