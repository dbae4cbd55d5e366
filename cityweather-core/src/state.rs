//! The weather state store.
//!
//! [`WeatherState`] owns the selected city, its resolved [`Location`], the
//! current conditions and the aggregated forecast. Rendering layers hold a
//! [`watch::Receiver`] from [`WeatherState::subscribe`] and redraw whenever a
//! new [`WeatherSnapshot`] is published.
//!
//! Overlapping fetches are allowed. Each fetch takes a generation number when
//! it starts, and only the most recently started fetch may publish its result
//! or write the saved city. Older fetches finish as [`FetchOutcome::Superseded`].

use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

use crate::{
    Config, WeatherError,
    aggregate::{DayGrouping, aggregate_daily},
    config::DEFAULT_CITY,
    model::{CurrentConditions, DailyForecastEntry, Location, ProviderStatus, WeatherSnapshot},
    provider::{RESOLVE_LIMIT, WeatherProvider, provider_from_config},
    store::{CityStore, FileCityStore},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The result was published to subscribers.
    Applied,
    /// A newer fetch started meanwhile; this result was dropped.
    Superseded,
}

#[derive(Debug)]
struct Loaded {
    location: Location,
    weather: CurrentConditions,
    forecast: Vec<DailyForecastEntry>,
}

#[derive(Debug)]
pub struct WeatherState {
    provider: Arc<dyn WeatherProvider>,
    store: Arc<dyn CityStore>,
    grouping: DayGrouping,
    default_city: String,
    /// Generation of the latest started fetch. Held while committing results.
    generation: Mutex<u64>,
    tx: watch::Sender<WeatherSnapshot>,
}

impl WeatherState {
    pub fn new(provider: Arc<dyn WeatherProvider>, store: Arc<dyn CityStore>) -> Self {
        let (tx, _rx) = watch::channel(WeatherSnapshot {
            city: DEFAULT_CITY.to_string(),
            ..Default::default()
        });

        Self {
            provider,
            store,
            grouping: DayGrouping::default(),
            default_city: DEFAULT_CITY.to_string(),
            generation: Mutex::new(0),
            tx,
        }
    }

    /// Build the provider and file store described by `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let provider: Arc<dyn WeatherProvider> = Arc::from(provider_from_config(config));
        let store = Arc::new(FileCityStore::new(config.state_file_path()?));

        Ok(Self::new(provider, store)
            .with_default_city(config.default_city())
            .with_grouping(config.day_grouping))
    }

    pub fn with_default_city(mut self, city: &str) -> Self {
        self.default_city = city.to_string();
        self.tx.send_modify(|s| s.city = city.to_string());
        self
    }

    pub fn with_grouping(mut self, grouping: DayGrouping) -> Self {
        self.grouping = grouping;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<WeatherSnapshot> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> WeatherSnapshot {
        self.tx.borrow().clone()
    }

    pub fn provider(&self) -> &dyn WeatherProvider {
        self.provider.as_ref()
    }

    /// Restore the saved city (or fall back to the default) and fetch its weather.
    ///
    /// An unreadable saved record is logged and ignored.
    pub async fn initialize(&self) -> Result<FetchOutcome, WeatherError> {
        let city = match self.store.load() {
            Ok(Some(location)) => {
                tracing::info!(city = %location.city, "Restored saved city");
                let city = location.city.clone();
                self.tx.send_modify(|s| {
                    s.city = location.city.clone();
                    s.location = Some(location);
                });
                city
            }
            Ok(None) => {
                tracing::debug!(city = %self.default_city, "No saved city, using default");
                self.adopt_default()
            }
            Err(err) => {
                tracing::warn!(error = %err, city = %self.default_city, "Ignoring saved city");
                self.adopt_default()
            }
        };

        self.fetch_weather(&city).await
    }

    /// Resolve `city` and load its weather. The active city is left unchanged.
    pub async fn fetch_weather(&self, city: &str) -> Result<FetchOutcome, WeatherError> {
        let generation = self.begin();
        let result = self.resolve_and_load(city).await;
        self.finish(generation, result, None)
    }

    /// Like [`fetch_weather`](Self::fetch_weather), adopting `city` as the
    /// active city only if the fetch succeeds.
    pub async fn update_city(&self, city: &str) -> Result<FetchOutcome, WeatherError> {
        let generation = self.begin();
        let result = self.resolve_and_load(city).await;
        self.finish(generation, result, Some(city.to_string()))
    }

    /// Reload weather for the active location without geocoding again.
    pub async fn refresh(&self) -> Result<FetchOutcome, WeatherError> {
        let snapshot = self.snapshot();
        let Some(location) = snapshot.location else {
            return self.fetch_weather(&snapshot.city).await;
        };

        let generation = self.begin();
        let result = self.load_for(location).await;
        self.finish(generation, result, None)
    }

    /// Weather for any city without touching the active city, the published
    /// snapshot or the saved record.
    pub async fn lookup(&self, city: &str) -> Result<WeatherSnapshot, WeatherError> {
        let loaded = self.resolve_and_load(city).await?;
        tracing::debug!(city = %loaded.location.city, "Looked up city");

        Ok(WeatherSnapshot {
            city: city.trim().to_string(),
            location: Some(loaded.location),
            weather: Some(loaded.weather),
            forecast: loaded.forecast,
            status: ProviderStatus::Ready,
            fetched_at: Some(Utc::now()),
        })
    }

    fn adopt_default(&self) -> String {
        let city = self.default_city.clone();
        self.tx.send_modify(|s| s.city = city.clone());
        city
    }

    fn lock_generation(&self) -> MutexGuard<'_, u64> {
        self.generation.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin(&self) -> u64 {
        let mut generation = self.lock_generation();
        *generation += 1;
        self.tx.send_modify(|s| s.status = ProviderStatus::Loading);
        *generation
    }

    async fn resolve_and_load(&self, city: &str) -> Result<Loaded, WeatherError> {
        let query = city.trim();
        if query.is_empty() {
            return Err(WeatherError::CityNotFound(city.to_string()));
        }

        let location = self
            .provider
            .geocode(query, RESOLVE_LIMIT)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| WeatherError::CityNotFound(query.to_string()))?;

        tracing::debug!(
            query,
            city = %location.city,
            lat = location.lat,
            lon = location.lon,
            "Resolved city"
        );

        self.load_for(location).await
    }

    async fn load_for(&self, location: Location) -> Result<Loaded, WeatherError> {
        let (weather, samples) = tokio::try_join!(
            self.provider.current(location.lat, location.lon),
            self.provider.forecast(location.lat, location.lon),
        )?;

        let forecast = aggregate_daily(&samples, self.grouping);

        Ok(Loaded { location, weather, forecast })
    }

    fn finish(
        &self,
        generation: u64,
        result: Result<Loaded, WeatherError>,
        adopt_city: Option<String>,
    ) -> Result<FetchOutcome, WeatherError> {
        let latest = self.lock_generation();
        if *latest != generation {
            tracing::debug!(generation, latest = *latest, "Dropping superseded fetch");
            return Ok(FetchOutcome::Superseded);
        }

        match result {
            Ok(loaded) => {
                if let Err(err) = self.store.save(&loaded.location) {
                    tracing::warn!(error = %err, "Failed to persist city");
                }

                tracing::info!(
                    city = %loaded.location.city,
                    days = loaded.forecast.len(),
                    "Weather updated"
                );

                self.tx.send_modify(|s| {
                    if let Some(city) = adopt_city {
                        s.city = city;
                    }
                    s.location = Some(loaded.location);
                    s.weather = Some(loaded.weather);
                    s.forecast = loaded.forecast;
                    s.status = ProviderStatus::Ready;
                    s.fetched_at = Some(Utc::now());
                });

                Ok(FetchOutcome::Applied)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Weather fetch failed");

                self.tx.send_modify(|s| {
                    s.weather = None;
                    s.forecast.clear();
                    s.status = ProviderStatus::Error {
                        kind: err.kind(),
                        message: err.to_string(),
                    };
                });

                Err(err)
            }
        }
    }
}
