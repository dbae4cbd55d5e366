//! Core library for the `cityweather` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The OpenWeather client behind the [`WeatherProvider`] trait
//! - Daily aggregation of 3-hour forecast samples
//! - Persistence of the last selected city
//! - [`WeatherState`], the observable store a front-end binds to
//!
//! It is used by `cityweather-cli`, but can also be reused by other front-ends.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod state;
pub mod store;

pub use aggregate::{DayGrouping, aggregate_daily};
pub use config::{Config, Endpoints};
pub use error::{ErrorKind, WeatherError};
pub use model::{
    CurrentConditions, DailyForecastEntry, ForecastSample, Location, ProviderStatus,
    WeatherSnapshot,
};
pub use provider::{WeatherProvider, openweather::OpenWeatherProvider, suggest_cities};
pub use state::{FetchOutcome, WeatherState};
pub use store::{CityStore, FileCityStore, MemoryCityStore};
