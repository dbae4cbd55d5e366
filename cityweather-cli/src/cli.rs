use std::{fmt, io::IsTerminal};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use cityweather_core::{
    CityStore, Config, DayGrouping, FileCityStore, Location, WeatherSnapshot, WeatherState,
    suggest_cities,
};
use inquire::{Select, Text};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "cityweather", version, about = "Current weather and 5-day forecast for a city")]
pub struct Cli {
    /// Log debug output to stderr (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the API key, default city and day grouping interactively.
    Configure,

    /// Show current conditions and forecast for the saved city.
    Show {
        /// Number of forecast days to print after today.
        #[arg(long, default_value_t = 5)]
        days: usize,
    },

    /// Look up any city's weather without changing the saved city.
    Search {
        city: String,

        /// Number of forecast days to print after today.
        #[arg(long, default_value_t = 5)]
        days: usize,
    },

    /// Change the saved city.
    SetCity {
        city: String,
    },

    /// List places matching a partial name and optionally pick one as the saved city.
    Suggest {
        query: String,

        /// Only print the matches, never prompt.
        #[arg(long)]
        list: bool,
    },

    /// Print the saved location without contacting the weather service.
    Saved,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = Config::load()?;

        match self.command {
            Command::Configure => configure(config),
            Command::Show { days } => {
                let state = WeatherState::from_config(&config)?;
                let result = state.initialize().await;
                let snapshot = settled(&state, result)?;
                print!("{}", render::current(&snapshot));
                print!("{}", render::forecast(&snapshot.forecast, days));
                Ok(())
            }
            Command::Search { city, days } => {
                let state = WeatherState::from_config(&config)?;
                let snapshot = state.lookup(&city).await?;
                print!("{}", render::current(&snapshot));
                print!("{}", render::forecast(&snapshot.forecast, days));
                Ok(())
            }
            Command::SetCity { city } => {
                let state = WeatherState::from_config(&config)?;
                let result = state.update_city(&city).await;
                let snapshot = settled(&state, result)?;
                if let Some(location) = &snapshot.location {
                    println!("Saved city: {}", render::place(location));
                }
                Ok(())
            }
            Command::Suggest { query, list } => {
                let state = WeatherState::from_config(&config)?;
                let places = suggest_cities(state.provider(), &query).await?;
                if places.is_empty() {
                    println!("No matches for \"{}\".", query.trim());
                    return Ok(());
                }

                if list || !std::io::stdin().is_terminal() {
                    for place in &places {
                        println!("{}", render::suggestion(place));
                    }
                    return Ok(());
                }

                let choices = places.into_iter().map(Choice).collect();
                let picked = Select::new("Save which city?", choices)
                    .prompt_skippable()
                    .context("City selection failed")?;
                let Some(Choice(place)) = picked else {
                    return Ok(());
                };

                let result = state.update_city(&place.city).await;
                let snapshot = settled(&state, result)?;
                if let Some(location) = &snapshot.location {
                    println!("Saved city: {}", render::place(location));
                }
                Ok(())
            }
            Command::Saved => {
                let store = FileCityStore::new(config.state_file_path()?);
                match store.load()? {
                    Some(location) => println!("{}", render::suggestion(&location)),
                    None => println!(
                        "No saved city at {}; using default {}.",
                        store.path().display(),
                        config.default_city()
                    ),
                }
                Ok(())
            }
        }
    }
}

/// A geocoding candidate as shown in the selection prompt.
struct Choice(Location);

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render::suggestion(&self.0))
    }
}

/// Turn a finished fetch into the snapshot to print, or the user-visible error.
fn settled<T>(
    state: &WeatherState,
    result: Result<T, cityweather_core::WeatherError>,
) -> anyhow::Result<WeatherSnapshot> {
    let snapshot = state.snapshot();
    if let Err(err) = result {
        bail!(snapshot.error().map(str::to_string).unwrap_or_else(|| err.to_string()));
    }
    Ok(snapshot)
}

fn configure(mut config: Config) -> anyhow::Result<()> {
    let key = Text::new("OpenWeather API key:")
        .with_default(config.api_key.as_deref().unwrap_or_default())
        .prompt()
        .context("API key prompt cancelled")?;
    config.api_key = Some(key.trim().to_string()).filter(|k| !k.is_empty());

    let city = Text::new("Default city:")
        .with_default(config.default_city())
        .prompt()
        .context("City prompt cancelled")?;
    config.default_city = Some(city.trim().to_string()).filter(|c| !c.is_empty());

    let options = vec!["weekday", "calendar_date"];
    let start = match config.day_grouping {
        DayGrouping::Weekday => 0,
        DayGrouping::CalendarDate => 1,
    };
    let grouping = Select::new("Group forecast samples by:", options)
        .with_starting_cursor(start)
        .prompt()
        .context("Grouping prompt cancelled")?;
    config.day_grouping = match grouping {
        "calendar_date" => DayGrouping::CalendarDate,
        _ => DayGrouping::Weekday,
    };

    config.save()?;
    println!("Configuration saved to {}", Config::config_file_path()?.display());
    Ok(())
}
