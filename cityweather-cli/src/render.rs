//! Plain-text rendering of weather snapshots.

use chrono::Local;
use cityweather_core::{DailyForecastEntry, Location, WeatherSnapshot};

pub fn place(location: &Location) -> String {
    match &location.state {
        Some(state) if !state.is_empty() => {
            format!("{}, {}, {}", location.city, state, location.country)
        }
        _ => format!("{}, {}", location.city, location.country),
    }
}

pub fn suggestion(location: &Location) -> String {
    format!("{}  (lat {:.2}, lon {:.2})", place(location), location.lat, location.lon)
}

pub fn current(snapshot: &WeatherSnapshot) -> String {
    let heading = snapshot.location.as_ref().map(place).unwrap_or_else(|| snapshot.city.clone());
    let mut lines = vec![heading];

    if let Some(w) = &snapshot.weather {
        lines.push(format!("  {}°C, {}", w.temp_c, w.condition));
        lines.push(format!("  Humidity  {}%", w.humidity_pct));
        lines.push(format!("  Wind      {} m/s", w.wind_speed));
        lines.push(format!("  Pressure  {} hPa", w.pressure_hpa));
    }

    if let Some(at) = snapshot.fetched_at {
        lines.push(format!("  Updated   {}", at.with_timezone(&Local).format("%Y-%m-%d %H:%M")));
    }

    block(lines)
}

/// Forecast table skipping the first (current) day, limited to `days` rows.
pub fn forecast(entries: &[DailyForecastEntry], days: usize) -> String {
    let rows: Vec<String> = entries
        .iter()
        .skip(1)
        .take(days)
        .map(|day| {
            format!(
                "  {:<4}{:>4}°C  {:>3}%  {:>3} m/s  {:>5} hPa  {}",
                day.day, day.temp_c, day.humidity_pct, day.wind_speed, day.pressure_hpa, day.condition
            )
        })
        .collect();

    if rows.is_empty() {
        return "\nNo forecast data available.\n".to_string();
    }

    let mut lines = vec![String::new(), "Forecast".to_string()];
    lines.extend(rows);
    block(lines)
}

fn block(lines: Vec<String>) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(day: &str) -> DailyForecastEntry {
        DailyForecastEntry {
            day: day.to_string(),
            temp_c: 11,
            wind_speed: 3,
            humidity_pct: 60,
            pressure_hpa: 1012,
            condition: "clear sky".into(),
            icon: String::new(),
        }
    }

    #[test]
    fn place_includes_state_when_present() {
        let mut loc = Location {
            city: "Springfield".into(),
            state: Some("Illinois".into()),
            country: "US".into(),
            lat: 39.8,
            lon: -89.644,
        };
        assert_eq!(place(&loc), "Springfield, Illinois, US");
        assert_eq!(suggestion(&loc), "Springfield, Illinois, US  (lat 39.80, lon -89.64)");

        loc.state = None;
        assert_eq!(place(&loc), "Springfield, US");
    }

    #[test]
    fn forecast_skips_today_and_limits_rows() {
        let entries: Vec<_> = ["Mon", "Tue", "Wed", "Thu"].iter().map(|d| entry(d)).collect();
        let out = forecast(&entries, 2);

        assert!(!out.contains("Mon"));
        assert!(out.contains("Tue"));
        assert!(out.contains("Wed"));
        assert!(!out.contains("Thu"));
    }

    #[test]
    fn current_lists_conditions_under_place() {
        let snapshot = WeatherSnapshot {
            city: "paris".into(),
            location: Some(Location {
                city: "Paris".into(),
                state: None,
                country: "FR".into(),
                lat: 48.85,
                lon: 2.35,
            }),
            weather: Some(cityweather_core::CurrentConditions {
                temp_c: 15,
                humidity_pct: 60,
                wind_speed: 3.2,
                pressure_hpa: 1012,
                condition: "clear sky".into(),
                icon: String::new(),
            }),
            ..Default::default()
        };

        assert_eq!(
            current(&snapshot),
            "Paris, FR\n  15°C, clear sky\n  Humidity  60%\n  Wind      3.2 m/s\n  Pressure  1012 hPa\n"
        );
    }

    #[test]
    fn empty_forecast_says_so() {
        assert!(forecast(&[entry("Mon")], 5).contains("No forecast data"));
    }
}
