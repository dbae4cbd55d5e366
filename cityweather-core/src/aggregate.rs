//! Collapsing raw forecast samples into one summary per day.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{DailyForecastEntry, ForecastSample};

/// How samples are assigned to a day bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayGrouping {
    /// Bucket by short weekday name. Two dates sharing a weekday collapse together.
    #[default]
    Weekday,
    /// Bucket by local calendar date; the entry is still labelled by weekday.
    CalendarDate,
}

#[derive(Debug, PartialEq, Eq)]
enum BucketKey {
    Label(String),
    Date(NaiveDate),
}

#[derive(Debug)]
struct Bucket {
    key: BucketKey,
    day: String,
    temps: Vec<f64>,
    winds: Vec<f64>,
    humidities: Vec<f64>,
    pressures: Vec<f64>,
    conditions: Vec<String>,
    icon: String,
}

/// Aggregate samples into daily entries, ordered by first occurrence.
pub fn aggregate_daily(samples: &[ForecastSample], grouping: DayGrouping) -> Vec<DailyForecastEntry> {
    let mut buckets: Vec<Bucket> = Vec::new();

    for sample in samples {
        let day = sample.at.format("%a").to_string();
        let key = match grouping {
            DayGrouping::Weekday => BucketKey::Label(day.clone()),
            DayGrouping::CalendarDate => BucketKey::Date(sample.at.date_naive()),
        };

        let idx = match buckets.iter().position(|b| b.key == key) {
            Some(idx) => idx,
            None => {
                buckets.push(Bucket {
                    key,
                    day,
                    temps: Vec::new(),
                    winds: Vec::new(),
                    humidities: Vec::new(),
                    pressures: Vec::new(),
                    conditions: Vec::new(),
                    icon: sample.icon.clone(),
                });
                buckets.len() - 1
            }
        };

        let bucket = &mut buckets[idx];
        bucket.temps.push(sample.temp_c);
        bucket.winds.push(sample.wind_speed);
        bucket.humidities.push(sample.humidity_pct);
        bucket.pressures.push(sample.pressure_hpa);
        if !bucket.conditions.contains(&sample.condition) {
            bucket.conditions.push(sample.condition.clone());
        }
    }

    buckets
        .into_iter()
        .map(|b| DailyForecastEntry {
            day: b.day,
            temp_c: mean_rounded(&b.temps),
            wind_speed: mean_rounded(&b.winds),
            humidity_pct: mean_rounded(&b.humidities),
            pressure_hpa: mean_rounded(&b.pressures),
            condition: b.conditions.join(", "),
            icon: b.icon,
        })
        .collect()
}

/// Round half towards positive infinity, so 2.5 => 3 and -2.5 => -2.
pub fn round_half_up(value: f64) -> i32 {
    let floor = value.floor();
    let rounded = if value - floor >= 0.5 { floor + 1.0 } else { floor };
    rounded as i32
}

fn mean_rounded(values: &[f64]) -> i32 {
    if values.is_empty() {
        return 0;
    }
    round_half_up(values.iter().sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, FixedOffset, TimeZone};

    fn sample(at: DateTime<FixedOffset>, temp: f64, condition: &str, icon: &str) -> ForecastSample {
        ForecastSample {
            at,
            temp_c: temp,
            humidity_pct: 50.0,
            wind_speed: 3.0,
            pressure_hpa: 1010.0,
            condition: condition.to_string(),
            icon: icon.to_string(),
        }
    }

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .and_then(|tz| tz.with_ymd_and_hms(y, m, d, h, 0, 0).single())
            .expect("valid timestamp")
    }

    #[test]
    fn two_monday_samples_average() {
        // 2024-01-01 was a Monday.
        let samples = vec![
            sample(utc(2024, 1, 1, 0), 10.0, "clear sky", "01d"),
            sample(utc(2024, 1, 1, 3), 12.0, "clear sky", "01d"),
        ];

        let days = aggregate_daily(&samples, DayGrouping::Weekday);
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].day, "Mon");
        assert_eq!(days[0].temp_c, 11);
    }

    #[test]
    fn forty_sample_window_gives_five_days() {
        let start = utc(2024, 1, 1, 0);
        let samples: Vec<_> = (0..40)
            .map(|i| {
                let at = start + Duration::hours(3 * i);
                let condition = if i % 8 < 4 { "clear sky" } else { "light rain" };
                let icon = format!("icon-{i}");
                sample(at, i as f64, condition, &icon)
            })
            .collect();

        let days = aggregate_daily(&samples, DayGrouping::Weekday);
        let labels: Vec<_> = days.iter().map(|d| d.day.as_str()).collect();
        assert_eq!(labels, ["Mon", "Tue", "Wed", "Thu", "Fri"]);

        for (n, day) in days.iter().enumerate() {
            // temps 8n..8n+7, mean 8n+3.5, rounded up
            assert_eq!(day.temp_c, 8 * n as i32 + 4);
            assert_eq!(day.icon, format!("icon-{}", 8 * n));
            assert_eq!(day.condition, "clear sky, light rain");
        }
    }

    #[test]
    fn conditions_are_distinct_in_first_seen_order() {
        let samples = vec![
            sample(utc(2024, 1, 2, 0), 1.0, "overcast clouds", "04n"),
            sample(utc(2024, 1, 2, 3), 1.0, "light snow", "13n"),
            sample(utc(2024, 1, 2, 6), 1.0, "overcast clouds", "04d"),
        ];

        let days = aggregate_daily(&samples, DayGrouping::Weekday);
        assert_eq!(days[0].condition, "overcast clouds, light snow");
        assert_eq!(days[0].icon, "04n");
    }

    #[test]
    fn weekday_grouping_merges_dates_a_week_apart() {
        let samples = vec![
            sample(utc(2024, 1, 1, 12), 10.0, "a", "x"),
            sample(utc(2024, 1, 2, 12), 0.0, "b", "y"),
            sample(utc(2024, 1, 8, 12), 20.0, "c", "z"),
        ];

        let days = aggregate_daily(&samples, DayGrouping::Weekday);
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].day, "Mon");
        assert_eq!(days[0].temp_c, 15);
        assert_eq!(days[0].condition, "a, c");
        assert_eq!(days[1].day, "Tue");
    }

    #[test]
    fn calendar_grouping_keeps_dates_apart() {
        let samples = vec![
            sample(utc(2024, 1, 1, 12), 10.0, "a", "x"),
            sample(utc(2024, 1, 8, 12), 20.0, "c", "z"),
        ];

        let days = aggregate_daily(&samples, DayGrouping::CalendarDate);
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].day, "Mon");
        assert_eq!(days[1].day, "Mon");
        assert_eq!(days[1].temp_c, 20);
    }

    #[test]
    fn labels_follow_sample_offset() {
        // 22:00 UTC Sunday is already Monday at +05:30.
        let ist = FixedOffset::east_opt(5 * 3600 + 1800).expect("offset");
        let at = utc(2023, 12, 31, 22).with_timezone(&ist);

        let days = aggregate_daily(&[sample(at, 1.0, "a", "x")], DayGrouping::Weekday);
        assert_eq!(days[0].day, "Mon");
    }

    #[test]
    fn empty_input_is_empty_forecast() {
        assert!(aggregate_daily(&[], DayGrouping::Weekday).is_empty());
    }

    #[test]
    fn rounding_matches_half_up() {
        assert_eq!(round_half_up(15.4), 15);
        assert_eq!(round_half_up(2.5), 3);
        assert_eq!(round_half_up(-2.5), -2);
        assert_eq!(round_half_up(-2.6), -3);
    }

    #[test]
    fn rounding_just_below_half_goes_down() {
        // Adding 0.5 to this value would round up in floating point.
        assert_eq!(round_half_up(0.49999999999999994), 0);
        assert_eq!(round_half_up(-0.5), 0);
    }
}
