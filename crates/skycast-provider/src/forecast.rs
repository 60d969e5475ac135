//! Reduction of the upstream 3-hourly forecast feed into daily entries.
//!
//! Points are bucketed by UTC calendar date in encounter order, and only
//! the first five buckets survive. The feed normally arrives sorted, so
//! encounter order and date order coincide; when they don't, encounter
//! order wins. That matches the behavior clients already depend on.

use chrono::NaiveDate;

use crate::types::{
    timestamp_to_utc, ApiForecastPoint, ForecastDay, ForecastTemperature, ForecastWind,
    WeatherDescriptor,
};

const MAX_FORECAST_DAYS: usize = 5;

struct DayBucket {
    date: NaiveDate,
    temp_min: f64,
    temp_max: f64,
    humidity: Vec<f64>,
    wind_speed: Vec<f64>,
    weather: Vec<WeatherDescriptor>,
}

impl DayBucket {
    fn new(date: NaiveDate) -> Self {
        Self {
            date,
            temp_min: f64::INFINITY,
            temp_max: f64::NEG_INFINITY,
            humidity: Vec::new(),
            wind_speed: Vec::new(),
            weather: Vec::new(),
        }
    }

    fn absorb(&mut self, point: &ApiForecastPoint) {
        self.temp_min = self.temp_min.min(point.main.temp_min);
        self.temp_max = self.temp_max.max(point.main.temp_max);
        self.humidity.push(point.main.humidity);
        self.wind_speed.push(point.wind.speed);
        if let Some(descriptor) = point.weather.first() {
            self.weather.push(WeatherDescriptor {
                main: descriptor.main.clone(),
                description: descriptor.description.clone(),
                icon: descriptor.icon.clone(),
            });
        }
    }
}

/// Reduce the raw feed to at most five `ForecastDay`s.
///
/// Per retained day: true min/max over the point-level min/max fields,
/// the descriptor at the positional midpoint of the day's list, mean
/// humidity rounded to an integer, and mean wind speed rounded to one
/// decimal place.
pub fn reduce_forecast(points: &[ApiForecastPoint]) -> Vec<ForecastDay> {
    let mut buckets: Vec<DayBucket> = Vec::new();

    for point in points {
        let date = timestamp_to_utc(point.dt).date_naive();
        match buckets.iter_mut().find(|b| b.date == date) {
            Some(bucket) => bucket.absorb(point),
            None => {
                let mut bucket = DayBucket::new(date);
                bucket.absorb(point);
                buckets.push(bucket);
            }
        }
    }

    buckets
        .into_iter()
        .take(MAX_FORECAST_DAYS)
        .filter_map(|bucket| {
            // A bucket always has at least one point, so the midpoint
            // descriptor exists unless the feed omitted descriptors.
            let midpoint = bucket.weather.len() / 2;
            let weather = bucket.weather.get(midpoint).cloned()?;
            Some(ForecastDay {
                date: bucket.date,
                temperature: ForecastTemperature {
                    min: round_half_up(bucket.temp_min),
                    max: round_half_up(bucket.temp_max),
                },
                weather,
                humidity: mean(&bucket.humidity).round() as i64,
                wind: ForecastWind {
                    speed: (mean(&bucket.wind_speed) * 10.0).round() / 10.0,
                },
            })
        })
        .collect()
}

/// Round with halves going toward positive infinity, so -6.5 becomes -6.
/// Temperatures go negative; `f64::round` would pull halves away from
/// zero and change stored values.
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
