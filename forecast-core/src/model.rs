use chrono::NaiveDate;
use serde::Serialize;

use crate::condition::WeatherCode;

/// Number of daily entries requested from the provider and required in a [`ForecastSet`].
pub const FORECAST_DAYS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub name: &'static str,
}

impl Location {
    pub const LUDHIANA: Location =
        Location { latitude: 30.9009, longitude: 75.8573, name: "Ludhiana, Punjab" };
}

/// Current conditions at the moment of the fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherSnapshot {
    pub temperature_c: f64,
    pub apparent_temperature_c: f64,
    pub relative_humidity_pct: u8,
    pub precipitation_mm: f64,
    pub wind_speed_kmh: f64,
    pub wind_direction_deg: u16,
    pub weather_code: WeatherCode,
    pub is_day: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyForecastEntry {
    pub date: NaiveDate,
    pub weather_code: WeatherCode,
    pub temperature_max_c: f64,
    pub temperature_min_c: f64,
    pub precipitation_sum_mm: f64,
    pub wind_speed_max_kmh: f64,
}

/// Exactly [`FORECAST_DAYS`] daily entries, today first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastSet([DailyForecastEntry; FORECAST_DAYS]);

impl ForecastSet {
    pub fn today(&self) -> &DailyForecastEntry {
        &self.0[0]
    }

    pub fn days(&self) -> &[DailyForecastEntry] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DailyForecastEntry> {
        self.0.iter()
    }
}

impl TryFrom<Vec<DailyForecastEntry>> for ForecastSet {
    /// The rejected entries are handed back.
    type Error = Vec<DailyForecastEntry>;

    fn try_from(entries: Vec<DailyForecastEntry>) -> Result<Self, Self::Error> {
        let days: [DailyForecastEntry; FORECAST_DAYS] = entries.try_into()?;
        if days.windows(2).any(|w| w[0].date >= w[1].date) {
            return Err(days.into());
        }
        Ok(Self(days))
    }
}

impl<'a> IntoIterator for &'a ForecastSet {
    type Item = &'a DailyForecastEntry;
    type IntoIter = std::slice::Iter<'a, DailyForecastEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Everything a successful fetch yields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    pub current: WeatherSnapshot,
    pub daily: ForecastSet,
}
