//! Display-ready view of a loaded forecast.
//!
//! Everything here is plain text; colours and layout are up to the front-end.

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::{DailyForecastEntry, Forecast, Location};

pub const LOADING_TEXT: &str = "Loading weather data...";
pub const ERROR_TEXT: &str = "Unable to load weather data";
pub const FORECAST_TITLE: &str = "7-Day Forecast";
pub const TODAY_LABEL: &str = "Today";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Theme {
    Day,
    Night,
}

impl Theme {
    pub fn for_daylight(is_day: bool) -> Self {
        if is_day { Theme::Day } else { Theme::Night }
    }

    /// Top and bottom colour of the background gradient.
    pub fn gradient(self) -> [&'static str; 2] {
        match self {
            Theme::Day => ["#4A90E2", "#7BB3F0"],
            Theme::Night => ["#2C3E50", "#34495E"],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentView {
    pub icon: &'static str,
    pub temperature: String,
    pub description: &'static str,
    pub feels_like: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detail {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayRow {
    pub label: String,
    pub icon: &'static str,
    pub description: &'static str,
    pub high: String,
    pub low: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForecastView {
    pub location: &'static str,
    pub date_heading: String,
    pub theme: Theme,
    pub current: CurrentView,
    pub details: Vec<Detail>,
    pub days: Vec<DayRow>,
}

impl ForecastView {
    /// `today` is the viewer's local date, used only for the heading.
    pub fn new(forecast: &Forecast, location: &Location, today: NaiveDate) -> Self {
        let current = &forecast.current;

        Self {
            location: location.name,
            date_heading: today.format("%A, %B %-d, %Y").to_string(),
            theme: Theme::for_daylight(current.is_day),
            current: CurrentView {
                icon: current.weather_code.icon(current.is_day),
                temperature: format!("{}°C", round_half_up(current.temperature_c)),
                description: current.weather_code.description(),
                feels_like: format!("Feels like {}°C", round_half_up(current.apparent_temperature_c)),
            },
            details: vec![
                Detail { label: "💧 Humidity", value: format!("{}%", current.relative_humidity_pct) },
                Detail {
                    label: "🌧️ Precipitation",
                    value: format!("{} mm", current.precipitation_mm),
                },
                Detail { label: "💨 Wind Speed", value: format!("{} km/h", current.wind_speed_kmh) },
                Detail {
                    label: "🧭 Wind Direction",
                    value: format!("{}°", current.wind_direction_deg),
                },
            ],
            days: forecast.daily.iter().enumerate().map(|(i, day)| day_row(i, day)).collect(),
        }
    }
}

fn day_row(index: usize, day: &DailyForecastEntry) -> DayRow {
    let label =
        if index == 0 { TODAY_LABEL.to_string() } else { day.date.format("%a, %b %-d").to_string() };

    DayRow {
        label,
        // Daily rows always use the daytime glyph.
        icon: day.weather_code.icon(true),
        description: day.weather_code.description(),
        high: format!("{}°", round_half_up(day.temperature_max_c)),
        low: format!("{}°", round_half_up(day.temperature_min_c)),
    }
}

/// Round to the nearest integer, halves towards positive infinity (-2.5 -> -2).
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}
