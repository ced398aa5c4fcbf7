use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::{
    FetchError,
    condition::WeatherCode,
    model::{DailyForecastEntry, FORECAST_DAYS, Forecast, ForecastSet, Location, WeatherSnapshot},
};

use super::ForecastProvider;

pub const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,apparent_temperature,is_day,precipitation,weather_code,wind_speed_10m,wind_direction_10m";
pub const DAILY_FIELDS: &str =
    "weather_code,temperature_2m_max,temperature_2m_min,precipitation_sum,wind_speed_10m_max";

/// Client for the Open-Meteo forecast endpoint.
#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    base_url: String,
    http: Client,
}

impl OpenMeteoProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url: base_url.into(), http })
    }

    fn query(location: &Location) -> [(&'static str, String); 6] {
        [
            ("latitude", location.latitude.to_string()),
            ("longitude", location.longitude.to_string()),
            ("current", CURRENT_FIELDS.to_string()),
            ("daily", DAILY_FIELDS.to_string()),
            ("timezone", "auto".to_string()),
            ("forecast_days", FORECAST_DAYS.to_string()),
        ]
    }
}

#[async_trait]
impl ForecastProvider for OpenMeteoProvider {
    async fn fetch(&self, location: &Location) -> Result<Forecast, FetchError> {
        debug!(
            url = %self.base_url,
            latitude = location.latitude,
            longitude = location.longitude,
            "requesting forecast"
        );

        let res = self.http.get(&self.base_url).query(&Self::query(location)).send().await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(FetchError::HttpStatus { code: status.as_u16(), body: truncate_body(&body) });
        }

        parse_forecast(&body)
    }
}

/// Parse and validate an Open-Meteo response body.
pub fn parse_forecast(body: &str) -> Result<Forecast, FetchError> {
    let parsed: OmResponse = serde_json::from_str(body)?;

    Ok(Forecast { current: parsed.current.into_snapshot()?, daily: parsed.daily.into_forecast_set()? })
}

#[derive(Debug, Deserialize)]
struct OmResponse {
    current: OmCurrent,
    daily: OmDaily,
}

#[derive(Debug, Deserialize)]
struct OmCurrent {
    temperature_2m: f64,
    relative_humidity_2m: f64,
    apparent_temperature: f64,
    is_day: u8,
    precipitation: f64,
    weather_code: i32,
    wind_speed_10m: f64,
    wind_direction_10m: f64,
}

impl OmCurrent {
    fn into_snapshot(self) -> Result<WeatherSnapshot, FetchError> {
        if !(0.0..=100.0).contains(&self.relative_humidity_2m) {
            return Err(schema(format!(
                "current.relative_humidity_2m out of range: {}",
                self.relative_humidity_2m
            )));
        }
        if self.wind_direction_10m < 0.0 || !self.wind_direction_10m.is_finite() {
            return Err(schema(format!(
                "current.wind_direction_10m out of range: {}",
                self.wind_direction_10m
            )));
        }

        Ok(WeatherSnapshot {
            temperature_c: self.temperature_2m,
            apparent_temperature_c: self.apparent_temperature,
            relative_humidity_pct: self.relative_humidity_2m.round() as u8,
            precipitation_mm: non_negative(self.precipitation, "current.precipitation")?,
            wind_speed_kmh: non_negative(self.wind_speed_10m, "current.wind_speed_10m")?,
            wind_direction_deg: (self.wind_direction_10m.round() as u32 % 360) as u16,
            weather_code: WeatherCode(self.weather_code),
            is_day: self.is_day != 0,
        })
    }
}

/// Parallel arrays: index `i` of every field describes the same day.
#[derive(Debug, Deserialize)]
struct OmDaily {
    time: Vec<String>,
    weather_code: Vec<Option<i32>>,
    temperature_2m_max: Vec<Option<f64>>,
    temperature_2m_min: Vec<Option<f64>>,
    precipitation_sum: Vec<Option<f64>>,
    wind_speed_10m_max: Vec<Option<f64>>,
}

impl OmDaily {
    fn into_forecast_set(self) -> Result<ForecastSet, FetchError> {
        let lengths = [
            ("time", self.time.len()),
            ("weather_code", self.weather_code.len()),
            ("temperature_2m_max", self.temperature_2m_max.len()),
            ("temperature_2m_min", self.temperature_2m_min.len()),
            ("precipitation_sum", self.precipitation_sum.len()),
            ("wind_speed_10m_max", self.wind_speed_10m_max.len()),
        ];

        if lengths.iter().any(|(_, len)| *len != FORECAST_DAYS) {
            let found = lengths
                .iter()
                .map(|(name, len)| format!("{name}={len}"))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(schema(format!(
                "expected {FORECAST_DAYS} entries in every daily array, got {found}"
            )));
        }

        let mut entries = Vec::with_capacity(FORECAST_DAYS);
        for (i, time) in self.time.iter().enumerate() {
            let date = NaiveDate::parse_from_str(time, "%Y-%m-%d")
                .map_err(|e| schema(format!("daily.time[{i}] '{time}' is not a date: {e}")))?;

            entries.push(DailyForecastEntry {
                date,
                weather_code: WeatherCode(present(&self.weather_code, "weather_code", i)?),
                temperature_max_c: present(&self.temperature_2m_max, "temperature_2m_max", i)?,
                temperature_min_c: present(&self.temperature_2m_min, "temperature_2m_min", i)?,
                precipitation_sum_mm: present(&self.precipitation_sum, "precipitation_sum", i)?,
                wind_speed_max_kmh: present(&self.wind_speed_10m_max, "wind_speed_10m_max", i)?,
            });
        }

        ForecastSet::try_from(entries)
            .map_err(|_| schema("daily.time is not strictly chronological".to_string()))
    }
}

fn present<T: Copy>(values: &[Option<T>], field: &str, idx: usize) -> Result<T, FetchError> {
    values
        .get(idx)
        .copied()
        .flatten()
        .ok_or_else(|| schema(format!("daily.{field}[{idx}] is missing")))
}

fn non_negative(value: f64, field: &str) -> Result<f64, FetchError> {
    if value >= 0.0 { Ok(value) } else { Err(schema(format!("{field} is negative: {value}"))) }
}

fn schema(msg: String) -> FetchError {
    FetchError::Schema(msg)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_response() {
        let forecast = parse_forecast(&fixtures::response().to_string()).expect("valid fixture");

        assert_eq!(forecast.current.relative_humidity_pct, 58);
        assert_eq!(forecast.current.wind_direction_deg, 285);
        assert_eq!(forecast.current.weather_code, WeatherCode(1));
        assert!(forecast.current.is_day);

        assert_eq!(forecast.daily.days().len(), FORECAST_DAYS);
        assert_eq!(forecast.daily.today().date, NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
        assert_eq!(forecast.daily.days()[4].weather_code, WeatherCode(95));
        assert_eq!(forecast.daily.days()[6].temperature_min_c, -0.5);
    }

    #[test]
    fn night_flag_is_read_from_integer() {
        let mut body = fixtures::response();
        body["current"]["is_day"] = 0.into();
        let forecast = parse_forecast(&body.to_string()).expect("valid");
        assert!(!forecast.current.is_day);
    }

    #[test]
    fn rejects_short_daily_arrays() {
        let mut body = fixtures::response();
        for field in ["time", "weather_code", "temperature_2m_max", "temperature_2m_min"] {
            body["daily"][field].as_array_mut().unwrap().pop();
        }
        let err = parse_forecast(&body.to_string()).unwrap_err();
        assert!(matches!(err, FetchError::Schema(ref msg) if msg.contains("time=6")), "{err}");
    }

    #[test]
    fn rejects_misaligned_daily_arrays() {
        let mut body = fixtures::response();
        body["daily"]["temperature_2m_min"].as_array_mut().unwrap().pop();
        let err = parse_forecast(&body.to_string()).unwrap_err();
        assert!(
            matches!(err, FetchError::Schema(ref msg) if msg.contains("temperature_2m_min=6")),
            "{err}"
        );
    }

    #[test]
    fn rejects_null_daily_value() {
        let mut body = fixtures::response();
        body["daily"]["temperature_2m_max"][3] = serde_json::Value::Null;
        let err = parse_forecast(&body.to_string()).unwrap_err();
        assert!(matches!(err, FetchError::Schema(ref msg) if msg.contains("temperature_2m_max[3]")));
    }

    #[test]
    fn rejects_missing_current_object() {
        let mut body = fixtures::response();
        body.as_object_mut().unwrap().remove("current");
        let err = parse_forecast(&body.to_string()).unwrap_err();
        assert!(matches!(err, FetchError::Schema(_)), "{err}");
    }

    #[test]
    fn rejects_bad_date() {
        let mut body = fixtures::response();
        body["daily"]["time"][2] = "20th October".into();
        let err = parse_forecast(&body.to_string()).unwrap_err();
        assert!(matches!(err, FetchError::Schema(ref msg) if msg.contains("daily.time[2]")));
    }

    #[test]
    fn rejects_humidity_above_hundred() {
        let mut body = fixtures::response();
        body["current"]["relative_humidity_2m"] = 140.into();
        assert!(matches!(parse_forecast(&body.to_string()), Err(FetchError::Schema(_))));
    }

    #[test]
    fn wind_direction_wraps_at_full_circle() {
        let mut body = fixtures::response();
        body["current"]["wind_direction_10m"] = 360.into();
        let forecast = parse_forecast(&body.to_string()).expect("valid");
        assert_eq!(forecast.current.wind_direction_deg, 0);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = parse_forecast("<html>upstream timeout</html>").unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[test]
    fn query_carries_location_and_fields() {
        let query = OpenMeteoProvider::query(&Location::LUDHIANA);
        assert!(query.contains(&("latitude", "30.9009".to_string())));
        assert!(query.contains(&("longitude", "75.8573".to_string())));
        assert!(query.contains(&("timezone", "auto".to_string())));
        assert!(query.contains(&("forecast_days", "7".to_string())));
        assert!(query.contains(&("current", CURRENT_FIELDS.to_string())));
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let long = "é".repeat(300);
        let cut = truncate_body(&long);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), 203);
        assert_eq!(truncate_body("short"), "short");
    }
}
