//! Core library for the `forecast` CLI.
//!
//! This crate defines:
//! - The weather-code classification table (icons and descriptions)
//! - Shared domain models (current conditions, the 7-day forecast)
//! - The Open-Meteo provider and the fetch controller driving it
//! - A display-ready view of a loaded forecast
//! - Configuration handling
//!
//! It is used by `forecast-cli`, but can also be reused by other front-ends.

pub mod condition;
pub mod config;
pub mod controller;
pub mod error;
pub mod model;
pub mod provider;
pub mod view;

pub use condition::WeatherCode;
pub use config::Config;
pub use controller::{Command, FetchState, ForecastController, LoadKind, RefreshOutcome, RetryPolicy};
pub use error::{FailureKind, FetchError, FetchFailure};
pub use model::{DailyForecastEntry, FORECAST_DAYS, Forecast, ForecastSet, Location, WeatherSnapshot};
pub use provider::{ForecastProvider, provider_from_config};
pub use view::ForecastView;
