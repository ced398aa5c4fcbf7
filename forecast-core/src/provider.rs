use crate::{Config, FetchError, Forecast, Location, provider::open_meteo::OpenMeteoProvider};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod open_meteo;

#[async_trait]
pub trait ForecastProvider: Send + Sync + Debug {
    /// Fetch current conditions and the daily forecast for `location`.
    async fn fetch(&self, location: &Location) -> Result<Forecast, FetchError>;
}

/// Construct the provider described by the `[provider]` config section.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Box<dyn ForecastProvider>> {
    let provider = OpenMeteoProvider::new(&config.provider.base_url, config.provider.timeout())?;
    Ok(Box::new(provider))
}
