use crate::{Config, WeatherSnapshot, error::WeatherError};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod openweather;

pub use openweather::OpenWeatherClient;

/// Remote source of weather snapshots.
#[async_trait]
pub trait WeatherClient: Send + Sync + Debug {
    /// Fetch current, hourly and daily weather for the given coordinates,
    /// passed as decimal strings.
    async fn get_hourly(&self, lat: &str, lon: &str) -> Result<WeatherSnapshot, WeatherError>;
}

/// Client for front ends that only read the local store. Never makes a
/// request; every fetch fails with [`WeatherError::MissingApiKey`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineClient;

#[async_trait]
impl WeatherClient for OfflineClient {
    async fn get_hourly(&self, _lat: &str, _lon: &str) -> Result<WeatherSnapshot, WeatherError> {
        Err(WeatherError::MissingApiKey)
    }
}

/// Construct the default client from config.
pub fn client_from_config(config: &Config) -> Result<Arc<dyn WeatherClient>, WeatherError> {
    Ok(Arc::new(OpenWeatherClient::from_config(config)?))
}
