use async_trait::async_trait;
use reqwest::Client;

use crate::{
    config::{Config, DEFAULT_BASE_URL, Units},
    error::WeatherError,
    model::WeatherSnapshot,
};

use super::WeatherClient;

const ONECALL_PATH: &str = "/data/2.5/onecall";
const EXCLUDE: &str = "minutely,alerts";

/// Client for the OpenWeather One Call API.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    api_key: String,
    base_url: String,
    units: Units,
    language: String,
    http: Client,
}

impl OpenWeatherClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            units: Units::default(),
            language: "en".to_string(),
            http: Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, WeatherError> {
        let api_key = config.api_key()?.to_owned();
        let http = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            units: config.units,
            language: config.language.clone(),
            http,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_units(mut self, units: Units) -> Self {
        self.units = units;
        self
    }
}

#[async_trait]
impl WeatherClient for OpenWeatherClient {
    async fn get_hourly(&self, lat: &str, lon: &str) -> Result<WeatherSnapshot, WeatherError> {
        let url = format!("{}{}", self.base_url, ONECALL_PATH);

        tracing::debug!(%lat, %lon, units = %self.units, "Requesting OpenWeather one call");

        let res = self
            .http
            .get(&url)
            .query(&[
                ("lat", lat),
                ("lon", lon),
                ("exclude", EXCLUDE),
                ("units", self.units.as_str()),
                ("lang", self.language.as_str()),
                ("appid", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(WeatherError::Api { status: status.as_u16(), body: truncate_body(&body) });
        }

        let snapshot: WeatherSnapshot = serde_json::from_str(&body)?;

        tracing::debug!(
            hourly = snapshot.hourly.len(),
            daily = snapshot.daily.len(),
            "Parsed OpenWeather response"
        );

        Ok(snapshot)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        format!("{}...", body.chars().take(MAX).collect::<String>())
    } else {
        body.to_string()
    }
}
