use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The location weather is fetched for.
///
/// Coordinates are optional: a location picked by name may not have been
/// geocoded yet, and such a location is never sent to the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Location {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            country: None,
            state: None,
            latitude: Some(latitude),
            longitude: Some(longitude),
        }
    }

    /// Both coordinates, if set and finite.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => Some((lat, lon)),
            _ => None,
        }
    }

    /// "Name, State, Country" with the missing parts left out.
    pub fn display_name(&self) -> String {
        [Some(self.name.as_str()), self.state.as_deref(), self.country.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A weather condition entry as reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub id: i32,
    pub main: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Current {
    pub dt: i64,
    #[serde(default)]
    pub sunrise: Option<i64>,
    #[serde(default)]
    pub sunset: Option<i64>,
    pub temp: f64,
    pub feels_like: f64,
    #[serde(default)]
    pub pressure: u32,
    pub humidity: u8,
    #[serde(default)]
    pub uvi: f64,
    #[serde(default)]
    pub clouds: u8,
    #[serde(default)]
    pub visibility: Option<u32>,
    pub wind_speed: f64,
    #[serde(default)]
    pub wind_deg: u16,
    #[serde(default)]
    pub weather: Vec<Condition>,
}

impl Current {
    pub fn time(&self) -> Option<DateTime<Utc>> {
        unix_to_utc(self.dt)
    }

    pub fn condition(&self) -> Option<&Condition> {
        self.weather.first()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hourly {
    pub dt: i64,
    pub temp: f64,
    pub feels_like: f64,
    pub humidity: u8,
    /// Probability of precipitation, 0.0..=1.0.
    #[serde(default)]
    pub pop: f64,
    pub wind_speed: f64,
    #[serde(default)]
    pub weather: Vec<Condition>,
}

impl Hourly {
    pub fn time(&self) -> Option<DateTime<Utc>> {
        unix_to_utc(self.dt)
    }

    pub fn condition(&self) -> Option<&Condition> {
        self.weather.first()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTemp {
    pub day: f64,
    pub min: f64,
    pub max: f64,
    pub night: f64,
    pub eve: f64,
    pub morn: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Daily {
    pub dt: i64,
    pub sunrise: i64,
    pub sunset: i64,
    pub temp: DailyTemp,
    pub humidity: u8,
    #[serde(default)]
    pub pop: f64,
    pub wind_speed: f64,
    #[serde(default)]
    pub weather: Vec<Condition>,
}

impl Daily {
    pub fn time(&self) -> Option<DateTime<Utc>> {
        unix_to_utc(self.dt)
    }

    pub fn condition(&self) -> Option<&Condition> {
        self.weather.first()
    }
}

/// Everything one fetch returns. Replaced as a whole on every successful
/// update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lon")]
    pub longitude: f64,
    #[serde(default)]
    pub timezone: String,
    #[serde(default)]
    pub timezone_offset: i32,
    #[serde(default)]
    pub current: Option<Current>,
    #[serde(default)]
    pub hourly: Vec<Hourly>,
    #[serde(default)]
    pub daily: Vec<Daily>,
}

pub(crate) fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}
