use std::path::PathBuf;

use thiserror::Error;

/// Failure of an update, handed verbatim to the update completion.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Weather API request failed with status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse weather response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to store weather data: {0}")]
    Store(#[from] StoreError),

    #[error(
        "No API key configured.\n\
         Hint: run `weatherly configure` and enter your OpenWeather API key."
    )]
    MissingApiKey,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on store file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to (de)serialize '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io { path: path.into(), source }
    }

    pub(crate) fn serialize(key: impl Into<String>, source: serde_json::Error) -> Self {
        StoreError::Serialize { key: key.into(), source }
    }
}
