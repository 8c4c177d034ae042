use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Select, Text};
use tokio::sync::oneshot;
use weatherly_core::{
    Config, FileStore, Location, OfflineClient, Units, WeatherClient, WeatherInteractor,
    client_from_config,
};

use crate::render::{Renderer, describe_change};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weatherly", version, about = "Weather for your selected location")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure the OpenWeather API key and display preferences.
    Configure,

    /// Select the location to fetch weather for.
    Locate {
        /// Place name, e.g. "Oslo".
        name: String,

        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        #[arg(long)]
        country: Option<String>,

        #[arg(long)]
        state: Option<String>,
    },

    /// Fetch fresh weather data for the selected location.
    Update,

    /// Show stored weather data.
    Show {
        /// Include the next 24 hours.
        #[arg(long)]
        hours: bool,

        /// Include the daily forecast.
        #[arg(long)]
        days: bool,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Locate { name, lat, lon, country, state } => {
                let location =
                    Location { name, country, state, latitude: Some(lat), longitude: Some(lon) };
                locate(&Session::open(false)?, location)
            }
            Command::Update => update(&Session::open(true)?).await,
            Command::Show { hours, days } => {
                show(&Session::open(false)?, hours, days);
                Ok(())
            }
        }
    }
}

/// Loaded config plus the interactor wired to the on-disk store.
///
/// Only `online` sessions need an API key; the others read and write the
/// store without ever reaching the network.
struct Session {
    config: Config,
    interactor: WeatherInteractor,
}

impl Session {
    fn open(online: bool) -> anyhow::Result<Self> {
        Self::with_config(Config::load()?, online)
    }

    fn with_config(config: Config, online: bool) -> anyhow::Result<Self> {
        let store_path = config.store_path()?;
        let store = FileStore::open(&store_path)
            .with_context(|| format!("Failed to open store: {}", store_path.display()))?;
        let client: Arc<dyn WeatherClient> =
            if online { client_from_config(&config)? } else { Arc::new(OfflineClient) };

        tracing::debug!(store = %store_path.display(), online, "Session opened");

        let interactor = WeatherInteractor::new(Arc::new(store), client);
        Ok(Self { config, interactor })
    }

    fn renderer(&self, timezone_offset: i32) -> Renderer {
        Renderer::new(self.config.units, timezone_offset)
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()?;
    config.set_api_key(api_key);

    let start = Units::all().iter().position(|u| *u == config.units).unwrap_or(0);
    config.units = Select::new("Units:", Units::all().to_vec()).with_starting_cursor(start).prompt()?;

    config.language = Text::new("Language code:").with_default(&config.language).prompt()?;

    config.save()?;
    println!("Configuration saved to {}", Config::config_file_path()?.display());
    Ok(())
}

fn locate(session: &Session, location: Location) -> anyhow::Result<()> {
    session.interactor.subscribe_location_notification(|change| {
        println!("{}", describe_change(&change));
    });

    session.interactor.save(&location)?;
    session.interactor.unsubscribe_location_notification();

    let renderer = session.renderer(0);
    if let Some(selected) = session.interactor.selected_location() {
        println!("{}", renderer.location(&selected));
    }
    println!("Run `weatherly update` to fetch weather for it.");
    Ok(())
}

async fn update(session: &Session) -> anyhow::Result<()> {
    let (tx, rx) = oneshot::channel();

    let Some(handle) = session.interactor.update_weather_data(move |result| {
        let _ = tx.send(result);
    }) else {
        println!(
            "No location selected.\n\
             Hint: run `weatherly locate <name> --lat <lat> --lon <lon>` first."
        );
        return Ok(());
    };

    handle.await.context("Weather update task failed")?;
    if let Err(err) = rx.await.context("Weather update finished without reporting a result")? {
        tracing::debug!(error = ?err, "Update reported an error");
        return Err(err.into());
    }

    show(session, true, false);
    Ok(())
}

fn show(session: &Session, hours: bool, days: bool) {
    for line in show_lines(session, hours, days) {
        println!("{line}");
    }
}

fn show_lines(session: &Session, hours: bool, days: bool) -> Vec<String> {
    let interactor = &session.interactor;

    let Some(location) = interactor.selected_location() else {
        return vec!["No location selected.".to_string()];
    };

    let renderer = session.renderer(interactor.timezone_offset().unwrap_or_default());
    let mut lines = vec![renderer.location(&location)];

    match interactor.current() {
        Some(current) => lines.push(renderer.current(&current)),
        None => {
            lines.push("No weather data yet. Run `weatherly update`.".to_string());
            return lines;
        }
    }

    if hours {
        lines.push("\nNext hours:".to_string());
        lines.extend(interactor.hours().iter().map(|hour| format!("  {}", renderer.hour(hour))));
    }

    if days {
        lines.push("\nDays:".to_string());
        lines.extend(interactor.days().iter().map(|day| format!("  {}", renderer.day(day))));
    }

    tracing::debug!(lines = lines.len(), "Rendered stored weather");
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &tempfile::TempDir) -> Config {
        Config { data_file: Some(dir.path().join("store.json")), ..Config::default() }
    }

    #[test]
    fn locate_then_show_without_api_key() {
        let dir = tempfile::tempdir().unwrap();

        let session = Session::with_config(config_in(&dir), false).unwrap();
        locate(&session, Location::new("Oslo", 59.91, 10.75)).unwrap();

        let reopened = Session::with_config(config_in(&dir), false).unwrap();
        let lines = show_lines(&reopened, true, true);

        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("Oslo"));
        assert!(lines[1].starts_with("No weather data yet"));
    }

    #[test]
    fn show_before_locate() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::with_config(config_in(&dir), false).unwrap();

        assert_eq!(show_lines(&session, false, false), vec!["No location selected.".to_string()]);
    }

    #[test]
    fn update_session_requires_api_key() {
        let dir = tempfile::tempdir().unwrap();

        assert!(Session::with_config(config_in(&dir), true).is_err());

        let config = Config { api_key: Some("KEY".into()), ..config_in(&dir) };
        assert!(Session::with_config(config, true).is_ok());
    }
}
