//! Orchestration between the remote client and the local store.
//!
//! [`WeatherInteractor`] keeps no copy of any data: every read goes to the
//! store, and derived views are computed on each call.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::{
    client::WeatherClient,
    error::{StoreError, WeatherError},
    model::{Current, Daily, Hourly, Location, WeatherSnapshot},
    store::{CollectionChange, LocalStore, LocalStoreExt, NotificationToken},
};

/// Upper bound on the number of hourly entries returned by [`WeatherInteractor::hours`].
pub const HOURS_IN_DAY: usize = 24;

/// State a pending fetch may outlive. Fetches hold it weakly.
#[derive(Debug)]
struct Shared {
    store: Arc<dyn LocalStore>,
    location_subscription: Mutex<Option<NotificationToken>>,
}

#[derive(Debug)]
pub struct WeatherInteractor {
    shared: Arc<Shared>,
    client: Arc<dyn WeatherClient>,
}

impl WeatherInteractor {
    pub fn new(store: Arc<dyn LocalStore>, client: Arc<dyn WeatherClient>) -> Self {
        Self {
            shared: Arc::new(Shared { store, location_subscription: Mutex::new(None) }),
            client,
        }
    }

    pub fn selected_location(&self) -> Option<Location> {
        self.shared.store.get_object()
    }

    pub fn current(&self) -> Option<Current> {
        self.snapshot()?.current
    }

    /// The first [`HOURS_IN_DAY`] hourly entries, in stored order.
    pub fn hours(&self) -> Vec<Hourly> {
        let Some(snapshot) = self.snapshot() else {
            return Vec::new();
        };

        let mut hours = snapshot.hourly;
        hours.truncate(HOURS_IN_DAY);
        hours
    }

    pub fn days(&self) -> Vec<Daily> {
        self.snapshot().map(|snapshot| snapshot.daily).unwrap_or_default()
    }

    /// Offset from UTC, in seconds, of the snapshot's location.
    pub fn timezone_offset(&self) -> Option<i32> {
        self.snapshot().map(|snapshot| snapshot.timezone_offset)
    }

    fn snapshot(&self) -> Option<WeatherSnapshot> {
        self.shared.store.get_object()
    }

    /// Fetch weather for the selected location and replace the stored snapshot.
    ///
    /// Returns immediately. `completion` later receives `Ok(true)` once the new
    /// snapshot is stored, or the fetch error; on error the stored snapshot is
    /// left as it was.
    ///
    /// Nothing happens, and `completion` is never called, when no location
    /// with coordinates is stored. In that case `None` is returned.
    ///
    /// If the interactor is dropped before the response arrives, the response
    /// is discarded and `completion` is never called.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn update_weather_data<F>(&self, completion: F) -> Option<JoinHandle<()>>
    where
        F: FnOnce(Result<bool, WeatherError>) + Send + 'static,
    {
        let Some((lat, lon)) = self.selected_location().and_then(|loc| loc.coordinates()) else {
            tracing::warn!("No location with coordinates stored, skipping weather update");
            return None;
        };

        let lat = format_coordinate(lat);
        let lon = format_coordinate(lon);
        let client = Arc::clone(&self.client);
        let shared = Arc::downgrade(&self.shared);

        tracing::info!(%lat, %lon, "Updating weather data");

        Some(tokio::spawn(async move {
            let result = client.get_hourly(&lat, &lon).await;

            let Some(shared) = shared.upgrade() else {
                tracing::debug!("Interactor dropped before the response arrived, discarding it");
                return;
            };

            match result {
                Ok(snapshot) => match shared.store.add_or_update(&snapshot) {
                    Ok(()) => {
                        tracing::info!(
                            hourly = snapshot.hourly.len(),
                            daily = snapshot.daily.len(),
                            "Weather data updated"
                        );
                        completion(Ok(true));
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "Failed to store weather data");
                        completion(Err(err.into()));
                    }
                },
                Err(err) => {
                    tracing::warn!(error = %err, "Weather update failed");
                    completion(Err(err));
                }
            }
        }))
    }

    /// Store `location` as the selected location, replacing any previous one.
    pub fn save(&self, location: &Location) -> Result<(), StoreError> {
        tracing::debug!(location = %location.display_name(), "Saving selected location");
        self.shared.store.add_or_update(location)
    }

    /// Deliver every later change to the selected location to `completion`.
    ///
    /// Only one subscription is kept: a new call releases the previous one
    /// before registering.
    pub fn subscribe_location_notification<F>(&self, completion: F)
    where
        F: Fn(CollectionChange) + Send + Sync + 'static,
    {
        let mut slot = self.shared.location_subscription.lock();
        if let Some(previous) = slot.take() {
            previous.invalidate();
        }
        *slot = Some(self.shared.store.observe_changes::<Location, _>(completion));
    }

    pub fn unsubscribe_location_notification(&self) {
        if let Some(token) = self.shared.location_subscription.lock().take() {
            token.invalidate();
        }
    }
}

/// Decimal text for a coordinate, always with a fractional part ("10.0", not "10").
fn format_coordinate(value: f64) -> String {
    let text = value.to_string();
    if text.contains('.') { text } else { format!("{text}.0") }
}
