//! Core library for the `weatherly` app.
//!
//! This crate defines:
//! - Shared domain models (location, weather snapshot)
//! - A local object store with single-slot entities and change notifications
//! - Abstraction over the remote weather client
//! - The interactor that syncs the two and exposes derived views
//! - Configuration & credentials handling
//!
//! It is used by `weatherly-cli`, but any front end can drive it.

pub mod client;
pub mod config;
pub mod error;
pub mod interactor;
pub mod model;
pub mod store;

pub use client::{OfflineClient, OpenWeatherClient, WeatherClient, client_from_config};
pub use config::{Config, Units};
pub use error::{StoreError, WeatherError};
pub use interactor::WeatherInteractor;
pub use model::{Condition, Current, Daily, DailyTemp, Hourly, Location, WeatherSnapshot};
pub use store::{
    CollectionChange, Entity, FileStore, LocalStore, LocalStoreExt, MemoryStore,
    NotificationToken, StoreKey,
};
