//! Local object store with change notifications.
//!
//! Every entity type lives in a single slot addressed by a fixed [`StoreKey`],
//! so the store holds at most one [`Location`] and one [`WeatherSnapshot`].
//! [`LocalStore`] is the object-safe engine interface working on raw JSON
//! payloads; [`LocalStoreExt`] layers the typed API on top of it.

use std::{fmt::Debug, sync::Arc};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    error::StoreError,
    model::{Location, WeatherSnapshot},
};

pub mod file;
pub mod memory;
pub mod slots;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use slots::{NotificationToken, SingleSlotCache, SlotChange};

/// Fixed slot identifiers. The string forms are persisted and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StoreKey {
    Location,
    WeatherSnapshot,
}

impl StoreKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKey::Location => "selected_location",
            StoreKey::WeatherSnapshot => "weather_snapshot",
        }
    }

    pub const fn all() -> &'static [StoreKey] {
        &[StoreKey::Location, StoreKey::WeatherSnapshot]
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::all().iter().copied().find(|key| key.as_str() == value)
    }
}

impl std::fmt::Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A model type persisted in its own slot.
pub trait Entity: Serialize + DeserializeOwned {
    const KEY: StoreKey;
}

impl Entity for Location {
    const KEY: StoreKey = StoreKey::Location;
}

impl Entity for WeatherSnapshot {
    const KEY: StoreKey = StoreKey::WeatherSnapshot;
}

/// What happened to an observed collection.
///
/// Index sets refer to positions in the collection; a single-slot collection
/// only ever reports index 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionChange {
    Update {
        deletions: Vec<usize>,
        insertions: Vec<usize>,
        modifications: Vec<usize>,
    },
    Error(String),
}

impl CollectionChange {
    pub fn inserted() -> Self {
        CollectionChange::Update { deletions: vec![], insertions: vec![0], modifications: vec![] }
    }

    pub fn modified() -> Self {
        CollectionChange::Update { deletions: vec![], insertions: vec![], modifications: vec![0] }
    }

    pub fn deleted() -> Self {
        CollectionChange::Update { deletions: vec![0], insertions: vec![], modifications: vec![] }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CollectionChange::Error(_))
    }
}

impl From<SlotChange> for CollectionChange {
    fn from(change: SlotChange) -> Self {
        match change {
            SlotChange::Inserted => CollectionChange::inserted(),
            SlotChange::Modified => CollectionChange::modified(),
            SlotChange::Deleted => CollectionChange::deleted(),
        }
    }
}

pub type ChangeCallback = Arc<dyn Fn(CollectionChange) + Send + Sync>;

/// Storage engine interface.
///
/// Writes are serialized by the engine. Observers run on the writing thread
/// once the write has been committed, with no engine lock held, so writes
/// racing on different threads may be reported out of commit order.
pub trait LocalStore: Send + Sync + Debug {
    fn get(&self, key: StoreKey) -> Option<Value>;

    /// Insert or replace the payload in `key`'s slot.
    fn put(&self, key: StoreKey, value: Value) -> Result<(), StoreError>;

    /// Empty `key`'s slot. Returns whether it held anything.
    fn remove(&self, key: StoreKey) -> Result<bool, StoreError>;

    fn observe(&self, key: StoreKey, callback: ChangeCallback) -> NotificationToken;
}

/// Typed access for any [`LocalStore`].
pub trait LocalStoreExt: LocalStore {
    fn get_object<T: Entity>(&self) -> Option<T> {
        let value = self.get(T::KEY)?;
        match serde_json::from_value(value) {
            Ok(object) => Some(object),
            Err(err) => {
                tracing::warn!(key = %T::KEY, error = %err, "Stored object does not decode, ignoring it");
                None
            }
        }
    }

    fn add_or_update<T: Entity>(&self, object: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(object)
            .map_err(|err| StoreError::serialize(T::KEY.as_str(), err))?;
        self.put(T::KEY, value)
    }

    fn delete<T: Entity>(&self) -> Result<bool, StoreError> {
        self.remove(T::KEY)
    }

    fn observe_changes<T, F>(&self, callback: F) -> NotificationToken
    where
        T: Entity,
        F: Fn(CollectionChange) + Send + Sync + 'static,
    {
        self.observe(T::KEY, Arc::new(callback))
    }
}

impl<S: LocalStore + ?Sized> LocalStoreExt for S {}
