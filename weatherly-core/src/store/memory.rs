use parking_lot::Mutex;
use serde_json::Value;

use super::{
    ChangeCallback, CollectionChange, LocalStore, StoreKey,
    slots::{NotificationToken, Observers, SingleSlotCache},
};
use crate::error::StoreError;

/// In-process store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Mutex<SingleSlotCache>,
    observers: Observers,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: StoreKey) -> Option<Value> {
        self.slots.lock().get(key).cloned()
    }

    fn put(&self, key: StoreKey, value: Value) -> Result<(), StoreError> {
        let change = self.slots.lock().put(key, value);
        self.observers.notify(key, change.into());
        Ok(())
    }

    fn remove(&self, key: StoreKey) -> Result<bool, StoreError> {
        let removed = self.slots.lock().take(key).is_some();
        if removed {
            self.observers.notify(key, CollectionChange::deleted());
        }
        Ok(removed)
    }

    fn observe(&self, key: StoreKey, callback: ChangeCallback) -> NotificationToken {
        self.observers.register(key, callback)
    }
}
