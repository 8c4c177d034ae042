//! Building blocks shared by the store engines: the single-slot cache and the
//! observer registry behind [`NotificationToken`].

use std::{
    collections::BTreeMap,
    sync::{Arc, Weak},
};

use parking_lot::Mutex;
use serde_json::Value;

use super::{ChangeCallback, CollectionChange, StoreKey};

/// Result of mutating a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotChange {
    Inserted,
    Modified,
    Deleted,
}

/// At most one payload per [`StoreKey`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SingleSlotCache {
    slots: BTreeMap<StoreKey, Value>,
}

impl SingleSlotCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: StoreKey) -> Option<&Value> {
        self.slots.get(&key)
    }

    /// Replace whatever occupies the slot.
    pub fn put(&mut self, key: StoreKey, value: Value) -> SlotChange {
        match self.slots.insert(key, value) {
            Some(_) => SlotChange::Modified,
            None => SlotChange::Inserted,
        }
    }

    pub fn take(&mut self, key: StoreKey) -> Option<Value> {
        self.slots.remove(&key)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StoreKey, &Value)> {
        self.slots.iter().map(|(key, value)| (*key, value))
    }
}

#[derive(Default)]
struct ObserverTable {
    next_id: u64,
    entries: Vec<(u64, StoreKey, ChangeCallback)>,
}

/// Registered change callbacks, keyed by slot.
#[derive(Default)]
pub(crate) struct Observers {
    table: Arc<Mutex<ObserverTable>>,
}

impl Observers {
    pub(crate) fn register(&self, key: StoreKey, callback: ChangeCallback) -> NotificationToken {
        let mut table = self.table.lock();
        let id = table.next_id;
        table.next_id += 1;
        table.entries.push((id, key, callback));

        tracing::debug!(%key, id, "Observer registered");
        NotificationToken { id, key, table: Arc::downgrade(&self.table) }
    }

    /// Deliver `change` to every observer of `key`. Callbacks run after the
    /// registry lock is released so they may subscribe or unsubscribe.
    ///
    /// Each observer is checked again right before its callback runs, so a
    /// token released earlier in the same delivery (or on another thread
    /// before that check) gets nothing.
    pub(crate) fn notify(&self, key: StoreKey, change: CollectionChange) {
        let callbacks: Vec<(u64, ChangeCallback)> = self
            .table
            .lock()
            .entries
            .iter()
            .filter(|(_, observed, _)| *observed == key)
            .map(|(id, _, callback)| (*id, Arc::clone(callback)))
            .collect();

        for (id, callback) in callbacks {
            if self.is_registered(id) {
                callback(change.clone());
            }
        }
    }

    fn is_registered(&self, id: u64) -> bool {
        self.table.lock().entries.iter().any(|(registered, _, _)| *registered == id)
    }

    pub(crate) fn count(&self) -> usize {
        self.table.lock().entries.len()
    }
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers").field("count", &self.count()).finish()
    }
}

/// Handle for an active subscription. Dropping it stops delivery.
#[must_use = "dropping a NotificationToken immediately ends the subscription"]
pub struct NotificationToken {
    id: u64,
    key: StoreKey,
    table: Weak<Mutex<ObserverTable>>,
}

impl NotificationToken {
    pub fn key(&self) -> StoreKey {
        self.key
    }

    /// Whether the subscription is still registered with a live store.
    pub fn is_active(&self) -> bool {
        self.table
            .upgrade()
            .is_some_and(|table| table.lock().entries.iter().any(|(id, _, _)| *id == self.id))
    }

    /// Stop delivery now. Same as dropping the token.
    pub fn invalidate(self) {}
}

impl Drop for NotificationToken {
    fn drop(&mut self) {
        if let Some(table) = self.table.upgrade() {
            table.lock().entries.retain(|(id, _, _)| *id != self.id);
            tracing::debug!(key = %self.key, id = self.id, "Observer released");
        }
    }
}

impl std::fmt::Debug for NotificationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationToken")
            .field("id", &self.id)
            .field("key", &self.key)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, ChangeCallback) {
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        let callback: ChangeCallback = Arc::new(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (hits, callback)
    }

    #[test]
    fn put_reports_insert_then_modify() {
        let mut cache = SingleSlotCache::new();
        assert_eq!(cache.put(StoreKey::Location, Value::from(1)), SlotChange::Inserted);
        assert_eq!(cache.put(StoreKey::Location, Value::from(2)), SlotChange::Modified);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(StoreKey::Location), Some(&Value::from(2)));
    }

    #[test]
    fn take_empties_the_slot() {
        let mut cache = SingleSlotCache::new();
        cache.put(StoreKey::WeatherSnapshot, Value::from("x"));

        assert_eq!(cache.take(StoreKey::WeatherSnapshot), Some(Value::from("x")));
        assert_eq!(cache.take(StoreKey::WeatherSnapshot), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn notify_only_reaches_matching_key() {
        let observers = Observers::default();
        let (location_hits, on_location) = counter();
        let (snapshot_hits, on_snapshot) = counter();

        let _a = observers.register(StoreKey::Location, on_location);
        let _b = observers.register(StoreKey::WeatherSnapshot, on_snapshot);

        observers.notify(StoreKey::Location, CollectionChange::inserted());

        assert_eq!(location_hits.load(Ordering::SeqCst), 1);
        assert_eq!(snapshot_hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn dropping_token_unregisters() {
        let observers = Observers::default();
        let (hits, callback) = counter();

        let token = observers.register(StoreKey::Location, callback);
        assert!(token.is_active());
        assert_eq!(observers.count(), 1);

        token.invalidate();
        assert_eq!(observers.count(), 0);

        observers.notify(StoreKey::Location, CollectionChange::modified());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn token_released_during_delivery_gets_nothing() {
        let observers = Observers::default();
        let later: Arc<Mutex<Option<NotificationToken>>> = Arc::new(Mutex::new(None));

        let slot = Arc::clone(&later);
        let _first = observers.register(
            StoreKey::Location,
            Arc::new(move |_| {
                slot.lock().take();
            }),
        );
        let (hits, callback) = counter();
        *later.lock() = Some(observers.register(StoreKey::Location, callback));

        observers.notify(StoreKey::Location, CollectionChange::modified());

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(observers.count(), 1);
    }

    #[test]
    fn token_outliving_store_is_inactive() {
        let observers = Observers::default();
        let (_hits, callback) = counter();
        let token = observers.register(StoreKey::Location, callback);

        drop(observers);
        assert!(!token.is_active());
    }
}
