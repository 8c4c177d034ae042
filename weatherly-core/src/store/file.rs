use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::anyhow;
use directories::ProjectDirs;
use parking_lot::Mutex;
use serde_json::Value;

use super::{
    ChangeCallback, CollectionChange, LocalStore, StoreKey,
    slots::{NotificationToken, Observers, SingleSlotCache, SlotChange},
};
use crate::error::StoreError;

/// Store persisted as a single JSON document.
///
/// The whole document is loaded at open and rewritten on every mutation
/// (temp file + rename). A mutation that cannot be written leaves the slot
/// untouched and is reported to the slot's observers as an error.
///
/// Writes are committed one at a time, but observers are notified after the
/// lock is released: with concurrent writers, notifications may arrive in a
/// different order than the commits. A single writer always sees them in
/// commit order.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    slots: Mutex<SingleSlotCache>,
    observers: Observers,
}

impl FileStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let slots = if path.exists() { load(&path)? } else { SingleSlotCache::new() };

        tracing::debug!(path = %path.display(), slots = slots.len(), "Opened file store");

        Ok(Self { path, slots: Mutex::new(slots), observers: Observers::default() })
    }

    /// Default location of the store file in the platform data directory.
    pub fn default_path() -> anyhow::Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weatherly", "weatherly")
            .ok_or_else(|| anyhow!("Could not determine platform data directory"))?;

        Ok(dirs.data_dir().join("store.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn commit(
        &self,
        key: StoreKey,
        mutate: impl FnOnce(&mut SingleSlotCache) -> Option<SlotChange>,
    ) -> Result<Option<SlotChange>, StoreError> {
        let result = {
            let mut current = self.slots.lock();
            let mut next = current.clone();
            match mutate(&mut next) {
                None => Ok(None),
                Some(change) => save(&self.path, &next).map(|()| {
                    *current = next;
                    Some(change)
                }),
            }
        };

        match &result {
            Ok(Some(change)) => self.observers.notify(key, (*change).into()),
            Ok(None) => {}
            Err(err) => {
                tracing::error!(%key, error = %err, "Failed to persist store change");
                self.observers.notify(key, CollectionChange::Error(err.to_string()));
            }
        }

        result
    }
}

impl LocalStore for FileStore {
    fn get(&self, key: StoreKey) -> Option<Value> {
        self.slots.lock().get(key).cloned()
    }

    fn put(&self, key: StoreKey, value: Value) -> Result<(), StoreError> {
        self.commit(key, |slots| Some(slots.put(key, value))).map(|_| ())
    }

    fn remove(&self, key: StoreKey) -> Result<bool, StoreError> {
        self.commit(key, |slots| slots.take(key).map(|_| SlotChange::Deleted))
            .map(|change| change.is_some())
    }

    fn observe(&self, key: StoreKey, callback: ChangeCallback) -> NotificationToken {
        self.observers.register(key, callback)
    }
}

fn load(path: &Path) -> Result<SingleSlotCache, StoreError> {
    let contents = fs::read_to_string(path).map_err(|err| StoreError::io(path, err))?;

    let document: BTreeMap<String, Value> =
        serde_json::from_str(&contents).map_err(|err| StoreError::serialize("store", err))?;

    let mut slots = SingleSlotCache::new();
    for (name, value) in document {
        match StoreKey::parse(&name) {
            Some(key) => {
                slots.put(key, value);
            }
            None => tracing::warn!(key = %name, "Skipping unknown key in store file"),
        }
    }

    Ok(slots)
}

fn save(path: &Path, slots: &SingleSlotCache) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| StoreError::io(parent, err))?;
    }

    let document: BTreeMap<&str, &Value> =
        slots.iter().map(|(key, value)| (key.as_str(), value)).collect();
    let bytes =
        serde_json::to_vec_pretty(&document).map_err(|err| StoreError::serialize("store", err))?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes).map_err(|err| StoreError::io(&tmp, err))?;
    if let Err(err) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(StoreError::io(path, err));
    }

    Ok(())
}
