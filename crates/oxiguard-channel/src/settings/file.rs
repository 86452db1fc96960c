//! JSON file setting store.
//!
//! File format: a single JSON object mapping storage keys to tagged values,
//! e.g. `{"foo#Integer#LOOK_BEHIND": {"type": "integer", "value": 5}}`.
//! The whole file is rewritten on every `set`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use tracing::{debug, warn};

use super::{SettingError, SettingStore, SettingValue};

/// Settings persisted to a JSON file and cached in memory.
#[derive(Debug)]
pub struct JsonFileSettingStore {
    path: PathBuf,
    cache: RwLock<BTreeMap<String, SettingValue>>,
}

impl JsonFileSettingStore {
    /// Open (or prepare to create) the store at `path`.
    ///
    /// An existing file that cannot be read or parsed is an error; a missing
    /// file starts an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingError> {
        let path = path.into();
        let cache = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| SettingError::Backend(format!("read {}: {e}", path.display())))?;
            serde_json::from_str(&content)
                .map_err(|e| SettingError::Backend(format!("parse {}: {e}", path.display())))?
        } else {
            BTreeMap::new()
        };

        debug!(path = %path.display(), entries = cache.len(), "opened settings file");
        Ok(Self {
            path,
            cache: RwLock::new(cache),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, SettingValue>) -> Result<(), SettingError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SettingError::Backend(format!("create {}: {e}", parent.display())))?;
        }
        let json = serde_json::to_string_pretty(values)
            .map_err(|e| SettingError::Backend(e.to_string()))?;
        std::fs::write(&self.path, json).map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "failed to persist settings");
            SettingError::Backend(format!("write {}: {e}", self.path.display()))
        })
    }
}

impl SettingStore for JsonFileSettingStore {
    fn get(&self, key: &str) -> Result<Option<SettingValue>, SettingError> {
        let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
        Ok(cache.get(key).cloned())
    }

    fn set(&self, key: &str, value: SettingValue) -> Result<(), SettingError> {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        let previous = cache.insert(key.to_string(), value);
        if let Err(e) = self.persist(&cache) {
            // Keep memory consistent with disk
            match previous {
                Some(old) => cache.insert(key.to_string(), old),
                None => cache.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }
}
