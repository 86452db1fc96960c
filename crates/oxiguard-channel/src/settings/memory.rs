//! In-memory setting store, for local runs and tests.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use super::{SettingError, SettingStore, SettingValue};

#[derive(Debug, Default)]
pub struct MemorySettingStore {
    values: RwLock<HashMap<String, SettingValue>>,
}

impl MemorySettingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SettingStore for MemorySettingStore {
    fn get(&self, key: &str) -> Result<Option<SettingValue>, SettingError> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: SettingValue) -> Result<(), SettingError> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing() {
        let store = MemorySettingStore::new();
        assert_eq!(store.get("nope").unwrap(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_set_overwrites() {
        let store = MemorySettingStore::new();
        store.set("k", SettingValue::Flag(true)).unwrap();
        store.set("k", SettingValue::Flag(false)).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(SettingValue::Flag(false)));
        assert_eq!(store.len(), 1);
    }
}
