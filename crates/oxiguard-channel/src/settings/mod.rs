//! Typed per-channel settings.
//!
//! A [`ChannelSetting<T>`] names a setting and fixes its value type and
//! default at compile time. Stores only ever see tagged [`SettingValue`]s
//! under a composite key `channel#Type#NAME`, so two settings sharing a name
//! but declared with different types never collide. Reading a value whose
//! tag does not match the declared type is a `TypeMismatch`, never a coercion.

pub mod file;
pub mod memory;

use std::fmt;
use std::sync::Arc;

use oxiguard_core::ErrorKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub use file::JsonFileSettingStore;
pub use memory::MemorySettingStore;

// ─────────────────────────────────────────────
// Values & errors
// ─────────────────────────────────────────────

/// A stored setting value, tagged with its runtime type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum SettingValue {
    Integer(i64),
    Text(String),
    Flag(bool),
}

impl SettingValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            SettingValue::Integer(_) => i64::TYPE_NAME,
            SettingValue::Text(_) => String::TYPE_NAME,
            SettingValue::Flag(_) => bool::TYPE_NAME,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingError {
    #[error("setting {0} not found")]
    NotFound(String),

    #[error("setting {key} holds a {found} value, expected {expected}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("setting store failure: {0}")]
    Backend(String),
}

impl SettingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SettingError::NotFound(_) => ErrorKind::NotFound,
            SettingError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            SettingError::Backend(_) => ErrorKind::StoreFault,
        }
    }
}

// ─────────────────────────────────────────────
// Typed identifiers
// ─────────────────────────────────────────────

/// Rust types a setting may hold.
pub trait SettingType: Sized {
    const TYPE_NAME: &'static str;

    fn into_value(self) -> SettingValue;

    fn from_value(value: &SettingValue) -> Option<Self>;
}

impl SettingType for i64 {
    const TYPE_NAME: &'static str = "Integer";

    fn into_value(self) -> SettingValue {
        SettingValue::Integer(self)
    }

    fn from_value(value: &SettingValue) -> Option<Self> {
        match value {
            SettingValue::Integer(n) => Some(*n),
            _ => None,
        }
    }
}

impl SettingType for String {
    const TYPE_NAME: &'static str = "String";

    fn into_value(self) -> SettingValue {
        SettingValue::Text(self)
    }

    fn from_value(value: &SettingValue) -> Option<Self> {
        match value {
            SettingValue::Text(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl SettingType for bool {
    const TYPE_NAME: &'static str = "Boolean";

    fn into_value(self) -> SettingValue {
        SettingValue::Flag(self)
    }

    fn from_value(value: &SettingValue) -> Option<Self> {
        match value {
            SettingValue::Flag(b) => Some(*b),
            _ => None,
        }
    }
}

/// A named setting with a statically known value type and default.
pub struct ChannelSetting<T> {
    name: &'static str,
    default: fn() -> T,
}

impl<T: SettingType> ChannelSetting<T> {
    pub const fn new(name: &'static str, default: fn() -> T) -> Self {
        Self { name, default }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn default_value(&self) -> T {
        (self.default)()
    }

    /// Storage key for this setting in `channel`.
    pub fn key(&self, channel: &str) -> String {
        format!("{}#{}#{}", channel, T::TYPE_NAME, self.name)
    }
}

impl<T> fmt::Debug for ChannelSetting<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelSetting").field("name", &self.name).finish()
    }
}

fn default_permission() -> String {
    "Viewer".to_string()
}

fn default_look_behind() -> i64 {
    10
}

/// Level applied to users without an explicit assignment.
pub const DEFAULT_PERMISSION: ChannelSetting<String> =
    ChannelSetting::new("DEFAULT_PERMISSION", default_permission);

/// Messages re-checked when a blacklist entry is added without a count.
pub const LOOK_BEHIND: ChannelSetting<i64> = ChannelSetting::new("LOOK_BEHIND", default_look_behind);

// ─────────────────────────────────────────────
// Store trait & typed façade
// ─────────────────────────────────────────────

/// Raw key/value persistence for settings.
pub trait SettingStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<SettingValue>, SettingError>;

    fn set(&self, key: &str, value: SettingValue) -> Result<(), SettingError>;
}

/// Typed access to a [`SettingStore`].
#[derive(Clone)]
pub struct ChannelSettings {
    store: Arc<dyn SettingStore>,
}

impl ChannelSettings {
    pub fn new(store: Arc<dyn SettingStore>) -> Self {
        Self { store }
    }

    /// In-memory settings, the default backend.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySettingStore::new()))
    }

    /// Stored value; `NotFound` if the setting was never set.
    pub fn get<T: SettingType>(
        &self,
        channel: &str,
        setting: &ChannelSetting<T>,
    ) -> Result<T, SettingError> {
        let key = setting.key(channel);
        debug!(setting = setting.name(), channel, "retrieving setting");
        let value = self
            .store
            .get(&key)?
            .ok_or_else(|| SettingError::NotFound(key.clone()))?;
        T::from_value(&value).ok_or(SettingError::TypeMismatch {
            key,
            expected: T::TYPE_NAME,
            found: value.type_name(),
        })
    }

    /// Stored value, or the setting's declared default when unset.
    pub fn get_or_default<T: SettingType>(
        &self,
        channel: &str,
        setting: &ChannelSetting<T>,
    ) -> Result<T, SettingError> {
        match self.get(channel, setting) {
            Err(SettingError::NotFound(_)) => Ok(setting.default_value()),
            other => other,
        }
    }

    pub fn set<T: SettingType>(
        &self,
        channel: &str,
        setting: &ChannelSetting<T>,
        value: T,
    ) -> Result<(), SettingError> {
        self.store.set(&setting.key(channel), value.into_value())
    }
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self::in_memory()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn text_default() -> String {
        "fallback".to_string()
    }

    fn int_default() -> i64 {
        -1
    }

    const GREETING: ChannelSetting<String> = ChannelSetting::new("GREETING", text_default);
    const GREETING_COUNT: ChannelSetting<i64> = ChannelSetting::new("GREETING", int_default);

    #[test]
    fn test_unset_returns_default() {
        let settings = ChannelSettings::in_memory();
        assert_eq!(settings.get_or_default("foo", &GREETING).unwrap(), "fallback");
        assert_eq!(
            settings.get_or_default("foo", &DEFAULT_PERMISSION).unwrap(),
            "Viewer"
        );
        assert_eq!(settings.get_or_default("foo", &LOOK_BEHIND).unwrap(), 10);
    }

    #[test]
    fn test_strict_get_unset_is_not_found() {
        let settings = ChannelSettings::in_memory();
        let err = settings.get("foo", &GREETING).unwrap_err();
        assert_eq!(err, SettingError::NotFound("foo#String#GREETING".into()));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_set_then_get() {
        let settings = ChannelSettings::in_memory();
        settings.set("foo", &GREETING, "hi".to_string()).unwrap();
        assert_eq!(settings.get_or_default("foo", &GREETING).unwrap(), "hi");
    }

    #[test]
    fn test_channels_do_not_collide() {
        let settings = ChannelSettings::in_memory();
        settings.set("foo", &LOOK_BEHIND, 3).unwrap();
        assert_eq!(settings.get_or_default("bar", &LOOK_BEHIND).unwrap(), 10);
    }

    #[test]
    fn test_same_name_different_type_do_not_collide() {
        let settings = ChannelSettings::in_memory();
        settings.set("foo", &GREETING, "hello".to_string()).unwrap();
        settings.set("foo", &GREETING_COUNT, 4).unwrap();
        assert_eq!(settings.get_or_default("foo", &GREETING).unwrap(), "hello");
        assert_eq!(settings.get_or_default("foo", &GREETING_COUNT).unwrap(), 4);
    }

    #[test]
    fn test_wrong_stored_type_is_mismatch() {
        let store = Arc::new(MemorySettingStore::new());
        store
            .set(&GREETING.key("foo"), SettingValue::Integer(7))
            .unwrap();
        let settings = ChannelSettings::new(store);

        let err = settings.get_or_default("foo", &GREETING).unwrap_err();
        assert_eq!(
            err,
            SettingError::TypeMismatch {
                key: "foo#String#GREETING".into(),
                expected: "String",
                found: "Integer",
            }
        );
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_key_format() {
        assert_eq!(LOOK_BEHIND.key("foo"), "foo#Integer#LOOK_BEHIND");
        assert_eq!(DEFAULT_PERMISSION.key("foo"), "foo#String#DEFAULT_PERMISSION");
    }

    #[test]
    fn test_value_serde_shape() {
        let json = serde_json::to_value(SettingValue::Text("x".into())).unwrap();
        assert_eq!(json, serde_json::json!({"type": "text", "value": "x"}));
    }
}
