//! Config loader — reads `~/.oxiguard/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.oxiguard/config.json`
//! 3. Environment variables `OXIGUARD_<SECTION>__<FIELD>` (override JSON)

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::Config;

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the default path + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);
    apply_env_overrides(load_config_from_path(&config_path))
}

/// Load config from a specific file path, without env overrides.
fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return Config::default();
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return Config::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to parse config JSON: {}", e);
            Config::default()
        }
    }
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config).map_err(std::io::Error::other)?;

    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Env var format: `OXIGUARD_<SECTION>__<FIELD>` (double underscore as delimiter).
///
/// Supported overrides:
/// - `OXIGUARD_CHANNELS__HISTORY_LIMIT` → `channels.history_limit`
/// - `OXIGUARD_CHANNELS__DEFAULT_PERMISSION` → `channels.default_permission`
/// - `OXIGUARD_CHANNELS__LOOK_BEHIND` → `channels.look_behind`
/// - `OXIGUARD_CHANNELS__AUTOJOIN` → `channels.autojoin` (comma-separated)
/// - `OXIGUARD_TIMEOUTS__ESCALATION_FACTOR` → `timeouts.escalation_factor`
/// - `OXIGUARD_TIMEOUTS__MAX_SECS` → `timeouts.max_secs`
fn apply_env_overrides(config: Config) -> Config {
    apply_overrides(config, |key| std::env::var(key).ok())
}

fn apply_overrides(mut config: Config, lookup: impl Fn(&str) -> Option<String>) -> Config {
    if let Some(val) = lookup("OXIGUARD_CHANNELS__HISTORY_LIMIT") {
        match val.parse::<usize>() {
            Ok(n) => config.channels.history_limit = n,
            Err(_) => warn!(value = %val, "ignoring invalid OXIGUARD_CHANNELS__HISTORY_LIMIT"),
        }
    }
    if let Some(val) = lookup("OXIGUARD_CHANNELS__DEFAULT_PERMISSION") {
        config.channels.default_permission = Some(val);
    }
    if let Some(val) = lookup("OXIGUARD_CHANNELS__LOOK_BEHIND") {
        match val.parse::<i64>() {
            Ok(n) => config.channels.look_behind = Some(n),
            Err(_) => warn!(value = %val, "ignoring invalid OXIGUARD_CHANNELS__LOOK_BEHIND"),
        }
    }
    if let Some(val) = lookup("OXIGUARD_CHANNELS__AUTOJOIN") {
        config.channels.autojoin = val
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
    }
    if let Some(val) = lookup("OXIGUARD_TIMEOUTS__ESCALATION_FACTOR") {
        if let Ok(n) = val.parse::<u32>() {
            config.timeouts.escalation_factor = n;
        }
    }
    if let Some(val) = lookup("OXIGUARD_TIMEOUTS__MAX_SECS") {
        if let Ok(n) = val.parse::<u64>() {
            config.timeouts.max_secs = n;
        }
    }
    config
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
