//! Configuration schema.
//!
//! Hierarchy: `Config` → `ChannelsConfig`, `TimeoutsConfig`, `LinksConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.
//! We use `#[serde(rename_all = "camelCase")]` to handle the conversion.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration, loaded from `~/.oxiguard/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub channels: ChannelsConfig,
    pub timeouts: TimeoutsConfig,
    pub links: LinksConfig,
}

// ─────────────────────────────────────────────
// Channels
// ─────────────────────────────────────────────

/// Defaults applied to every channel when it is opened.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelsConfig {
    /// Maximum messages retained per channel (and per user within a channel).
    pub history_limit: usize,
    /// Level for users without an explicit assignment, seeded into each
    /// channel's `DEFAULT_PERMISSION` setting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_permission: Option<String>,
    /// Look-behind used when blacklisting without an explicit count, seeded
    /// into each channel's `LOOK_BEHIND` setting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub look_behind: Option<i64>,
    /// Channels opened at startup.
    pub autojoin: Vec<String>,
    /// Users granted a fixed level in every channel (username → level name).
    pub operators: HashMap<String, String>,
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            history_limit: 100,
            default_permission: None,
            look_behind: None,
            autojoin: Vec::new(),
            operators: HashMap::new(),
        }
    }
}

// ─────────────────────────────────────────────
// Timeouts
// ─────────────────────────────────────────────

/// Timeout durations and escalation policy.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimeoutsConfig {
    /// First-offense duration for blacklist hits, in seconds.
    pub blacklist_secs: u64,
    /// First-offense duration for spam, in seconds.
    pub spam_secs: u64,
    /// First-offense duration for manual timeouts, in seconds.
    pub manual_secs: u64,
    /// Multiplier applied to an active timeout on a repeat offense.
    pub escalation_factor: u32,
    /// Upper bound for escalated durations, in seconds.
    pub max_secs: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            blacklist_secs: 60,
            spam_secs: 30,
            manual_secs: 600,
            escalation_factor: 2,
            max_secs: 86_400,
        }
    }
}

// ─────────────────────────────────────────────
// Links
// ─────────────────────────────────────────────

/// Link rewriting behaviour.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LinksConfig {
    /// Query parameters removed from rewritten links. Entries ending in `*`
    /// match by prefix.
    pub strip_params: Vec<String>,
    /// Schemes a link may use.
    pub allowed_schemes: Vec<String>,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            strip_params: vec![
                "utm_*".to_string(),
                "fbclid".to_string(),
                "gclid".to_string(),
                "ref".to_string(),
            ],
            allowed_schemes: vec!["http".to_string(), "https".to_string()],
        }
    }
}
