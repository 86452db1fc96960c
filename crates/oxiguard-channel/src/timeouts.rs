//! Timeout tracking with escalation on repeat offenses.
//!
//! One record per (user, reason). A record is active while
//! `assigned_at + duration` lies in the future; expiry is evaluated at read
//! time, nothing is evicted in the background. Expired records are dropped
//! whenever a new offense is recorded.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use oxiguard_core::config::TimeoutsConfig;
use oxiguard_core::ChatUser;
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────
// Reasons & policy
// ─────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeoutReason {
    /// Message matched the channel blacklist.
    Blacklist,
    /// Flooding or repeated messages.
    Spam,
    /// Issued by a moderator.
    Manual,
}

impl TimeoutReason {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeoutReason::Blacklist => "blacklist",
            TimeoutReason::Spam => "spam",
            TimeoutReason::Manual => "manual",
        }
    }
}

impl fmt::Display for TimeoutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeoutReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "blacklist" | "bl" => Ok(TimeoutReason::Blacklist),
            "spam" => Ok(TimeoutReason::Spam),
            "manual" => Ok(TimeoutReason::Manual),
            other => Err(format!("unknown timeout reason '{other}'")),
        }
    }
}

/// Base durations per reason and the escalation rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimeoutPolicy {
    pub blacklist: Duration,
    pub spam: Duration,
    pub manual: Duration,
    pub escalation_factor: u32,
    pub max: Duration,
}

impl TimeoutPolicy {
    pub fn base(&self, reason: TimeoutReason) -> Duration {
        match reason {
            TimeoutReason::Blacklist => self.blacklist,
            TimeoutReason::Spam => self.spam,
            TimeoutReason::Manual => self.manual,
        }
    }

    /// Next duration for a repeat offense. Never shorter than `current`.
    pub fn escalate(&self, current: Duration) -> Duration {
        let stepped = current
            .checked_mul(self.escalation_factor)
            .unwrap_or(Duration::MAX)
            .min(self.max);
        stepped.max(current)
    }
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        TimeoutPolicy::from(&TimeoutsConfig::default())
    }
}

impl From<&TimeoutsConfig> for TimeoutPolicy {
    fn from(cfg: &TimeoutsConfig) -> Self {
        Self {
            blacklist: Duration::from_secs(cfg.blacklist_secs),
            spam: Duration::from_secs(cfg.spam_secs),
            manual: Duration::from_secs(cfg.manual_secs),
            escalation_factor: cfg.escalation_factor,
            max: Duration::from_secs(cfg.max_secs),
        }
    }
}

// ─────────────────────────────────────────────
// Tracker
// ─────────────────────────────────────────────

#[derive(Clone, Debug)]
struct TimeoutRecord {
    duration: Duration,
    assigned_at: DateTime<Utc>,
}

impl TimeoutRecord {
    fn is_active(&self, now: DateTime<Utc>) -> bool {
        let Ok(delta) = TimeDelta::from_std(self.duration) else {
            return true;
        };
        match self.assigned_at.checked_add_signed(delta) {
            Some(expires_at) => expires_at > now,
            None => true,
        }
    }
}

/// Per-channel timeout records, keyed by (user, reason).
#[derive(Debug, Default)]
pub struct TimeoutManager {
    policy: TimeoutPolicy,
    records: RwLock<HashMap<(ChatUser, TimeoutReason), TimeoutRecord>>,
}

impl TimeoutManager {
    pub fn new(policy: TimeoutPolicy) -> Self {
        Self {
            policy,
            records: RwLock::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> &TimeoutPolicy {
        &self.policy
    }

    /// Longest active timeout for `user` across all reasons; zero if none.
    pub fn get(&self, user: &ChatUser) -> Duration {
        self.get_at(user, Utc::now())
    }

    pub fn get_at(&self, user: &ChatUser, now: DateTime<Utc>) -> Duration {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        records
            .iter()
            .filter(|((u, _), record)| u == user && record.is_active(now))
            .map(|(_, record)| record.duration)
            .max()
            .unwrap_or(Duration::ZERO)
    }

    /// Record an offense and return the resulting duration: the reason's
    /// base duration, or an escalation of the active one.
    pub fn add(&self, user: &ChatUser, reason: TimeoutReason) -> Duration {
        self.add_at(user, reason, Utc::now())
    }

    pub fn add_at(&self, user: &ChatUser, reason: TimeoutReason, now: DateTime<Utc>) -> Duration {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let duration = match records.get(&(user.clone(), reason)) {
            Some(active) if active.is_active(now) => self.policy.escalate(active.duration),
            _ => self.policy.base(reason),
        };
        records.retain(|_, record| record.is_active(now));
        records.insert(
            (user.clone(), reason),
            TimeoutRecord {
                duration,
                assigned_at: now,
            },
        );
        duration
    }

    /// Drop every timeout for `user`. Returns how many records were removed.
    pub fn clear(&self, user: &ChatUser) -> usize {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let before = records.len();
        records.retain(|(u, _), _| u != user);
        before - records.len()
    }
}
