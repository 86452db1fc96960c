//! Blacklist engine — typed entries matched against chat text.
//!
//! Entries are identified by (pattern, type). Each type carries its own
//! matching predicate:
//! - **Phrase**: case-insensitive substring
//! - **Domain**: any link in the text whose host is the entry host or one of
//!   its subdomains (and whose path starts with the entry path, if it has one)
//! - **Regex**: case-insensitive regular expression, compiled on insertion
//!
//! Entries are kept in insertion order, so listings and fuzzy removal
//! results are stable for a given state.

use std::fmt;
use std::str::FromStr;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use oxiguard_core::ErrorKind;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─────────────────────────────────────────────
// Types & errors
// ─────────────────────────────────────────────

/// How a blacklist pattern is matched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlacklistType {
    Phrase,
    Domain,
    Regex,
}

impl BlacklistType {
    pub const ALL: [BlacklistType; 3] = [
        BlacklistType::Phrase,
        BlacklistType::Domain,
        BlacklistType::Regex,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BlacklistType::Phrase => "phrase",
            BlacklistType::Domain => "domain",
            BlacklistType::Regex => "regex",
        }
    }
}

impl fmt::Display for BlacklistType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlacklistType {
    type Err = BlacklistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "phrase" | "word" | "text" => Ok(BlacklistType::Phrase),
            "domain" | "url" | "link" => Ok(BlacklistType::Domain),
            "regex" | "re" => Ok(BlacklistType::Regex),
            other => Err(BlacklistError::UnknownType(other.to_string())),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BlacklistError {
    #[error("no {kind} blacklist entry '{pattern}'")]
    NotFound { pattern: String, kind: BlacklistType },

    #[error("invalid {kind} pattern '{pattern}': {reason}")]
    InvalidPattern {
        pattern: String,
        kind: BlacklistType,
        reason: String,
    },

    #[error("unknown blacklist type '{0}'")]
    UnknownType(String),
}

impl BlacklistError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BlacklistError::NotFound { .. } => ErrorKind::NotFound,
            BlacklistError::InvalidPattern { .. } | BlacklistError::UnknownType(_) => {
                ErrorKind::InvalidInput
            }
        }
    }
}

// ─────────────────────────────────────────────
// Entry
// ─────────────────────────────────────────────

#[derive(Clone, Debug)]
enum Matcher {
    Phrase(String),
    Domain { host: String, path: Option<String> },
    Regex(Regex),
}

/// A stored blacklist entry together with its compiled predicate.
#[derive(Clone, Debug)]
pub struct BlacklistEntry {
    pattern: String,
    kind: BlacklistType,
    created_at: DateTime<Utc>,
    matcher: Matcher,
}

impl BlacklistEntry {
    /// Build an entry, validating and compiling `pattern` for `kind`.
    pub fn new(pattern: &str, kind: BlacklistType) -> Result<Self, BlacklistError> {
        let pattern = pattern.trim();
        let invalid = |reason: &str| BlacklistError::InvalidPattern {
            pattern: pattern.to_string(),
            kind,
            reason: reason.to_string(),
        };

        if pattern.is_empty() {
            return Err(invalid("pattern is empty"));
        }

        let matcher = match kind {
            BlacklistType::Phrase => Matcher::Phrase(pattern.to_lowercase()),
            BlacklistType::Domain => {
                let (host, rest) = split_link(pattern).ok_or_else(|| invalid("not a domain"))?;
                let path = rest.trim_end_matches('/');
                Matcher::Domain {
                    host,
                    path: (!path.is_empty()).then(|| path.to_string()),
                }
            }
            BlacklistType::Regex => {
                let re = RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| invalid(&e.to_string()))?;
                Matcher::Regex(re)
            }
        };

        Ok(Self {
            pattern: pattern.to_string(),
            kind,
            created_at: Utc::now(),
            matcher,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn kind(&self) -> BlacklistType {
        self.kind
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether `text` trips this entry.
    pub fn matches(&self, text: &str) -> bool {
        match &self.matcher {
            Matcher::Phrase(needle) => text.to_lowercase().contains(needle.as_str()),
            Matcher::Domain { host, path } => text.split_whitespace().any(|token| {
                let Some((token_host, rest)) = split_link(token) else {
                    return false;
                };
                let host_matches = token_host == *host
                    || token_host
                        .strip_suffix(host.as_str())
                        .is_some_and(|prefix| prefix.ends_with('.'));
                host_matches && path.as_deref().map_or(true, |p| path_prefix_matches(&rest, p))
            }),
            Matcher::Regex(re) => re.is_match(text),
        }
    }

    /// Pattern-text equality; regexes compare exactly, other types ignore case.
    fn same_pattern(&self, input: &str) -> bool {
        let input = input.trim();
        match self.kind {
            BlacklistType::Regex => self.pattern == input,
            BlacklistType::Phrase | BlacklistType::Domain => {
                self.pattern.to_lowercase() == input.to_lowercase()
            }
        }
    }
}

impl fmt::Display for BlacklistEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.pattern, self.kind)
    }
}

/// Reduce a link-like token to `(host, path-and-rest)`, lowercased.
///
/// Handles scheme, credentials and port; any leading or trailing
/// non-alphanumeric characters are ignored.
/// Returns `None` for tokens that do not look like a host (no dot).
fn split_link(token: &str) -> Option<(String, String)> {
    let token = token
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();
    let without_scheme = token.split_once("://").map_or(token.as_str(), |(_, rest)| rest);

    let split_at = without_scheme
        .find(['/', '?', '#'])
        .unwrap_or(without_scheme.len());
    let (authority, rest) = without_scheme.split_at(split_at);

    let host_port = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
    let host = host_port.split(':').next().unwrap_or_default();

    let valid = host.contains('.')
        && !host.starts_with('.')
        && !host.ends_with('.')
        && host.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '.');
    valid.then(|| (host.to_string(), rest.to_string()))
}

/// `rest` continues with `prefix` and then ends or starts a new path
/// segment, query or fragment.
fn path_prefix_matches(rest: &str, prefix: &str) -> bool {
    rest.strip_prefix(prefix)
        .is_some_and(|tail| tail.is_empty() || tail.starts_with(['/', '?', '#']))
}

// ─────────────────────────────────────────────
// Manager
// ─────────────────────────────────────────────

/// Blacklist store for one channel.
#[derive(Debug, Default)]
pub struct BlacklistManager {
    entries: RwLock<Vec<BlacklistEntry>>,
}

impl BlacklistManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry and return it. Re-adding an existing (pattern, type)
    /// returns the stored entry unchanged.
    pub fn add(&self, pattern: &str, kind: BlacklistType) -> Result<BlacklistEntry, BlacklistError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = entries
            .iter()
            .find(|e| e.kind == kind && e.same_pattern(pattern))
        {
            return Ok(existing.clone());
        }

        let entry = BlacklistEntry::new(pattern, kind)?;
        entries.push(entry.clone());
        Ok(entry)
    }

    /// Whether any entry matches `text`.
    pub fn is_blacklisted(&self, text: &str) -> bool {
        self.first_match(text).is_some()
    }

    /// The oldest entry matching `text`, if any.
    pub fn first_match(&self, text: &str) -> Option<BlacklistEntry> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.iter().find(|e| e.matches(text)).cloned()
    }

    /// Remove the entry with exactly this (pattern, type).
    pub fn remove(&self, pattern: &str, kind: BlacklistType) -> Result<BlacklistEntry, BlacklistError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let index = entries
            .iter()
            .position(|e| e.kind == kind && e.same_pattern(pattern))
            .ok_or_else(|| BlacklistError::NotFound {
                pattern: pattern.trim().to_string(),
                kind,
            })?;
        Ok(entries.remove(index))
    }

    /// Remove every entry, of any type, whose pattern equals `pattern`.
    /// Returns the removed entries in insertion order; empty if none matched.
    pub fn remove_fuzzy(&self, pattern: &str) -> Vec<BlacklistEntry> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let (removed, kept): (Vec<_>, Vec<_>) =
            entries.drain(..).partition(|e| e.same_pattern(pattern));
        *entries = kept;
        removed
    }

    /// All entries in insertion order.
    pub fn entries(&self) -> Vec<BlacklistEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_type_aliases() {
        assert_eq!("url".parse::<BlacklistType>().unwrap(), BlacklistType::Domain);
        assert_eq!("Word".parse::<BlacklistType>().unwrap(), BlacklistType::Phrase);
        assert_eq!("re".parse::<BlacklistType>().unwrap(), BlacklistType::Regex);
        let err = "glob".parse::<BlacklistType>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_phrase_matches_case_insensitive_substring() {
        let entry = BlacklistEntry::new("Free Gold", BlacklistType::Phrase).unwrap();
        assert!(entry.matches("get FREE gold now"));
        assert!(!entry.matches("gold for free"));
    }

    #[test]
    fn test_domain_matching() {
        let entry = BlacklistEntry::new("spamlink.com", BlacklistType::Domain).unwrap();
        assert!(entry.matches("visit spamlink.com now"));
        assert!(entry.matches("https://www.spamlink.com/free?x=1"));
        assert!(entry.matches("(see http://user@spamlink.com:8080/a)"));
        assert!(entry.matches("spamlink.com!"));
        assert!(!entry.matches("notspamlink.com"));
        assert!(!entry.matches("spamlink.community"));
        assert!(!entry.matches("spamlink dot com"));
    }

    #[test]
    fn test_domain_with_path() {
        let entry = BlacklistEntry::new("https://host.tv/bad/", BlacklistType::Domain).unwrap();
        assert!(entry.matches("host.tv/bad/clip"));
        assert!(entry.matches("https://host.tv/bad"));
        assert!(entry.matches("host.tv/bad?t=30"));
        assert!(!entry.matches("host.tv/good"));
        assert!(!entry.matches("host.tv/badger-fan-club"));
    }

    #[test]
    fn test_domain_ignores_surrounding_markup() {
        let entry = BlacklistEntry::new("spamlink.com", BlacklistType::Domain).unwrap();
        assert!(entry.matches("**spamlink.com**"));
        assert!(entry.matches("`spamlink.com`"));
        assert!(entry.matches("{spamlink.com}"));
        assert!(entry.matches("_https://spamlink.com/x_"));
    }

    #[test]
    fn test_invalid_patterns() {
        let err = BlacklistEntry::new("   ", BlacklistType::Phrase).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(BlacklistEntry::new("nodots", BlacklistType::Domain).is_err());
        assert!(BlacklistEntry::new("(unclosed", BlacklistType::Regex).is_err());
    }

    #[test]
    fn test_regex_matching() {
        let entry = BlacklistEntry::new(r"b+u+y\s+now", BlacklistType::Regex).unwrap();
        assert!(entry.matches("BUUUY   now"));
        assert!(!entry.matches("buy later"));
    }

    #[test]
    fn test_add_returns_matching_entry() {
        let bl = BlacklistManager::new();
        let entry = bl.add("spam", BlacklistType::Phrase).unwrap();
        assert!(entry.matches("spam spam"));
        assert!(bl.is_blacklisted("so much SPAM"));
        assert!(!bl.is_blacklisted("ham"));
    }

    #[test]
    fn test_add_duplicate_is_idempotent() {
        let bl = BlacklistManager::new();
        let first = bl.add("spam", BlacklistType::Phrase).unwrap();
        let second = bl.add("SPAM", BlacklistType::Phrase).unwrap();
        assert_eq!(bl.len(), 1);
        assert_eq!(first.created_at(), second.created_at());
        assert_eq!(second.pattern(), "spam");
    }

    #[test]
    fn test_non_ascii_case_folding() {
        let bl = BlacklistManager::new();
        bl.add("ÄRGER", BlacklistType::Phrase).unwrap();
        bl.add("ärger", BlacklistType::Phrase).unwrap();
        assert_eq!(bl.len(), 1);
        assert!(bl.is_blacklisted("so viel Ärger"));

        let removed = bl.remove_fuzzy("ärger");
        assert_eq!(removed.len(), 1);
        assert!(bl.is_empty());
        assert!(!bl.is_blacklisted("so viel Ärger"));
    }

    #[test]
    fn test_remove_exact() {
        let bl = BlacklistManager::new();
        bl.add("spamlink.com", BlacklistType::Domain).unwrap();
        bl.add("spamlink.com", BlacklistType::Phrase).unwrap();

        let removed = bl.remove("spamlink.com", BlacklistType::Domain).unwrap();
        assert_eq!(removed.kind(), BlacklistType::Domain);
        assert_eq!(bl.len(), 1);
        // The phrase entry still matches
        assert!(bl.is_blacklisted("spamlink.com"));
    }

    #[test]
    fn test_remove_exact_missing() {
        let bl = BlacklistManager::new();
        let err = bl.remove("spamlink.com", BlacklistType::Domain).unwrap_err();
        assert_eq!(
            err,
            BlacklistError::NotFound {
                pattern: "spamlink.com".into(),
                kind: BlacklistType::Domain
            }
        );
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_removed_entry_no_longer_matches() {
        let bl = BlacklistManager::new();
        bl.add("casino", BlacklistType::Phrase).unwrap();
        bl.remove("casino", BlacklistType::Phrase).unwrap();
        assert!(!bl.is_blacklisted("casino"));
        assert!(bl.is_empty());
    }

    #[test]
    fn test_remove_fuzzy_across_types() {
        let bl = BlacklistManager::new();
        bl.add("spam.com", BlacklistType::Domain).unwrap();
        bl.add("other", BlacklistType::Phrase).unwrap();
        bl.add("spam.com", BlacklistType::Phrase).unwrap();
        bl.add("spam.com", BlacklistType::Regex).unwrap();

        let removed = bl.remove_fuzzy("Spam.com");
        let kinds: Vec<_> = removed.iter().map(|e| e.kind()).collect();
        // Regex comparison is exact, so "Spam.com" leaves the regex entry
        assert_eq!(kinds, vec![BlacklistType::Domain, BlacklistType::Phrase]);

        let entries: Vec<_> = bl.entries().iter().map(|e| e.to_string()).collect();
        assert_eq!(entries, vec!["other [phrase]", "spam.com [regex]"]);
    }

    #[test]
    fn test_remove_fuzzy_no_match_is_empty() {
        let bl = BlacklistManager::new();
        bl.add("other", BlacklistType::Phrase).unwrap();
        assert!(bl.remove_fuzzy("spamlink.com").is_empty());
        assert_eq!(bl.len(), 1);
    }

    #[test]
    fn test_first_match_is_oldest() {
        let bl = BlacklistManager::new();
        bl.add("bad", BlacklistType::Phrase).unwrap();
        bl.add("bad.*", BlacklistType::Regex).unwrap();
        let hit = bl.first_match("bad words").unwrap();
        assert_eq!(hit.kind(), BlacklistType::Phrase);
    }
}
