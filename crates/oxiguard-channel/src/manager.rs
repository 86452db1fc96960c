//! Channel Manager — the per-channel façade over every moderation store.
//!
//! Responsibilities:
//! - Resolve effective permissions, falling back to the channel's
//!   `DEFAULT_PERMISSION` setting for users without an assignment
//! - Ingest messages into history and check them against the blacklist
//! - Mutate the blacklist, re-scanning recent history for new entries
//! - Expose timeouts, settings, and link rewriting
//!
//! Every store error is converted into a [`ChannelError`] here; nothing
//! below this layer leaks to callers unchanged.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use oxiguard_core::{ChatMessage, ChatUser, Permission};
use tracing::{debug, info};

use crate::blacklist::{BlacklistEntry, BlacklistManager, BlacklistType};
use crate::error::{ChannelError, IntoChannelError};
use crate::history::{MessageHistory, MessageSnapshot, MessageStore};
use crate::links::{LinkCleaner, LinkRewriter};
use crate::permissions::{PermissionError, PermissionsManager};
use crate::settings::{ChannelSetting, ChannelSettings, SettingType, DEFAULT_PERMISSION, LOOK_BEHIND};
use crate::timeouts::{TimeoutManager, TimeoutPolicy, TimeoutReason};
use crate::AUDIT_TARGET;

/// Which part of the history a snapshot covers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SnapshotScope {
    Channel,
    User(ChatUser),
}

/// All moderation state for one named channel.
pub struct ChannelManager {
    name: String,
    permissions: PermissionsManager,
    history: Arc<dyn MessageStore>,
    timeouts: TimeoutManager,
    blacklist: BlacklistManager,
    settings: ChannelSettings,
    links: Arc<dyn LinkRewriter>,
}

impl fmt::Debug for ChannelManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelManager")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl ChannelManager {
    /// Create a channel with in-memory stores and default collaborators.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            permissions: PermissionsManager::new(),
            history: Arc::new(MessageHistory::default()),
            timeouts: TimeoutManager::default(),
            blacklist: BlacklistManager::new(),
            settings: ChannelSettings::in_memory(),
            links: Arc::new(LinkCleaner::default()),
        }
    }

    /// Replace the message store.
    pub fn with_history(mut self, history: Arc<dyn MessageStore>) -> Self {
        self.history = history;
        self
    }

    /// Replace the settings backend (e.g. one shared by several channels).
    pub fn with_settings(mut self, settings: ChannelSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Replace the link rewriting collaborator.
    pub fn with_links(mut self, links: Arc<dyn LinkRewriter>) -> Self {
        self.links = links;
        self
    }

    /// Replace the timeout policy; existing timeout records are discarded.
    pub fn with_timeout_policy(mut self, policy: TimeoutPolicy) -> Self {
        self.timeouts = TimeoutManager::new(policy);
        self
    }

    /// Channel name as it was opened.
    pub fn name(&self) -> &str {
        &self.name
    }

    // ─────────────────────────────────────────────
    // Permissions
    // ─────────────────────────────────────────────

    /// Effective level of `user`: the explicit assignment, otherwise the
    /// channel default. A default that names no level is an error.
    pub fn resolve_permission(&self, user: &ChatUser) -> Result<Permission, ChannelError> {
        match self.permissions.get(user) {
            Ok(level) => Ok(level),
            Err(PermissionError::NotFound(_)) => {
                let configured = self.setting(&DEFAULT_PERMISSION)?;
                configured
                    .parse::<Permission>()
                    .map_err(|e| e.in_channel(&self.name))
            }
        }
    }

    /// Whether `user` may act at the `required` level.
    pub fn check_permission(&self, user: &ChatUser, required: Permission) -> Result<bool, ChannelError> {
        Ok(self.resolve_permission(user)?.authorizes(required))
    }

    /// Assign `level` to `user`, returning the previous explicit assignment.
    pub fn set_permission(&self, user: &ChatUser, level: Permission) -> Option<Permission> {
        info!(
            target: AUDIT_TARGET,
            channel = %self.name,
            user = %user,
            level = %level,
            "setting permission"
        );
        self.permissions.set(user.clone(), level)
    }

    /// Explicit assignments, sorted by user.
    pub fn permission_assignments(&self) -> Vec<(ChatUser, Permission)> {
        self.permissions.assignments()
    }

    // ─────────────────────────────────────────────
    // Messages
    // ─────────────────────────────────────────────

    /// Store `message` and report whether it is clean (`true`) or
    /// blacklisted (`false`). A storage failure is an error and the
    /// blacklist is not consulted.
    pub fn ingest_message(&self, message: ChatMessage) -> Result<bool, ChannelError> {
        let stored = self
            .history
            .append(message)
            .map_err(|e| e.in_channel(&self.name))?;

        match self.blacklist.first_match(&stored.text) {
            Some(entry) => {
                debug!(
                    channel = %self.name,
                    user = %stored.author,
                    entry = %entry,
                    "message blacklisted"
                );
                Ok(false)
            }
            None => Ok(true),
        }
    }

    /// Point-in-time copy of the history in `scope`, newest first.
    pub fn snapshot(&self, scope: &SnapshotScope) -> MessageSnapshot {
        match scope {
            SnapshotScope::Channel => self.history.channel_snapshot(),
            SnapshotScope::User(user) => self.history.user_snapshot(user),
        }
    }

    /// Snapshot of the whole channel.
    pub fn message_snapshot(&self) -> MessageSnapshot {
        self.snapshot(&SnapshotScope::Channel)
    }

    /// Snapshot of the messages `user` sent.
    pub fn user_message_snapshot(&self, user: &ChatUser) -> MessageSnapshot {
        self.snapshot(&SnapshotScope::User(user.clone()))
    }

    // ─────────────────────────────────────────────
    // Timeouts
    // ─────────────────────────────────────────────

    pub fn user_timeout(&self, user: &ChatUser) -> Duration {
        self.timeouts.get(user)
    }

    /// Time out `user` for `reason`; the result includes any escalation.
    pub fn add_user_timeout(&self, user: &ChatUser, reason: TimeoutReason) -> Duration {
        let duration = self.timeouts.add(user, reason);
        info!(
            target: AUDIT_TARGET,
            channel = %self.name,
            user = %user,
            reason = %reason,
            secs = duration.as_secs(),
            "adding timeout"
        );
        duration
    }

    /// Lift every timeout on `user`.
    pub fn clear_user_timeouts(&self, user: &ChatUser) -> usize {
        let cleared = self.timeouts.clear(user);
        info!(
            target: AUDIT_TARGET,
            channel = %self.name,
            user = %user,
            cleared,
            "clearing timeouts"
        );
        cleared
    }

    // ─────────────────────────────────────────────
    // Blacklist
    // ─────────────────────────────────────────────

    /// Blacklist `pattern`, re-checking the channel's `LOOK_BEHIND` most
    /// recent messages.
    pub fn add_blacklist_entry(
        &self,
        pattern: &str,
        kind: BlacklistType,
    ) -> Result<Vec<ChatMessage>, ChannelError> {
        let look_behind = self.setting(&LOOK_BEHIND)?;
        self.add_blacklist_entry_with_look_behind(pattern, kind, look_behind)
    }

    /// Blacklist `pattern` and return which of the `look_behind` newest
    /// messages (newest first) match the new entry. Only the new entry is
    /// checked; a non-positive look-behind skips the scan.
    pub fn add_blacklist_entry_with_look_behind(
        &self,
        pattern: &str,
        kind: BlacklistType,
        look_behind: i64,
    ) -> Result<Vec<ChatMessage>, ChannelError> {
        info!(
            target: AUDIT_TARGET,
            channel = %self.name,
            pattern,
            kind = %kind,
            look_behind,
            "adding blacklist entry"
        );

        if look_behind <= 0 {
            self.blacklist
                .add(pattern, kind)
                .map_err(|e| e.in_channel(&self.name))?;
            return Ok(Vec::new());
        }

        // Taken before insertion so only pre-existing messages are re-checked
        let recent = self
            .message_snapshot()
            .take(usize::try_from(look_behind).unwrap_or(usize::MAX));
        let entry = self
            .blacklist
            .add(pattern, kind)
            .map_err(|e| e.in_channel(&self.name))?;

        Ok(recent
            .iter()
            .filter(|message| entry.matches(&message.text))
            .cloned()
            .collect())
    }

    /// Remove the entry with exactly this pattern and type.
    pub fn remove_blacklist_entry(
        &self,
        pattern: &str,
        kind: BlacklistType,
    ) -> Result<BlacklistEntry, ChannelError> {
        let removed = self
            .blacklist
            .remove(pattern, kind)
            .map_err(|e| e.in_channel(&self.name))?;
        info!(
            target: AUDIT_TARGET,
            channel = %self.name,
            entry = %removed,
            "removed blacklist entry"
        );
        Ok(removed)
    }

    /// Remove every entry whose pattern equals `pattern`, whatever its type.
    pub fn remove_blacklist_entries(&self, pattern: &str) -> Vec<BlacklistEntry> {
        let removed = self.blacklist.remove_fuzzy(pattern);
        info!(
            target: AUDIT_TARGET,
            channel = %self.name,
            pattern,
            removed = removed.len(),
            "fuzzy blacklist removal"
        );
        removed
    }

    pub fn blacklist_entries(&self) -> Vec<BlacklistEntry> {
        self.blacklist.entries()
    }

    // ─────────────────────────────────────────────
    // Links & settings
    // ─────────────────────────────────────────────

    pub async fn rewrite_link(&self, link: &str) -> Result<String, ChannelError> {
        self.links
            .rewrite(link)
            .await
            .map_err(|e| e.in_channel(&self.name))
    }

    /// Value of `setting` for this channel, or its default when unset.
    pub fn setting<T: SettingType>(&self, setting: &ChannelSetting<T>) -> Result<T, ChannelError> {
        self.settings
            .get_or_default(&self.name, setting)
            .map_err(|e| e.in_channel(&self.name))
    }

    pub fn set_setting<T: SettingType>(
        &self,
        setting: &ChannelSetting<T>,
        value: T,
    ) -> Result<(), ChannelError> {
        debug!(channel = %self.name, setting = setting.name(), "updating setting");
        self.settings
            .set(&self.name, setting, value)
            .map_err(|e| e.in_channel(&self.name))
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryError;
    use crate::links::LinkError;
    use crate::settings::{MemorySettingStore, SettingStore, SettingValue};
    use async_trait::async_trait;
    use oxiguard_core::ErrorKind;

    fn user(name: &str) -> ChatUser {
        ChatUser::new(name)
    }

    fn say(channel: &ChannelManager, who: &str, text: &str) -> bool {
        channel.ingest_message(ChatMessage::new(who, text)).unwrap()
    }

    /// Store whose appends always fail.
    struct BrokenStore;

    impl MessageStore for BrokenStore {
        fn append(&self, _message: ChatMessage) -> Result<Arc<ChatMessage>, HistoryError> {
            Err(HistoryError::Rejected("disk full".into()))
        }
        fn channel_snapshot(&self) -> MessageSnapshot {
            MessageSnapshot::default()
        }
        fn user_snapshot(&self, _user: &ChatUser) -> MessageSnapshot {
            MessageSnapshot::default()
        }
    }

    /// Rewriter that uppercases or rejects.
    struct ShoutingRewriter;

    #[async_trait]
    impl LinkRewriter for ShoutingRewriter {
        async fn rewrite(&self, link: &str) -> Result<String, LinkError> {
            if link.starts_with("bad") {
                Err(LinkError::InvalidUrl {
                    url: link.to_string(),
                    reason: "rejected".into(),
                })
            } else {
                Ok(link.to_uppercase())
            }
        }
    }

    // ── permissions ──

    #[test]
    fn test_unset_user_gets_default_viewer() {
        let channel = ChannelManager::new("foo");
        assert_eq!(channel.resolve_permission(&user("alice")).unwrap(), Permission::Viewer);

        channel.set_permission(&user("alice"), Permission::BotAdmin);
        assert_eq!(channel.resolve_permission(&user("alice")).unwrap(), Permission::BotAdmin);
    }

    #[test]
    fn test_configured_default_applies_to_unset_users() {
        let channel = ChannelManager::new("foo");
        channel
            .set_setting(&DEFAULT_PERMISSION, "ChannelModerator".to_string())
            .unwrap();
        assert_eq!(
            channel.resolve_permission(&user("bob")).unwrap(),
            Permission::ChannelModerator
        );
        // Explicit assignment still wins, even below the default
        channel.set_permission(&user("bob"), Permission::Viewer);
        assert_eq!(channel.resolve_permission(&user("bob")).unwrap(), Permission::Viewer);
    }

    #[test]
    fn test_invalid_default_fails() {
        let channel = ChannelManager::new("foo");
        channel
            .set_setting(&DEFAULT_PERMISSION, "Overlord".to_string())
            .unwrap();
        let err = channel.resolve_permission(&user("bob")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(err.channel, "foo");
        assert!(channel.check_permission(&user("bob"), Permission::Viewer).is_err());
    }

    #[test]
    fn test_default_with_wrong_stored_type_is_mismatch() {
        let store = Arc::new(MemorySettingStore::new());
        store
            .set(&DEFAULT_PERMISSION.key("foo"), SettingValue::Integer(3))
            .unwrap();
        let channel = ChannelManager::new("foo").with_settings(ChannelSettings::new(store));
        let err = channel.resolve_permission(&user("bob")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_check_permission_follows_order() {
        let channel = ChannelManager::new("foo");
        for have in Permission::ALL {
            channel.set_permission(&user("alice"), have);
            for need in Permission::ALL {
                assert_eq!(
                    channel.check_permission(&user("alice"), need).unwrap(),
                    have >= need
                );
            }
        }
    }

    // ── messages ──

    #[test]
    fn test_ingest_reports_clean_and_blacklisted() {
        let channel = ChannelManager::new("foo");
        channel
            .add_blacklist_entry_with_look_behind("casino", BlacklistType::Phrase, 0)
            .unwrap();
        assert!(say(&channel, "alice", "hello there"));
        assert!(!say(&channel, "bob", "best CASINO deals"));
        // Both are stored regardless of verdict
        assert_eq!(channel.message_snapshot().len(), 2);
    }

    #[test]
    fn test_ingest_store_failure_is_error() {
        let channel = ChannelManager::new("foo").with_history(Arc::new(BrokenStore));
        let err = channel
            .ingest_message(ChatMessage::new("alice", "hi"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StoreFault);
        assert!(err.detail.contains("disk full"));
    }

    #[test]
    fn test_snapshot_scopes() {
        let channel = ChannelManager::new("foo");
        say(&channel, "alice", "a1");
        say(&channel, "bob", "b1");
        say(&channel, "alice", "a2");

        let all = channel.snapshot(&SnapshotScope::Channel);
        assert_eq!(all.len(), 3);
        let alice = channel.snapshot(&SnapshotScope::User(user("alice")));
        let texts: Vec<_> = alice.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["a2", "a1"]);
        assert_eq!(channel.user_message_snapshot(&user("bob")).len(), 1);
        let direct = channel.user_message_snapshot(&user("alice"));
        let direct: Vec<_> = direct.iter().map(|m| m.sequence).collect();
        let scoped: Vec<_> = alice.iter().map(|m| m.sequence).collect();
        assert_eq!(direct, scoped);
    }

    #[test]
    fn test_debug_shows_name() {
        let channel = ChannelManager::new("foo");
        let shown = format!("{channel:?}");
        assert!(shown.starts_with("ChannelManager"));
        assert!(shown.contains("\"foo\""));
    }

    // ── blacklist ──

    #[test]
    fn test_look_behind_returns_matching_recent_messages() {
        let channel = ChannelManager::new("foo");
        say(&channel, "old", "spamlink.com from long ago");
        say(&channel, "a", "check spamlink.com");
        say(&channel, "b", "hello");
        say(&channel, "c", "http://spamlink.com/free");
        say(&channel, "d", "nothing here");
        say(&channel, "e", "still nothing");

        let hits = channel
            .add_blacklist_entry_with_look_behind("spamlink.com", BlacklistType::Domain, 5)
            .unwrap();
        let texts: Vec<_> = hits.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["http://spamlink.com/free", "check spamlink.com"]);
    }

    #[test]
    fn test_non_positive_look_behind_skips_scan() {
        let channel = ChannelManager::new("foo");
        say(&channel, "a", "spam");
        for n in [0, -3] {
            let hits = channel
                .add_blacklist_entry_with_look_behind("spam", BlacklistType::Phrase, n)
                .unwrap();
            assert!(hits.is_empty());
        }
        // The entry was still added
        assert!(!say(&channel, "b", "spam again"));
    }

    #[test]
    fn test_look_behind_ignores_existing_entries() {
        let channel = ChannelManager::new("foo");
        channel
            .add_blacklist_entry_with_look_behind("rude", BlacklistType::Phrase, 0)
            .unwrap();
        say(&channel, "a", "rude words");
        say(&channel, "b", "buy gold");

        let hits = channel
            .add_blacklist_entry_with_look_behind("gold", BlacklistType::Phrase, 10)
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "buy gold");
    }

    #[test]
    fn test_look_behind_larger_than_history() {
        let channel = ChannelManager::new("foo");
        say(&channel, "a", "gold");
        let hits = channel
            .add_blacklist_entry_with_look_behind("gold", BlacklistType::Phrase, i64::MAX)
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_default_look_behind_from_setting() {
        let channel = ChannelManager::new("foo");
        say(&channel, "a", "gold 1");
        say(&channel, "a", "gold 2");
        say(&channel, "a", "gold 3");
        channel.set_setting(&LOOK_BEHIND, 2).unwrap();

        let hits = channel.add_blacklist_entry("gold", BlacklistType::Phrase).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_invalid_regex_is_invalid_input() {
        let channel = ChannelManager::new("foo");
        let err = channel
            .add_blacklist_entry_with_look_behind("(", BlacklistType::Regex, 5)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(channel.blacklist_entries().is_empty());
    }

    #[test]
    fn test_remove_missing_entry() {
        let channel = ChannelManager::new("foo");
        let err = channel
            .remove_blacklist_entry("spamlink.com", BlacklistType::Domain)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(channel.remove_blacklist_entries("spamlink.com").is_empty());
    }

    #[test]
    fn test_remove_entry_then_message_is_clean() {
        let channel = ChannelManager::new("foo");
        channel
            .add_blacklist_entry_with_look_behind("spamlink.com", BlacklistType::Domain, 0)
            .unwrap();
        assert!(!say(&channel, "a", "spamlink.com"));

        let removed = channel
            .remove_blacklist_entry("spamlink.com", BlacklistType::Domain)
            .unwrap();
        assert_eq!(removed.pattern(), "spamlink.com");
        assert!(say(&channel, "a", "spamlink.com"));
    }

    #[test]
    fn test_fuzzy_removal_removes_all_types() {
        let channel = ChannelManager::new("foo");
        channel
            .add_blacklist_entry_with_look_behind("spam.io", BlacklistType::Domain, 0)
            .unwrap();
        channel
            .add_blacklist_entry_with_look_behind("spam.io", BlacklistType::Phrase, 0)
            .unwrap();
        assert_eq!(channel.remove_blacklist_entries("spam.io").len(), 2);
        assert!(channel.blacklist_entries().is_empty());
    }

    // ── timeouts ──

    #[test]
    fn test_timeouts_escalate() {
        let channel = ChannelManager::new("foo");
        let alice = user("alice");
        assert_eq!(channel.user_timeout(&alice), Duration::ZERO);

        let first = channel.add_user_timeout(&alice, TimeoutReason::Blacklist);
        let second = channel.add_user_timeout(&alice, TimeoutReason::Blacklist);
        assert!(second >= first);
        assert_eq!(channel.user_timeout(&alice), second);

        assert_eq!(channel.clear_user_timeouts(&alice), 1);
        assert_eq!(channel.user_timeout(&alice), Duration::ZERO);
    }

    #[test]
    fn test_custom_timeout_policy() {
        let policy = TimeoutPolicy {
            manual: Duration::from_secs(5),
            ..TimeoutPolicy::default()
        };
        let channel = ChannelManager::new("foo").with_timeout_policy(policy);
        assert_eq!(
            channel.add_user_timeout(&user("a"), TimeoutReason::Manual),
            Duration::from_secs(5)
        );
    }

    // ── links ──

    #[tokio::test]
    async fn test_rewrite_link_delegates() {
        let channel = ChannelManager::new("foo").with_links(Arc::new(ShoutingRewriter));
        assert_eq!(channel.rewrite_link("a.io").await.unwrap(), "A.IO");
    }

    #[tokio::test]
    async fn test_rewrite_link_error_is_translated() {
        let channel = ChannelManager::new("foo").with_links(Arc::new(ShoutingRewriter));
        let err = channel.rewrite_link("bad.io").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(err.channel, "foo");
    }

    #[tokio::test]
    async fn test_default_rewriter_cleans_links() {
        let channel = ChannelManager::new("foo");
        let out = channel
            .rewrite_link("example.com/x?utm_source=chat")
            .await
            .unwrap();
        assert_eq!(out, "https://example.com/x");
    }

    // ── settings ──

    #[test]
    fn test_settings_are_scoped_by_channel() {
        let shared = ChannelSettings::in_memory();
        let foo = ChannelManager::new("foo").with_settings(shared.clone());
        let bar = ChannelManager::new("bar").with_settings(shared);
        foo.set_setting(&LOOK_BEHIND, 1).unwrap();
        assert_eq!(foo.setting(&LOOK_BEHIND).unwrap(), 1);
        assert_eq!(bar.setting(&LOOK_BEHIND).unwrap(), 10);
    }
}
