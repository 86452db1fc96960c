//! Core domain types shared by the channel stores and the CLI.
//!
//! - [`ChatUser`]: normalized username, the subject of permissions and timeouts
//! - [`Permission`]: totally ordered privilege tiers
//! - [`ChatMessage`]: an immutable chat line as retained by message history

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────
// User identity
// ─────────────────────────────────────────────

/// A chat user, identified by username.
///
/// Usernames are trimmed and lowercased on construction, so `"Alice"` and
/// `"alice "` address the same user.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatUser(String);

impl ChatUser {
    pub fn new(username: impl AsRef<str>) -> Self {
        ChatUser(username.as_ref().trim().to_lowercase())
    }

    pub fn username(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChatUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for ChatUser {
    fn from(s: &str) -> Self {
        ChatUser::new(s)
    }
}

impl From<String> for ChatUser {
    fn from(s: String) -> Self {
        ChatUser::new(s)
    }
}

// ─────────────────────────────────────────────
// Permission levels
// ─────────────────────────────────────────────

/// Privilege tiers, lowest first. The derived `Ord` is the permission order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Permission {
    Viewer,
    ChannelModerator,
    BotModerator,
    BotAdmin,
}

impl Permission {
    /// All levels in ascending order.
    pub const ALL: [Permission; 4] = [
        Permission::Viewer,
        Permission::ChannelModerator,
        Permission::BotModerator,
        Permission::BotAdmin,
    ];

    /// Whether this level may perform an action gated at `required`.
    pub fn authorizes(self, required: Permission) -> bool {
        self >= required
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Permission::Viewer => "Viewer",
            Permission::ChannelModerator => "ChannelModerator",
            Permission::BotModerator => "BotModerator",
            Permission::BotAdmin => "BotAdmin",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A string that names no permission level.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a valid permission level")]
pub struct PermissionParseError(pub String);

impl FromStr for Permission {
    type Err = PermissionParseError;

    /// Parses a level by name, ignoring ASCII case (`"botadmin"` → `BotAdmin`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Permission::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| PermissionParseError(s.to_string()))
    }
}

// ─────────────────────────────────────────────
// Chat messages
// ─────────────────────────────────────────────

/// A single chat line.
///
/// `sequence` is assigned by the message history when the message is
/// appended; it is zero until then.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub author: ChatUser,
    pub text: String,
    pub received_at: DateTime<Utc>,
    #[serde(default)]
    pub sequence: u64,
}

impl ChatMessage {
    /// Create a message received now.
    pub fn new(author: impl Into<ChatUser>, text: impl Into<String>) -> Self {
        ChatMessage {
            author: author.into(),
            text: text.into(),
            received_at: Utc::now(),
            sequence: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_is_normalized() {
        assert_eq!(ChatUser::new("  Alice "), ChatUser::new("alice"));
        assert_eq!(ChatUser::new("Bob").username(), "bob");
    }

    #[test]
    fn test_permission_order() {
        assert!(Permission::Viewer < Permission::ChannelModerator);
        assert!(Permission::ChannelModerator < Permission::BotModerator);
        assert!(Permission::BotModerator < Permission::BotAdmin);
    }

    #[test]
    fn test_authorizes_matches_order() {
        for have in Permission::ALL {
            for need in Permission::ALL {
                assert_eq!(have.authorizes(need), have >= need, "{have} vs {need}");
            }
        }
    }

    #[test]
    fn test_parse_permission() {
        assert_eq!("BotAdmin".parse::<Permission>().unwrap(), Permission::BotAdmin);
        assert_eq!("viewer".parse::<Permission>().unwrap(), Permission::Viewer);
        assert_eq!(
            " channelmoderator ".parse::<Permission>().unwrap(),
            Permission::ChannelModerator
        );
    }

    #[test]
    fn test_parse_invalid_permission() {
        let err = "Superuser".parse::<Permission>().unwrap_err();
        assert_eq!(err, PermissionParseError("Superuser".into()));
        assert!("".parse::<Permission>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for level in Permission::ALL {
            assert_eq!(level.to_string().parse::<Permission>().unwrap(), level);
        }
    }

    #[test]
    fn test_message_new() {
        let msg = ChatMessage::new("Alice", "hello");
        assert_eq!(msg.author.username(), "alice");
        assert_eq!(msg.text, "hello");
        assert_eq!(msg.sequence, 0);
    }
}
