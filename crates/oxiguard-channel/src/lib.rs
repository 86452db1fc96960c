//! Oxiguard Channel — per-channel moderation state.
//!
//! This crate provides:
//! - **permissions**: explicit user → level assignments
//! - **history**: bounded, newest-first message history with immutable snapshots
//! - **blacklist**: typed blacklist entries and matching
//! - **timeouts**: per-reason timeouts with escalation
//! - **settings**: typed per-channel settings over pluggable stores
//! - **links**: the link rewriting collaborator
//! - **manager**: `ChannelManager`, the per-channel façade over all of the above
//! - **commands**: the closed set of bot commands and their handlers
//! - **hub**: `ChannelHub`, routing inbound calls to channels by name
//!
//! Audit events (permission changes, timeouts, blacklist mutations) are
//! logged under the `oxiguard::audit` tracing target.

pub mod blacklist;
pub mod commands;
pub mod error;
pub mod history;
pub mod hub;
pub mod links;
pub mod manager;
pub mod permissions;
pub mod settings;
pub mod timeouts;

/// Tracing target for audit events.
pub const AUDIT_TARGET: &str = "oxiguard::audit";

pub use blacklist::{BlacklistEntry, BlacklistManager, BlacklistType};
pub use commands::{CommandReply, CommandType};
pub use error::ChannelError;
pub use history::{MessageHistory, MessageSnapshot, MessageStore};
pub use hub::{ChannelHub, CommandOutcome};
pub use links::{LinkCleaner, LinkRewriter};
pub use manager::{ChannelManager, SnapshotScope};
pub use permissions::PermissionsManager;
pub use settings::{ChannelSetting, ChannelSettings, SettingStore};
pub use timeouts::{TimeoutManager, TimeoutReason};
