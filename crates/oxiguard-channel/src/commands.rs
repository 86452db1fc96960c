//! Command dispatcher — the closed set of bot commands.
//!
//! Each [`CommandType`] carries its aliases, the permission level needed to
//! run it, and its handler. Resolution never fails: anything that is not a
//! known alias is [`CommandType::Unknown`]. The dispatcher does not enforce
//! permissions itself; callers check [`CommandType::required_permission`]
//! against the channel before calling [`CommandType::execute`].

use std::fmt;

use oxiguard_core::{ChatUser, ErrorKind, Permission};
use tracing::debug;

use crate::blacklist::BlacklistType;
use crate::error::{ChannelError, IntoChannelError};
use crate::manager::ChannelManager;
use crate::timeouts::TimeoutReason;

// ─────────────────────────────────────────────
// Reply
// ─────────────────────────────────────────────

/// Text a command sends back, one entry per line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandReply {
    lines: Vec<String>,
}

impl CommandReply {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style single line.
    pub fn line(mut self, line: impl Into<String>) -> Self {
        self.lines.push(line.into());
        self
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl fmt::Display for CommandReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines.join("\n"))
    }
}

// ─────────────────────────────────────────────
// Command types
// ─────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandType {
    /// Add, remove and list blacklist entries.
    Blacklist,
    /// Repeat a cleaned-up link.
    LinkRepeater,
    /// Show or change a user's permission level.
    Permission,
    /// Time users out or lift their timeouts.
    Timeout,
    /// Fallback for anything unrecognised.
    Unknown,
}

impl CommandType {
    /// Resolution order.
    pub const ALL: [CommandType; 5] = [
        CommandType::Blacklist,
        CommandType::LinkRepeater,
        CommandType::Permission,
        CommandType::Timeout,
        CommandType::Unknown,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CommandType::Blacklist => "blacklist",
            CommandType::LinkRepeater => "repeat",
            CommandType::Permission => "permit",
            CommandType::Timeout => "timeout",
            CommandType::Unknown => "unknown",
        }
    }

    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            CommandType::Blacklist => &["blacklist", "bl"],
            CommandType::LinkRepeater => &["repeat", "rep", "r"],
            CommandType::Permission => &["permit", "perm"],
            CommandType::Timeout => &["timeout", "to"],
            CommandType::Unknown => &[""],
        }
    }

    pub fn required_permission(self) -> Permission {
        match self {
            CommandType::Blacklist => Permission::BotModerator,
            CommandType::LinkRepeater => Permission::BotAdmin,
            CommandType::Permission => Permission::BotAdmin,
            CommandType::Timeout => Permission::ChannelModerator,
            CommandType::Unknown => Permission::ChannelModerator,
        }
    }

    fn usage(self) -> &'static str {
        match self {
            CommandType::Blacklist => {
                "blacklist add <type> <pattern> [lookbehind] | remove <pattern> [type] | list"
            }
            CommandType::LinkRepeater => "repeat <url>",
            CommandType::Permission => "permit <user> [level]",
            CommandType::Timeout => "timeout <user> [reason|clear]",
            CommandType::Unknown => "",
        }
    }

    /// The command `alias` names; `Unknown` when nothing matches exactly.
    pub fn resolve(alias: &str) -> CommandType {
        Self::ALL
            .into_iter()
            .find(|command| command.aliases().contains(&alias))
            .unwrap_or(CommandType::Unknown)
    }

    /// Run the handler against `channel` on behalf of `invoker`.
    pub async fn execute(
        self,
        channel: &ChannelManager,
        invoker: &ChatUser,
        args: &[&str],
    ) -> Result<CommandReply, ChannelError> {
        debug!(
            channel = channel.name(),
            user = %invoker,
            command = self.name(),
            args = args.len(),
            "executing command"
        );
        match self {
            CommandType::Blacklist => blacklist(channel, args),
            CommandType::LinkRepeater => repeat(channel, args).await,
            CommandType::Permission => permit(channel, args),
            CommandType::Timeout => timeout(channel, args),
            CommandType::Unknown => Ok(help()),
        }
    }

    fn usage_error(self, channel: &ChannelManager) -> ChannelError {
        ChannelError::new(
            channel.name(),
            ErrorKind::InvalidInput,
            format!("usage: {}", self.usage()),
        )
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────

fn parse_type(channel: &ChannelManager, raw: &str) -> Result<BlacklistType, ChannelError> {
    raw.parse::<BlacklistType>()
        .map_err(|e| e.in_channel(channel.name()))
}

fn blacklist(channel: &ChannelManager, args: &[&str]) -> Result<CommandReply, ChannelError> {
    let usage = || CommandType::Blacklist.usage_error(channel);

    match args.split_first() {
        Some((&"add", rest)) if rest.len() >= 2 => {
            let kind = parse_type(channel, rest[0])?;
            let mut words = &rest[1..];

            // A trailing number is the look-behind, unless it is the whole pattern
            let look_behind = match words.split_last() {
                Some((last, init)) if !init.is_empty() => match last.parse::<i64>() {
                    Ok(n) => {
                        words = init;
                        Some(n)
                    }
                    Err(_) => None,
                },
                _ => None,
            };
            let pattern = words.join(" ");

            let hits = match look_behind {
                Some(n) => channel.add_blacklist_entry_with_look_behind(&pattern, kind, n)?,
                None => channel.add_blacklist_entry(&pattern, kind)?,
            };

            let mut reply = CommandReply::new().line(format!("blacklisted {pattern} [{kind}]"));
            if !hits.is_empty() {
                reply.push(format!("{} recent message(s) match:", hits.len()));
                for message in &hits {
                    reply.push(format!("  {}: {}", message.author, message.text));
                }
            }
            Ok(reply)
        }
        Some((&"remove", rest)) if !rest.is_empty() => {
            // An explicit type is only recognised as the last of several words
            let typed = match rest.split_last() {
                Some((last, init)) if !init.is_empty() => last
                    .parse::<BlacklistType>()
                    .ok()
                    .map(|kind| (init.join(" "), kind)),
                _ => None,
            };

            match typed {
                Some((pattern, kind)) => {
                    let removed = channel.remove_blacklist_entry(&pattern, kind)?;
                    Ok(CommandReply::new().line(format!("removed {removed}")))
                }
                None => {
                    let pattern = rest.join(" ");
                    let removed = channel.remove_blacklist_entries(&pattern);
                    if removed.is_empty() {
                        return Ok(CommandReply::new().line(format!("no entries match {pattern}")));
                    }
                    let mut reply = CommandReply::new();
                    for entry in removed {
                        reply.push(format!("removed {entry}"));
                    }
                    Ok(reply)
                }
            }
        }
        Some((&"list", [])) => {
            let entries = channel.blacklist_entries();
            if entries.is_empty() {
                return Ok(CommandReply::new().line("blacklist is empty"));
            }
            let mut reply = CommandReply::new();
            for entry in entries {
                reply.push(entry.to_string());
            }
            Ok(reply)
        }
        _ => Err(usage()),
    }
}

async fn repeat(channel: &ChannelManager, args: &[&str]) -> Result<CommandReply, ChannelError> {
    let [link] = args else {
        return Err(CommandType::LinkRepeater.usage_error(channel));
    };
    let rewritten = channel.rewrite_link(link).await?;
    Ok(CommandReply::new().line(rewritten))
}

fn permit(channel: &ChannelManager, args: &[&str]) -> Result<CommandReply, ChannelError> {
    match args {
        [user] => {
            let user = ChatUser::new(user);
            let level = channel.resolve_permission(&user)?;
            Ok(CommandReply::new().line(format!("{user} is {level}")))
        }
        [user, level] => {
            let user = ChatUser::new(user);
            let level = level
                .parse::<Permission>()
                .map_err(|e| e.in_channel(channel.name()))?;
            let reply = match channel.set_permission(&user, level) {
                Some(previous) if previous != level => {
                    format!("{user} is now {level} (was {previous})")
                }
                _ => format!("{user} is now {level}"),
            };
            Ok(CommandReply::new().line(reply))
        }
        _ => Err(CommandType::Permission.usage_error(channel)),
    }
}

fn timeout(channel: &ChannelManager, args: &[&str]) -> Result<CommandReply, ChannelError> {
    let (user, reason) = match args {
        [user] => (ChatUser::new(user), None),
        [user, reason] => (ChatUser::new(user), Some(*reason)),
        _ => return Err(CommandType::Timeout.usage_error(channel)),
    };

    if reason.is_some_and(|r| r.eq_ignore_ascii_case("clear")) {
        let cleared = channel.clear_user_timeouts(&user);
        return Ok(CommandReply::new().line(format!("cleared {cleared} timeout(s) for {user}")));
    }

    let reason = match reason {
        Some(raw) => raw
            .parse::<TimeoutReason>()
            .map_err(|e| ChannelError::new(channel.name(), ErrorKind::InvalidInput, e))?,
        None => TimeoutReason::Manual,
    };
    let duration = channel.add_user_timeout(&user, reason);
    Ok(CommandReply::new().line(format!(
        "{user} timed out for {}s ({reason})",
        duration.as_secs()
    )))
}

fn help() -> CommandReply {
    let mut reply = CommandReply::new().line("commands:");
    for command in CommandType::ALL {
        if command == CommandType::Unknown {
            continue;
        }
        reply.push(format!(
            "  {:<40} requires {}",
            command.usage(),
            command.required_permission()
        ));
    }
    reply
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
