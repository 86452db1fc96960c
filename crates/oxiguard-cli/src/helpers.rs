//! Shared CLI helpers — paths, console output formatting, banner.

use std::path::PathBuf;

use colored::Colorize;

use oxiguard_channel::{CommandReply, CommandType, MessageSnapshot};
use oxiguard_core::utils::{get_data_path, get_settings_path, truncate_string};
use oxiguard_core::{ChatMessage, ChatUser, Permission};

/// Longest message text shown in history listings.
const MAX_PREVIEW: usize = 80;

/// Expand `~` at the start of a path to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_next::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs_next::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// File holding persisted channel settings.
pub fn settings_file() -> PathBuf {
    get_settings_path().join("channels.json")
}

/// Console line-editor history.
pub fn history_file() -> PathBuf {
    get_data_path().join("history").join("console_history")
}

/// One history line: `[seq] author: text`.
pub fn format_message(message: &ChatMessage) -> String {
    format!(
        "[{}] {}: {}",
        message.sequence,
        message.author,
        truncate_string(&message.text, MAX_PREVIEW)
    )
}

pub fn format_denied(command: CommandType, required: Permission, actual: Permission) -> String {
    format!("{command} requires {required}, you are {actual}")
}

/// Prompt showing who speaks where.
pub fn prompt(channel: &str, user: &ChatUser) -> String {
    format!("#{channel} {user}> ")
}

pub fn print_banner(channel: &str, user: &ChatUser) {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("{}  v{}", "🛡 Oxiguard".cyan().bold(), version.dimmed());
    println!("{}", format!("#{channel} as {user}").dimmed());
    println!(
        "{}",
        "Chat away; \"!cmd args\" runs a command, /as <user>, /history [user], /perms, \"exit\" to quit."
            .dimmed()
    );
    println!();
}

pub fn print_verdict(clean: bool) {
    if clean {
        println!("  {}", "✓ clean".green());
    } else {
        println!("  {}", "✗ blacklisted".red().bold());
    }
}

pub fn print_reply(reply: &CommandReply) {
    if reply.is_empty() {
        println!("  {}", "(no output)".dimmed());
    }
    for line in reply.lines() {
        println!("  {line}");
    }
}

pub fn print_denied(command: CommandType, required: Permission, actual: Permission) {
    println!("  {}", format_denied(command, required, actual).yellow());
}

pub fn print_history(snapshot: &MessageSnapshot) {
    if snapshot.is_empty() {
        println!("  {}", "(no messages)".dimmed());
        return;
    }
    for message in snapshot.iter() {
        println!("  {}", format_message(message));
    }
}

pub fn print_error(err: &dyn std::error::Error) {
    eprintln!("  {} {err}", "❌".red());
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
