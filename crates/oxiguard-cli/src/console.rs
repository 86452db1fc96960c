//! Interactive moderation console.
//!
//! Uses `rustyline` for line editing with persistent history. Each line is
//! either a console directive, a bot command (`!alias args...`) or a chat
//! message ingested into the current channel.

use anyhow::Result;
use rustyline::config::Configurer;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{DefaultEditor, Editor};
use tracing::debug;

use oxiguard_channel::{ChannelHub, CommandOutcome, SnapshotScope};
use oxiguard_core::ChatUser;

use crate::helpers;

/// Exit commands (case-insensitive match).
const EXIT_COMMANDS: &[&str] = &["exit", "quit", "/exit", "/quit", ":q"];

/// A parsed console line.
#[derive(Debug, PartialEq, Eq)]
enum ConsoleInput<'a> {
    Empty,
    Exit,
    /// `/as <user>`
    SwitchUser(&'a str),
    /// `/history [user]`
    History(Option<&'a str>),
    /// `/perms`
    Permissions,
    /// `!alias args...`
    Command { alias: &'a str, args: Vec<&'a str> },
    /// A directive used wrongly.
    Usage(&'static str),
    Chat(&'a str),
}

fn parse_line(line: &str) -> ConsoleInput<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ConsoleInput::Empty;
    }
    if EXIT_COMMANDS.contains(&trimmed.to_lowercase().as_str()) {
        return ConsoleInput::Exit;
    }

    if let Some(command) = trimmed.strip_prefix('!') {
        let mut words = command.split_whitespace();
        let alias = words.next().unwrap_or("");
        return ConsoleInput::Command {
            alias,
            args: words.collect(),
        };
    }

    let mut words = trimmed.split_whitespace();
    match words.next() {
        Some("/as") => match (words.next(), words.next()) {
            (Some(user), None) => ConsoleInput::SwitchUser(user),
            _ => ConsoleInput::Usage("/as <user>"),
        },
        Some("/history") => match (words.next(), words.next()) {
            (user, None) => ConsoleInput::History(user),
            _ => ConsoleInput::Usage("/history [user]"),
        },
        Some("/perms") => ConsoleInput::Permissions,
        _ => ConsoleInput::Chat(trimmed),
    }
}

/// Run the console loop on `channel`, speaking as `user`.
pub async fn run(hub: ChannelHub, channel: &str, mut user: ChatUser) -> Result<()> {
    let channel = hub.channel(channel)?;
    helpers::print_banner(channel.name(), &user);

    let mut editor = create_editor()?;

    loop {
        let line = match editor.readline(&helpers::prompt(channel.name(), &user)) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        };

        let input = parse_line(&line);
        if input != ConsoleInput::Empty {
            let _ = editor.add_history_entry(line.as_str());
        }

        match input {
            ConsoleInput::Empty => continue,
            ConsoleInput::Exit => {
                println!("\nBye!");
                break;
            }
            ConsoleInput::SwitchUser(name) => {
                user = ChatUser::new(name);
                match channel.resolve_permission(&user) {
                    Ok(level) => println!("  now speaking as {user} ({level})"),
                    Err(e) => helpers::print_error(&e),
                }
            }
            ConsoleInput::History(who) => {
                let scope = match who {
                    Some(name) => SnapshotScope::User(ChatUser::new(name)),
                    None => SnapshotScope::Channel,
                };
                helpers::print_history(&channel.snapshot(&scope));
            }
            ConsoleInput::Permissions => {
                let assignments = channel.permission_assignments();
                if assignments.is_empty() {
                    println!("  no explicit assignments");
                }
                for (who, level) in assignments {
                    println!("  {who:<20} {level}");
                }
            }
            ConsoleInput::Command { alias, args } => {
                debug!(channel = channel.name(), alias, "console command");
                match hub.run_command(channel.name(), &user, alias, &args).await {
                    Ok(CommandOutcome::Executed(reply)) => helpers::print_reply(&reply),
                    Ok(CommandOutcome::Denied {
                        command,
                        required,
                        actual,
                    }) => helpers::print_denied(command, required, actual),
                    Err(e) => helpers::print_error(&e),
                }
            }
            ConsoleInput::Usage(usage) => println!("  usage: {usage}"),
            ConsoleInput::Chat(text) => match hub.ingest(channel.name(), &user, text) {
                Ok(clean) => helpers::print_verdict(clean),
                Err(e) => helpers::print_error(&e),
            },
        }
    }

    save_history(&mut editor);
    Ok(())
}

/// Create a rustyline editor with history.
fn create_editor() -> Result<Editor<(), DefaultHistory>> {
    let mut editor = DefaultEditor::new()?;
    editor.set_max_history_size(1000)?;

    let path = helpers::history_file();
    if path.exists() {
        let _ = editor.load_history(&path);
        debug!("loaded console history from {}", path.display());
    }

    Ok(editor)
}

fn save_history(editor: &mut Editor<(), DefaultHistory>) {
    let path = helpers::history_file();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(e) = editor.save_history(&path) {
        debug!("failed to save history: {e}");
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
