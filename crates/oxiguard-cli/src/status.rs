//! `oxiguard status` — show configuration.
//!
//! - Config and settings file locations
//! - Effective channel defaults and timeout policy
//! - Operators and autojoin channels

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use oxiguard_core::config::{get_config_path, load_config};

use crate::helpers;

fn exists_marker(exists: bool) -> String {
    if exists {
        "✓".green().to_string()
    } else {
        "(not found)".red().to_string()
    }
}

/// Run the status command.
pub fn run(path: Option<&Path>) -> Result<()> {
    let config = load_config(path);
    let config_path = path.map(Path::to_path_buf).unwrap_or_else(get_config_path);
    let settings_path = helpers::settings_file();

    println!();
    println!("{}", "🛡 Oxiguard Status".cyan().bold());
    println!();

    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        config_path.display(),
        exists_marker(config_path.exists())
    );
    println!(
        "  {:<18} {} {}",
        "Settings:".bold(),
        settings_path.display(),
        exists_marker(settings_path.exists())
    );

    // Channels
    let channels = &config.channels;
    println!();
    println!("  {:<18} {}", "History limit:".bold(), channels.history_limit);
    println!(
        "  {:<18} {}",
        "Default level:".bold(),
        channels
            .default_permission
            .as_deref()
            .unwrap_or("Viewer (built-in)")
    );
    println!(
        "  {:<18} {}",
        "Look-behind:".bold(),
        channels
            .look_behind
            .map_or_else(|| "10 (built-in)".to_string(), |n| n.to_string())
    );
    let autojoin = if channels.autojoin.is_empty() {
        "none".dimmed().to_string()
    } else {
        channels.autojoin.join(", ")
    };
    println!("  {:<18} {}", "Autojoin:".bold(), autojoin);

    // Timeouts
    let t = &config.timeouts;
    println!(
        "  {:<18} blacklist {}s | spam {}s | manual {}s",
        "Timeouts:".bold(),
        t.blacklist_secs,
        t.spam_secs,
        t.manual_secs
    );
    println!(
        "  {:<18} {}",
        "Escalation:".bold(),
        format!("x{} up to {}s", t.escalation_factor, t.max_secs).dimmed()
    );

    // Operators
    println!();
    println!("  {}", "Operators:".bold());
    if channels.operators.is_empty() {
        println!("    {}", "· none".dimmed());
    }
    let mut operators: Vec<_> = channels.operators.iter().collect();
    operators.sort();
    for (user, level) in operators {
        println!("    {user:<20} {level}");
    }

    println!();
    Ok(())
}
