//! Oxiguard CLI — entry point.
//!
//! # Commands
//!
//! - `oxiguard console [-c CHANNEL] [-u USER]`: interactive moderation console
//! - `oxiguard init`: write a default config
//! - `oxiguard status`: show configuration
//!
//! `--config <PATH>` points any command at another config file.

mod console;
mod helpers;
mod init;
mod status;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use oxiguard_channel::settings::JsonFileSettingStore;
use oxiguard_channel::{ChannelHub, ChannelSettings};
use oxiguard_core::config::{load_config, Config};
use oxiguard_core::ChatUser;

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// 🛡 Oxiguard: per-channel chat moderation
#[derive(Parser)]
#[command(name = "oxiguard", version, about, long_about = None)]
struct Cli {
    /// Config file to use instead of ~/.oxiguard/config.json
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Moderate a channel interactively
    Console {
        /// Channel to open
        #[arg(short, long, default_value = "console")]
        channel: String,

        /// User the console speaks as
        #[arg(short, long, default_value = "operator")]
        user: String,

        /// Keep settings in memory instead of ~/.oxiguard/settings
        #[arg(long, default_value_t = false)]
        ephemeral: bool,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Create ~/.oxiguard/config.json with defaults
    Init,

    /// Show configuration
    Status,
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref().map(helpers::expand_tilde);

    match cli.command {
        Commands::Console {
            channel,
            user,
            ephemeral,
            logs,
        } => {
            init_logging(logs);
            let config = load_config(config_path.as_deref());
            let hub = build_hub(config, ephemeral)?;
            hub.open_autojoin().context("failed to open autojoin channels")?;
            console::run(hub, &channel, ChatUser::new(user)).await
        }
        Commands::Init => init::run(config_path.as_deref()),
        Commands::Status => status::run(config_path.as_deref()),
    }
}

/// Build the channel hub, with file-backed settings unless `ephemeral`.
fn build_hub(config: Config, ephemeral: bool) -> Result<ChannelHub> {
    let hub = ChannelHub::new(config);
    if ephemeral {
        info!("using in-memory settings");
        return Ok(hub);
    }

    let path = helpers::settings_file();
    let store = JsonFileSettingStore::open(&path)
        .with_context(|| format!("failed to open settings at {}", path.display()))?;
    info!(path = %path.display(), "using file-backed settings");
    Ok(hub.with_settings(ChannelSettings::new(Arc::new(store))))
}

/// Initialize tracing/logging.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("oxiguard=debug,oxiguard_channel=debug,info")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .compact()
        .init();
}
