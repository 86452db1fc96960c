//! `oxiguard init` — create the data directory and a default config.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use oxiguard_core::config::{get_config_path, save_config, Config};
use oxiguard_core::utils::get_settings_path;

pub fn run(path: Option<&Path>) -> Result<()> {
    println!();
    println!("{}", "🛡 Oxiguard Setup".cyan().bold());
    println!();

    let config_path = path.map(Path::to_path_buf).unwrap_or_else(get_config_path);
    if config_path.exists() {
        println!(
            "  {} config already exists at {}",
            "✓".green(),
            config_path.display()
        );
    } else {
        save_config(&Config::default(), Some(&config_path))?;
        println!(
            "  {} created config at {}",
            "✓".green(),
            config_path.display()
        );
    }

    let settings_dir = get_settings_path();
    std::fs::create_dir_all(&settings_dir)?;
    println!("  {} settings dir at {}", "✓".green(), settings_dir.display());

    println!();
    println!(
        "{}",
        "  Setup complete! Run `oxiguard console` to start moderating.".green()
    );
    println!();

    Ok(())
}
