//! Configuration view and validation commands: `boardsync config`.

use std::path::Path;

use anyhow::Result;
use boardsync::config::{CONFIG_DIR, CONFIG_FILE, SyncConfig};

use super::super::ConfigCommands;

pub fn cmd_config(project_dir: &Path, config: &SyncConfig, command: Option<ConfigCommands>) -> Result<()> {
    let local_path = project_dir.join(CONFIG_DIR).join(CONFIG_FILE);

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Boardsync Configuration");
            println!("=======================");
            println!();

            match SyncConfig::locate(project_dir) {
                Some(path) => println!("Config file: {}", path.display()),
                None => println!("No boardsync.toml found; using defaults."),
            }
            println!();

            println!("[api]");
            println!("  url = \"{}\"", config.api.url);
            println!("  socket_url = \"{}\"", config.api.socket_url);
            println!(
                "  token = {}",
                if config.api.token.is_some() { "\"****\"" } else { "(unset)" }
            );
            println!("  timeout_secs = {}", config.api.timeout_secs);
            println!("  page_size = {}", config.api.page_size);
            println!();
            println!("[board]");
            match &config.board.default_project {
                Some(project) => println!("  default_project = \"{}\"", project),
                None => println!("  default_project = (unset)"),
            }
            println!();
        }
        Some(ConfigCommands::Validate) => {
            let warnings = config.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
        }
        Some(ConfigCommands::Init) => {
            if local_path.exists() {
                println!("boardsync.toml already exists at {}", local_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            SyncConfig::default().save(&local_path)?;
            println!("Created boardsync.toml at {}", local_path.display());
        }
    }

    Ok(())
}
