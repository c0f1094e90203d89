//! Configuration view and validation commands: `web2app-admin config`.

use std::path::Path;

use anyhow::Result;
use web2app_admin::config::AdminConfig;

use super::super::ConfigCommands;

pub fn cmd_config(config_path: &Path, command: Option<ConfigCommands>) -> Result<()> {
    let config = AdminConfig::resolve(config_path)?;

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Web2App Admin Configuration");
            println!("===========================");
            println!();
            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!(
                    "No config file at {} (using defaults + environment)",
                    config_path.display()
                );
            }
            println!();
            print!("{}", config.redacted().to_toml()?);
            println!();
            println!("OAuth callback: {}", config.callback_url());
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let warnings = config.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
    }

    Ok(())
}
