use crate::config_manager::{Config, CONFIG_KEYS};
use crate::GlobalOpts;
use clap::Subcommand;
use colored::*;
use tox_edm_logger as logger;

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show the current configuration
    Show,
    /// Set a configuration value (keys: edm-path, work-dir)
    Set { key: String, value: String },
    /// Print the path of the configuration file
    Path,
}

pub fn handle_config(action: ConfigAction, opts: &GlobalOpts) {
    match action {
        ConfigAction::Show => match Config::load() {
            Ok(config) => {
                println!("{}", "Configuration:".bold().green());
                if config.is_empty() {
                    if opts.verbosity_level() > 0 {
                        println!("  {}", "(empty)".yellow());
                    }
                } else {
                    for (key, value) in config.values_iter() {
                        println!("  {}: {}", key.cyan(), value);
                    }
                }
                match config.edm_locator().locate() {
                    Ok(edm) => println!("  {}: {}", "edm".cyan(), edm.path().display()),
                    Err(_) => println!("  {}: {}", "edm".cyan(), "not found".yellow()),
                }
            }
            Err(e) => {
                logger::error(&format!("Failed to load config: {}", e));
            }
        },
        ConfigAction::Set { key, value } => match Config::load() {
            Ok(mut config) => {
                if !config.set(&key, value.clone()) {
                    logger::error(&format!(
                        "Unknown config key: {}. Currently supported keys: {}",
                        key,
                        CONFIG_KEYS.join(", ")
                    ));
                    return;
                }
                match config.save() {
                    Ok(_) => {
                        logger::success(&format!("Set {} = {}", key, value));
                    }
                    Err(e) => {
                        logger::error(&format!("Failed to save config: {}", e));
                    }
                }
            }
            Err(e) => {
                logger::error(&format!("Failed to load config: {}", e));
            }
        },
        ConfigAction::Path => {
            let config_path = Config::path();
            logger::debug(&format!("Reading config from: {}", config_path.display()));
            println!("{}", config_path.display());
        }
    }
}
