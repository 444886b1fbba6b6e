//! Configuration management CLI commands.
//!
//! Provides `config get`, `config set`, `config list`, and `config path` commands
//! for viewing and modifying configuration settings from the command line.

use clap::Subcommand;
use flurfunk::config::{config_file_path, ConfigFile, ConfigKey};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Get a configuration value
    Get {
        /// Configuration key in format section.key (e.g., query.debounce_ms)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key in format section.key (e.g., store.url)
        key: String,

        /// Value to set
        value: String,
    },

    /// List all configuration settings
    List,

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Get { key } => run_get(&key),
        ConfigCommands::Set { key, value } => run_set(&key, &value),
        ConfigCommands::List => run_list(),
        ConfigCommands::Path => run_path(),
    }
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "Unknown configuration key '{}'. Use 'flurfunk config list' to see available keys.",
            key
        ))
    })
}

/// Get a configuration value.
fn run_get(key: &str) -> Result<(), CliError> {
    let config_key = parse_key(key)?;
    let config = ConfigFile::load()?;
    let value = config_key.get(&config);

    if value.is_empty() {
        println!("(not set)");
    } else {
        println!("{}", value);
    }

    Ok(())
}

/// Set a configuration value.
fn run_set(key: &str, value: &str) -> Result<(), CliError> {
    let config_key = parse_key(key)?;

    let mut config = ConfigFile::load()?;
    config_key.set(&mut config, value)?;
    config.save()?;

    println!("Set {} = {}", config_key, config_key.get(&config));

    Ok(())
}

/// List all configuration settings.
fn run_list() -> Result<(), CliError> {
    let config = ConfigFile::load()?;
    print!("{}", render_list(&config));
    Ok(())
}

fn render_list(config: &ConfigFile) -> String {
    let mut out = String::new();
    out.push_str("Configuration Settings\n");
    out.push_str("======================\n");

    let mut current_section = "";

    for key in ConfigKey::all() {
        let (section, name) = key.section_and_name();

        // Section header when section changes
        if section != current_section {
            out.push('\n');
            out.push_str(&format!("[{}]\n", section));
            current_section = section;
        }

        let value = key.get(config);
        if value.is_empty() {
            out.push_str(&format!("  {} = (not set)\n", name));
        } else {
            out.push_str(&format!("  {} = {}\n", name, value));
        }
    }

    out
}

/// Show the configuration file path.
fn run_path() -> Result<(), CliError> {
    println!("{}", config_file_path()?.display());
    Ok(())
}
