//! Configuration management CLI commands
//!
//! Provides commands for managing ~/.ci-provision/config.toml

use anyhow::Result;
use clap::Subcommand;

use super::config::CliConfig;
use super::output;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize configuration file with default values
    Init {
        /// Overwrite existing configuration file
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration
    Show {
        /// Output format (json, yaml, or table)
        #[arg(short, long, default_value = "yaml")]
        output: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (instance_url, access_token, api_version, login_url, or timeout)
        key: String,

        /// Configuration value
        value: String,
    },

    /// Get configuration file path
    Path,
}

/// Handle config commands
pub async fn handle_config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Init { force } => init_config(force)?,
        ConfigCommands::Show { output } => show_config(&output)?,
        ConfigCommands::Set { key, value } => set_config(&key, &value)?,
        ConfigCommands::Path => println!("{}", CliConfig::config_path()?.display()),
    }

    Ok(())
}

fn init_config(force: bool) -> Result<()> {
    let path = CliConfig::config_path()?;

    if path.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at: {}\nUse --force to overwrite",
            path.display()
        );
    }

    CliConfig::default().save_to_path(&path)?;

    println!("✅ Configuration file created at: {}", path.display());
    println!("\nYou can now set values using:");
    println!("  ci-provision config set instance_url <instance-url>");
    println!("  ci-provision config set access_token <token>");
    println!("  ci-provision config set api_version <version>");

    Ok(())
}

fn show_config(output_format: &str) -> Result<()> {
    let path = CliConfig::config_path()?;

    if !path.exists() {
        println!("No configuration file found at: {}", path.display());
        println!("\nRun 'ci-provision config init' to create one");
        return Ok(());
    }

    let config = CliConfig::load_from_path(&path)?.redacted();

    if output_format == "table" {
        print_config_table(&config);
    } else {
        output::print_output(&config, output_format)?;
    }

    Ok(())
}

fn set_config(key: &str, value: &str) -> Result<()> {
    let path = CliConfig::config_path()?;
    let mut config = CliConfig::load_from_path(&path).unwrap_or_default();

    config.set(key, value)?;
    config.save_to_path(&path)?;

    if key == "access_token" {
        println!("✅ Access token set successfully");
    } else {
        println!("✅ {} set to: {}", key, value);
    }
    println!("Configuration saved to: {}", path.display());

    Ok(())
}

fn print_config_table(config: &CliConfig) {
    let rows = [
        ("instance_url", config.instance_url.clone()),
        ("access_token", config.access_token.clone()),
        ("api_version", config.api_version.clone()),
        ("login_url", config.login_url.clone()),
        ("timeout", config.timeout.map(|t| format!("{} seconds", t))),
    ];

    output::print_table_header(&[("Key", 15), ("Value", 50)]);
    for (key, value) in rows {
        println!("{:<15} {}", key, value.as_deref().unwrap_or("<not set>"));
    }
    println!();
}
