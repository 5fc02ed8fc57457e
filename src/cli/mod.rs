//! # Command Line Interface
//!
//! `setup` provisions the CI connected app; `config` manages the local
//! configuration file holding connection settings.

pub mod config;
pub mod config_cmd;
pub mod output;
pub mod setup;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::observability::init_logging;
use crate::platform::{HttpGateway, HttpGatewayConfig, RemoteResourceGateway};
use config::CliConfig;

#[derive(Parser)]
#[command(name = "ci-provision")]
#[command(about = "Provision a certificate-authenticated connected app for continuous integration")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging, including request and response bodies
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Instance URL of the target org
    #[arg(long, global = true)]
    pub instance_url: Option<String>,

    /// OAuth access token for the operator
    #[arg(long, global = true)]
    pub access_token: Option<String>,

    /// Path to file containing the access token
    #[arg(long, global = true)]
    pub access_token_file: Option<PathBuf>,

    /// REST API version
    #[arg(long, global = true)]
    pub api_version: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the permission set and connected app for CI
    Setup(setup::SetupArgs),

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        command: config_cmd::ConfigCommands,
    },
}

/// Run CLI commands
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.log_json);

    match cli.command {
        Commands::Setup(args) => {
            let file_config = CliConfig::load()?;
            let gateway = create_gateway(
                cli.instance_url,
                cli.access_token,
                cli.access_token_file,
                cli.api_version,
                cli.timeout,
                cli.verbose,
                &file_config,
            )?;
            let login_url = config::resolve_login_url(&file_config);
            setup::handle_setup_command(args, gateway, &login_url).await?
        }
        Commands::Config { command } => config_cmd::handle_config_command(command).await?,
    }

    Ok(())
}

/// Create the HTTP gateway with resolved connection settings
fn create_gateway(
    instance_url: Option<String>,
    access_token: Option<String>,
    access_token_file: Option<PathBuf>,
    api_version: Option<String>,
    timeout: Option<u64>,
    verbose: bool,
    file_config: &CliConfig,
) -> anyhow::Result<Arc<dyn RemoteResourceGateway>> {
    let config = HttpGatewayConfig {
        instance_url: config::resolve_instance_url(instance_url, file_config)?,
        access_token: config::resolve_access_token(access_token, access_token_file, file_config)?,
        api_version: config::resolve_api_version(api_version, file_config),
        timeout: config::resolve_timeout(timeout, file_config),
        verbose,
    };

    let gateway = HttpGateway::new(config).context("Failed to create platform client")?;
    Ok(Arc::new(gateway))
}
