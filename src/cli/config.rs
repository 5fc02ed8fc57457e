//! Configuration file handling for the ci-provision CLI
//!
//! Manages loading and saving CLI configuration from ~/.ci-provision/config.toml
//! and resolving connection settings from multiple sources.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::platform::http::DEFAULT_API_VERSION;

pub const ENV_INSTANCE_URL: &str = "CI_PROVISION_INSTANCE_URL";
pub const ENV_ACCESS_TOKEN: &str = "CI_PROVISION_ACCESS_TOKEN";
pub const ENV_API_VERSION: &str = "CI_PROVISION_API_VERSION";
pub const ENV_LOGIN_URL: &str = "CI_PROVISION_LOGIN_URL";

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LOGIN_URL: &str = "https://login.salesforce.com";

/// Keys accepted by `config set`
pub const CONFIG_KEYS: &[&str] =
    &["instance_url", "access_token", "api_version", "login_url", "timeout"];

/// CLI configuration stored in ~/.ci-provision/config.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Instance URL of the target org
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_url: Option<String>,

    /// OAuth access token for the operator
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// REST API version, e.g. "58.0"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    /// Login URL printed in the follow-up instructions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_url: Option<String>,

    /// Request timeout in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl CliConfig {
    /// Get the default configuration file path (~/.ci-provision/config.toml)
    pub fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .context("Unable to determine home directory")?;

        let mut path = PathBuf::from(home);
        path.push(".ci-provision");
        path.push("config.toml");

        Ok(path)
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_path()?)
    }

    /// Load configuration from a specific path; a missing file is an empty config
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_path()?)
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Copy with the access token masked, for display
    pub fn redacted(&self) -> Self {
        Self {
            access_token: self.access_token.as_deref().map(super::output::mask_secret),
            ..self.clone()
        }
    }

    /// Set a value by key as used by `config set`
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "instance_url" => self.instance_url = Some(value.to_string()),
            "access_token" => self.access_token = Some(value.to_string()),
            "api_version" => self.api_version = Some(value.to_string()),
            "login_url" => self.login_url = Some(value.to_string()),
            "timeout" => {
                let timeout: u64 = value
                    .parse()
                    .context("Invalid timeout value. Must be a number in seconds")?;
                self.timeout = Some(timeout);
            }
            _ => anyhow::bail!(
                "Unknown configuration key: '{}'. Valid keys: {}",
                key,
                CONFIG_KEYS.join(", ")
            ),
        }
        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn from_env(name: &str) -> Option<String> {
    non_empty(std::env::var(name).ok())
}

/// Resolve the access token from multiple sources
///
/// Checks sources in the following priority order:
/// 1. --access-token command line flag
/// 2. --access-token-file command line flag
/// 3. ~/.ci-provision/config.toml
/// 4. CI_PROVISION_ACCESS_TOKEN environment variable
pub fn resolve_access_token(
    token_flag: Option<String>,
    token_file_flag: Option<PathBuf>,
    config: &CliConfig,
) -> Result<String> {
    if let Some(token) = non_empty(token_flag) {
        debug!("Using access token from --access-token flag");
        return Ok(token);
    }

    if let Some(token_file) = token_file_flag {
        debug!("Reading access token from file: {}", token_file.display());
        let token = std::fs::read_to_string(&token_file)
            .with_context(|| format!("Failed to read token file: {}", token_file.display()))?
            .trim()
            .to_string();

        if token.is_empty() {
            anyhow::bail!("Token file is empty: {}", token_file.display());
        }

        return Ok(token);
    }

    if let Some(token) = non_empty(config.access_token.clone()) {
        debug!("Using access token from config file");
        return Ok(token);
    }

    if let Some(token) = from_env(ENV_ACCESS_TOKEN) {
        debug!("Using access token from {} environment variable", ENV_ACCESS_TOKEN);
        return Ok(token);
    }

    anyhow::bail!(
        "No access token found. Please provide one via:\n\
         - --access-token flag\n\
         - --access-token-file flag\n\
         - ~/.ci-provision/config.toml\n\
         - {} environment variable",
        ENV_ACCESS_TOKEN
    )
}

/// Resolve the instance URL from flag, config file or environment
pub fn resolve_instance_url(url_flag: Option<String>, config: &CliConfig) -> Result<String> {
    if let Some(url) = non_empty(url_flag) {
        debug!("Using instance URL from --instance-url flag: {}", url);
        return Ok(url);
    }

    if let Some(url) = non_empty(config.instance_url.clone()) {
        debug!("Using instance URL from config file: {}", url);
        return Ok(url);
    }

    if let Some(url) = from_env(ENV_INSTANCE_URL) {
        debug!("Using instance URL from {} environment variable: {}", ENV_INSTANCE_URL, url);
        return Ok(url);
    }

    anyhow::bail!(
        "No instance URL found. Please provide one via:\n\
         - --instance-url flag\n\
         - ~/.ci-provision/config.toml\n\
         - {} environment variable",
        ENV_INSTANCE_URL
    )
}

/// Resolve the API version, defaulting to 58.0
pub fn resolve_api_version(version_flag: Option<String>, config: &CliConfig) -> String {
    non_empty(version_flag)
        .or_else(|| non_empty(config.api_version.clone()))
        .or_else(|| from_env(ENV_API_VERSION))
        .unwrap_or_else(|| DEFAULT_API_VERSION.to_string())
}

/// Resolve the login URL used in follow-up instructions
pub fn resolve_login_url(config: &CliConfig) -> String {
    non_empty(config.login_url.clone())
        .or_else(|| from_env(ENV_LOGIN_URL))
        .unwrap_or_else(|| DEFAULT_LOGIN_URL.to_string())
}

/// Resolve the request timeout in seconds, defaulting to 30
pub fn resolve_timeout(timeout_flag: Option<u64>, config: &CliConfig) -> u64 {
    if let Some(timeout) = timeout_flag {
        debug!("Using timeout from --timeout flag: {} seconds", timeout);
        return timeout;
    }

    if let Some(timeout) = config.timeout {
        debug!("Using timeout from config file: {} seconds", timeout);
        return timeout;
    }

    DEFAULT_TIMEOUT_SECS
}
