//! Shared output formatting utilities for CLI commands
//!
//! Supports JSON, YAML, and table formats. Command output goes to stdout; logs
//! go to stderr.

use anyhow::{Context, Result};
use serde::Serialize;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Table,
}

impl std::str::FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "yaml" => Ok(OutputFormat::Yaml),
            "table" => Ok(OutputFormat::Table),
            _ => anyhow::bail!(
                "Unsupported output format: '{}'. Use 'json', 'yaml', or 'table'.",
                s
            ),
        }
    }
}

/// Print data in the specified format
pub fn print_output<T: Serialize>(data: &T, format: &str) -> Result<()> {
    match format.parse::<OutputFormat>()? {
        OutputFormat::Json => print_json(data),
        OutputFormat::Yaml => print_yaml(data),
        OutputFormat::Table => {
            anyhow::bail!("Table format requires custom implementation per data type")
        }
    }
}

/// Print data as JSON
pub fn print_json<T: Serialize>(data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data).context("Failed to serialize to JSON")?;
    println!("{}", json);
    Ok(())
}

/// Print data as YAML
pub fn print_yaml<T: Serialize>(data: &T) -> Result<()> {
    let yaml = serde_yaml::to_string(data).context("Failed to serialize to YAML")?;
    println!("{}", yaml);
    Ok(())
}

/// Print a table header with an underline
pub fn print_table_header(columns: &[(&str, usize)]) {
    println!();
    let mut header = String::new();
    for (name, width) in columns {
        header.push_str(&format!("{:<width$} ", name, width = width));
    }
    println!("{}", header.trim());

    let total_width: usize = columns.iter().map(|(_, w)| w + 1).sum();
    println!("{}", "-".repeat(total_width.saturating_sub(1)));
}

/// Mask all but the last four characters of a secret
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), visible)
}
