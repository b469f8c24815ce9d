//! Config command - view and manage InkLoc configuration
//!
//! Provides the `inkloc config` CLI command which:
//! 1. Shows the effective configuration (YAML or JSON)
//! 2. Validates the configuration file and reports errors
//! 3. Writes a default configuration file

use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;
use inkloc_core::config::Config;
use tracing::info;

use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Validate configuration file
    Validate,
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    pub async fn execute(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        match self {
            ConfigCommand::Show => execute_show(config_path, format),
            ConfigCommand::Validate => execute_validate(config_path, format),
            ConfigCommand::Init { force } => execute_init(config_path, *force, format),
        }
    }
}

fn execute_show(config_path: &Path, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let config = Config::load_or_default(config_path);
    info!(config_path = %config_path.display(), "Showing configuration");

    if format.is_json() {
        let json =
            serde_json::to_value(&config).context("Failed to serialize configuration to JSON")?;
        formatter.print_json(&json);
    } else {
        formatter.success(&format!("Configuration ({})", config_path.display()));
        formatter.info("");
        for line in config.to_yaml()?.lines() {
            formatter.info(line);
        }
    }
    Ok(())
}

/// Outcome of validating the file at a path
#[derive(Debug)]
enum Validation {
    Missing,
    Unreadable(String),
    Checked(Vec<String>),
}

fn validate_file(config_path: &Path) -> Validation {
    if !config_path.exists() {
        return Validation::Missing;
    }
    match Config::load(config_path) {
        Ok(config) => {
            Validation::Checked(config.validate().iter().map(ToString::to_string).collect())
        }
        Err(e) => Validation::Unreadable(format!("Failed to parse configuration: {e}")),
    }
}

fn execute_validate(config_path: &Path, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let validation = validate_file(config_path);

    let errors: Vec<String> = match &validation {
        Validation::Missing => Vec::new(),
        Validation::Unreadable(e) => vec![e.clone()],
        Validation::Checked(errors) => errors.clone(),
    };

    if format.is_json() {
        formatter.print_json(&serde_json::json!({
            "valid": errors.is_empty(),
            "config_path": config_path.display().to_string(),
            "exists": !matches!(validation, Validation::Missing),
            "errors": errors,
        }));
    } else if matches!(validation, Validation::Missing) {
        formatter.info(&format!("Configuration file not found at {}", config_path.display()));
        formatter.info("Using defaults. Run 'inkloc config init' to create one.");
    } else if errors.is_empty() {
        formatter.success("Configuration is valid");
        formatter.info(&format!("File: {}", config_path.display()));
    } else {
        formatter.error(&format!(
            "Configuration has {} error{}:",
            errors.len(),
            if errors.len() == 1 { "" } else { "s" }
        ));
        formatter.info(&format!("File: {}", config_path.display()));
        for error in &errors {
            formatter.info(&format!("  {}", error));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("configuration is invalid")
    }
}

/// Writes the default file; returns false when one exists and `force` is off
fn init_config(config_path: &Path, force: bool) -> Result<bool> {
    if config_path.exists() && !force {
        return Ok(false);
    }
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create configuration directory")?;
    }
    let yaml = Config::default().to_yaml()?;
    std::fs::write(config_path, yaml).context("Failed to write configuration file")?;
    Ok(true)
}

fn execute_init(config_path: &Path, force: bool, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let written = init_config(config_path, force)?;

    if format.is_json() {
        formatter.print_json(&serde_json::json!({
            "success": written,
            "config_path": config_path.display().to_string(),
        }));
    } else if written {
        formatter.success(&format!("Wrote {}", config_path.display()));
    } else {
        formatter.warn(&format!(
            "{} already exists; use --force to overwrite",
            config_path.display()
        ));
    }
    Ok(())
}
