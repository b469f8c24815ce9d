//! InkLoc CLI - Command-line interface for InkLoc
//!
//! Provides commands for:
//! - Resolving the location once, optionally with high-accuracy positioning
//! - Inspecting diagnostics and cumulative metrics
//! - Managing preferences, the location cache and the consent record
//! - Viewing and validating configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use inkloc_core::config::Config;
use tracing_subscriber::EnvFilter;

mod commands;
mod context;
mod output;

use commands::{
    cache::CacheCommand, config::ConfigCommand, consent::ConsentCommand,
    diagnostics::DiagnosticsCommand, locate::LocateCommand, metrics::MetricsCommand,
    prefs::PrefsCommand,
};
use context::CliContext;
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "inkloc", version, about = "Studio location resolution tools")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Resolve the current location once
    Locate(LocateCommand),
    /// Export a diagnostics snapshot
    Diagnostics(DiagnosticsCommand),
    /// Show cumulative resolution metrics
    Metrics(MetricsCommand),
    /// View and change user preferences
    #[command(subcommand)]
    Prefs(PrefsCommand),
    /// Manage the last-known location cache
    #[command(subcommand)]
    Cache(CacheCommand),
    /// Grant, revoke or inspect location consent
    #[command(subcommand)]
    Consent(ConsentCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let config_path = cli.config.unwrap_or_else(Config::default_path);

    if let Commands::Config(cmd) = &cli.command {
        return cmd.execute(&config_path, format).await;
    }

    let ctx = CliContext::load(&config_path)?;
    match cli.command {
        Commands::Locate(cmd) => cmd.execute(&ctx, format).await,
        Commands::Diagnostics(cmd) => cmd.execute(&ctx, format).await,
        Commands::Metrics(cmd) => cmd.execute(&ctx, format).await,
        Commands::Prefs(cmd) => cmd.execute(&ctx, format).await,
        Commands::Cache(cmd) => cmd.execute(&ctx, format).await,
        Commands::Consent(cmd) => cmd.execute(&ctx, format).await,
        Commands::Config(_) => Ok(()),
    }
}
