//! Prefs command - view and change user preferences

use anyhow::{Context, Result};
use clap::Subcommand;
use inkloc_core::domain::{PreferenceChange, UserPreferences};
use tracing::info;

use crate::context::CliContext;
use crate::output::{get_formatter, OutputFormat, OutputFormatter};

#[derive(Debug, Subcommand)]
pub enum PrefsCommand {
    /// Show current preferences
    Show,
    /// Change one preference
    Set {
        /// Preference key (e.g., "gpsEnabled" or "update_frequency")
        key: String,
        /// New value
        value: String,
    },
}

impl PrefsCommand {
    pub async fn execute(&self, ctx: &CliContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        match self {
            PrefsCommand::Show => {
                let session = ctx.open_service().await?;
                let prefs = session.service.user_preferences();
                session.close().await;
                print_preferences(formatter.as_ref(), &prefs, format)
            }
            PrefsCommand::Set { key, value } => {
                let change = match PreferenceChange::parse(key, value) {
                    Ok(change) => change,
                    Err(e) => {
                        formatter.error(&e.to_string());
                        formatter.info(&format!(
                            "Supported keys: {}",
                            PreferenceChange::KEYS.join(", ")
                        ));
                        return Err(e.into());
                    }
                };
                info!(key = change.key(), "Setting preference");
                let prefs = apply(ctx, change).await?;
                if !format.is_json() {
                    formatter.success(&format!("Set {} = {}", change.key(), value));
                }
                print_preferences(formatter.as_ref(), &prefs, format)
            }
        }
    }
}

async fn apply(ctx: &CliContext, change: PreferenceChange) -> Result<UserPreferences> {
    let session = ctx.open_service().await?;
    let prefs = session.service.set_user_preference(change).await;
    session.close().await;
    Ok(prefs)
}

fn print_preferences(
    formatter: &dyn OutputFormatter,
    prefs: &UserPreferences,
    format: OutputFormat,
) -> Result<()> {
    if format.is_json() {
        let json =
            serde_json::to_value(prefs).context("Failed to serialize preferences to JSON")?;
        formatter.print_json(&json);
    } else {
        formatter.info(&format!("autoLocationEnabled:  {}", prefs.auto_location_enabled));
        formatter.info(&format!("gpsEnabled:           {}", prefs.gps_enabled));
        formatter.info(&format!("updateFrequency:      {}", prefs.update_frequency));
        formatter.info(&format!("batteryOptimization:  {}", prefs.battery_optimization));
    }
    Ok(())
}
