//! Diagnostics command - export the operator snapshot

use anyhow::{Context, Result};
use clap::Args;

use crate::context::CliContext;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct DiagnosticsCommand {}

impl DiagnosticsCommand {
    pub async fn execute(&self, ctx: &CliContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let session = ctx.open_service().await?;
        let diagnostics = session.service.export_diagnostics().await;
        session.close().await;

        if format.is_json() {
            let json = serde_json::to_value(&diagnostics)
                .context("Failed to serialize diagnostics to JSON")?;
            formatter.print_json(&json);
            return Ok(());
        }

        formatter.success(&format!("Diagnostics ({})", diagnostics.exported_at.to_rfc3339()));
        formatter.info("");
        match &diagnostics.current_location {
            Some(location) => {
                let updated = location
                    .last_updated
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "never".to_string());
                formatter.info(&format!(
                    "Location:       {} ({}, updated {})",
                    location.name, location.source, updated
                ));
            }
            None => formatter.info("Location:       none"),
        }

        let device = &diagnostics.device;
        formatter.info(&format!(
            "Device:         {}",
            if device.is_mobile { "mobile" } else { "desktop" }
        ));
        formatter.info(&format!("Positioning:    {}", yes_no(device.positioning)));
        match device.battery_level {
            Some(level) => formatter.info(&format!("Battery:        {:.0}%", level * 100.0)),
            None => formatter.info(&format!("Battery:        {}", yes_no(device.battery))),
        }
        formatter.info(&format!("Consent:        {}", yes_no(device.consent_granted)));

        let prefs = &diagnostics.preferences;
        formatter.info(&format!(
            "Preferences:    auto={} gps={} frequency={} battery_optimization={}",
            prefs.auto_location_enabled,
            prefs.gps_enabled,
            prefs.update_frequency,
            prefs.battery_optimization
        ));
        formatter.info(&format!(
            "Success rate:   {} (gps {}, ip {})",
            diagnostics.metrics.success_rate,
            diagnostics.metrics.gps_success_rate,
            diagnostics.metrics.ip_success_rate
        ));

        let errors = &diagnostics.error_state;
        formatter.info(&format!("Failures:       {} consecutive", errors.consecutive_failures));
        if let Some(last) = &errors.last_error {
            formatter.info(&format!(
                "Last error:     {} ({}, {})",
                last.message,
                last.kind,
                last.timestamp.to_rfc3339()
            ));
        }
        if errors.network_offline {
            formatter.warn("Network is offline");
        }
        Ok(())
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
