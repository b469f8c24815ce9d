//! Metrics command - cumulative resolution counters

use anyhow::{Context, Result};
use clap::Args;

use crate::context::CliContext;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct MetricsCommand {}

impl MetricsCommand {
    pub async fn execute(&self, ctx: &CliContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let session = ctx.open_service().await?;
        let summary = session.service.metrics();
        session.close().await;

        if format.is_json() {
            let json =
                serde_json::to_value(&summary).context("Failed to serialize metrics to JSON")?;
            formatter.print_json(&json);
            return Ok(());
        }

        let counters = &summary.counters;
        formatter.success(&format!("Success rate: {}", summary.success_rate));
        formatter.info(&format!(
            "GPS:            {} ok / {} failed ({})",
            counters.gps_success, counters.gps_failure, summary.gps_success_rate
        ));
        formatter.info(&format!(
            "IP:             {} ok / {} failed ({})",
            counters.ip_success, counters.ip_failure, summary.ip_success_rate
        ));
        formatter.info(&format!("Cache hits:     {}", counters.cache_hits));
        formatter.info(&format!("Requests:       {}", counters.total_requests));

        for (label, errors) in [("GPS", &counters.gps_errors), ("IP", &counters.ip_errors)] {
            if errors.is_empty() {
                continue;
            }
            let breakdown: Vec<String> = errors
                .iter()
                .map(|(kind, count)| format!("{kind}={count}"))
                .collect();
            let heading = format!("{label} errors:");
            formatter.info(&format!("{heading:<16}{}", breakdown.join(", ")));
        }
        Ok(())
    }
}
