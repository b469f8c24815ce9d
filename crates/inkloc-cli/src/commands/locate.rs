//! Locate command - resolve the current location once

use anyhow::{Context, Result};
use clap::Args;
use inkloc_core::domain::LocationResult;
use inkloc_resolver::ResolveError;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::context::CliContext;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct LocateCommand {
    /// Use on-device positioning in high-accuracy mode (requires consent)
    #[arg(long)]
    pub high_accuracy: bool,
}

impl LocateCommand {
    pub async fn execute(&self, ctx: &CliContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let location = resolve_once(ctx, self.high_accuracy)
            .await?
            .context("Location resolution failed")?;

        if format.is_json() {
            let json = serde_json::to_value(&location)
                .context("Failed to serialize location to JSON")?;
            formatter.print_json(&json);
        } else {
            formatter.success(&format!("{} ({})", location.display_name(), location.source));
            if !location.country.is_empty() {
                formatter.info(&format!("Country:        {}", location.country));
            }
            if let Some(accuracy) = &location.accuracy {
                formatter.info(&format!("Accuracy:       {}", accuracy));
            }
            if let Some(ms) = location.response_time {
                formatter.info(&format!("Response time:  {}ms", ms));
            }
        }
        Ok(())
    }
}

/// Runs one resolution; the outer error covers setup, the inner one the attempt
async fn resolve_once(
    ctx: &CliContext,
    high_accuracy: bool,
) -> Result<std::result::Result<LocationResult, ResolveError>> {
    let session = ctx.open_service().await?;
    info!(high_accuracy, "Resolving location");

    let result = if high_accuracy {
        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_interrupt.cancel();
            }
        });
        let result = session.service.request_high_accuracy(cancel).await;
        watcher.abort();
        result
    } else {
        session.service.refresh().await
    };

    session.close().await;
    Ok(result)
}
