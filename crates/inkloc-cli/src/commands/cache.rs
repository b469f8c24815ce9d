//! Cache command - manage the last-known location cache

use anyhow::Result;
use clap::Subcommand;
use tracing::info;

use crate::context::CliContext;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    /// Remove the cached location and reset metrics (preferences are kept)
    Clear,
}

impl CacheCommand {
    pub async fn execute(&self, ctx: &CliContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        match self {
            CacheCommand::Clear => {
                let session = ctx.open_service().await?;
                session.service.clear_cache().await;
                session.close().await;
                info!("Location cache cleared");

                if format.is_json() {
                    formatter.print_json(&serde_json::json!({ "success": true, "cleared": true }));
                } else {
                    formatter.success("Location cache and metrics cleared");
                }
                Ok(())
            }
        }
    }
}
