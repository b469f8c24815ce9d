//! Consent command - stands in for the site's consent manager

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Subcommand;
use inkloc_core::domain::ConsentRecord;
use inkloc_core::ports::IConsentStore;
use inkloc_resolver::ConsentGate;

use crate::context::CliContext;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConsentCommand {
    /// Grant location consent (valid for consent.max_age_days)
    Grant,
    /// Revoke location consent
    Revoke,
    /// Show the stored consent record and whether it is valid now
    Show,
}

impl ConsentCommand {
    pub async fn execute(&self, ctx: &CliContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let store = ctx.open_store().await?;

        let (record, granted) = match self {
            ConsentCommand::Grant => {
                let record = store.consent.grant().await?;
                (Some(record), None)
            }
            ConsentCommand::Revoke => {
                let record = store.consent.revoke().await?;
                (Some(record), None)
            }
            ConsentCommand::Show => {
                let record = store
                    .consent
                    .load()
                    .await
                    .context("Failed to read consent record")?;
                let gate = ConsentGate::new(
                    Arc::new(store.consent.clone()),
                    ctx.config.consent.max_age(),
                );
                (record, Some(gate.has_consent().await))
            }
        };
        store.close().await;

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "record": record,
                "valid": granted,
            }));
            return Ok(());
        }

        match self {
            ConsentCommand::Grant => formatter.success("Location consent granted"),
            ConsentCommand::Revoke => formatter.success("Location consent revoked"),
            ConsentCommand::Show => describe(formatter.as_ref(), record.as_ref(), granted),
        }
        Ok(())
    }
}

fn describe(
    formatter: &dyn crate::output::OutputFormatter,
    record: Option<&ConsentRecord>,
    valid: Option<bool>,
) {
    let Some(record) = record else {
        formatter.info("No consent record stored");
        return;
    };
    let stamped = chrono::DateTime::from_timestamp_millis(record.timestamp)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| record.timestamp.to_string());
    formatter.info(&format!("Location:  {}", if record.location { "granted" } else { "denied" }));
    formatter.info(&format!("Recorded:  {}", stamped));
    if valid == Some(false) && record.location {
        formatter.warn("Consent has expired");
    }
}
