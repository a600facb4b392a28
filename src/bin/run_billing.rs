//! Runs the recurring billing job once and prints the report as JSON.
//!
//! Usage: `run-billing [REFERENCE]` where `REFERENCE` is an RFC 3339 instant
//! (defaults to now). Meant to be called by an external scheduler.

use chrono::{DateTime, Utc};
use dotenvy::dotenv;
use pocket_ledger::{
    config::{database, settings},
    core::billing::{self, BillingOptions, BillingReport},
    errors::{Error, Result},
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn parse_reference(arg: Option<String>) -> Result<Option<DateTime<Utc>>> {
    arg.map(|raw| {
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| Error::invalid_field("reference", format!("{raw}: {e}")))
    })
    .transpose()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    dotenv().ok();

    let reference_date = parse_reference(std::env::args().nth(1))?;
    let app_config = settings::load_app_config()?;
    let db = database::init_db(&app_config.database_url)
        .await
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    let result = billing::run_billing(&db, BillingOptions { reference_date }).await?;
    info!("{}", billing::format_billing_summary(&result));

    let report = BillingReport::from(result);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
