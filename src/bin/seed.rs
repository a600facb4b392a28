//! Seeds a demo account and prints a bearer token for it.
//!
//! Usage: `seed`. Reads the same settings as the server and needs
//! `CARD_ENCRYPTION_KEY` to encrypt the demo card number.

use chrono::Utc;
use dotenvy::dotenv;
use pocket_ledger::{
    config::{database, settings},
    core::{cipher::CardCipher, seed},
    errors::Result,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    dotenv().ok();

    let app_config = settings::load_app_config()?;
    let cipher =
        CardCipher::from_env().inspect_err(|e| error!("Card cipher unavailable: {}", e))?;
    let db = database::init_db(&app_config.database_url)
        .await
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    let outcome = seed::seed_demo_data(&db, &cipher, Utc::now()).await?;
    if outcome.created {
        info!("Seeded demo user, card, subscription and transactions");
    }

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
