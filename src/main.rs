use dotenvy::dotenv;
use pocket_ledger::{
    api::{AppState, build_router},
    config::{database, settings},
    core::cipher::CardCipher,
    errors::Result,
};
use tokio::{net::TcpListener, signal};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for ctrl+c: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received ctrl+c, shutting down."),
        () = terminate => info!("Received terminate signal, shutting down."),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; variables may also come from the environment
    dotenv().ok();

    // 3. Settings, then the card cipher; a missing key is fatal
    let app_config = settings::load_app_config()?;
    let cipher = CardCipher::from_env()
        .inspect_err(|e| error!("Card cipher unavailable: {}", e))?;

    // 4. Database
    let db = database::init_db(&app_config.database_url)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Serve
    let listener = TcpListener::bind(&app_config.bind_address).await?;
    info!("HTTP server listening on {}", app_config.bind_address);
    if app_config.cron_secret.is_none() {
        info!("CRON_SECRET not set; the billing cron route is closed.");
    }

    let app = build_router(AppState::new(db, cipher, app_config));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
