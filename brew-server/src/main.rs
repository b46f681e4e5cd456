//! brew-server binary
//!
//! Serves the storefront ordering API, the provider redirects and the Stripe
//! webhook, and runs the cart / orphan sweep in the background.

use brew_server::sweep::{self, SweepSettings};
use brew_server::utils::logger::init_logger_with_file;
use brew_server::{AppState, Config, api};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;
    init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());

    tracing::info!("Starting brew-server (env: {})", config.environment);

    let http_port = config.http_port;
    let sweep_settings = SweepSettings {
        cart_idle_ttl: config.cart_idle_ttl,
        orphan_timeout: config.orphan_timeout,
        interval: config.sweep_interval,
    };

    let state = AppState::new(config).await?;

    sweep::spawn(state.carts.clone(), state.ledger.clone(), sweep_settings);

    let app = api::create_router(state);

    let http_addr = format!("0.0.0.0:{http_port}");
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("brew-server HTTP listening on {http_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("brew-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
