use std::net::SocketAddr;
use std::sync::Arc;

use factuur_core::{Config, ExtractionGateway, MAX_DOCUMENT_BYTES};
use factuur_store::InvoiceStore;
use tracing_subscriber::EnvFilter;

mod app;
mod error;
mod handlers;
mod models;
mod state;
mod template;
mod upload;


use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::load();
    tracing::debug!(?config, "configuration loaded");

    // Create the schema up front so a bad database path fails at startup.
    let store = InvoiceStore::open(&config.database_path)?;
    tracing::info!(
        path = %config.database_path.display(),
        invoices = store.count()?,
        "invoice store ready"
    );
    drop(store);

    let gateway = ExtractionGateway::from_config(&config, reqwest::Client::new());

    let state = Arc::new(AppState {
        gateway,
        database_path: config.database_path.clone(),
        max_upload_bytes: MAX_DOCUMENT_BYTES,
    });

    let app = app::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
