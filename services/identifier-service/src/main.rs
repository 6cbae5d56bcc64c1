//! lotline identifier service.
//!
//! Mints LOT and Serial codes from per-scope sequence counters and decodes
//! codes of every format version over HTTP.

use anyhow::Result;
use lotline_service::{
    api,
    config::{self, StoreBackend},
    db::{Database, Stores},
    service::IdentifierService,
    state::AppState,
};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::Config::from_env()?;

    // Prefer RUST_LOG, fall back to LOTLINE_LOG_LEVEL
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting lotline identifier service");
    info!(
        listen_addr = %config.listen_addr,
        store = ?config.store,
        active_format = %config.active_format,
        "Configuration loaded"
    );

    let models = config.load_model_map()?;
    info!(models = models.len(), "Model table loaded");

    let (stores, db) = match config.store {
        StoreBackend::Memory => {
            info!("Using in-memory stores; identifiers will not survive restart");
            (Stores::memory(), None)
        }
        StoreBackend::Postgres => {
            let db = match Database::connect(&config.database).await {
                Ok(db) => db,
                Err(e) => {
                    error!(error = %e, "Failed to connect to database");
                    return Err(e.into());
                }
            };

            if config.dev_mode {
                info!("Running database migrations (dev mode)");
                if let Err(e) = db.run_migrations().await {
                    error!(error = %e, "Failed to run migrations");
                    return Err(e.into());
                }
            }
            (db.stores(), Some(db))
        }
    };

    let service =
        IdentifierService::from_stores(&stores, config.allocator, models, config.active_format);
    let state = AppState::new(service, db);
    let app = api::create_router(state);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "Listening for connections");

    let mut server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let mut shutdown_rx = shutdown_rx;
                loop {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                    if shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
    });

    let finished = tokio::select! {
        _ = tokio::signal::ctrl_c() => None,
        result = &mut server_handle => Some(result),
    };

    let result = match finished {
        Some(result) => result,
        None => {
            info!("Received shutdown signal");
            let _ = shutdown_tx.send(true);
            server_handle.await
        }
    };

    match result {
        Ok(Ok(())) => info!("Server exited normally"),
        Ok(Err(e)) => error!(error = %e, "Server error"),
        Err(e) => error!(error = %e, "Server task panicked"),
    }

    info!("lotline shutdown complete");
    Ok(())
}
