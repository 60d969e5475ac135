use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use skycast_provider::WeatherClient;
use skycast_server::routes::{self, AppState};
use skycast_server::Config;
use skycast_store::{Db, LocationStore, SnapshotStore};
use skycast_sync::SyncEngine;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let db = Db::open(&config.db_path)
        .with_context(|| format!("Failed to open database at {}", config.db_path))?;
    let locations = LocationStore::new(db.clone());
    let snapshots = SnapshotStore::new(db);

    let client = Arc::new(WeatherClient::new(config.provider_config())?);
    let engine = Arc::new(SyncEngine::new(
        Arc::clone(&client),
        locations.clone(),
        snapshots.clone(),
    ));
    engine.start(config.sync_interval_minutes);

    let app = routes::router(AppState {
        engine: Arc::clone(&engine),
        locations,
        snapshots,
        client,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Skycast server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    engine.stop();
    info!("Skycast server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
