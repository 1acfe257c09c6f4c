use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chirpy::app::{AppState, router};
use chirpy::clock::SystemClock;
use chirpy::config::Config;
use chirpy::db::{Repositories, get_database};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chirpy=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("invalid configuration")?;
    tracing::info!("Starting Chirpy with config: {:?}", config);

    let repos = match &config.mongo_db_url {
        Some(url) => {
            let db = get_database(url)
                .await
                .context("failed to connect to MongoDB")?;
            Repositories::mongo(&db)
                .await
                .context("failed to prepare collections")?
        }
        None => {
            tracing::warn!("MONGO_DB_URL not set, using in-memory stores");
            Repositories::in_memory()
        }
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = AppState::new(config, repos, Arc::new(SystemClock));
    let app = router(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server exited gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down server...");
}
