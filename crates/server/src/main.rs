//! yatube-rs server entry point.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use fred::prelude::*;
use tokio::signal;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use yatube_api::{AppSettings, AppState};
use yatube_common::{Clock, Config, ResponseCache, SystemClock};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "yatube=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Pick the response cache backend: Redis when configured, else in-process.
async fn build_cache(config: &Config, clock: Arc<dyn Clock>) -> anyhow::Result<ResponseCache> {
    let Some(redis) = &config.redis else {
        info!("No Redis configured, using in-process response cache");
        return Ok(ResponseCache::memory(clock));
    };

    info!("Connecting to Redis...");
    let fred_config = fred::types::config::Config::from_url(&redis.url)
        .context("Failed to parse Redis URL")?;
    let client = fred::clients::Client::new(fred_config, None, None, None);
    client.connect();
    client
        .wait_for_connect()
        .await
        .context("Failed to connect to Redis")?;
    info!("Connected to Redis response cache");

    Ok(ResponseCache::redis(Arc::new(client), redis.prefix.clone()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    init_tracing(config.logging.json);
    info!("Starting yatube-rs server...");

    // Connect to database
    let db = yatube_db::init(&config).await?;
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    yatube_db::migrate(&db).await?;
    info!("Migrations completed");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cache = build_cache(&config, clock.clone()).await?;

    let state = AppState::new(
        Arc::new(db),
        cache,
        AppSettings::from_config(&config),
        clock,
    );

    let app = yatube_api::app(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)));

    // Start server with graceful shutdown
    let addr = config.bind_addr();
    info!(addr = %addr, url = %config.server.url, "Listening");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
