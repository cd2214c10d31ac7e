use anyhow::Result;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod message;
pub mod metrics;
pub mod routes;
pub mod signature;

use config::Config;
use context::AppContext;

pub async fn run() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    if config.webhook_secret.is_empty() {
        tracing::warn!("WEBHOOK_SECRET is not set; readiness will fail and ingestion is rejected");
    }

    // Connect to database and apply schema
    let db_pool = db::create_pool(&config.database_url).await?;
    db::init_schema(&db_pool).await?;
    tracing::info!("Connected to database");

    let bind_address = format!("0.0.0.0:{}", config.port);
    let app_context = Arc::new(AppContext::new(db_pool, Arc::new(config)));
    let app = routes::create_router(app_context);

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!("Webhook server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("Shutdown signal received. Shutting down...");
    }
}
