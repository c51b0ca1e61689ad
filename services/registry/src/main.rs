//! strato registry service.
//!
//! Keeps an in-memory resource graph synchronized with the external
//! control plane. The protocol layer drives reads through the library
//! surface; this binary wires up providers and runs the warmup worker.

use std::sync::Arc;

use anyhow::Result;
use strato_registry::{
    config::Config,
    providers::{HttpProvider, ProviderSet},
    worker::WarmupWorker,
    Registry, StaticCatalog,
};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing (prefer RUST_LOG, fallback to STRATO_LOG_LEVEL)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting strato registry");

    let client = reqwest::Client::new();
    let provider = |base: &str| -> Arc<dyn strato_registry::providers::ResourceProvider> {
        Arc::new(HttpProvider::new(
            client.clone(),
            base,
            config.provider_timeout,
        ))
    };
    let providers = ProviderSet {
        compute: provider(&config.endpoints.compute),
        storage: provider(&config.endpoints.storage),
        network: provider(&config.endpoints.network),
        port: provider(&config.endpoints.port),
        security_group: provider(&config.endpoints.security_group),
        security_rule: provider(&config.endpoints.security_rule),
    };

    let catalog = Arc::new(StaticCatalog::new(
        config.flavors.clone(),
        config.images.clone(),
    ));
    let registry = Arc::new(Registry::new(providers, catalog));

    // Create shutdown channel for graceful shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let worker = WarmupWorker::new(
        registry.clone(),
        config.warm_owners.clone(),
        config.warm_interval,
    );
    let worker_handle = tokio::spawn(async move {
        worker.run(shutdown_rx).await;
    });

    info!(
        owners = config.warm_owners.len(),
        interval_secs = config.warm_interval.as_secs(),
        "Registry running"
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    if shutdown_tx.send(true).is_err() {
        error!("Failed to signal shutdown to worker");
    }
    worker_handle.await?;

    info!("Registry stopped");
    Ok(())
}
