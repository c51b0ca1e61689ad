//! Background cache-warming worker.
//!
//! Runs a bulk reconciliation pass per configured owner on a periodic
//! interval, so interactive reads mostly hit an already warm cache.

use std::sync::Arc;
use std::time::Duration;

use strato_id::OwnerScope;
use tokio::sync::watch;
use tracing::{error, info, instrument};

use crate::reconciler::Registry;

/// Worker that keeps the cache warm for a fixed set of owners.
pub struct WarmupWorker {
    registry: Arc<Registry>,
    owners: Vec<OwnerScope>,
    interval: Duration,
}

impl WarmupWorker {
    /// Creates a new warmup worker.
    pub fn new(registry: Arc<Registry>, owners: Vec<OwnerScope>, interval: Duration) -> Self {
        Self {
            registry,
            owners,
            interval,
        }
    }

    /// Runs the worker until shutdown is signaled.
    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs(),
            owners = self.owners.len(),
            "Starting warmup worker"
        );

        let mut interval = tokio::time::interval(self.interval);
        // Don't immediately tick on startup - wait for first interval
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.run_pass().await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Warmup worker shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Runs one warm pass over every configured owner.
    async fn run_pass(&self) {
        for owner in &self.owners {
            match self.registry.resolve_all(owner).await {
                Ok(entities) => {
                    info!(owner = %owner, entities = entities.len(), "Warm pass complete");
                }
                Err(e) => {
                    // A failed pass keeps whatever was validated before the
                    // failure; the next tick retries from there.
                    error!(owner = %owner, error = %e, "Warm pass failed");
                }
            }
        }
    }
}
