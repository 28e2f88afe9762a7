//! Lifecycle Manager
//!
//! Owns the reaper task for the lifetime of the process. Shutdown stops the
//! reaper and waits for it before wiping both tiers, so a reap can never
//! interleave with the final wipe.

use std::sync::Arc;

use puml_core::PumlResult;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::jobs::{reaper_task, ReaperConfig, ReaperMetrics, ReaperSnapshot};
use crate::services::ImageService;

/// Running service plus its background reaper.
#[derive(Debug)]
pub struct Lifecycle {
    service: Arc<ImageService>,
    shutdown_tx: watch::Sender<bool>,
    reaper: JoinHandle<Arc<ReaperMetrics>>,
}

impl Lifecycle {
    /// Spawn the reaper. Must be called from within a tokio runtime.
    pub fn start(service: Arc<ImageService>, config: ReaperConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let reaper = tokio::spawn(reaper_task(Arc::clone(&service), config, shutdown_rx));
        tracing::info!("Lifecycle started");
        Self {
            service,
            shutdown_tx,
            reaper,
        }
    }

    pub fn service(&self) -> &Arc<ImageService> {
        &self.service
    }

    /// Stop the reaper, wait for it, then remove every cached artifact.
    ///
    /// Consumes the manager so it can only run once. The wipe runs even if
    /// the reaper task panicked; its error, if any, is returned.
    pub async fn shutdown(self) -> PumlResult<Option<ReaperSnapshot>> {
        tracing::info!("Lifecycle shutting down");
        let _ = self.shutdown_tx.send(true);

        let snapshot = match self.reaper.await {
            Ok(metrics) => Some(metrics.snapshot()),
            Err(e) => {
                tracing::error!(error = %e, "Reaper task did not finish cleanly");
                None
            }
        };

        self.service.remove_all().await?;
        tracing::info!("Lifecycle shutdown complete");
        Ok(snapshot)
    }
}
