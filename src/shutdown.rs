//! Graceful Shutdown Module
//!
//! Handles shutdown of the server on SIGINT/SIGTERM: broadcasts a stop
//! signal to the accept loop and runs one best-effort final stats persist.
//! The on-disk counters are still only guaranteed to reflect the last
//! completed persist, not the last recorded mutation.

use crate::stats::StatsStore;
use crate::{ApiError, Result};
use std::time::Duration;
use tokio::signal;
use tokio::sync::broadcast;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Shutdown coordinator for the server and its background persists
pub struct ShutdownCoordinator {
    stats_store: Option<StatsStore>,
    shutdown_sender: broadcast::Sender<()>,
    shutdown_timeout: Duration,
}

impl ShutdownCoordinator {
    /// Create new shutdown coordinator
    pub fn new(shutdown_timeout: Duration) -> Self {
        let (shutdown_sender, _) = broadcast::channel(16);

        Self {
            stats_store: None,
            shutdown_sender,
            shutdown_timeout,
        }
    }

    /// Set stats store reference for the final persist on shutdown
    pub fn set_stats_store(&mut self, stats_store: StatsStore) {
        self.stats_store = Some(stats_store);
    }

    /// Get shutdown receiver for components to listen for shutdown signals
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_sender.subscribe()
    }

    /// Start listening for shutdown signals
    pub async fn listen_for_shutdown(&self) -> Result<()> {
        info!("Starting shutdown signal listener");

        let mut sigint =
            signal::unix::signal(signal::unix::SignalKind::interrupt()).map_err(|e| {
                ApiError::SystemError(format!("Failed to create SIGINT handler: {}", e))
            })?;

        let mut sigterm =
            signal::unix::signal(signal::unix::SignalKind::terminate()).map_err(|e| {
                ApiError::SystemError(format!("Failed to create SIGTERM handler: {}", e))
            })?;

        tokio::select! {
            _ = sigint.recv() => {
                info!("Received SIGINT, initiating graceful shutdown");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, initiating graceful shutdown");
            }
        }

        self.initiate_shutdown().await
    }

    /// Initiate graceful shutdown sequence
    pub async fn initiate_shutdown(&self) -> Result<()> {
        info!("Initiating graceful shutdown sequence");

        if let Err(e) = self.shutdown_sender.send(()) {
            // Normal when all receivers have already been dropped
            debug!("Shutdown signal not sent (no active receivers): {}", e);
        }

        match timeout(self.shutdown_timeout, self.perform_shutdown()).await {
            Ok(result) => match result {
                Ok(()) => {
                    info!("Graceful shutdown completed successfully");
                    Ok(())
                }
                Err(e) => {
                    error!("Error during graceful shutdown: {}", e);
                    Err(e)
                }
            },
            Err(_) => {
                error!(
                    "Graceful shutdown timed out after {:?}, forcing shutdown",
                    self.shutdown_timeout
                );
                Err(ApiError::TimeoutError(
                    "Graceful shutdown timeout".to_string(),
                ))
            }
        }
    }

    /// Perform the actual shutdown operations
    async fn perform_shutdown(&self) -> Result<()> {
        info!("Performing shutdown operations");

        // Final stats persist. Best-effort: failure is logged, never fatal.
        if let Some(stats_store) = &self.stats_store {
            info!("Persisting final stats");
            match timeout(Duration::from_secs(5), stats_store.persist()).await {
                Ok(Ok(())) => {
                    info!("Final stats persisted");
                }
                Ok(Err(e)) => {
                    warn!("Error persisting final stats: {}", e);
                }
                Err(_) => {
                    warn!("Final stats persist timed out");
                }
            }
        }

        // Give a moment for final log messages to be written
        tokio::time::sleep(Duration::from_millis(100)).await;

        info!("Shutdown operations completed");
        Ok(())
    }
}

/// Shutdown signal wrapper for components
pub struct ShutdownSignal {
    receiver: broadcast::Receiver<()>,
    shutdown_requested: bool,
}

impl ShutdownSignal {
    /// Create new shutdown signal from receiver
    pub fn new(receiver: broadcast::Receiver<()>) -> Self {
        Self {
            receiver,
            shutdown_requested: false,
        }
    }

    /// Check if shutdown has been requested (non-blocking)
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested
    }

    /// Wait for shutdown signal
    pub async fn wait_for_shutdown(&mut self) -> Result<()> {
        match self.receiver.recv().await {
            Ok(()) => {
                self.shutdown_requested = true;
                Ok(())
            }
            Err(broadcast::error::RecvError::Closed) => {
                self.shutdown_requested = true;
                Ok(())
            }
            Err(broadcast::error::RecvError::Lagged(_)) => {
                self.shutdown_requested = true;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_shutdown_broadcast_reaches_subscribers() {
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
        let mut signal = ShutdownSignal::new(coordinator.subscribe());

        assert!(!signal.is_shutdown_requested());
        coordinator.initiate_shutdown().await.unwrap();

        signal.wait_for_shutdown().await.unwrap();
        assert!(signal.is_shutdown_requested());
    }

    #[tokio::test]
    async fn test_shutdown_persists_final_stats() {
        let temp_dir = TempDir::new().unwrap();
        let store = StatsStore::new(temp_dir.path().join("data.json"));
        store.record("last.png").await;

        let mut coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
        coordinator.set_stats_store(store.clone());
        coordinator.initiate_shutdown().await.unwrap();

        let on_disk: crate::stats::Stats =
            serde_json::from_slice(&std::fs::read(store.data_file()).unwrap()).unwrap();
        assert_eq!(on_disk.total_requests, 1);
        assert_eq!(on_disk.image_counts["last.png"], 1);
    }
}
