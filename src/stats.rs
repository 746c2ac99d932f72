//! Stats Module
//!
//! In-memory request counters with JSON persistence. The store is the only
//! mutable shared state in the service: every mutation goes through the
//! writer lock, and each mutation schedules a fire-and-forget persist so the
//! request path never waits on the disk write.

use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Persisted counter state.
///
/// `total_requests` equals the sum of `image_counts` values whenever no
/// mutation is in flight. Entries are created on first serve and never
/// removed, even if the file later disappears from the image directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub total_requests: u64,
    pub image_counts: HashMap<String, u64>,
    pub last_updated: DateTime<Utc>,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            total_requests: 0,
            image_counts: HashMap::new(),
            last_updated: Utc::now(),
        }
    }
}

/// Shared handle to the counter store.
///
/// Cloning is cheap; all clones observe the same state. The persisted file
/// may transiently lag the in-memory state because persistence is
/// asynchronous, but converges once in-flight saves complete.
#[derive(Debug, Clone)]
pub struct StatsStore {
    stats: Arc<RwLock<Stats>>,
    data_file: PathBuf,
}

impl StatsStore {
    /// Create a store backed by the given data file. No I/O happens here;
    /// call [`StatsStore::load`] before serving.
    pub fn new(data_file: PathBuf) -> Self {
        Self {
            stats: Arc::new(RwLock::new(Stats::default())),
            data_file,
        }
    }

    /// Path of the persisted data file
    pub fn data_file(&self) -> &Path {
        &self.data_file
    }

    /// Load persisted counters, replacing the in-memory state.
    ///
    /// A missing file initializes empty state and persists it immediately so
    /// the file exists from the first request on. Read or parse failures are
    /// logged and leave the in-memory defaults untouched; startup never
    /// fails here.
    pub async fn load(&self) {
        if !self.data_file.exists() {
            info!(
                "Stats file does not exist, creating: {}",
                self.data_file.display()
            );
            if let Err(e) = self.persist().await {
                warn!("Failed to create initial stats file: {}", e);
            }
            return;
        }

        let contents = match tokio::fs::read(&self.data_file).await {
            Ok(contents) => contents,
            Err(e) => {
                warn!(
                    "Failed to read stats file {}: {}",
                    self.data_file.display(),
                    e
                );
                return;
            }
        };

        let loaded: Stats = match serde_json::from_slice(&contents) {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!(
                    "Failed to parse stats file {}, starting from empty state: {}",
                    self.data_file.display(),
                    e
                );
                return;
            }
        };

        let mut stats = self.stats.write().await;
        *stats = loaded;
        info!(
            "Loaded stats: total_requests={}, images={}",
            stats.total_requests,
            stats.image_counts.len()
        );
    }

    /// Record one served request for `image_name` and schedule a persist.
    ///
    /// The increment happens under the exclusive lock; the disk write runs
    /// in a detached task so the request path never blocks on it. Persist
    /// failures are logged and dropped.
    pub async fn record(&self, image_name: &str) {
        {
            let mut stats = self.stats.write().await;
            stats.total_requests += 1;
            let count = {
                let entry = stats.image_counts.entry(image_name.to_string()).or_insert(0);
                *entry += 1;
                *entry
            };
            debug!(
                "Recorded request: image={}, total={}, image_total={}",
                image_name, stats.total_requests, count
            );
        }

        let store = self.clone();
        tokio::spawn(async move {
            if let Err(e) = store.persist().await {
                warn!("Failed to persist stats: {}", e);
            }
        });
    }

    /// Read-only copy of the current counters
    pub async fn snapshot(&self) -> Stats {
        self.stats.read().await.clone()
    }

    /// Write the full counter state to the data file.
    ///
    /// The write lock is held across the file write so overlapping detached
    /// persists are serialized and cannot interleave partial writes from
    /// this process. Atomic replacement on disk is not guaranteed; a crash
    /// mid-write leaves a corrupt file which the next load treats as no
    /// prior state.
    pub async fn persist(&self) -> Result<()> {
        let mut stats = self.stats.write().await;
        stats.last_updated = Utc::now();
        let json = serde_json::to_string_pretty(&*stats)?;
        tokio::fs::write(&self.data_file, json).await?;
        Ok(())
    }
}
