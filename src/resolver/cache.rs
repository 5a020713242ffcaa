//! Snapshot Cache
//!
//! Last-known-good subscription documents, one JSON slot per
//! (scope, source-config) pair. Writes are best-effort; an unreadable or
//! invalid snapshot behaves as a miss.

use std::path::PathBuf;
use tracing::warn;

use crate::model::SubscriptionDocument;

pub struct SnapshotCache {
    root: PathBuf,
}

impl SnapshotCache {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Persist the latest good document for a source. Failures are logged
    /// and never escalated to the caller.
    pub async fn store(&self, scope: &str, config_id: &str, document: &SubscriptionDocument) {
        let path = self.slot_path(scope, config_id);
        if let Some(parent) = path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                warn!("Failed to create cache directory for {}: {}", config_id, e);
                return;
            }
        }
        match serde_json::to_string(document) {
            Ok(json) => {
                if let Err(e) = tokio::fs::write(&path, json).await {
                    warn!("Failed to save cache for source {}: {}", config_id, e);
                }
            }
            Err(e) => warn!("Failed to serialize cache for source {}: {}", config_id, e),
        }
    }

    /// Most recent snapshot for a source, if one exists and still parses.
    pub async fn load(&self, scope: &str, config_id: &str) -> Option<SubscriptionDocument> {
        let path = self.slot_path(scope, config_id);
        let content = tokio::fs::read_to_string(&path).await.ok()?;
        serde_json::from_str(&content).ok()
    }

    fn slot_path(&self, scope: &str, config_id: &str) -> PathBuf {
        self.root
            .join(scope)
            .join("cache")
            .join(format!("{}.json", config_id))
    }
}
