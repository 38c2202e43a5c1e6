// # Memory Snapshot Cache
//
// In-memory implementation of SnapshotCache.
//
// ## Purpose
//
// Backs `--no-cache` runs and tests. Every fresh process starts with an
// empty cache, so each run lists the provider.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::snapshot_cache::{RecordSnapshot, SnapshotCache};

/// In-memory snapshot cache implementation
///
/// This implementation stores all snapshots in a HashMap protected by a RwLock.
/// Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotCache {
    inner: Arc<RwLock<HashMap<String, RecordSnapshot>>>,
}

impl MemorySnapshotCache {
    /// Create a new empty memory cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of hostnames with a snapshot
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the cache is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl SnapshotCache for MemorySnapshotCache {
    async fn load(&self, hostname: &str) -> Option<RecordSnapshot> {
        self.inner.read().await.get(hostname).cloned()
    }

    async fn store(&self, hostname: &str, snapshot: &RecordSnapshot) -> Result<(), Error> {
        self.inner
            .write()
            .await
            .insert(hostname.to_string(), snapshot.clone());
        Ok(())
    }
}
