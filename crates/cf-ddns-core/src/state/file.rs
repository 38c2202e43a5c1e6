// # File Snapshot Cache
//
// File-based implementation of SnapshotCache.
//
// ## Purpose
//
// Keeps the last known A record set of each hostname across runs so a
// steady-state run needs no remote listing at all.
//
// ## Crash Safety
//
// - Atomic writes: Uses write-then-rename for atomicity
// - Corruption detection: Validates JSON on load
// - A corrupt or unreadable file is a miss, never an older snapshot
//
// Only the last fully applied record set may be served. Any older copy could
// match the desired set by shape while the remote holds something else, and
// the engine would then skip the listing that would notice.
//
// ## File Format
//
// `<cache_dir>/<hostname>.cache`:
//
// ```json
// {
//   "timestamp": 1736424000,
//   "records": [
//     { "id": "372e6795...", "name": "home.example.com", "content": "1.2.3.4", "ttl": 60 }
//   ]
// }
// ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;
use crate::traits::snapshot_cache::{RecordSnapshot, SnapshotCache};

/// Extension of the live snapshot file
const CACHE_EXTENSION: &str = "cache";

/// File-based snapshot cache
///
/// - **Atomic writes**: New snapshot written to temporary file, then renamed
/// - **Corruption detection**: JSON validation on load; failures are a miss
///
/// # Example
///
/// ```rust,no_run
/// use cf_ddns_core::state::FileSnapshotCache;
/// use cf_ddns_core::traits::{RecordSnapshot, SnapshotCache};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let cache = FileSnapshotCache::new("/var/cache/cf-ddns");
///
///     cache.store("home.example.com", &RecordSnapshot::new(Vec::new())).await?;
///     let snapshot = cache.load("home.example.com").await;
///     assert!(snapshot.is_some());
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileSnapshotCache {
    dir: PathBuf,
}

impl FileSnapshotCache {
    /// Create a cache rooted at `dir`
    ///
    /// The directory is not touched until the first store.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Path of the live snapshot for `hostname`
    pub fn path_for(&self, hostname: &str) -> PathBuf {
        self.dir.join(format!("{hostname}.{CACHE_EXTENSION}"))
    }

    /// Load the snapshot, treating any read or parse failure as a miss
    async fn load_or_miss(path: &Path) -> Option<RecordSnapshot> {
        match Self::load_snapshot(path).await {
            Ok(snapshot) => snapshot,
            Err(Error::Json(e)) => {
                tracing::warn!(
                    "Snapshot file {} appears corrupted: {}. Treating as cache miss.",
                    path.display(),
                    e
                );
                None
            }
            Err(e) => {
                tracing::warn!("Failed to read snapshot {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Load snapshot from file
    async fn load_snapshot(path: &Path) -> Result<Option<RecordSnapshot>, Error> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Snapshot file does not exist: {}", path.display());
                return Ok(None);
            }
            Err(e) => return Err(Error::Io(e)),
        };

        let snapshot: RecordSnapshot = serde_json::from_str(&content)?;
        Ok(Some(snapshot))
    }

    /// Write snapshot to file atomically
    async fn write_snapshot(&self, path: &Path, snapshot: &RecordSnapshot) -> Result<(), Error> {
        fs::create_dir_all(&self.dir).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to create cache directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| Error::state_store(format!("Failed to serialize snapshot: {e}")))?;

        // Write to temporary file first
        let temp_path = Self::temp_path(path);
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.sync_all().await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        // Atomic rename (temp -> actual)
        fs::rename(&temp_path, path).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            ))
        })?;

        tracing::trace!("Snapshot written to file: {}", path.display());
        Ok(())
    }

    /// Get path to temporary file for atomic writes
    fn temp_path(path: &Path) -> PathBuf {
        let mut temp = path.to_path_buf();
        temp.set_extension("tmp");
        temp
    }
}

#[async_trait]
impl SnapshotCache for FileSnapshotCache {
    async fn load(&self, hostname: &str) -> Option<RecordSnapshot> {
        Self::load_or_miss(&self.path_for(hostname)).await
    }

    async fn store(&self, hostname: &str, snapshot: &RecordSnapshot) -> Result<(), Error> {
        self.write_snapshot(&self.path_for(hostname), snapshot).await
    }
}
