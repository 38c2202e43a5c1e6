// # Snapshot Cache Trait
//
// Defines the interface for persisting the last known A record set of a
// hostname between runs.
//
// ## Purpose
//
// The cache lets a run skip the remote listing when nothing changed:
// - The snapshot is the provider's record set as of the last listing
//   or the last fully applied plan
// - It is replaced wholesale, never merged
// - Freshness is decided by shape (cardinality + membership), not by age
//
// ## Implementations
//
// - File-based: one JSON file per hostname, atomic replace
// - Memory: per-process, for `--no-cache` and tests

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

use crate::record::{DnsRecord, PublicAddress};

/// Persisted copy of a hostname's A records
///
/// The record list is kept sorted by address so two snapshots of the same
/// state serialize identically.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RecordSnapshot {
    /// When the records were listed (or the plan that produced them applied)
    #[serde(rename = "timestamp", with = "chrono::serde::ts_seconds")]
    fetched_at: DateTime<Utc>,

    /// The records, sorted by address
    records: Vec<DnsRecord>,
}

impl RecordSnapshot {
    /// Create a snapshot taken now
    pub fn new(records: Vec<DnsRecord>) -> Self {
        Self::taken_at(Utc::now(), records)
    }

    /// Create a snapshot with an explicit timestamp
    pub fn taken_at(fetched_at: DateTime<Utc>, mut records: Vec<DnsRecord>) -> Self {
        records.sort_by(|a, b| a.address.cmp(&b.address).then_with(|| a.id.cmp(&b.id)));
        Self {
            fetched_at,
            records,
        }
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn records(&self) -> &[DnsRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<DnsRecord> {
        self.records
    }

    /// The distinct addresses held by the snapshot
    pub fn addresses(&self) -> BTreeSet<PublicAddress> {
        self.records.iter().map(|r| r.address).collect()
    }

    /// Check whether the snapshot can stand in for a fresh listing
    ///
    /// Usable only when it holds exactly as many records as `desired` has
    /// addresses and every desired address appears among them. Age is
    /// deliberately ignored.
    pub fn is_usable_for(&self, desired: &BTreeSet<PublicAddress>) -> bool {
        if self.records.len() != desired.len() {
            return false;
        }

        let cached = self.addresses();
        desired.iter().all(|addr| cached.contains(addr))
    }
}

/// Trait for snapshot cache implementations
///
/// # Trust Level: Trusted (Core Component)
///
/// ## Allowed Capabilities
/// - ✅ Perform I/O for persistent storage
/// - ✅ Recover from corrupted storage by reporting a miss
///
/// ## Forbidden Capabilities
/// - ❌ Decide freshness (owned by the engine via [`RecordSnapshot::is_usable_for`])
/// - ❌ Merge snapshots (every store replaces the previous one)
/// - ❌ Talk to the record store
#[async_trait]
pub trait SnapshotCache: Send + Sync {
    /// Load the snapshot for `hostname`
    ///
    /// # Returns
    ///
    /// - `Some(RecordSnapshot)`: A readable snapshot exists
    /// - `None`: Missing, unreadable or corrupted (all treated as a miss)
    async fn load(&self, hostname: &str) -> Option<RecordSnapshot>;

    /// Replace the snapshot for `hostname`
    ///
    /// Creates the storage location on first use. A concurrent reader must
    /// never observe a partially written snapshot.
    async fn store(&self, hostname: &str, snapshot: &RecordSnapshot) -> Result<(), crate::Error>;
}
