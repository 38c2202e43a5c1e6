//! Core reconciliation engine
//!
//! The SyncEngine is responsible for one reconciliation pass:
//! - Resolving the desired address set via AddressProbe
//! - Consulting the SnapshotCache before listing remotely
//! - Planning and applying changes via RecordStore
//! - Refreshing the snapshot after a fully applied pass
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐
//! │ AddressProbe │─── desired set ───┐
//! └──────────────┘                   │
//!                                    ▼
//!                           ┌──────────────┐
//!                           │  SyncEngine  │
//!                           └──────────────┘
//!                                    │
//!         ┌──────────────────────────┼──────────────────────────┐
//!         │                          │                          │
//!         ▼                          ▼                          ▼
//! ┌───────────────┐          ┌──────────────┐          ┌─────────────┐
//! │ SnapshotCache │          │ RecordStore  │          │   Events    │
//! │ (load/store)  │          │ (list/apply) │          │  (notify)   │
//! └───────────────┘          └──────────────┘          └─────────────┘
//! ```
//!
//! ## Pass Flow
//!
//! 1. Resolve the desired set (fatal if empty)
//! 2. Load the snapshot; use it if its shape matches the desired set
//! 3. Otherwise list the hostname's A records
//! 4. Build the ActionPlan and apply it front to back
//! 5. Store a new snapshot unless the pass was a pure cache-hit skip
//!
//! The first failed remote call ends the pass. The snapshot is left as it
//! was, so it still describes the last fully applied state.

pub mod plan;
pub mod resolver;

pub use plan::{Action, ActionPlan, PlanKind};
pub use resolver::resolve;

use std::collections::BTreeSet;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::record::{DnsRecord, PublicAddress};
use crate::traits::{AddressProbe, RecordSnapshot, RecordStore, SnapshotCache};

/// Events emitted by the SyncEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Desired set resolved
    AddressesResolved { addresses: Vec<PublicAddress> },

    /// Snapshot matched the desired set, no listing needed
    CacheHit { records: usize },

    /// No usable snapshot
    CacheMiss,

    /// Remote listing completed
    RecordsListed { records: usize },

    /// Plan computed
    Planned {
        hostname: String,
        actions: usize,
        mutations: usize,
    },

    /// One plan entry applied against the record store
    Applied { kind: PlanKind, address: PublicAddress },

    /// Snapshot replaced
    SnapshotStored { records: usize },

    /// Pass aborted
    Failed { error: String },
}

/// Result of a successful pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// The plan that was applied
    pub plan: ActionPlan,

    /// Whether the snapshot stood in for a listing
    pub cache_hit: bool,

    /// Records the hostname holds after the pass, sorted by address
    pub records: Vec<DnsRecord>,
}

impl SyncOutcome {
    /// True when the pass made no remote mutation
    pub fn is_noop(&self) -> bool {
        self.plan.is_noop()
    }
}

/// Core reconciliation engine
///
/// ## Lifecycle
///
/// 1. Create with [`SyncEngine::new()`]
/// 2. Optionally attach an event sink with [`SyncEngine::with_event_sink()`]
/// 3. Call [`SyncEngine::run()`] once per invocation
///
/// ## Load Resistance
///
/// The event sink is bounded. A full sink drops events with a warning
/// rather than stalling the pass.
pub struct SyncEngine {
    /// Desired-set discovery
    probe: Box<dyn AddressProbe>,

    /// Remote A records
    store: Box<dyn RecordStore>,

    /// Last known record set
    cache: Box<dyn SnapshotCache>,

    config: SyncConfig,

    /// Event sender for external monitoring
    event_tx: Option<mpsc::Sender<SyncEvent>>,
}

impl SyncEngine {
    /// Create a new engine
    ///
    /// # Errors
    ///
    /// [`Error::Config`] when `config` does not validate.
    pub fn new(
        probe: Box<dyn AddressProbe>,
        store: Box<dyn RecordStore>,
        cache: Box<dyn SnapshotCache>,
        config: SyncConfig,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            probe,
            store,
            cache,
            config,
            event_tx: None,
        })
    }

    /// Attach a bounded channel receiving [`SyncEvent`]s
    pub fn with_event_sink(mut self, tx: mpsc::Sender<SyncEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Run one reconciliation pass
    ///
    /// # Returns
    ///
    /// - `Ok(SyncOutcome)`: The hostname now holds exactly the desired set
    /// - `Err(Error)`: Fatal error; remote state may be partially applied
    pub async fn run(&self) -> Result<SyncOutcome> {
        match self.run_pass().await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.emit_event(SyncEvent::Failed {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn run_pass(&self) -> Result<SyncOutcome> {
        let hostname = self.config.target.as_str();

        let desired = resolve(self.probe.as_ref(), &self.config.interfaces).await?;
        debug!(
            "Desired set for {}: {}",
            hostname,
            desired
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );
        self.emit_event(SyncEvent::AddressesResolved {
            addresses: desired.iter().copied().collect(),
        });

        let (actual, cache_hit) = self.current_records(hostname, &desired).await?;

        let plan = ActionPlan::build(&desired, &actual, self.config.ttl, &self.config.policy);
        debug!("Plan for {}: {}", hostname, plan);
        self.emit_event(SyncEvent::Planned {
            hostname: hostname.to_string(),
            actions: plan.len(),
            mutations: plan.mutation_count(),
        });

        let records = self.apply(hostname, &plan).await?;

        if cache_hit && plan.is_noop() {
            debug!("{} is up to date", hostname);
        } else {
            self.refresh_snapshot(hostname, &records).await;
        }

        let mut records = records;
        records.sort_by(|a, b| a.address.cmp(&b.address).then_with(|| a.id.cmp(&b.id)));

        Ok(SyncOutcome {
            plan,
            cache_hit,
            records,
        })
    }

    /// Get the records to plan against, from the snapshot if it fits
    async fn current_records(
        &self,
        hostname: &str,
        desired: &BTreeSet<PublicAddress>,
    ) -> Result<(Vec<DnsRecord>, bool)> {
        if let Some(snapshot) = self.cache.load(hostname).await {
            if snapshot.is_usable_for(desired) {
                debug!(
                    "Using cached records for {} from {}",
                    hostname,
                    snapshot.fetched_at()
                );
                self.emit_event(SyncEvent::CacheHit {
                    records: snapshot.records().len(),
                });
                return Ok((snapshot.into_records(), true));
            }
            debug!("Cached records for {} no longer match", hostname);
        }
        self.emit_event(SyncEvent::CacheMiss);

        let records = self.store.list(hostname).await?;
        debug!(
            "Listed {} A record(s) for {} from {}",
            records.len(),
            hostname,
            self.store.provider_name()
        );
        self.emit_event(SyncEvent::RecordsListed {
            records: records.len(),
        });

        if records.is_empty()
            && self.config.policy.require_known_host
            && !self.store.host_exists(hostname).await?
        {
            return Err(Error::unknown_host(hostname));
        }

        Ok((records, false))
    }

    /// Apply the plan, stopping at the first failure
    ///
    /// Returns the records the hostname holds afterwards, rebuilt from the
    /// skipped records and the store's answers to create/update.
    async fn apply(&self, hostname: &str, plan: &ActionPlan) -> Result<Vec<DnsRecord>> {
        let ttl = self.config.ttl;
        let mut records = Vec::with_capacity(plan.len());

        for action in plan {
            match action {
                Action::Skip { record } => {
                    debug!("{} already points at {}", hostname, record.address);
                    records.push(record.clone());
                    continue;
                }
                Action::Insert { address } => {
                    info!("Adding {} to {}", address, hostname);
                    records.push(self.store.create(hostname, *address, ttl).await?);
                }
                Action::Update { from, to, record } => {
                    info!("Updating {} on {}: {} -> {}", record.id, hostname, from, to);
                    records.push(self.store.update(&record.id, hostname, *to, ttl).await?);
                }
                Action::Delete { record } => {
                    info!("Removing {} from {}", record.address, hostname);
                    self.store.delete(&record.id).await?;
                }
            }

            self.emit_event(SyncEvent::Applied {
                kind: action.kind(),
                address: action.address(),
            });
        }

        Ok(records)
    }

    /// Replace the snapshot; a failure here only costs a listing next run
    async fn refresh_snapshot(&self, hostname: &str, records: &[DnsRecord]) {
        let snapshot = RecordSnapshot::new(records.to_vec());

        match self.cache.store(hostname, &snapshot).await {
            Ok(()) => {
                debug!("Stored {} record(s) for {}", records.len(), hostname);
                self.emit_event(SyncEvent::SnapshotStored {
                    records: records.len(),
                });
            }
            Err(e) => {
                warn!("Failed to store snapshot for {}: {}", hostname, e);
            }
        }
    }

    /// Emit a sync event
    fn emit_event(&self, event: SyncEvent) {
        let Some(tx) = &self.event_tx else {
            return;
        };

        match tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MemorySnapshotCache;
    use async_trait::async_trait;
    use std::net::Ipv4Addr;
    use std::sync::Mutex;

    struct FixedProbe(Option<PublicAddress>);

    #[async_trait]
    impl AddressProbe for FixedProbe {
        async fn local_address(&self, interface: &str) -> Result<Ipv4Addr> {
            Err(Error::invalid_input(format!("no interface {interface}")))
        }

        async fn public_address(&self, _bind: Option<Ipv4Addr>) -> Result<PublicAddress> {
            self.0.ok_or_else(|| Error::http("unreachable"))
        }
    }

    #[derive(Default)]
    struct VecStore {
        records: Mutex<Vec<DnsRecord>>,
        next_id: Mutex<u32>,
    }

    #[async_trait]
    impl RecordStore for VecStore {
        async fn list(&self, _hostname: &str) -> Result<Vec<DnsRecord>> {
            Ok(self.records.lock().unwrap().clone())
        }

        async fn create(
            &self,
            hostname: &str,
            address: PublicAddress,
            ttl: u32,
        ) -> Result<DnsRecord> {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            let record = DnsRecord::new(format!("new-{next}"), hostname, address, ttl);
            self.records.lock().unwrap().push(record.clone());
            Ok(record)
        }

        async fn update(
            &self,
            record_id: &str,
            hostname: &str,
            address: PublicAddress,
            ttl: u32,
        ) -> Result<DnsRecord> {
            let updated = DnsRecord::new(record_id, hostname, address, ttl);
            let mut records = self.records.lock().unwrap();
            for r in records.iter_mut().filter(|r| r.id == record_id) {
                *r = updated.clone();
            }
            Ok(updated)
        }

        async fn delete(&self, record_id: &str) -> Result<()> {
            self.records.lock().unwrap().retain(|r| r.id != record_id);
            Ok(())
        }

        fn provider_name(&self) -> &'static str {
            "vec"
        }
    }

    fn config() -> SyncConfig {
        SyncConfig::new("home.example.com", "zone", "token").with_cache_enabled(false)
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let result = SyncEngine::new(
            Box::new(FixedProbe(None)),
            Box::new(VecStore::default()),
            Box::new(MemorySnapshotCache::new()),
            config().with_ttl(0),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_pass_emits_events_in_order() {
        let (tx, mut rx) = mpsc::channel(32);
        let engine = SyncEngine::new(
            Box::new(FixedProbe(Some("10.0.0.1".parse().unwrap()))),
            Box::new(VecStore::default()),
            Box::new(MemorySnapshotCache::new()),
            config(),
        )
        .unwrap()
        .with_event_sink(tx);

        let outcome = engine.run().await.unwrap();
        assert_eq!(outcome.plan.to_string(), "[Insert(10.0.0.1)]");
        assert!(!outcome.cache_hit);
        drop(engine);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        assert_eq!(
            events,
            vec![
                SyncEvent::AddressesResolved {
                    addresses: vec!["10.0.0.1".parse().unwrap()]
                },
                SyncEvent::CacheMiss,
                SyncEvent::RecordsListed { records: 0 },
                SyncEvent::Planned {
                    hostname: "home.example.com".into(),
                    actions: 1,
                    mutations: 1
                },
                SyncEvent::Applied {
                    kind: PlanKind::Insert,
                    address: "10.0.0.1".parse().unwrap()
                },
                SyncEvent::SnapshotStored { records: 1 },
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_is_reported_as_event() {
        let (tx, mut rx) = mpsc::channel(8);
        let engine = SyncEngine::new(
            Box::new(FixedProbe(None)),
            Box::new(VecStore::default()),
            Box::new(MemorySnapshotCache::new()),
            config(),
        )
        .unwrap()
        .with_event_sink(tx);

        let err = engine.run().await.unwrap_err();
        assert!(matches!(err, Error::NoAddressResolved));

        assert_eq!(
            rx.recv().await,
            Some(SyncEvent::Failed {
                error: "Cannot get public IPv4 address".into()
            })
        );
    }

    #[tokio::test]
    async fn test_full_event_sink_does_not_block() {
        let (tx, _rx) = mpsc::channel(1);
        let engine = SyncEngine::new(
            Box::new(FixedProbe(Some("10.0.0.1".parse().unwrap()))),
            Box::new(VecStore::default()),
            Box::new(MemorySnapshotCache::new()),
            config(),
        )
        .unwrap()
        .with_event_sink(tx);

        assert!(engine.run().await.is_ok());
    }
}
