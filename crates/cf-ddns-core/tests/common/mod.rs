//! Test doubles and common utilities for contract tests
//!
//! The doubles keep their state behind `Arc`s so a test can hand one copy to
//! the engine and keep another to inspect call counts afterwards.

#![allow(dead_code)]

use cf_ddns_core::error::{Error, Result};
use cf_ddns_core::traits::{AddressProbe, RecordSnapshot, RecordStore, SnapshotCache};
use cf_ddns_core::{DnsRecord, MemorySnapshotCache, PublicAddress, SyncConfig, SyncEngine};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const HOSTNAME: &str = "home.example.com";

pub fn addr(s: &str) -> PublicAddress {
    s.parse().expect("valid IPv4 literal")
}

pub fn record(id: &str, address: &str) -> DnsRecord {
    DnsRecord::new(id, HOSTNAME, addr(address), 60)
}

/// Minimal valid configuration for [`HOSTNAME`]
pub fn minimal_config() -> SyncConfig {
    SyncConfig::new(HOSTNAME, "zone-123", "test-token")
}

/// Build an engine around clones of the given doubles
pub fn engine(
    probe: &FakeProbe,
    store: &FakeRecordStore,
    cache: &CountingCache,
    config: SyncConfig,
) -> SyncEngine {
    SyncEngine::new(
        Box::new(probe.clone()),
        Box::new(FakeRecordStore::sharing_counters_with(store)),
        Box::new(cache.clone()),
        config,
    )
    .expect("engine construction succeeds")
}

/// A scripted AddressProbe
///
/// Interfaces map to local addresses; local addresses (or `None` for an
/// unbound probe) map to public answers.
#[derive(Clone, Default)]
pub struct FakeProbe {
    locals: Arc<Mutex<HashMap<String, Ipv4Addr>>>,
    publics: Arc<Mutex<HashMap<Option<Ipv4Addr>, PublicAddress>>>,
    public_call_count: Arc<AtomicUsize>,
}

impl FakeProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe answering `public` to the unbound request
    pub fn unbound(public: &str) -> Self {
        let probe = Self::new();
        probe.set_public(None, public);
        probe
    }

    /// Declare an interface with a public answer behind it
    pub fn with_interface(self, interface: &str, local: [u8; 4], public: &str) -> Self {
        let local = Ipv4Addr::from(local);
        self.locals
            .lock()
            .unwrap()
            .insert(interface.to_string(), local);
        self.set_public(Some(local), public);
        self
    }

    /// Change the public answer seen from `bind`
    pub fn set_public(&self, bind: Option<Ipv4Addr>, public: &str) {
        self.publics.lock().unwrap().insert(bind, addr(public));
    }

    /// Get the number of times public_address() was called
    pub fn public_call_count(&self) -> usize {
        self.public_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AddressProbe for FakeProbe {
    async fn local_address(&self, interface: &str) -> Result<Ipv4Addr> {
        self.locals
            .lock()
            .unwrap()
            .get(interface)
            .copied()
            .ok_or_else(|| Error::invalid_input(format!("interface {interface} has no IPv4")))
    }

    async fn public_address(&self, bind: Option<Ipv4Addr>) -> Result<PublicAddress> {
        self.public_call_count.fetch_add(1, Ordering::SeqCst);
        self.publics
            .lock()
            .unwrap()
            .get(&bind)
            .copied()
            .ok_or_else(|| Error::http("probe unreachable"))
    }
}

/// Which store call an injected failure applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    List,
    Create,
    Update,
    Delete,
}

/// An in-memory RecordStore that tracks calls
pub struct FakeRecordStore {
    records: Arc<Mutex<Vec<DnsRecord>>>,
    next_id: Arc<AtomicUsize>,
    list_call_count: Arc<AtomicUsize>,
    create_call_count: Arc<AtomicUsize>,
    update_call_count: Arc<AtomicUsize>,
    delete_call_count: Arc<AtomicUsize>,
    host_exists_call_count: Arc<AtomicUsize>,
    /// Fail the first call of this kind with `{code, message}`
    failure: Arc<Mutex<Option<(StoreOp, i64, String)>>>,
    /// Whether the zone holds other record types for the host
    host_known: Arc<Mutex<bool>>,
}

impl FakeRecordStore {
    pub fn new() -> Self {
        Self::with_records(Vec::new())
    }

    pub fn with_records(records: Vec<DnsRecord>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
            next_id: Arc::new(AtomicUsize::new(0)),
            list_call_count: Arc::new(AtomicUsize::new(0)),
            create_call_count: Arc::new(AtomicUsize::new(0)),
            update_call_count: Arc::new(AtomicUsize::new(0)),
            delete_call_count: Arc::new(AtomicUsize::new(0)),
            host_exists_call_count: Arc::new(AtomicUsize::new(0)),
            failure: Arc::new(Mutex::new(None)),
            host_known: Arc::new(Mutex::new(true)),
        }
    }

    /// Create a new FakeRecordStore that shares state with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            records: Arc::clone(&other.records),
            next_id: Arc::clone(&other.next_id),
            list_call_count: Arc::clone(&other.list_call_count),
            create_call_count: Arc::clone(&other.create_call_count),
            update_call_count: Arc::clone(&other.update_call_count),
            delete_call_count: Arc::clone(&other.delete_call_count),
            host_exists_call_count: Arc::clone(&other.host_exists_call_count),
            failure: Arc::clone(&other.failure),
            host_known: Arc::clone(&other.host_known),
        }
    }

    /// Make the next call of kind `op` fail with a provider error
    pub fn fail_next(&self, op: StoreOp, code: i64, message: &str) {
        *self.failure.lock().unwrap() = Some((op, code, message.to_string()));
    }

    /// Report the hostname as absent from the zone
    pub fn forget_host(&self) {
        *self.host_known.lock().unwrap() = false;
    }

    /// Addresses currently held, sorted
    pub fn addresses(&self) -> Vec<String> {
        let mut addrs: Vec<_> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.address)
            .collect();
        addrs.sort();
        addrs.iter().map(ToString::to_string).collect()
    }

    pub fn records(&self) -> Vec<DnsRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn list_call_count(&self) -> usize {
        self.list_call_count.load(Ordering::SeqCst)
    }

    pub fn create_call_count(&self) -> usize {
        self.create_call_count.load(Ordering::SeqCst)
    }

    pub fn update_call_count(&self) -> usize {
        self.update_call_count.load(Ordering::SeqCst)
    }

    pub fn delete_call_count(&self) -> usize {
        self.delete_call_count.load(Ordering::SeqCst)
    }

    pub fn host_exists_call_count(&self) -> usize {
        self.host_exists_call_count.load(Ordering::SeqCst)
    }

    /// Total number of mutating calls
    pub fn mutation_count(&self) -> usize {
        self.create_call_count() + self.update_call_count() + self.delete_call_count()
    }

    /// Total number of calls of any kind
    pub fn call_count(&self) -> usize {
        self.list_call_count() + self.mutation_count() + self.host_exists_call_count()
    }

    fn take_failure(&self, op: StoreOp) -> Result<()> {
        let mut failure = self.failure.lock().unwrap();
        if matches!(&*failure, Some((failing, _, _)) if *failing == op) {
            if let Some((_, code, message)) = failure.take() {
                return Err(Error::provider(code, message));
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl RecordStore for FakeRecordStore {
    async fn list(&self, hostname: &str) -> Result<Vec<DnsRecord>> {
        self.list_call_count.fetch_add(1, Ordering::SeqCst);
        self.take_failure(StoreOp::List)?;

        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.hostname == hostname)
            .cloned()
            .collect())
    }

    async fn create(&self, hostname: &str, address: PublicAddress, ttl: u32) -> Result<DnsRecord> {
        self.create_call_count.fetch_add(1, Ordering::SeqCst);
        self.take_failure(StoreOp::Create)?;

        let id = format!("created-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let record = DnsRecord::new(id, hostname, address, ttl);
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
        self.update_call_count.fetch_add(1, Ordering::SeqCst);
        self.take_failure(StoreOp::Update)?;

        let mut records = self.records.lock().unwrap();
        let existing = records
            .iter_mut()
            .find(|r| r.id == record_id)
            .ok_or_else(|| Error::provider(81044, "Record not found"))?;
        *existing = DnsRecord::new(record_id, hostname, address, ttl);
        Ok(existing.clone())
    }

    async fn delete(&self, record_id: &str) -> Result<()> {
        self.delete_call_count.fetch_add(1, Ordering::SeqCst);
        self.take_failure(StoreOp::Delete)?;

        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|r| r.id != record_id);
        if records.len() == before {
            return Err(Error::provider(81044, "Record not found"));
        }
        Ok(())
    }

    async fn host_exists(&self, _hostname: &str) -> Result<bool> {
        self.host_exists_call_count.fetch_add(1, Ordering::SeqCst);
        Ok(*self.host_known.lock().unwrap())
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}

/// A SnapshotCache that counts loads and stores
#[derive(Clone, Default)]
pub struct CountingCache {
    inner: MemorySnapshotCache,
    load_call_count: Arc<AtomicUsize>,
    store_call_count: Arc<AtomicUsize>,
    fail_stores: Arc<Mutex<bool>>,
}

impl CountingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a snapshot taken now without counting it as a store
    pub async fn seed(&self, records: Vec<DnsRecord>) {
        self.seed_snapshot(RecordSnapshot::new(records)).await;
    }

    pub async fn seed_snapshot(&self, snapshot: RecordSnapshot) {
        self.inner
            .store(HOSTNAME, &snapshot)
            .await
            .expect("memory store succeeds");
    }

    pub async fn snapshot(&self) -> Option<RecordSnapshot> {
        self.inner.load(HOSTNAME).await
    }

    /// Make every store fail
    pub fn break_storage(&self) {
        *self.fail_stores.lock().unwrap() = true;
    }

    pub fn load_call_count(&self) -> usize {
        self.load_call_count.load(Ordering::SeqCst)
    }

    pub fn store_call_count(&self) -> usize {
        self.store_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SnapshotCache for CountingCache {
    async fn load(&self, hostname: &str) -> Option<RecordSnapshot> {
        self.load_call_count.fetch_add(1, Ordering::SeqCst);
        self.inner.load(hostname).await
    }

    async fn store(&self, hostname: &str, snapshot: &RecordSnapshot) -> Result<()> {
        self.store_call_count.fetch_add(1, Ordering::SeqCst);
        if *self.fail_stores.lock().unwrap() {
            return Err(Error::state_store("disk full"));
        }
        self.inner.store(hostname, snapshot).await
    }
}
