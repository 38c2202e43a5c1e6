//! Core traits for the cf-ddns system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`AddressProbe`]: Discover local and public IPv4 addresses
//! - [`RecordStore`]: List and mutate A records via the provider API
//! - [`SnapshotCache`]: Persist the last known record set between runs

pub mod address_probe;
pub mod record_store;
pub mod snapshot_cache;

pub use address_probe::AddressProbe;
pub use record_store::RecordStore;
pub use snapshot_cache::{RecordSnapshot, SnapshotCache};
