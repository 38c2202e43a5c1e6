// # cf-ddns-core
//
// Core library for the cf-ddns record reconciler.
//
// ## Architecture Overview
//
// This library keeps the A records of one hostname equal to the set of public
// IPv4 addresses the host egresses from:
// - **AddressProbe**: Trait for discovering local and public addresses
// - **RecordStore**: Trait for listing and mutating records via provider APIs
// - **SnapshotCache**: Trait for persisting the last known record set
// - **ActionPlan**: Pure diff of desired vs actual records
// - **SyncEngine**: Orchestrates resolve → cache/list → plan → apply → store
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from implementations
// 2. **Run-to-Completion**: One pass per invocation, the scheduler retries
// 3. **Library-First**: All core functionality can be used as a library
// 4. **Idempotency**: A second pass over unchanged inputs mutates nothing

pub mod config;
pub mod engine;
pub mod error;
pub mod record;
pub mod state;
pub mod traits;

// Re-export core types for convenience
pub use config::{ReconcilePolicy, SyncConfig};
pub use engine::{Action, ActionPlan, PlanKind, SyncEngine, SyncEvent, SyncOutcome, resolve};
pub use error::{Error, Result};
pub use record::{DnsRecord, PublicAddress};
pub use state::{FileSnapshotCache, MemorySnapshotCache};
pub use traits::{AddressProbe, RecordSnapshot, RecordStore, SnapshotCache};
