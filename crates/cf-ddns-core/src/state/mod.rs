// # Snapshot Cache Implementations
//
// This module provides implementations of the SnapshotCache trait for
// different persistence strategies.

pub mod file;
pub mod memory;

pub use file::FileSnapshotCache;
pub use memory::MemorySnapshotCache;
