//! Configuration types for the cf-ddns system
//!
//! A [`SyncConfig`] is built once at startup and handed to the engine by
//! value. Nothing in the core reads environment variables or globals.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Default cache directory for record snapshots
pub const DEFAULT_CACHE_DIR: &str = "/var/cache/cf-ddns";

/// Default TTL for created/updated records (seconds)
pub const DEFAULT_TTL: u32 = 60;

/// Configuration of one reconciliation run
#[derive(Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Hostname whose A records are managed
    pub target: String,

    /// Provider zone holding the hostname
    pub zone_id: String,

    /// Provider API token
    /// ⚠️ NEVER log this value
    pub api_token: String,

    /// Interfaces to probe; empty means one unbound probe
    #[serde(default)]
    pub interfaces: Vec<String>,

    /// TTL for created/updated records
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// Directory holding one snapshot file per hostname
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// When false, snapshots live in memory only
    #[serde(default = "default_cache_enabled")]
    pub cache_enabled: bool,

    /// Reconciliation policy switches
    #[serde(default)]
    pub policy: ReconcilePolicy,
}

// Custom Debug implementation that hides the API token
impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("target", &self.target)
            .field("zone_id", &self.zone_id)
            .field("api_token", &"<REDACTED>")
            .field("interfaces", &self.interfaces)
            .field("ttl", &self.ttl)
            .field("cache_dir", &self.cache_dir)
            .field("cache_enabled", &self.cache_enabled)
            .field("policy", &self.policy)
            .finish()
    }
}

impl SyncConfig {
    /// Create a configuration with defaults for everything but the identifiers
    pub fn new(
        target: impl Into<String>,
        zone_id: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            zone_id: zone_id.into(),
            api_token: api_token.into(),
            interfaces: Vec::new(),
            ttl: default_ttl(),
            cache_dir: default_cache_dir(),
            cache_enabled: default_cache_enabled(),
            policy: ReconcilePolicy::default(),
        }
    }

    /// Set the interfaces to probe
    pub fn with_interfaces(mut self, interfaces: Vec<String>) -> Self {
        self.interfaces = interfaces;
        self
    }

    /// Set the record TTL
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the snapshot directory
    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    /// Enable or disable the on-disk snapshot cache
    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    /// Set the reconciliation policy
    pub fn with_policy(mut self, policy: ReconcilePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.api_token.is_empty() {
            return Err(crate::Error::config("API token cannot be empty"));
        }

        if self.zone_id.is_empty() {
            return Err(crate::Error::config("Zone ID cannot be empty"));
        }

        if self.ttl == 0 {
            return Err(crate::Error::config("TTL must be > 0"));
        }

        if self.interfaces.iter().any(|i| i.trim().is_empty()) {
            return Err(crate::Error::config("Interface names cannot be empty"));
        }

        validate_domain_name(&self.target)
    }
}

/// Switches for the points where reconciliation behavior is a policy choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilePolicy {
    /// Turn an Insert/Delete pair into one Update of the stale record
    #[serde(default)]
    pub reuse_slot_on_single_change: bool,

    /// Rewrite records whose address matches but whose TTL differs
    #[serde(default)]
    pub reconcile_ttl: bool,

    /// Fail with `UnknownHost` when the hostname has no records at all
    #[serde(default = "default_require_known_host")]
    pub require_known_host: bool,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            reuse_slot_on_single_change: false,
            reconcile_ttl: false,
            require_known_host: default_require_known_host(),
        }
    }
}

/// Validate that a string is a valid domain name
///
/// This implements basic DNS domain name validation per RFC 1035.
/// It's not comprehensive but catches common errors.
pub fn validate_domain_name(domain: &str) -> Result<(), crate::Error> {
    if domain.is_empty() {
        return Err(crate::Error::config("Target hostname cannot be empty"));
    }

    // Total length limit (RFC 1035: 253 chars max)
    if domain.len() > 253 {
        return Err(crate::Error::config(format!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        )));
    }

    for label in domain.split('.') {
        if label.is_empty() {
            return Err(crate::Error::config(format!(
                "Domain name has empty label: '{domain}'"
            )));
        }

        if label.len() > 63 {
            return Err(crate::Error::config(format!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(crate::Error::config(format!(
                "Domain label contains invalid characters. Label: '{label}'. \
                Valid: alphanumeric and hyphen only."
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(crate::Error::config(format!(
                "Domain label cannot start or end with hyphen. Label: '{label}'"
            )));
        }
    }

    Ok(())
}

fn default_ttl() -> u32 {
    DEFAULT_TTL
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_DIR)
}

fn default_cache_enabled() -> bool {
    true
}

fn default_require_known_host() -> bool {
    true
}
