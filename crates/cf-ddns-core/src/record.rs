//! Addresses and A records
//!
//! [`PublicAddress`] is the unit of the desired set; [`DnsRecord`] is one
//! A record as held by the provider. Both serialize in the provider's own
//! vocabulary (`name`, `content`) so snapshots round-trip through the cache
//! file without a translation layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::error::Error;

/// A validated IPv4 literal
///
/// Ordering is numeric (octet by octet), which is the order plans are built
/// and snapshots are written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicAddress(Ipv4Addr);

impl PublicAddress {
    pub const fn new(addr: Ipv4Addr) -> Self {
        Self(addr)
    }

    pub const fn ip(&self) -> Ipv4Addr {
        self.0
    }

    /// Whether a probe answer is usable as a record target.
    ///
    /// Private ranges are accepted (the agent is also used on internal
    /// zones); addresses that can never be an egress identity are not.
    pub fn is_usable(&self) -> bool {
        !(self.0.is_unspecified()
            || self.0.is_loopback()
            || self.0.is_broadcast()
            || self.0.is_multicast())
    }
}

impl From<Ipv4Addr> for PublicAddress {
    fn from(addr: Ipv4Addr) -> Self {
        Self(addr)
    }
}

impl FromStr for PublicAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<Ipv4Addr>()
            .map(Self)
            .map_err(|_| Error::invalid_input(format!("not an IPv4 address: {s:?}")))
    }
}

impl fmt::Display for PublicAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One remote A record
///
/// `id` is owned by the provider: it is only ever taken from a listing or
/// from the result of a create/update call, never invented locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Provider-assigned identifier
    pub id: String,

    /// Fully qualified record name
    #[serde(rename = "name")]
    pub hostname: String,

    /// Record content
    #[serde(rename = "content")]
    pub address: PublicAddress,

    /// Time-to-live in seconds
    pub ttl: u32,
}

impl DnsRecord {
    pub fn new(
        id: impl Into<String>,
        hostname: impl Into<String>,
        address: PublicAddress,
        ttl: u32,
    ) -> Self {
        Self {
            id: id.into(),
            hostname: hostname.into(),
            address,
            ttl,
        }
    }
}
