// # Address Probe Trait
//
// Defines the capability used to learn which public IPv4 addresses this host
// egresses from.
//
// ## Implementations
//
// - HTTP discovery bound to an interface address: `cf-ddns-ip-http` crate
// - Test doubles: scripted probes in the contract tests
//
// ## Usage
//
// ```rust,ignore
// use cf_ddns_core::AddressProbe;
//
// #[tokio::main]
// async fn main() -> Result<(), Box<dyn std::error::Error>> {
//     let probe = /* AddressProbe implementation */;
//
//     let local = probe.local_address("eth0").await?;
//     let public = probe.public_address(Some(local)).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::Ipv4Addr;

use crate::record::PublicAddress;

/// Capability for discovering addresses
///
/// # Trust Level: Semi-Trusted
///
/// Probes perform platform and network I/O but make no decisions:
///
/// ## Allowed Capabilities
/// - ✅ Read the OS interface table
/// - ✅ Perform one discovery request per call, bound to the given address
///
/// ## Forbidden Capabilities
/// - ❌ Retry or fall back to a different interface (owned by the resolver)
/// - ❌ Deduplicate results (owned by the resolver)
/// - ❌ Touch the record store or the snapshot cache
///
/// Errors returned here are absorbed by the resolver: a failing interface
/// simply contributes nothing to the desired set.
#[async_trait]
pub trait AddressProbe: Send + Sync {
    /// Look up the IPv4 address locally assigned to `interface`
    ///
    /// # Returns
    ///
    /// - `Ok(Ipv4Addr)`: The first IPv4 address on the interface
    /// - `Err(Error)`: Unknown interface, or no IPv4 address assigned
    async fn local_address(&self, interface: &str) -> Result<Ipv4Addr, crate::Error>;

    /// Discover the public address seen by the outside world
    ///
    /// # Parameters
    ///
    /// - `bind`: Local address to use as the request's source, or `None`
    ///   to let the OS pick the route
    ///
    /// # Returns
    ///
    /// - `Ok(PublicAddress)`: The address the discovery service observed
    /// - `Err(Error)`: The service was unreachable or answered nonsense
    async fn public_address(&self, bind: Option<Ipv4Addr>)
    -> Result<PublicAddress, crate::Error>;
}
