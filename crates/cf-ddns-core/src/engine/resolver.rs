//! Desired-set resolution
//!
//! Turns the configured interfaces into the set of public IPv4 addresses the
//! hostname should point at.

use std::collections::BTreeSet;

use tracing::debug;

use crate::error::{Error, Result};
use crate::record::PublicAddress;
use crate::traits::AddressProbe;

/// Resolve the desired address set
///
/// - No interfaces: exactly one unbound public probe.
/// - Otherwise one probe per interface, bound to its local IPv4 address.
///
/// An interface that fails at either step, or whose answer is not usable,
/// contributes nothing. Answers shared by several interfaces collapse into
/// one entry.
///
/// # Errors
///
/// [`Error::NoAddressResolved`] when nothing usable came back.
pub async fn resolve(
    probe: &dyn AddressProbe,
    interfaces: &[String],
) -> Result<BTreeSet<PublicAddress>> {
    let mut desired = BTreeSet::new();

    if interfaces.is_empty() {
        if let Some(addr) = probe_public(probe, None, None).await {
            desired.insert(addr);
        }
    } else {
        for interface in interfaces {
            let local = match probe.local_address(interface).await {
                Ok(local) => local,
                Err(e) => {
                    debug!("Skipping interface {}: {}", interface, e);
                    continue;
                }
            };

            if let Some(addr) = probe_public(probe, Some(local), Some(interface)).await {
                desired.insert(addr);
            }
        }
    }

    if desired.is_empty() {
        return Err(Error::NoAddressResolved);
    }

    Ok(desired)
}

async fn probe_public(
    probe: &dyn AddressProbe,
    bind: Option<std::net::Ipv4Addr>,
    interface: Option<&str>,
) -> Option<PublicAddress> {
    let label = interface.unwrap_or("default route");

    match probe.public_address(bind).await {
        Ok(addr) if addr.is_usable() => {
            match interface {
                Some(iface) => debug!("Public IPv4 via {}: {}", iface, addr),
                None => debug!("Public IPv4: {}", addr),
            }
            Some(addr)
        }
        Ok(addr) => {
            debug!("Ignoring unusable address {} from {}", addr, label);
            None
        }
        Err(e) => {
            debug!("Public IPv4 probe via {} failed: {}", label, e);
            None
        }
    }
}
