// # Record Store Trait
//
// Defines the boundary to the remote DNS provider: list, create, update and
// delete A records for one hostname.
//
// ## Implementations
//
// - Cloudflare: `cf-ddns-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use cf_ddns_core::RecordStore;
//
// #[tokio::main]
// async fn main() -> Result<(), Box<dyn std::error::Error>> {
//     let store = /* RecordStore implementation */;
//
//     let records = store.list("home.example.com").await?;
//     for record in records {
//         println!("{} -> {}", record.id, record.address);
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::record::{DnsRecord, PublicAddress};

/// Trait for DNS record store implementations
///
/// # Trust Level: Untrusted
///
/// Record stores are thin API clients:
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to their endpoints only
/// - ✅ Parse provider-specific responses
/// - ✅ Return success or failure
///
/// ## Forbidden Capabilities
/// - ❌ Retry failed calls (periodic re-invocation is the retry mechanism)
/// - ❌ Decide whether a mutation is needed (owned by the planner)
/// - ❌ Access the snapshot cache
/// - ❌ Cache listings beyond a single request
///
/// # Errors
///
/// A call the provider reports as failed must surface as
/// [`Error::Provider`](crate::Error::Provider) carrying the first reported
/// `code` and `message`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// List every A record for `hostname`
    ///
    /// An empty list is not an error: it means the hostname has no A records.
    async fn list(&self, hostname: &str) -> Result<Vec<DnsRecord>, crate::Error>;

    /// Create an A record and return it with its new identifier
    async fn create(
        &self,
        hostname: &str,
        address: PublicAddress,
        ttl: u32,
    ) -> Result<DnsRecord, crate::Error>;

    /// Rewrite an existing record in place
    async fn update(
        &self,
        record_id: &str,
        hostname: &str,
        address: PublicAddress,
        ttl: u32,
    ) -> Result<DnsRecord, crate::Error>;

    /// Delete a record by identifier
    async fn delete(&self, record_id: &str) -> Result<(), crate::Error>;

    /// Whether the zone holds any record, of any type, for `hostname`
    ///
    /// Only consulted when an A listing comes back empty. Stores that cannot
    /// answer keep the default and report the host as known.
    async fn host_exists(&self, _hostname: &str) -> Result<bool, crate::Error> {
        Ok(true)
    }

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
