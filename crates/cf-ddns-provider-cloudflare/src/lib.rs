// # Cloudflare Record Store
//
// This crate provides the Cloudflare implementation of `RecordStore` for
// cf-ddns.
//
// ## Implementation Status
//
// - ✅ One HTTP request per store call (listings follow pagination)
// - ✅ Provider errors surface the first `{code, message}` verbatim
// - ✅ HTTP timeout configured (30 seconds)
// - ✅ A records only
// - ❌ NO retry logic (periodic re-invocation is the retry mechanism)
// - ❌ NO caching (snapshots are owned by the SnapshotCache)
// - ❌ NO zone discovery (the zone ID is always configured)
//
// ## Architectural Constraints
//
// ### Trust Level: Untrusted (Record Store)
//
// **Allowed Capabilities**:
// - ✅ Perform HTTP/HTTPS API calls to the Cloudflare API only
// - ✅ Parse provider-specific responses
//
// **Forbidden Capabilities**:
// - ❌ Spawn tasks or threads
// - ❌ Implement retry logic
// - ❌ Decide which records to change (owned by the planner)
// - ❌ Access the snapshot cache
//
// ## Security Requirements
//
// - API token NEVER appears in logs
// - Store construction fails fast if the token is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List DNS Records: GET `/zones/:zone_id/dns_records?type=A&name=...`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`
// - Delete DNS Record: DELETE `/zones/:zone_id/dns_records/:record_id`

mod types;

use async_trait::async_trait;
use cf_ddns_core::traits::RecordStore;
use cf_ddns_core::{DnsRecord, Error, PublicAddress, Result};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use types::{CloudflareDnsRecord, CloudflareResponse, DeletedRecord, RecordPayload};

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Records requested per listing page
const PAGE_SIZE: &str = "100";

/// Smallest page the API accepts, used for existence probes
const PROBE_PAGE_SIZE: &str = "5";

/// Cloudflare record store
///
/// # Trust Level: Untrusted
///
/// Stateless and single-shot. Every method maps to one API call (listings
/// may take several pages) and reports failure without retrying.
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API token.
pub struct CloudflareRecordStore {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// Zone holding the managed hostname
    zone_id: String,

    /// API root, overridable for tests
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareRecordStore")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl CloudflareRecordStore {
    /// Create a new Cloudflare record store
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:DNS:Edit permissions
    /// - `zone_id`: Zone holding the managed hostname
    ///
    /// # Errors
    ///
    /// [`Error::Config`] for an empty token or zone, [`Error::Http`] if the
    /// HTTP client cannot be built.
    pub fn new(api_token: impl Into<String>, zone_id: impl Into<String>) -> Result<Self> {
        let api_token = api_token.into();
        let zone_id = zone_id.into();

        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }
        if zone_id.is_empty() {
            return Err(Error::config("Cloudflare zone ID cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_token,
            zone_id,
            base_url: CLOUDFLARE_API_BASE.to_string(),
            client,
        })
    }

    /// Point the store at a different API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn records_url(&self) -> String {
        format!("{}/zones/{}/dns_records", self.base_url, self.zone_id)
    }

    fn record_url(&self, record_id: &str) -> String {
        format!("{}/{}", self.records_url(), record_id)
    }

    /// Send a request and decode the response envelope
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<CloudflareResponse<T>> {
        let response = request
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| Error::http(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        tracing::trace!("Cloudflare responded {}", status);

        let body = response
            .text()
            .await
            .map_err(|e| Error::http(format!("Failed to read response: {e}")))?;

        parse_response(status, &body)
    }

    /// Send a mutating request whose result must be a DNS record
    async fn send_for_record(&self, request: RequestBuilder) -> Result<DnsRecord> {
        let record = self
            .send::<CloudflareDnsRecord>(request)
            .await?
            .into_result()?
            .ok_or_else(|| Error::invalid_response("response is missing the record"))?;

        DnsRecord::try_from(record)
    }
}

/// Decode a response body
///
/// Cloudflare answers errors with a JSON envelope as well, so the HTTP status
/// only matters when the body is not an envelope at all.
fn parse_response<T: DeserializeOwned>(
    status: StatusCode,
    body: &str,
) -> Result<CloudflareResponse<T>> {
    serde_json::from_str(body).map_err(|e| {
        tracing::debug!("Unparseable Cloudflare response ({}): {}", status, e);
        Error::http(format!("HTTP {status}: unexpected response body"))
    })
}

/// Decode one listing page
///
/// Returns the page's A records and whether another page should be fetched.
/// A response without `result_info` is the only page; an empty page ends the
/// walk whatever total the API advertised.
fn decode_list_page(
    response: CloudflareResponse<Vec<CloudflareDnsRecord>>,
    page: u32,
) -> Result<(Vec<DnsRecord>, bool)> {
    let total_pages = response
        .result_info
        .as_ref()
        .and_then(|info| info.total_pages)
        .unwrap_or(1);
    let batch = response.into_result()?.unwrap_or_default();

    if batch.is_empty() {
        return Ok((Vec::new(), false));
    }

    let records = batch
        .into_iter()
        .map(DnsRecord::try_from)
        .collect::<Result<Vec<_>>>()?;

    Ok((records, page < total_pages))
}

/// Decide from an untyped listing whether the name holds any record
///
/// `total_count` counts as well as the returned rows, so a short page still
/// proves existence.
fn decode_host_exists(response: CloudflareResponse<Vec<serde_json::Value>>) -> Result<bool> {
    let total = response.result_info.as_ref().map_or(0, |info| info.total_count);
    let found = response
        .into_result()?
        .is_some_and(|records| !records.is_empty());

    Ok(found || total > 0)
}

#[async_trait]
impl RecordStore for CloudflareRecordStore {
    /// List all A records for a hostname
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?type=A&name=home.example.com&per_page=100&page=1
    /// Authorization: Bearer <token>
    /// ```
    async fn list(&self, hostname: &str) -> Result<Vec<DnsRecord>> {
        let mut records = Vec::new();
        let mut page: u32 = 1;

        loop {
            let page_param = page.to_string();
            let request = self.client.get(self.records_url()).query(&[
                ("type", "A"),
                ("name", hostname),
                ("per_page", PAGE_SIZE),
                ("page", page_param.as_str()),
            ]);

            let (batch, more) = decode_list_page(self.send(request).await?, page)?;
            records.extend(batch);

            if !more {
                break;
            }
            page += 1;
        }

        tracing::debug!("Cloudflare holds {} A record(s) for {}", records.len(), hostname);
        Ok(records)
    }

    /// Create an A record
    ///
    /// # API Call
    ///
    /// ```http
    /// POST /zones/:zone_id/dns_records
    /// { "type": "A", "name": "home.example.com", "content": "1.2.3.4", "ttl": 60 }
    /// ```
    async fn create(&self, hostname: &str, address: PublicAddress, ttl: u32) -> Result<DnsRecord> {
        let request = self
            .client
            .post(self.records_url())
            .json(&RecordPayload::a_record(hostname, address, ttl));

        self.send_for_record(request).await
    }

    /// Rewrite an A record
    ///
    /// # API Call
    ///
    /// ```http
    /// PUT /zones/:zone_id/dns_records/:record_id
    /// { "type": "A", "name": "home.example.com", "content": "1.2.3.4", "ttl": 60 }
    /// ```
    async fn update(
        &self,
        record_id: &str,
        hostname: &str,
        address: PublicAddress,
        ttl: u32,
    ) -> Result<DnsRecord> {
        let request = self
            .client
            .put(self.record_url(record_id))
            .json(&RecordPayload::a_record(hostname, address, ttl));

        self.send_for_record(request).await
    }

    /// Delete a record
    ///
    /// # API Call
    ///
    /// ```http
    /// DELETE /zones/:zone_id/dns_records/:record_id
    /// ```
    async fn delete(&self, record_id: &str) -> Result<()> {
        let request = self.client.delete(self.record_url(record_id));

        self.send::<DeletedRecord>(request).await?.into_result()?;
        Ok(())
    }

    /// Check for records of any type under the hostname
    async fn host_exists(&self, hostname: &str) -> Result<bool> {
        let request = self
            .client
            .get(self.records_url())
            .query(&[("name", hostname), ("per_page", PROBE_PAGE_SIZE)]);

        decode_host_exists(self.send(request).await?)
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}
