// # HTTP Address Probe
//
// This crate provides the HTTP-based AddressProbe for cf-ddns.
//
// ## Purpose
//
// - Looks up the IPv4 address assigned to an interface in the OS table
// - Asks a public "what is my IP" service which address a request from that
//   local address egresses as
//
// Binding the request to the interface address is what makes multi-uplink
// hosts work: each uplink's traffic leaves through its own route and the
// service reports that uplink's public address.
//
// ## Architecture
//
// Discovery services are tried in order; the first one that answers with an
// IPv4 literal wins. No state is kept between calls.

use async_trait::async_trait;
use cf_ddns_core::traits::AddressProbe;
use cf_ddns_core::{Error, PublicAddress, Result};

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// Default discovery services, tried in order
pub const DEFAULT_DISCOVERY_URLS: &[&str] = &[
    "https://api.ipify.org",  // returns plain text IP
    "https://ifconfig.me/ip", // No rate limit documented
    "https://icanhazip.com",  // No rate limit documented
];

/// Default per-request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP-based address probe
#[derive(Debug, Clone)]
pub struct HttpAddressProbe {
    /// Discovery URLs, in order of preference
    urls: Vec<String>,

    /// Per-request timeout
    timeout: Duration,
}

impl Default for HttpAddressProbe {
    fn default() -> Self {
        Self {
            urls: DEFAULT_DISCOVERY_URLS.iter().map(|u| u.to_string()).collect(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl HttpAddressProbe {
    /// Create a probe using the default discovery services
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the discovery services
    pub fn with_urls(mut self, urls: Vec<String>) -> Self {
        self.urls = urls;
        self
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// Build a client whose connections originate from `bind`
    ///
    /// Unbound probes still bind to `0.0.0.0` so the request goes out over
    /// IPv4 even on dual-stack hosts.
    fn client_for(&self, bind: Option<Ipv4Addr>) -> Result<reqwest::Client> {
        let local = IpAddr::V4(bind.unwrap_or(Ipv4Addr::UNSPECIFIED));

        reqwest::Client::builder()
            .timeout(self.timeout)
            .local_address(local)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {e}")))
    }

    /// Fetch the public address from one service
    async fn fetch(client: &reqwest::Client, url: &str) -> Result<PublicAddress> {
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::http(format!("Request to {url} failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::http(format!(
                "{url} answered HTTP {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::http(format!("Failed to read response from {url}: {e}")))?;

        parse_address_body(&body)
    }
}

/// Parse a discovery service answer
///
/// Services answer with the bare address, possibly followed by a newline.
/// Anything that is not an IPv4 literal is rejected.
pub fn parse_address_body(body: &str) -> Result<PublicAddress> {
    let text = body.trim();

    match text.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => Ok(PublicAddress::new(ip)),
        Ok(IpAddr::V6(ip)) => Err(Error::invalid_response(format!(
            "Expected IPv4, got: {ip}"
        ))),
        Err(_) => Err(Error::invalid_response(format!(
            "Invalid IP address: {text:?}"
        ))),
    }
}

/// Pick the first IPv4 address of `interface` from an interface table
pub fn interface_ipv4(table: &[(String, IpAddr)], interface: &str) -> Result<Ipv4Addr> {
    table
        .iter()
        .filter(|(name, _)| name == interface)
        .find_map(|(_, ip)| match ip {
            IpAddr::V4(v4) => Some(*v4),
            IpAddr::V6(_) => None,
        })
        .ok_or_else(|| Error::invalid_input(format!("Interface {interface} has no IPv4 address")))
}

#[async_trait]
impl AddressProbe for HttpAddressProbe {
    async fn local_address(&self, interface: &str) -> Result<Ipv4Addr> {
        let table = local_ip_address::list_afinet_netifas()
            .map_err(|e| Error::invalid_input(format!("Failed to list interfaces: {e}")))?;

        let ip = interface_ipv4(&table, interface)?;
        tracing::trace!("Interface {} has local address {}", interface, ip);
        Ok(ip)
    }

    async fn public_address(&self, bind: Option<Ipv4Addr>) -> Result<PublicAddress> {
        let client = self.client_for(bind)?;
        let mut last_error = None;

        for url in &self.urls {
            match Self::fetch(&client, url).await {
                Ok(addr) => return Ok(addr),
                Err(e) => {
                    tracing::debug!("Discovery via {} failed: {}", url, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::config("No discovery URLs configured")))
    }
}
