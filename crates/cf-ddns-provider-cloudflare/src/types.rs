//! Cloudflare API v4 wire types

use serde::{Deserialize, Serialize};

use cf_ddns_core::{DnsRecord, Error, PublicAddress, Result};

/// Envelope shared by every Cloudflare API response
#[derive(Debug, Deserialize)]
pub struct CloudflareResponse<T> {
    pub success: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub errors: Vec<CloudflareError>,
    pub result_info: Option<CloudflareResultInfo>,
}

impl<T> CloudflareResponse<T> {
    /// Turn `success: false` into a provider error carrying the first entry
    pub fn into_result(self) -> Result<Option<T>> {
        if self.success {
            return Ok(self.result);
        }

        let (code, message) = self
            .errors
            .into_iter()
            .next()
            .map(|e| (e.code, e.message))
            .unwrap_or_else(|| (0, "Unknown error".to_string()));
        Err(Error::provider(code, message))
    }
}

#[derive(Debug, Deserialize)]
pub struct CloudflareError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct CloudflareResultInfo {
    #[allow(dead_code)]
    pub page: u32,
    #[allow(dead_code)]
    pub per_page: u32,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub total_count: u32,
}

/// A DNS record as returned by the API
///
/// Only the fields the reconciler needs; everything else is ignored.
#[derive(Debug, Deserialize)]
pub struct CloudflareDnsRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub content: String,
    pub ttl: u32,
}

impl TryFrom<CloudflareDnsRecord> for DnsRecord {
    type Error = Error;

    fn try_from(record: CloudflareDnsRecord) -> Result<Self> {
        if record.record_type != "A" {
            return Err(Error::invalid_response(format!(
                "expected an A record, got {} for {}",
                record.record_type, record.name
            )));
        }

        let address: PublicAddress = record.content.parse().map_err(|_| {
            Error::invalid_response(format!(
                "record {} has non-IPv4 content {:?}",
                record.id, record.content
            ))
        })?;

        Ok(DnsRecord::new(record.id, record.name, address, record.ttl))
    }
}

/// Body of create and update requests
#[derive(Debug, Serialize)]
pub struct RecordPayload<'a> {
    #[serde(rename = "type")]
    pub record_type: &'static str,
    pub name: &'a str,
    pub content: String,
    pub ttl: u32,
}

impl<'a> RecordPayload<'a> {
    pub fn a_record(name: &'a str, address: PublicAddress, ttl: u32) -> Self {
        Self {
            record_type: "A",
            name,
            content: address.to_string(),
            ttl,
        }
    }
}

/// Result of a delete call
#[derive(Debug, Deserialize)]
pub struct DeletedRecord {
    #[allow(dead_code)]
    pub id: String,
}
