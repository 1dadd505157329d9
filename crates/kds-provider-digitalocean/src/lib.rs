// # DigitalOcean DNS Provider
//
// DigitalOcean API v2 adapter for kube-dns-sync.
//
// ## Behaviour
//
// - ✅ Records listed with `links.pages.next` pagination
// - ✅ Relative names (`@` for the apex) translated to and from absolute names
// - ✅ One HTTP request per record write (POST create, PUT update, DELETE)
// - ✅ HTTP timeout configured (30 seconds)
// - ❌ NO retry logic (the polling interval is the retry)
//
// ## Trust Level: Untrusted (DNS Provider)
//
// Same limits as every provider: HTTP calls to its own API, no tasks, no
// retries, no decisions about what to change.
//
// ## API Reference
//
// - List Records: GET `/v2/domains/:zone/records?per_page=..`
// - Create Record: POST `/v2/domains/:zone/records`
// - Update Record: PUT `/v2/domains/:zone/records/:id`
// - Delete Record: DELETE `/v2/domains/:zone/records/:id`

use async_trait::async_trait;
use kds_core::config::ProviderConfig;
use kds_core::record::{Record, names_match, normalize_name, qualify, relative_to};
use kds_core::traits::{DnsProvider, DnsProviderFactory};
use kds_core::{Error, ProviderRegistry, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// DigitalOcean API base URL
pub const DIGITALOCEAN_API_BASE: &str = "https://api.digitalocean.com";

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Records fetched per page (API maximum)
const PAGE_SIZE: u32 = 200;

const PROVIDER: &str = "digitalocean";

/// DigitalOcean DNS provider
pub struct DigitalOceanProvider {
    /// ⚠️ NEVER log this value
    api_token: String,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for DigitalOceanProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigitalOceanProvider")
            .field("api_token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct RecordsPage {
    domain_records: Vec<DomainRecord>,
    #[serde(default)]
    links: Links,
}

#[derive(Debug, Default, Deserialize)]
struct Links {
    #[serde(default)]
    pages: Option<Pages>,
}

#[derive(Debug, Deserialize)]
struct Pages {
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecordResponse {
    domain_record: DomainRecord,
}

#[derive(Debug, Deserialize)]
struct DomainRecord {
    id: u64,
    #[serde(rename = "type")]
    record_type: String,
    name: String,
    data: String,
    #[serde(default)]
    ttl: Option<u32>,
}

#[derive(Debug, Serialize)]
struct DomainRecordBody<'a> {
    #[serde(rename = "type")]
    record_type: &'a str,
    name: String,
    data: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ttl: Option<u32>,
}

impl DomainRecord {
    fn into_record(self, zone: &str) -> Record {
        Record {
            id: Some(self.id.to_string()),
            name: qualify(&self.name, zone),
            record_type: self.record_type,
            value: self.data,
            ttl: self
                .ttl
                .filter(|ttl| *ttl > 0)
                .map(|ttl| Duration::from_secs(ttl.into())),
        }
    }
}

impl DigitalOceanProvider {
    /// Create a new DigitalOcean provider
    pub fn new(api_token: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_token, DIGITALOCEAN_API_BASE)
    }

    /// Create a provider talking to `base_url` instead of the public API
    pub fn with_base_url(api_token: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.trim().is_empty() {
            return Err(Error::config("DigitalOcean API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_token,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn records_url(&self, zone: &str) -> String {
        format!("{}/v2/domains/{}/records", self.base_url, normalize_name(zone))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| Error::http(format!("DigitalOcean request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(Error::from_status(PROVIDER, status.as_u16(), &body));
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        self.send(request)
            .await?
            .json()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("Failed to parse response: {e}")))
    }

    async fn list_records(&self, zone: &str) -> Result<Vec<DomainRecord>> {
        let mut records = Vec::new();
        let mut request = self
            .client
            .get(self.records_url(zone))
            .query(&[("per_page", PAGE_SIZE.to_string())]);

        loop {
            let page: RecordsPage = self.send_json(request).await?;
            records.extend(page.domain_records);

            match page.links.pages.and_then(|p| p.next) {
                Some(next) => request = self.client.get(next),
                None => break,
            }
        }

        Ok(records)
    }
}

#[async_trait]
impl DnsProvider for DigitalOceanProvider {
    async fn get_records(&self, zone: &str) -> Result<Vec<Record>> {
        let records = self.list_records(zone).await?;
        debug!(zone = %zone, count = records.len(), "Listed DigitalOcean records");
        Ok(records.into_iter().map(|r| r.into_record(zone)).collect())
    }

    async fn set_records(&self, zone: &str, records: &[Record]) -> Result<Vec<Record>> {
        let url = self.records_url(zone);
        let mut stored = Vec::with_capacity(records.len());

        for record in records {
            let body = DomainRecordBody {
                record_type: &record.record_type,
                name: relative_to(&record.name, zone),
                data: &record.value,
                ttl: record
                    .ttl
                    .map(|ttl| u32::try_from(ttl.as_secs()).unwrap_or(u32::MAX)),
            };

            let request = match &record.id {
                Some(id) => self.client.put(format!("{url}/{id}")),
                None => self.client.post(&url),
            };

            let response: RecordResponse = self.send_json(request.json(&body)).await?;
            info!(hostname = %record.name, address = %record.value, "DigitalOcean record stored");
            stored.push(response.domain_record.into_record(zone));
        }

        Ok(stored)
    }

    async fn delete_records(&self, zone: &str, records: &[Record]) -> Result<Vec<Record>> {
        let url = self.records_url(zone);
        let existing = if records.iter().any(|r| r.id.is_none()) {
            self.list_records(zone).await?
        } else {
            Vec::new()
        };

        let mut deleted = Vec::with_capacity(records.len());
        for record in records {
            let id = match &record.id {
                Some(id) => id.clone(),
                None => match existing.iter().find(|e| {
                    names_match(&qualify(&e.name, zone), &record.name)
                        && e.record_type.eq_ignore_ascii_case(&record.record_type)
                        && e.data == record.value
                }) {
                    Some(found) => found.id.to_string(),
                    None => {
                        debug!(hostname = %record.name, address = %record.value, "Record already absent");
                        continue;
                    }
                },
            };

            self.send(self.client.delete(format!("{url}/{id}"))).await?;
            info!(hostname = %record.name, address = %record.value, "DigitalOcean record deleted");
            deleted.push(Record {
                id: Some(id),
                ..record.clone()
            });
        }

        Ok(deleted)
    }
}

/// Factory for creating DigitalOcean providers
pub struct DigitalOceanFactory;

impl DnsProviderFactory for DigitalOceanFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        match config {
            ProviderConfig::DigitalOcean { api_token } => {
                Ok(Box::new(DigitalOceanProvider::new(api_token.clone())?))
            }
            _ => Err(Error::config("Invalid config for DigitalOcean provider")),
        }
    }
}

/// Register the DigitalOcean provider with a registry
pub fn register(registry: &ProviderRegistry) {
    registry.register_provider(PROVIDER, Box::new(DigitalOceanFactory));
}
