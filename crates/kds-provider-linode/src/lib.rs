// # Linode DNS Provider
//
// Linode API v4 adapter for kube-dns-sync.
//
// ## Behaviour
//
// - ✅ Domain ID resolved from the zone name on every call (no caching)
// - ✅ Records listed with `page`/`pages` pagination
// - ✅ Relative names (empty for the apex) translated to and from absolute names
// - ✅ HTTP timeout configured (30 seconds)
// - ❌ NO retry logic (the polling interval is the retry)
//
// ## API Reference
//
// - List Domains: GET `/v4/domains?page=..`
// - List Records: GET `/v4/domains/:domain_id/records?page=..`
// - Create Record: POST `/v4/domains/:domain_id/records`
// - Update Record: PUT `/v4/domains/:domain_id/records/:record_id`
// - Delete Record: DELETE `/v4/domains/:domain_id/records/:record_id`

use async_trait::async_trait;
use kds_core::config::ProviderConfig;
use kds_core::record::{Record, names_match, normalize_name, qualify, relative_to};
use kds_core::traits::{DnsProvider, DnsProviderFactory};
use kds_core::{Error, ProviderRegistry, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Linode API base URL
pub const LINODE_API_BASE: &str = "https://api.linode.com";

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Items fetched per page (API maximum)
const PAGE_SIZE: u32 = 500;

const PROVIDER: &str = "linode";

/// Linode DNS provider
pub struct LinodeProvider {
    /// ⚠️ NEVER log this value
    api_token: String,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for LinodeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinodeProvider")
            .field("api_token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Linode paginated list response
#[derive(Debug, Deserialize)]
struct Page<T> {
    data: Vec<T>,
    page: u32,
    pages: u32,
}

#[derive(Debug, Deserialize)]
struct Domain {
    id: u64,
    domain: String,
}

#[derive(Debug, Deserialize)]
struct DomainRecord {
    id: u64,
    #[serde(rename = "type")]
    record_type: String,
    name: String,
    target: String,
    #[serde(default)]
    ttl_sec: u32,
}

#[derive(Debug, Serialize)]
struct DomainRecordBody<'a> {
    #[serde(rename = "type")]
    record_type: &'a str,
    name: String,
    target: &'a str,
    ttl_sec: u32,
}

impl DomainRecord {
    fn into_record(self, zone: &str) -> Record {
        Record {
            id: Some(self.id.to_string()),
            name: qualify(&self.name, zone),
            record_type: self.record_type,
            value: self.target,
            ttl: (self.ttl_sec > 0).then(|| Duration::from_secs(self.ttl_sec.into())),
        }
    }
}

/// Linode names the apex with an empty string
fn linode_name(name: &str, zone: &str) -> String {
    match relative_to(name, zone).as_str() {
        "@" => String::new(),
        relative => relative.to_string(),
    }
}

impl LinodeProvider {
    /// Create a new Linode provider
    pub fn new(api_token: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_token, LINODE_API_BASE)
    }

    /// Create a provider talking to `base_url` instead of the public API
    pub fn with_base_url(api_token: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.trim().is_empty() {
            return Err(Error::config("Linode API token cannot be empty"));
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

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| Error::http(format!("Linode request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(Error::from_status(PROVIDER, status.as_u16(), &error_reasons(&body)));
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

    async fn list_all<T: DeserializeOwned>(&self, url: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page: u32 = 1;

        loop {
            let request = self.client.get(url).query(&[
                ("page", page.to_string()),
                ("page_size", PAGE_SIZE.to_string()),
            ]);
            let response: Page<T> = self.send_json(request).await?;
            items.extend(response.data);

            if response.page >= response.pages {
                break;
            }
            page = response.page + 1;
        }

        Ok(items)
    }

    /// Resolve the domain ID for `zone`
    async fn domain_id(&self, zone: &str) -> Result<u64> {
        let zone = normalize_name(zone);
        let domains: Vec<Domain> = self
            .list_all(&format!("{}/v4/domains", self.base_url))
            .await?;

        let id = domains
            .into_iter()
            .find(|d| names_match(&d.domain, &zone))
            .map(|d| d.id)
            .ok_or_else(|| Error::not_found(format!("Domain not found: {zone}")))?;

        debug!(zone = %zone, domain_id = id, "Resolved Linode domain");
        Ok(id)
    }

    fn records_url(&self, domain_id: u64) -> String {
        format!("{}/v4/domains/{domain_id}/records", self.base_url)
    }
}

/// Pull the `reason` strings out of a Linode error body
fn error_reasons(body: &str) -> String {
    #[derive(Deserialize)]
    struct Reason {
        reason: String,
    }
    #[derive(Deserialize)]
    struct Errors {
        errors: Vec<Reason>,
    }

    match serde_json::from_str::<Errors>(body) {
        Ok(parsed) if !parsed.errors.is_empty() => parsed
            .errors
            .into_iter()
            .map(|e| e.reason)
            .collect::<Vec<_>>()
            .join("; "),
        _ => body.to_string(),
    }
}

#[async_trait]
impl DnsProvider for LinodeProvider {
    async fn get_records(&self, zone: &str) -> Result<Vec<Record>> {
        let domain_id = self.domain_id(zone).await?;
        let records: Vec<DomainRecord> = self.list_all(&self.records_url(domain_id)).await?;
        debug!(zone = %zone, count = records.len(), "Listed Linode records");
        Ok(records.into_iter().map(|r| r.into_record(zone)).collect())
    }

    async fn set_records(&self, zone: &str, records: &[Record]) -> Result<Vec<Record>> {
        let url = self.records_url(self.domain_id(zone).await?);
        let mut stored = Vec::with_capacity(records.len());

        for record in records {
            let body = DomainRecordBody {
                record_type: &record.record_type,
                name: linode_name(&record.name, zone),
                target: &record.value,
                // 0 selects the domain default
                ttl_sec: record
                    .ttl
                    .map(|ttl| u32::try_from(ttl.as_secs()).unwrap_or(u32::MAX))
                    .unwrap_or(0),
            };

            let request = match &record.id {
                Some(id) => self.client.put(format!("{url}/{id}")),
                None => self.client.post(&url),
            };

            let created: DomainRecord = self.send_json(request.json(&body)).await?;
            info!(hostname = %record.name, address = %record.value, "Linode record stored");
            stored.push(created.into_record(zone));
        }

        Ok(stored)
    }

    async fn delete_records(&self, zone: &str, records: &[Record]) -> Result<Vec<Record>> {
        let url = self.records_url(self.domain_id(zone).await?);
        let existing: Vec<DomainRecord> = if records.iter().any(|r| r.id.is_none()) {
            self.list_all(&url).await?
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
                        && e.target == record.value
                }) {
                    Some(found) => found.id.to_string(),
                    None => {
                        debug!(hostname = %record.name, address = %record.value, "Record already absent");
                        continue;
                    }
                },
            };

            self.send(self.client.delete(format!("{url}/{id}"))).await?;
            info!(hostname = %record.name, address = %record.value, "Linode record deleted");
            deleted.push(Record {
                id: Some(id),
                ..record.clone()
            });
        }

        Ok(deleted)
    }
}

/// Factory for creating Linode providers
pub struct LinodeFactory;

impl DnsProviderFactory for LinodeFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        match config {
            ProviderConfig::Linode { api_token } => {
                Ok(Box::new(LinodeProvider::new(api_token.clone())?))
            }
            _ => Err(Error::config("Invalid config for Linode provider")),
        }
    }
}

/// Register the Linode provider with a registry
pub fn register(registry: &ProviderRegistry) {
    registry.register_provider(PROVIDER, Box::new(LinodeFactory));
}
