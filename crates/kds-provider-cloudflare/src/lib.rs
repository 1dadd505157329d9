// # Cloudflare DNS Provider
//
// This crate provides a Cloudflare DNS provider implementation for kube-dns-sync.
//
// ## Behaviour
//
// - ✅ Zone ID resolved from the zone name on every call (no caching)
// - ✅ Paginated record listing, every type returned to the reconciler
// - ✅ One HTTP request per record write (POST create, PUT update, DELETE)
// - ✅ HTTP timeout configured (30 seconds)
// - ✅ Status codes mapped to specific errors (401/403, 404, 409, 429, 5xx)
// - ❌ NO retry logic (the polling interval is the retry)
// - ❌ NO background tasks
//
// ## Trust Level: Untrusted (DNS Provider)
//
// **Allowed Capabilities**:
// - ✅ Perform HTTP/HTTPS API calls to the Cloudflare API only
// - ✅ Parse provider-specific responses
//
// **Forbidden Capabilities**:
// - ❌ Spawn tasks or threads
// - ❌ Implement retry logic (owned by SyncEngine)
// - ❌ Decide what to change (owned by Reconciler)
//
// ## Security Requirements
//
// - API token NEVER appears in logs or error messages
// - Provider MUST fail fast if token is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?page=..&per_page=..`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`
// - Delete DNS Record: DELETE `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use kds_core::config::ProviderConfig;
use kds_core::record::{Record, names_match, normalize_name};
use kds_core::traits::{DnsProvider, DnsProviderFactory};
use kds_core::{Error, ProviderRegistry, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Records fetched per page
const PAGE_SIZE: u32 = 100;

/// TTL value Cloudflare treats as "automatic"
const AUTO_TTL: u32 = 1;

const PROVIDER: &str = "cloudflare";

/// Cloudflare DNS provider
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API token.
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// API root, overridable for tests
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Cloudflare response envelope
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
    #[serde(default)]
    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResultInfo {
    page: u32,
    total_pages: u32,
}

#[derive(Debug, Deserialize)]
struct Zone {
    id: String,
}

#[derive(Debug, Deserialize)]
struct DnsRecord {
    id: String,
    #[serde(rename = "type")]
    record_type: String,
    name: String,
    content: String,
    ttl: u32,
}

#[derive(Debug, Serialize)]
struct DnsRecordBody<'a> {
    #[serde(rename = "type")]
    record_type: &'a str,
    name: &'a str,
    content: &'a str,
    ttl: u32,
}

impl From<DnsRecord> for Record {
    fn from(record: DnsRecord) -> Self {
        Record {
            id: Some(record.id),
            name: normalize_name(&record.name),
            record_type: record.record_type,
            value: record.content,
            ttl: (record.ttl != AUTO_TTL).then(|| Duration::from_secs(record.ttl.into())),
        }
    }
}

fn ttl_secs(ttl: Option<Duration>) -> u32 {
    match ttl {
        Some(ttl) => u32::try_from(ttl.as_secs()).unwrap_or(u32::MAX).max(AUTO_TTL),
        None => AUTO_TTL,
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the token is empty.
    pub fn new(api_token: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_token, CLOUDFLARE_API_BASE)
    }

    /// Create a provider talking to `base_url` instead of the public API
    pub fn with_base_url(api_token: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.trim().is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
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

    /// Send a request and unwrap the Cloudflare envelope
    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<Envelope<T>> {
        let response = request
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| Error::http(format!("Cloudflare request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(Error::from_status(PROVIDER, status.as_u16(), &body));
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("Failed to parse response: {e}")))?;

        if !envelope.success {
            let messages: Vec<String> = envelope
                .errors
                .iter()
                .map(|e| format!("{} ({})", e.message, e.code))
                .collect();
            return Err(Error::provider(PROVIDER, messages.join("; ")));
        }

        Ok(envelope)
    }

    /// Resolve the zone ID for `zone`
    ///
    /// ```http
    /// GET /zones?name=example.com
    /// ```
    async fn zone_id(&self, zone: &str) -> Result<String> {
        let zone = normalize_name(zone);
        let request = self
            .client
            .get(format!("{}/zones", self.base_url))
            .query(&[("name", zone.as_str())]);

        let envelope: Envelope<Vec<Zone>> = self.send(request).await?;
        let id = envelope
            .result
            .unwrap_or_default()
            .into_iter()
            .next()
            .map(|z| z.id)
            .ok_or_else(|| Error::not_found(format!("Zone not found: {zone}")))?;

        debug!(zone = %zone, zone_id = %id, "Resolved Cloudflare zone");
        Ok(id)
    }

    async fn list_records(&self, zone_id: &str) -> Result<Vec<DnsRecord>> {
        let url = format!("{}/zones/{zone_id}/dns_records", self.base_url);
        let mut records = Vec::new();
        let mut page: u32 = 1;

        loop {
            let request = self.client.get(&url).query(&[
                ("page", page.to_string()),
                ("per_page", PAGE_SIZE.to_string()),
            ]);
            let envelope: Envelope<Vec<DnsRecord>> = self.send(request).await?;
            records.extend(envelope.result.unwrap_or_default());

            match envelope.result_info {
                Some(info) if info.page < info.total_pages => page = info.page + 1,
                _ => break,
            }
        }

        Ok(records)
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    async fn get_records(&self, zone: &str) -> Result<Vec<Record>> {
        let zone_id = self.zone_id(zone).await?;
        let records = self.list_records(&zone_id).await?;
        debug!(zone = %zone, count = records.len(), "Listed Cloudflare records");
        Ok(records.into_iter().map(Record::from).collect())
    }

    /// POST each record without an id, PUT each record with one
    async fn set_records(&self, zone: &str, records: &[Record]) -> Result<Vec<Record>> {
        let zone_id = self.zone_id(zone).await?;
        let mut stored = Vec::with_capacity(records.len());

        for record in records {
            let body = DnsRecordBody {
                record_type: &record.record_type,
                name: &record.name,
                content: &record.value,
                ttl: ttl_secs(record.ttl),
            };

            let request = match &record.id {
                Some(id) => self
                    .client
                    .put(format!("{}/zones/{zone_id}/dns_records/{id}", self.base_url)),
                None => self
                    .client
                    .post(format!("{}/zones/{zone_id}/dns_records", self.base_url)),
            };

            let envelope: Envelope<DnsRecord> = self.send(request.json(&body)).await?;
            let created = envelope
                .result
                .ok_or_else(|| Error::provider(PROVIDER, "Response is missing the stored record"))?;

            info!(hostname = %record.name, address = %record.value, "Cloudflare record stored");
            stored.push(Record::from(created));
        }

        Ok(stored)
    }

    /// DELETE each record by id
    ///
    /// Records without an id are looked up by name, type and content first;
    /// records that no longer exist are skipped.
    async fn delete_records(&self, zone: &str, records: &[Record]) -> Result<Vec<Record>> {
        let zone_id = self.zone_id(zone).await?;

        let existing = if records.iter().any(|r| r.id.is_none()) {
            self.list_records(&zone_id).await?
        } else {
            Vec::new()
        };

        let mut deleted = Vec::with_capacity(records.len());
        for record in records {
            let id = match &record.id {
                Some(id) => id.clone(),
                None => match existing.iter().find(|e| {
                    names_match(&e.name, &record.name)
                        && e.record_type.eq_ignore_ascii_case(&record.record_type)
                        && e.content == record.value
                }) {
                    Some(found) => found.id.clone(),
                    None => {
                        debug!(hostname = %record.name, address = %record.value, "Record already absent");
                        continue;
                    }
                },
            };

            let request = self
                .client
                .delete(format!("{}/zones/{zone_id}/dns_records/{id}", self.base_url));
            let _: Envelope<serde_json::Value> = self.send(request).await?;

            info!(hostname = %record.name, address = %record.value, "Cloudflare record deleted");
            deleted.push(Record {
                id: Some(id),
                ..record.clone()
            });
        }

        Ok(deleted)
    }
}

/// Factory for creating Cloudflare providers
pub struct CloudflareFactory;

impl DnsProviderFactory for CloudflareFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        match config {
            ProviderConfig::Cloudflare { api_token } => {
                Ok(Box::new(CloudflareProvider::new(api_token.clone())?))
            }
            _ => Err(Error::config("Invalid config for Cloudflare provider")),
        }
    }
}

/// Register the Cloudflare provider with a registry
///
/// # Example
///
/// ```rust
/// use kds_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// kds_provider_cloudflare::register(&registry);
/// assert!(registry.has_provider("cloudflare"));
/// ```
pub fn register(registry: &ProviderRegistry) {
    registry.register_provider(PROVIDER, Box::new(CloudflareFactory));
}
