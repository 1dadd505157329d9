// # DNS Provider Trait
//
// Defines the interface for reading and writing DNS records via provider APIs.
//
// ## Implementations
//
// - Cloudflare: `kds-provider-cloudflare` crate
// - DigitalOcean: `kds-provider-digitalocean` crate
// - Linode: `kds-provider-linode` crate
//
// ## Usage
//
// ```rust,ignore
// use kds_core::{DnsProvider, Record};
//
// let records = provider.get_records("example.com").await?;
// provider
//     .set_records("example.com", &[Record::address("node.example.com", ip, None)])
//     .await?;
// ```

use crate::record::Record;
use async_trait::async_trait;

/// Trait for DNS provider implementations
///
/// The capability set is exactly get / set / delete over whole zones. The
/// reconciler decides *what* to change; a provider only carries it out.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Trust Level: Untrusted
///
/// DNS providers are **untrusted** components with strict limitations:
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to their endpoints only
/// - ✅ Parse provider-specific responses
/// - ✅ Translate between absolute names and the provider's naming
/// - ✅ Return success or failure (the next polling tick is the retry)
///
/// ## Forbidden Capabilities
/// - ❌ Spawn tasks or threads (violates shutdown determinism)
/// - ❌ Implement retry logic or backoff (owned by `SyncEngine`)
/// - ❌ Decide whether a change is needed (owned by `Reconciler`)
/// - ❌ Filter records by type in `get_records` (the reconciler must see
///   everything to prove it leaves non-address records alone)
/// - ❌ Cache zone contents between calls
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Fetch every record in `zone`, of every type and name
    ///
    /// Returned names must be absolute.
    async fn get_records(&self, zone: &str) -> Result<Vec<Record>, crate::Error>;

    /// Create (or update, when `id` is set) the given records in `zone`
    ///
    /// # Returns
    ///
    /// The records as stored by the provider, including assigned ids.
    async fn set_records(&self, zone: &str, records: &[Record])
    -> Result<Vec<Record>, crate::Error>;

    /// Delete the given records from `zone`
    ///
    /// Records without an `id` are matched on name, type and value.
    ///
    /// # Returns
    ///
    /// The records that were deleted.
    async fn delete_records(
        &self,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>, crate::Error>;
}

/// Helper trait for constructing DNS providers from configuration
pub trait DnsProviderFactory: Send + Sync {
    /// Create a DnsProvider instance from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: Configuration specific to this provider
    ///
    /// # Returns
    ///
    /// A boxed DnsProvider trait object
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Box<dyn DnsProvider>, crate::Error>;
}
