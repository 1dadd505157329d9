// # kds-core
//
// Core library for keeping DNS address records in step with the external IPs
// of ready Kubernetes nodes.
//
// ## Architecture Overview
//
// - **NodeLister**: Trait for listing cluster nodes (implemented in `kds-kube`)
// - **DnsProvider**: Trait for reading and writing provider records
// - **NodeAddressCollector**: Turns ready nodes into a desired address set
// - **Reconciler**: Diffs the desired set against provider state and applies it
// - **SyncEngine**: Polling loop that runs collector → reconciler per target
// - **ProviderRegistry**: Plugin-based registry for DNS providers
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from provider and cluster plumbing
// 2. **Polling**: The fixed interval is the only retry mechanism
// 3. **Plugin-Based**: Providers are registered dynamically, no hard-coded if-else
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Idempotency**: A second pass over unchanged state issues no writes

pub mod collector;
pub mod config;
pub mod duration;
pub mod engine;
pub mod error;
pub mod reconciler;
pub mod record;
pub mod registry;
pub mod selector;
pub mod shutdown;
pub mod traits;

// Re-export core types for convenience
pub use collector::NodeAddressCollector;
pub use config::{ConfigLayer, DnsTarget, LogFormat, ProviderConfig, SyncConfig};
pub use engine::{EngineEvent, EngineHandle, SyncEngine};
pub use error::{Error, Result};
pub use reconciler::{ChangePlan, ReconcileOutcome, Reconciler};
pub use record::{AddressRecord, Record, RecordParseError};
pub use registry::ProviderRegistry;
pub use selector::LabelSelector;
pub use shutdown::{Shutdown, ShutdownTrigger, shutdown_channel};
pub use traits::{DnsProvider, NodeLister};
