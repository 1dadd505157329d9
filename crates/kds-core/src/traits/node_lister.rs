// # Node Lister Trait
//
// Defines the interface for listing cluster nodes.
//
// ## Implementations
//
// - Kubernetes API: `kds-kube` crate
//
// ## Usage
//
// ```rust,ignore
// use kds_core::{LabelSelector, NodeLister};
//
// let selector: LabelSelector = "node-role.kubernetes.io/edge=true".parse()?;
// for node in lister.list_nodes(&selector).await? {
//     println!("{} ready={}", node.name, node.is_ready());
// }
// ```

use crate::selector::LabelSelector;
use async_trait::async_trait;
use std::fmt;

/// Condition type reported by ready nodes
pub const CONDITION_READY: &str = "Ready";

/// Condition status meaning "true"
pub const STATUS_TRUE: &str = "True";

/// A cluster node as seen by the collector
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeInfo {
    /// Node name
    pub name: String,
    /// Status conditions
    pub conditions: Vec<NodeCondition>,
    /// Reported addresses, in the order the cluster lists them
    pub addresses: Vec<NodeAddress>,
}

impl NodeInfo {
    /// A node is ready iff it reports a `Ready` condition with status `True`
    pub fn is_ready(&self) -> bool {
        self.conditions
            .iter()
            .any(|c| c.condition_type == CONDITION_READY && c.status == STATUS_TRUE)
    }

    /// Raw values of every address tagged as external IP
    pub fn external_ips(&self) -> impl Iterator<Item = &str> {
        self.addresses
            .iter()
            .filter(|a| a.address_type == NodeAddressType::ExternalIp)
            .map(|a| a.address.as_str())
    }
}

/// A node status condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeCondition {
    /// Condition type, e.g. "Ready" or "MemoryPressure"
    pub condition_type: String,
    /// "True", "False" or "Unknown"
    pub status: String,
}

impl NodeCondition {
    pub fn new(condition_type: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            condition_type: condition_type.into(),
            status: status.into(),
        }
    }
}

/// A node address as reported in node status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeAddress {
    pub address_type: NodeAddressType,
    /// Unparsed address value
    pub address: String,
}

impl NodeAddress {
    pub fn new(address_type: NodeAddressType, address: impl Into<String>) -> Self {
        Self {
            address_type,
            address: address.into(),
        }
    }
}

/// Node address type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeAddressType {
    ExternalIp,
    InternalIp,
    Hostname,
    ExternalDns,
    InternalDns,
    Other(String),
}

impl From<&str> for NodeAddressType {
    fn from(value: &str) -> Self {
        match value {
            "ExternalIP" => Self::ExternalIp,
            "InternalIP" => Self::InternalIp,
            "Hostname" => Self::Hostname,
            "ExternalDNS" => Self::ExternalDns,
            "InternalDNS" => Self::InternalDns,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for NodeAddressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExternalIp => f.write_str("ExternalIP"),
            Self::InternalIp => f.write_str("InternalIP"),
            Self::Hostname => f.write_str("Hostname"),
            Self::ExternalDns => f.write_str("ExternalDNS"),
            Self::InternalDns => f.write_str("InternalDNS"),
            Self::Other(other) => f.write_str(other),
        }
    }
}

/// Trait for node lister implementations
///
/// # Trust Level: Semi-Trusted
///
/// Node listers perform cluster API I/O but make no decisions:
///
/// ## Allowed Capabilities
/// - ✅ Call the cluster API (including paging through large lists)
/// - ✅ Convert cluster objects into [`NodeInfo`]
///
/// ## Forbidden Capabilities
/// - ❌ Filter by readiness or address type (owned by the collector)
/// - ❌ Watch or cache nodes between calls (the engine polls)
/// - ❌ Spawn background tasks
#[async_trait]
pub trait NodeLister: Send + Sync {
    /// List every node matching `selector`
    ///
    /// An empty selector lists all nodes.
    async fn list_nodes(&self, selector: &LabelSelector) -> Result<Vec<NodeInfo>, crate::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readiness_requires_true_ready_condition() {
        let mut node = NodeInfo {
            name: "n1".to_string(),
            ..Default::default()
        };
        assert!(!node.is_ready());

        node.conditions.push(NodeCondition::new("MemoryPressure", "True"));
        node.conditions.push(NodeCondition::new("Ready", "Unknown"));
        assert!(!node.is_ready());

        node.conditions.push(NodeCondition::new("Ready", "True"));
        assert!(node.is_ready());
    }

    #[test]
    fn address_type_round_trips_known_names() {
        for name in ["ExternalIP", "InternalIP", "Hostname", "ExternalDNS", "InternalDNS", "Custom"] {
            assert_eq!(NodeAddressType::from(name).to_string(), name);
        }
    }
}
