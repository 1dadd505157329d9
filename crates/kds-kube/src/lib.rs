//! Kubernetes node lister
//!
//! Implements [`NodeLister`] on top of the `kube` client. Nodes are listed
//! server-side with the label selector, page by page, and converted to the
//! cluster-agnostic [`NodeInfo`] model.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let client = kds_kube::connect(config.kubeconfig.as_deref()).await?;
//! let lister = Arc::new(kds_kube::KubeNodeLister::new(client));
//! ```

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node;
use kds_core::error::{Error, Result};
use kds_core::selector::LabelSelector;
use kds_core::traits::{NodeAddress, NodeCondition, NodeInfo, NodeLister};
use kube::api::ListParams;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use std::path::Path;
use tracing::{debug, info};

/// Nodes fetched per list call
pub const LIST_PAGE_SIZE: u32 = 500;

/// Build a cluster client
///
/// Uses the kubeconfig file at `kubeconfig` when given, otherwise the
/// in-cluster service account or the default kubeconfig discovery.
///
/// # Errors
///
/// Returns a configuration error when no usable cluster configuration is
/// found. Startup should treat this as fatal.
pub async fn connect(kubeconfig: Option<&Path>) -> Result<Client> {
    let config = match kubeconfig {
        Some(path) => {
            info!(path = %path.display(), "Using kubeconfig file");
            let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                Error::config(format!("Failed to read kubeconfig {}: {e}", path.display()))
            })?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|e| Error::config(format!("Invalid kubeconfig {}: {e}", path.display())))?
        }
        None => {
            debug!("Inferring cluster configuration");
            Config::infer()
                .await
                .map_err(|e| Error::config(format!("Failed to load cluster configuration: {e}")))?
        }
    };

    Client::try_from(config)
        .map_err(|e| Error::config(format!("Failed to create Kubernetes client: {e}")))
}

/// Lists cluster nodes through the Kubernetes API
#[derive(Clone)]
pub struct KubeNodeLister {
    api: Api<Node>,
}

impl KubeNodeLister {
    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }
}

#[async_trait]
impl NodeLister for KubeNodeLister {
    async fn list_nodes(&self, selector: &LabelSelector) -> Result<Vec<NodeInfo>> {
        let mut params = ListParams::default().limit(LIST_PAGE_SIZE);
        if !selector.is_empty() {
            params = params.labels(&selector.to_string());
        }

        let mut nodes = Vec::new();
        let mut page_count: u32 = 0;

        loop {
            page_count += 1;
            let page = self
                .api
                .list(&params)
                .await
                .map_err(|e| Error::node_source(e.to_string()))?;

            nodes.extend(page.items.iter().map(node_info));

            // An empty token also marks the last page.
            match page.metadata.continue_.filter(|token| !token.is_empty()) {
                Some(token) => params.continue_token = Some(token),
                None => break,
            }
        }

        debug!(
            selector = %selector,
            pages = page_count,
            nodes = nodes.len(),
            "Listed nodes"
        );
        Ok(nodes)
    }
}

/// Convert a Kubernetes `Node` to [`NodeInfo`]
pub fn node_info(node: &Node) -> NodeInfo {
    let status = node.status.as_ref();

    NodeInfo {
        name: node.metadata.name.clone().unwrap_or_default(),
        conditions: status
            .and_then(|s| s.conditions.as_ref())
            .map(|conditions| {
                conditions
                    .iter()
                    .map(|c| NodeCondition::new(c.type_.as_str(), c.status.as_str()))
                    .collect()
            })
            .unwrap_or_default(),
        addresses: status
            .and_then(|s| s.addresses.as_ref())
            .map(|addresses| {
                addresses
                    .iter()
                    .map(|a| NodeAddress::new(a.type_.as_str().into(), a.address.as_str()))
                    .collect()
            })
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{
        NodeAddress as KubeNodeAddress, NodeCondition as KubeNodeCondition, NodeStatus,
    };
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use kds_core::traits::NodeAddressType;

    fn kube_node(ready: &str, addresses: &[(&str, &str)]) -> Node {
        Node {
            metadata: ObjectMeta {
                name: Some("worker-1".to_string()),
                ..Default::default()
            },
            status: Some(NodeStatus {
                conditions: Some(vec![KubeNodeCondition {
                    type_: "Ready".to_string(),
                    status: ready.to_string(),
                    ..Default::default()
                }]),
                addresses: Some(
                    addresses
                        .iter()
                        .map(|(type_, address)| KubeNodeAddress {
                            type_: type_.to_string(),
                            address: address.to_string(),
                        })
                        .collect(),
                ),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn converts_ready_node() {
        let info = node_info(&kube_node(
            "True",
            &[("InternalIP", "10.0.0.4"), ("ExternalIP", "203.0.113.4")],
        ));

        assert_eq!(info.name, "worker-1");
        assert!(info.is_ready());
        assert_eq!(info.addresses.len(), 2);
        assert_eq!(info.addresses[0].address_type, NodeAddressType::InternalIp);
        assert_eq!(info.external_ips().collect::<Vec<_>>(), vec!["203.0.113.4"]);
    }

    #[test]
    fn converts_unready_node() {
        let info = node_info(&kube_node("Unknown", &[("ExternalIP", "203.0.113.4")]));
        assert!(!info.is_ready());
    }

    #[test]
    fn node_without_status_has_nothing() {
        let info = node_info(&Node::default());
        assert!(info.name.is_empty());
        assert!(!info.is_ready());
        assert!(info.addresses.is_empty());
    }

    #[test]
    fn unknown_address_types_are_kept() {
        let info = node_info(&kube_node("True", &[("Custom", "x")]));
        assert_eq!(
            info.addresses[0].address_type,
            NodeAddressType::Other("Custom".to_string())
        );
    }
}
