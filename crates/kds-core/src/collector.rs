//! Node address collection
//!
//! Lists the nodes matching a selector, keeps only the ready ones and
//! extracts their external IPs. Duplicates across nodes are preserved; the
//! reconciler deals with them.

use crate::error::Result;
use crate::selector::LabelSelector;
use crate::traits::NodeLister;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Collects the external addresses of ready nodes
#[derive(Clone)]
pub struct NodeAddressCollector {
    lister: Arc<dyn NodeLister>,
}

impl NodeAddressCollector {
    pub fn new(lister: Arc<dyn NodeLister>) -> Self {
        Self { lister }
    }

    /// Collect the external IPs of every ready node matching `selector`
    ///
    /// # Errors
    ///
    /// Only a failed node listing fails the call. Unparsable addresses are
    /// logged and skipped.
    pub async fn collect(&self, selector: &LabelSelector) -> Result<Vec<IpAddr>> {
        let nodes = self
            .lister
            .list_nodes(selector)
            .await
            .map_err(|e| e.context("failed to list nodes"))?;

        let mut addresses = Vec::new();
        for node in &nodes {
            if !node.is_ready() {
                debug!(node = %node.name, "Skipping node that is not ready");
                continue;
            }

            for raw in node.external_ips() {
                match raw.trim().parse::<IpAddr>() {
                    Ok(ip) => {
                        info!(node = %node.name, address = %ip, "Found external IP");
                        addresses.push(ip);
                    }
                    Err(e) => {
                        warn!(node = %node.name, address = raw, error = %e, "Skipping unparsable external IP");
                    }
                }
            }
        }

        debug!(
            selector = %selector,
            nodes = nodes.len(),
            addresses = addresses.len(),
            "Collected node addresses"
        );
        Ok(addresses)
    }
}
