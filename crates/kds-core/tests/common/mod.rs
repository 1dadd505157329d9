//! Test doubles and common utilities for contract tests
//!
//! The doubles keep real state (an in-memory zone, a fixed node list) so
//! tests can assert on outcomes as well as on call counts.

use kds_core::config::{DnsTarget, ProviderConfig, SyncConfig};
use kds_core::error::{Error, Result};
use kds_core::record::Record;
use kds_core::selector::LabelSelector;
use kds_core::traits::{
    DnsProvider, NodeAddress, NodeAddressType, NodeCondition, NodeInfo, NodeLister,
};
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// An in-memory DNS provider that tracks calls
#[derive(Default)]
pub struct MockDnsProvider {
    records: Mutex<Vec<Record>>,
    next_id: AtomicUsize,
    get_call_count: AtomicUsize,
    set_call_count: AtomicUsize,
    delete_call_count: AtomicUsize,
    /// (zone, "get" | "set" | "delete") in call order
    operations: Mutex<Vec<(String, &'static str)>>,
    fail_get: AtomicBool,
    fail_set: AtomicBool,
    fail_delete: AtomicBool,
    /// Zones whose every call fails
    failing_zones: Mutex<HashSet<String>>,
    /// Zones whose delete calls fail
    failing_delete_zones: Mutex<HashSet<String>>,
    get_delay: Mutex<Option<Duration>>,
}

impl MockDnsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `records` already in the zone
    pub fn with_records(records: Vec<Record>) -> Self {
        let provider = Self::new();
        for record in records {
            provider.insert(record);
        }
        provider
    }

    fn insert(&self, mut record: Record) -> Record {
        if record.id.is_none() {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            record.id = Some(format!("rec-{id}"));
        }
        self.records.lock().unwrap().push(record.clone());
        record
    }

    pub fn fail_get(&self, fail: bool) {
        self.fail_get.store(fail, Ordering::SeqCst);
    }

    pub fn fail_set(&self, fail: bool) {
        self.fail_set.store(fail, Ordering::SeqCst);
    }

    pub fn fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    pub fn fail_zone(&self, zone: &str) {
        self.failing_zones.lock().unwrap().insert(zone.to_string());
    }

    pub fn fail_delete_in(&self, zone: &str) {
        self.failing_delete_zones
            .lock()
            .unwrap()
            .insert(zone.to_string());
    }

    pub fn delay_get(&self, delay: Duration) {
        *self.get_delay.lock().unwrap() = Some(delay);
    }

    pub fn get_call_count(&self) -> usize {
        self.get_call_count.load(Ordering::SeqCst)
    }

    pub fn set_call_count(&self) -> usize {
        self.set_call_count.load(Ordering::SeqCst)
    }

    pub fn delete_call_count(&self) -> usize {
        self.delete_call_count.load(Ordering::SeqCst)
    }

    /// Number of write calls of either kind
    pub fn write_count(&self) -> usize {
        self.set_call_count() + self.delete_call_count()
    }

    pub fn operations(&self) -> Vec<&'static str> {
        self.operations.lock().unwrap().iter().map(|(_, op)| *op).collect()
    }

    /// Operations issued against `zone`, in call order
    pub fn operations_in(&self, zone: &str) -> Vec<&'static str> {
        self.operations
            .lock()
            .unwrap()
            .iter()
            .filter(|(z, _)| z == zone)
            .map(|(_, op)| *op)
            .collect()
    }

    fn log(&self, zone: &str, op: &'static str) {
        self.operations.lock().unwrap().push((zone.to_string(), op));
    }

    pub fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }

    /// Sorted address values stored on `name`
    pub fn addresses_of(&self, name: &str) -> Vec<IpAddr> {
        let mut ips: Vec<IpAddr> = self
            .records()
            .iter()
            .filter(|r| r.name == name && (r.record_type == "A" || r.record_type == "AAAA"))
            .filter_map(|r| r.value.parse().ok())
            .collect();
        ips.sort();
        ips
    }

    fn check_zone(&self, zone: &str) -> Result<()> {
        if self.failing_zones.lock().unwrap().contains(zone) {
            return Err(Error::dns_provider(format!("zone {zone} unreachable")));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn get_records(&self, zone: &str) -> Result<Vec<Record>> {
        self.get_call_count.fetch_add(1, Ordering::SeqCst);
        self.log(zone, "get");

        let delay = *self.get_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.check_zone(zone)?;
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(Error::http("get failed"));
        }
        Ok(self.records())
    }

    async fn set_records(&self, zone: &str, records: &[Record]) -> Result<Vec<Record>> {
        self.set_call_count.fetch_add(1, Ordering::SeqCst);
        self.log(zone, "set");

        self.check_zone(zone)?;
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(Error::http("set failed"));
        }
        Ok(records.iter().cloned().map(|r| self.insert(r)).collect())
    }

    async fn delete_records(&self, zone: &str, records: &[Record]) -> Result<Vec<Record>> {
        self.delete_call_count.fetch_add(1, Ordering::SeqCst);
        self.log(zone, "delete");

        self.check_zone(zone)?;
        if self.fail_delete.load(Ordering::SeqCst)
            || self.failing_delete_zones.lock().unwrap().contains(zone)
        {
            return Err(Error::http("delete failed"));
        }

        let mut stored = self.records.lock().unwrap();
        let mut deleted = Vec::new();
        stored.retain(|existing| {
            let hit = records.iter().any(|r| match (&r.id, &existing.id) {
                (Some(a), Some(b)) => a == b,
                _ => {
                    r.name == existing.name
                        && r.record_type == existing.record_type
                        && r.value == existing.value
                }
            });
            if hit {
                deleted.push(existing.clone());
            }
            !hit
        });
        Ok(deleted)
    }
}

/// A node lister returning a fixed node list
#[derive(Default)]
pub struct StaticNodeLister {
    nodes: Mutex<Vec<NodeInfo>>,
    list_call_count: AtomicUsize,
    selectors: Mutex<Vec<LabelSelector>>,
    fail: AtomicBool,
}

impl StaticNodeLister {
    pub fn new(nodes: Vec<NodeInfo>) -> Self {
        Self {
            nodes: Mutex::new(nodes),
            ..Default::default()
        }
    }

    pub fn set_nodes(&self, nodes: Vec<NodeInfo>) {
        *self.nodes.lock().unwrap() = nodes;
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn list_call_count(&self) -> usize {
        self.list_call_count.load(Ordering::SeqCst)
    }

    /// Selectors passed to `list_nodes`, in call order
    pub fn selectors(&self) -> Vec<LabelSelector> {
        self.selectors.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl NodeLister for StaticNodeLister {
    async fn list_nodes(&self, selector: &LabelSelector) -> Result<Vec<NodeInfo>> {
        self.list_call_count.fetch_add(1, Ordering::SeqCst);
        self.selectors.lock().unwrap().push(selector.clone());

        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::node_source("api server unavailable"));
        }
        Ok(self.nodes.lock().unwrap().clone())
    }
}

/// A ready node with the given external IPs
pub fn ready_node(name: &str, external_ips: &[&str]) -> NodeInfo {
    node(name, "True", external_ips)
}

/// A node whose Ready condition is not "True"
pub fn unready_node(name: &str, external_ips: &[&str]) -> NodeInfo {
    node(name, "False", external_ips)
}

fn node(name: &str, ready: &str, external_ips: &[&str]) -> NodeInfo {
    let mut addresses = vec![NodeAddress::new(NodeAddressType::InternalIp, "10.244.0.1")];
    addresses.extend(
        external_ips
            .iter()
            .map(|ip| NodeAddress::new(NodeAddressType::ExternalIp, *ip)),
    );
    NodeInfo {
        name: name.to_string(),
        conditions: vec![
            NodeCondition::new("MemoryPressure", "False"),
            NodeCondition::new("Ready", ready),
        ],
        addresses,
    }
}

pub fn record(name: &str, record_type: &str, value: &str) -> Record {
    Record {
        id: None,
        name: name.to_string(),
        record_type: record_type.to_string(),
        value: value.to_string(),
        ttl: None,
    }
}

pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

pub fn ips(list: &[&str]) -> Vec<IpAddr> {
    let mut out: Vec<IpAddr> = list.iter().map(|s| ip(s)).collect();
    out.sort();
    out
}

/// A valid configuration for `targets` with a short interval
pub fn config_for(targets: Vec<DnsTarget>) -> SyncConfig {
    let mut config = SyncConfig::new(
        ProviderConfig::Cloudflare {
            api_token: "test-token".to_string(),
        },
        targets,
    );
    config.interval = Duration::from_millis(50);
    config
}
