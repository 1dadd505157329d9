//! DNS reconciliation
//!
//! Converges the address records of one hostname onto a desired IP set:
//!
//! 1. Fetch every record in the zone once.
//! 2. Delete pass: address records on the hostname whose IP is not desired.
//! 3. Create pass: desired IPs with no matching record on the hostname.
//!
//! Both passes work from the single snapshot taken in step 1. Deletes are
//! always issued before creates; a failed delete batch aborts the pass so
//! nothing is created on top of stale state.
//!
//! Records of other types, or on other names, never enter either batch.

use crate::config::DnsTarget;
use crate::error::Result;
use crate::record::{Record, names_match};
use crate::traits::DnsProvider;
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The writes needed to converge one hostname
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangePlan {
    /// Stale address records to remove
    pub to_delete: Vec<Record>,
    /// Missing address records to add
    pub to_create: Vec<Record>,
}

impl ChangePlan {
    /// Whether the hostname is already converged
    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty() && self.to_create.is_empty()
    }
}

/// Result of a reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub deleted: usize,
    pub created: usize,
    /// True when the plan was only logged
    pub dry_run: bool,
}

/// Compute the delete and create sets for `target`
///
/// `desired` may contain duplicates; each address is created at most once.
pub fn plan_changes(target: &DnsTarget, desired: &[IpAddr], existing: &[Record]) -> ChangePlan {
    let hostname = target.fqdn();
    let mut plan = ChangePlan::default();
    let mut present: HashSet<IpAddr> = HashSet::new();

    for record in existing {
        let address = match record.parse_address() {
            Ok(address) => address,
            Err(e) if e.is_not_address() => continue,
            Err(e) => {
                warn!(record = %record.name, error = %e, "Skipping unparsable address record");
                continue;
            }
        };

        if !names_match(&address.name, &hostname) {
            continue;
        }

        if desired.contains(&address.ip) {
            present.insert(address.ip);
        } else {
            plan.to_delete.push(record.clone());
        }
    }

    let mut planned: HashSet<IpAddr> = HashSet::new();
    for ip in desired {
        if present.contains(ip) || !planned.insert(*ip) {
            continue;
        }
        plan.to_create
            .push(Record::address(hostname.clone(), *ip, target.record_ttl()));
    }

    plan
}

/// Applies change plans through a [`DnsProvider`]
#[derive(Clone)]
pub struct Reconciler {
    provider: Arc<dyn DnsProvider>,
    dry_run: bool,
}

impl Reconciler {
    pub fn new(provider: Arc<dyn DnsProvider>) -> Self {
        Self {
            provider,
            dry_run: false,
        }
    }

    /// Only log planned changes, never write to the provider
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Converge `target.hostname` onto `desired`
    ///
    /// # Errors
    ///
    /// Fetch, delete and create failures are returned wrapped. A delete
    /// failure means no create call is made.
    pub async fn reconcile(&self, target: &DnsTarget, desired: &[IpAddr]) -> Result<ReconcileOutcome> {
        let existing = self
            .provider
            .get_records(&target.zone)
            .await
            .map_err(|e| e.context("failed to get records"))?;

        debug!(
            zone = %target.zone,
            records = existing.len(),
            "Fetched existing records"
        );

        let plan = plan_changes(target, desired, &existing);
        let mut outcome = ReconcileOutcome {
            dry_run: self.dry_run,
            ..Default::default()
        };

        if self.dry_run {
            for record in &plan.to_delete {
                info!(hostname = %record.name, address = %record.value, "[DRY-RUN] Would delete record");
            }
            for record in &plan.to_create {
                info!(hostname = %record.name, address = %record.value, "[DRY-RUN] Would create record");
            }
            outcome.deleted = plan.to_delete.len();
            outcome.created = plan.to_create.len();
            return Ok(outcome);
        }

        info!(hostname = %target.hostname, count = plan.to_delete.len(), "Deleting stale records");
        if !plan.to_delete.is_empty() {
            self.provider
                .delete_records(&target.zone, &plan.to_delete)
                .await
                .map_err(|e| e.context("failed to delete records"))?;
            outcome.deleted = plan.to_delete.len();
        }

        info!(hostname = %target.hostname, count = plan.to_create.len(), "Creating new records");
        if !plan.to_create.is_empty() {
            self.provider
                .set_records(&target.zone, &plan.to_create)
                .await
                .map_err(|e| e.context("failed to create records"))?;
            outcome.created = plan.to_create.len();
        }

        info!(
            hostname = %target.hostname,
            deleted = outcome.deleted,
            created = outcome.created,
            "Reconciliation complete"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn target() -> DnsTarget {
        DnsTarget::new("h.example.com", "example.com")
    }

    fn a(name: &str, value: &str) -> Record {
        Record {
            id: None,
            name: name.to_string(),
            record_type: "A".to_string(),
            value: value.to_string(),
            ttl: None,
        }
    }

    fn ips(list: &[&str]) -> Vec<IpAddr> {
        list.iter().map(|s| s.parse().unwrap()).collect()
    }

    fn values(records: &[Record]) -> Vec<&str> {
        records.iter().map(|r| r.value.as_str()).collect()
    }

    #[test]
    fn convergence_plan() {
        let existing = vec![a("h.example.com", "10.0.0.1"), a("h.example.com", "10.0.0.2")];
        let plan = plan_changes(&target(), &ips(&["10.0.0.2", "10.0.0.3"]), &existing);

        assert_eq!(values(&plan.to_delete), vec!["10.0.0.1"]);
        assert_eq!(values(&plan.to_create), vec!["10.0.0.3"]);
    }

    #[test]
    fn other_names_and_types_are_ignored() {
        let mut txt = a("h.example.com", "v=spf1 -all");
        txt.record_type = "TXT".to_string();
        let existing = vec![txt, a("other.example.com", "10.0.0.9")];

        let plan = plan_changes(&target(), &[], &existing);
        assert!(plan.is_empty());
    }

    #[test]
    fn duplicate_desired_addresses_create_once() {
        let plan = plan_changes(&target(), &ips(&["10.0.0.1", "10.0.0.1"]), &[]);
        assert_eq!(values(&plan.to_create), vec!["10.0.0.1"]);
    }

    #[test]
    fn created_records_carry_target_ttl() {
        let target = target().with_ttl(Duration::from_secs(120));
        let plan = plan_changes(&target, &ips(&["2001:db8::1"]), &[]);

        assert_eq!(plan.to_create[0].record_type, "AAAA");
        assert_eq!(plan.to_create[0].name, "h.example.com");
        assert_eq!(plan.to_create[0].ttl, Some(Duration::from_secs(120)));
    }

    #[test]
    fn malformed_address_record_is_skipped() {
        let existing = vec![a("h.example.com", "garbage"), a("h.example.com", "10.0.0.5")];
        let plan = plan_changes(&target(), &ips(&["10.0.0.1"]), &existing);

        assert_eq!(values(&plan.to_delete), vec!["10.0.0.5"]);
        assert_eq!(values(&plan.to_create), vec!["10.0.0.1"]);
    }

    #[test]
    fn relative_hostname_is_qualified() {
        let target = DnsTarget::new("h", "example.com");
        let existing = vec![a("h.example.com", "10.0.0.1")];
        let plan = plan_changes(&target, &ips(&["10.0.0.1"]), &existing);
        assert!(plan.is_empty());
    }
}
