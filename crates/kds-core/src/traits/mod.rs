//! Core traits for the DNS sync system
//!
//! This module defines the abstract interfaces that all collaborators must follow.
//!
//! - [`NodeLister`]: List cluster nodes with their readiness and addresses
//! - [`DnsProvider`]: Read, create and delete DNS records via provider APIs

pub mod dns_provider;
pub mod node_lister;

pub use dns_provider::{DnsProvider, DnsProviderFactory};
pub use node_lister::{NodeAddress, NodeAddressType, NodeCondition, NodeInfo, NodeLister};
