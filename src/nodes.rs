//! Node list builder.
//!
//! Turns an endpoint snapshot into the comma separated
//! `address:peer_port:api_port` list that Typesense reads from its nodes
//! file. Everything here is pure; the reconciler decides when to call it.

use std::fmt;

use crate::types::{EndpointResource, NodeRecord};

/// Which endpoints resource to read and how to render its addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub service: String,
    pub peer_port: u16,
    pub api_port: u16,
}

/// Records in the order they were found in the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeList(Vec<NodeRecord>);

impl NodeList {
    pub fn from_snapshot(snapshot: &[EndpointResource], target: &Target) -> Self {
        Self(collect(snapshot, target))
    }

    /// Orders records by address, then ports, so that identical membership
    /// always renders identically.
    pub fn sorted(mut self) -> Self {
        self.0.sort();
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NodeList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, record) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", record)?;
        }
        Ok(())
    }
}

/// Emits one record per (address, port) pair whose port equals the API
/// port, for every subset of every resource named `target.service`.
pub fn collect(snapshot: &[EndpointResource], target: &Target) -> Vec<NodeRecord> {
    let mut records = Vec::new();
    for resource in snapshot.iter().filter(|r| r.name == target.service) {
        for subset in &resource.subsets {
            for address in &subset.addresses {
                // Other ports (e.g. the metrics exporter sidecar on 9000) are skipped.
                for port in subset.ports.iter().filter(|p| p.port == target.api_port) {
                    records.push(NodeRecord {
                        address: address.clone(),
                        peer_port: target.peer_port,
                        api_port: port.port,
                    });
                }
            }
        }
    }
    records
}

/// Renders the peer list in snapshot order; empty when nothing matches.
#[cfg(test)]
pub fn build(snapshot: &[EndpointResource], target: &Target) -> String {
    NodeList::from_snapshot(snapshot, target).to_string()
}
