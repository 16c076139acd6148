//! Data structures shared by the membership client, the node list builder
//! and the reconciliation loop.
//!
//! The snapshot types are a trimmed view of the Kubernetes `Endpoints`
//! resource: only the fields that decide which peers get written are
//! kept, so the builder can be exercised with hand-built snapshots.

use std::fmt;

use k8s_openapi::api::core::v1::{EndpointPort, EndpointSubset, Endpoints};

/// Every endpoint resource in the watched namespace, in the order the API
/// server returned them.
pub type EndpointSnapshot = Vec<EndpointResource>;

/// One `Endpoints` object: the addresses currently backing a service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointResource {
    pub name: String,
    pub subsets: Vec<Subset>,
}

/// A group of ready addresses reachable on a shared set of ports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subset {
    pub addresses: Vec<String>,
    pub ports: Vec<SubsetPort>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsetPort {
    pub name: Option<String>,
    pub port: u16,
}

/// A single peer entry, rendered as `address:peer_port:api_port`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct NodeRecord {
    pub address: String,
    pub peer_port: u16,
    pub api_port: u16,
}

impl fmt::Display for NodeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.address, self.peer_port, self.api_port)
    }
}

/// A notification from the watch subscription.
///
/// The reconciler treats every variant except `Bookmark` as "something
/// changed"; the payload only ends up in log lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Added(String),
    Modified(String),
    Deleted(String),
    Bookmark,
    /// The API server reported an error inside the stream, e.g. `410 Gone`.
    Error(String),
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::Added(name) => write!(f, "added {}", name),
            Change::Modified(name) => write!(f, "modified {}", name),
            Change::Deleted(name) => write!(f, "deleted {}", name),
            Change::Bookmark => f.write_str("bookmark"),
            Change::Error(message) => write!(f, "error: {}", message),
        }
    }
}

impl From<Endpoints> for EndpointResource {
    fn from(endpoints: Endpoints) -> Self {
        Self {
            name: endpoints.metadata.name.unwrap_or_default(),
            subsets: endpoints
                .subsets
                .unwrap_or_default()
                .into_iter()
                .map(Subset::from)
                .collect(),
        }
    }
}

impl From<EndpointSubset> for Subset {
    fn from(subset: EndpointSubset) -> Self {
        // notReadyAddresses are not serving and never become peers.
        Self {
            addresses: subset
                .addresses
                .unwrap_or_default()
                .into_iter()
                .map(|a| a.ip)
                .collect(),
            ports: subset
                .ports
                .unwrap_or_default()
                .into_iter()
                .filter_map(SubsetPort::from_endpoint_port)
                .collect(),
        }
    }
}

impl SubsetPort {
    fn from_endpoint_port(port: EndpointPort) -> Option<Self> {
        let number = u16::try_from(port.port).ok()?;
        Some(Self {
            name: port.name,
            port: number,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::EndpointAddress;
    use kube::api::ObjectMeta;

    fn address(ip: &str) -> EndpointAddress {
        EndpointAddress {
            ip: ip.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn converts_endpoints_keeping_ready_addresses_only() {
        let endpoints = Endpoints {
            metadata: ObjectMeta {
                name: Some("ts".to_string()),
                ..Default::default()
            },
            subsets: Some(vec![EndpointSubset {
                addresses: Some(vec![address("10.0.0.1"), address("10.0.0.2")]),
                not_ready_addresses: Some(vec![address("10.0.0.9")]),
                ports: Some(vec![EndpointPort {
                    name: Some("api".to_string()),
                    port: 8108,
                    ..Default::default()
                }]),
            }]),
        };

        let resource = EndpointResource::from(endpoints);
        assert_eq!(resource.name, "ts");
        assert_eq!(resource.subsets.len(), 1);
        assert_eq!(resource.subsets[0].addresses, vec!["10.0.0.1", "10.0.0.2"]);
        assert_eq!(
            resource.subsets[0].ports,
            vec![SubsetPort {
                name: Some("api".to_string()),
                port: 8108
            }]
        );
    }

    #[test]
    fn missing_fields_become_empty() {
        let resource = EndpointResource::from(Endpoints::default());
        assert_eq!(resource, EndpointResource::default());

        let subset = Subset::from(EndpointSubset::default());
        assert!(subset.addresses.is_empty());
        assert!(subset.ports.is_empty());
    }

    #[test]
    fn out_of_range_ports_are_dropped() {
        let subset = Subset::from(EndpointSubset {
            ports: Some(vec![
                EndpointPort {
                    port: -1,
                    ..Default::default()
                },
                EndpointPort {
                    port: 70000,
                    ..Default::default()
                },
                EndpointPort {
                    port: 9000,
                    ..Default::default()
                },
            ]),
            ..Default::default()
        });
        assert_eq!(subset.ports.len(), 1);
        assert_eq!(subset.ports[0].port, 9000);
    }

    #[test]
    fn node_record_display() {
        let record = NodeRecord {
            address: "10.0.0.1".into(),
            peer_port: 8107,
            api_port: 8108,
        };
        assert_eq!(record.to_string(), "10.0.0.1:8107:8108");
    }
}
