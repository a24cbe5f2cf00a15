//! Data structures shared between the watch source and the render engine.
//!
//! Events coming out of the cluster are decoded once, at the source
//! boundary, into the closed [`NodeEvent`] enum.  Everything past that
//! point works with typed node names and addresses only.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A node name together with its external address, if it has one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeAddress {
    pub name: String,
    pub external_ip: Option<String>,
}

impl NodeAddress {
    pub fn new(name: impl Into<String>, external_ip: Option<&str>) -> Self {
        Self {
            name: name.into(),
            external_ip: external_ip.map(str::to_string),
        }
    }

    /// The external address, treating an empty string the same as a
    /// missing one.
    pub fn address(&self) -> Option<&str> {
        self.external_ip.as_deref().filter(|ip| !ip.is_empty())
    }
}

/// A single change notification for one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEvent {
    /// The node was seen for the first time.
    Added(NodeAddress),
    /// A known node changed.  The payload carries its current address,
    /// which may be unchanged.
    Updated(NodeAddress),
    /// The node left the cluster.
    Deleted(NodeAddress),
}

impl NodeEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            NodeEvent::Added(_) => "ADD",
            NodeEvent::Updated(_) => "UPDATE",
            NodeEvent::Deleted(_) => "DELETE",
        }
    }

    pub fn node(&self) -> &NodeAddress {
        match self {
            NodeEvent::Added(node) | NodeEvent::Updated(node) | NodeEvent::Deleted(node) => node,
        }
    }
}

/// What a [`NodeSource`](crate::source::NodeSource) sends to the ingest loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    /// A complete listing of the cluster.  Sent once the initial list has
    /// been received, and again after every re-list.
    Synced(Vec<NodeAddress>),
    Node(NodeEvent),
}

/// One row of the rendered node list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeInfo {
    pub name: String,
    pub external_ip: String,
}

/// Point-in-time view of every address that ends up in the artifact.
///
/// This is both the input to the fingerprint and the data handed to the
/// template.  `timestamp` is for the template only and never fingerprinted.
#[derive(Debug, Clone, Serialize)]
pub struct RenderSnapshot {
    pub nodes: Vec<NodeInfo>,
    pub static_ips: Vec<String>,
    pub all_ips: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl RenderSnapshot {
    pub fn new(entries: Vec<(String, String)>, static_ips: &[String]) -> Self {
        Self::at(entries, static_ips, Utc::now())
    }

    pub fn at(
        entries: Vec<(String, String)>,
        static_ips: &[String],
        timestamp: DateTime<Utc>,
    ) -> Self {
        let mut all_ips = Vec::with_capacity(entries.len() + static_ips.len());
        let nodes = entries
            .into_iter()
            .map(|(name, external_ip)| {
                all_ips.push(external_ip.clone());
                NodeInfo { name, external_ip }
            })
            .collect();
        all_ips.extend(static_ips.iter().cloned());

        Self {
            nodes,
            static_ips: static_ips.to_vec(),
            all_ips,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_address_counts_as_missing() {
        assert_eq!(NodeAddress::new("node1", Some("")).address(), None);
        assert_eq!(NodeAddress::new("node1", None).address(), None);
        assert_eq!(
            NodeAddress::new("node1", Some("1.2.3.4")).address(),
            Some("1.2.3.4")
        );
    }

    #[test]
    fn snapshot_appends_static_ips_after_node_ips() {
        let snapshot = RenderSnapshot::new(
            vec![
                ("node1".into(), "1.2.3.4".into()),
                ("node2".into(), "5.6.7.8".into()),
            ],
            &["10.0.0.1".to_string()],
        );

        assert_eq!(snapshot.all_ips, vec!["1.2.3.4", "5.6.7.8", "10.0.0.1"]);
        assert_eq!(snapshot.static_ips, vec!["10.0.0.1"]);
        assert_eq!(snapshot.nodes[1].name, "node2");
    }
}
