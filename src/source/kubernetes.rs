use super::NodeSource;
use crate::types::{NodeAddress, NodeEvent, SourceEvent};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures_util::stream::StreamExt;
use k8s_openapi::api::core::v1::Node;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::runtime::watcher::{self, Event};
use kube::runtime::WatchStreamExt;
use kube::{Api, Client, ResourceExt};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::path::Path;
use tokio::sync::mpsc;

const EXTERNAL_IP: &str = "ExternalIP";

pub struct KubeNodeSource {
    client: Client,
}

impl KubeNodeSource {
    /// Build a client from `kubeconfig`, or infer one from `KUBECONFIG`,
    /// `~/.kube/config` or the in-cluster service account.
    pub async fn connect(kubeconfig: Option<&Path>) -> Result<Self> {
        let config = match kubeconfig {
            Some(path) => {
                let kubeconfig = Kubeconfig::read_from(path)
                    .map_err(|e| anyhow!("read kubeconfig {}: {}", path.display(), e))?;
                kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await
                    .map_err(|e| anyhow!("build kubeconfig: {}", e))?
            }
            None => kube::Config::infer()
                .await
                .map_err(|e| anyhow!("infer kubeconfig: {}", e))?,
        };
        let client =
            Client::try_from(config).map_err(|e| anyhow!("create kubernetes client: {}", e))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl NodeSource for KubeNodeSource {
    async fn watch(&self, events: mpsc::Sender<SourceEvent>) -> Result<()> {
        let api: Api<Node> = Api::all(self.client.clone());
        let mut stream = kube::runtime::watcher(api, watcher::Config::default())
            .default_backoff()
            .boxed();
        let mut tracker = NodeTracker::default();

        info!("Waiting for cache sync");
        while let Some(item) = stream.next().await {
            match item {
                Ok(event) => {
                    if let Some(event) = tracker.observe(event) {
                        events
                            .send(event)
                            .await
                            .map_err(|_| anyhow!("Channel closed"))?;
                    }
                }
                // The backoff wrapper retries; the watcher re-lists as needed.
                Err(e) => warn!("Node watch error: {}", e),
            }
        }

        Err(anyhow!("Node watch stream ended"))
    }
}

/// Turns raw watcher events into [`SourceEvent`]s.
///
/// The watcher reports "applied" for both new and changed nodes; the set of
/// names seen so far tells the two apart.  Objects delivered during a
/// (re-)list are buffered and emitted together as one `Synced` listing.
#[derive(Default)]
struct NodeTracker {
    known: HashSet<String>,
    listing: Vec<NodeAddress>,
}

impl NodeTracker {
    fn observe(&mut self, event: Event<Node>) -> Option<SourceEvent> {
        match event {
            Event::Init => {
                debug!("Node listing started");
                self.listing.clear();
                None
            }
            Event::InitApply(node) => {
                self.listing.push(node_address(&node));
                None
            }
            Event::InitDone => {
                let listing = std::mem::take(&mut self.listing);
                self.known = listing.iter().map(|n| n.name.clone()).collect();
                debug!("Node listing complete: {} nodes", listing.len());
                Some(SourceEvent::Synced(listing))
            }
            Event::Apply(node) => {
                let node = node_address(&node);
                let event = if self.known.insert(node.name.clone()) {
                    NodeEvent::Added(node)
                } else {
                    NodeEvent::Updated(node)
                };
                Some(SourceEvent::Node(event))
            }
            Event::Delete(node) => {
                let node = node_address(&node);
                self.known.remove(&node.name);
                Some(SourceEvent::Node(NodeEvent::Deleted(node)))
            }
        }
    }
}

/// The node's name and its first `ExternalIP` status address.
fn node_address(node: &Node) -> NodeAddress {
    let external_ip = node
        .status
        .as_ref()
        .and_then(|status| status.addresses.as_ref())
        .and_then(|addresses| addresses.iter().find(|a| a.type_ == EXTERNAL_IP))
        .map(|a| a.address.clone());
    NodeAddress {
        name: node.name_any(),
        external_ip,
    }
}
