use crate::types::SourceEvent;
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

pub mod kubernetes;
pub use kubernetes::KubeNodeSource;

#[async_trait]
pub trait NodeSource {
    /// Start watching the cluster's nodes.
    /// A `Synced` listing is sent first, then per-node events.
    async fn watch(&self, events: mpsc::Sender<SourceEvent>) -> Result<()>;
}
