//! Event ingestion.
//!
//! [`Watcher`] owns the address table and the last applied fingerprint
//! behind one mutex.  Every entry point takes that lock for its whole
//! critical section, from the table mutation through to committing the new
//! fingerprint, so render cycles never overlap and a burst of events
//! collapses into sequential cycles that are no-ops once the end state has
//! been applied.

use log::{debug, error, info, warn};
use tokio::sync::{mpsc, watch, Mutex};

use crate::error::{Error, Result};
use crate::fingerprint::Fingerprint;
use crate::safety::permit_render;
use crate::table::AddressTable;
use crate::trigger::{CycleOutcome, RenderTrigger};
use crate::types::{NodeAddress, NodeEvent, SourceEvent};

/// What an entry point ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The event did not change the table.
    NoChange,
    /// Too few nodes to render safely; the artifact was left alone.
    BelowThreshold { live: usize, minimum: usize },
    /// The table changed but the rendered data is what was applied last.
    Unchanged,
    Applied(Fingerprint),
}

impl From<CycleOutcome> for Outcome {
    fn from(outcome: CycleOutcome) -> Self {
        match outcome {
            CycleOutcome::Unchanged => Outcome::Unchanged,
            CycleOutcome::Applied(fingerprint) => Outcome::Applied(fingerprint),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Startup,
    Steady,
}

#[derive(Default)]
struct State {
    table: AddressTable,
    last_applied: Option<Fingerprint>,
}

pub struct Watcher {
    min_node_count: usize,
    trigger: RenderTrigger,
    state: Mutex<State>,
}

impl Watcher {
    pub fn new(min_node_count: usize, trigger: RenderTrigger) -> Self {
        Self {
            min_node_count,
            trigger,
            state: Mutex::new(State::default()),
        }
    }

    /// Apply a single node notification and render if it changed anything.
    pub async fn on_node_event(&self, event: NodeEvent) -> Result<Outcome> {
        let mut state = self.state.lock().await;

        let node = event.node();
        let old_ip = state.table.get(&node.name).map(str::to_string);
        let new_ip = match &event {
            NodeEvent::Deleted(_) => None,
            NodeEvent::Added(node) | NodeEvent::Updated(node) => node.address(),
        };
        debug!(
            "Node event received: type={} node={} old_ip={:?} new_ip={:?}",
            event.kind(),
            node.name,
            old_ip,
            new_ip
        );

        // A node that loses its external address is dropped, same as a node
        // that leaves the cluster.
        let changed = match new_ip {
            Some(ip) => state.table.upsert(&node.name, ip),
            None => state.table.remove(&node.name),
        };
        if !changed {
            debug!("No address changes detected, skipping render");
            return Ok(Outcome::NoChange);
        }
        match (old_ip.as_deref(), new_ip) {
            (None, Some(ip)) => info!("New node added: {} -> {}", node.name, ip),
            (Some(old), Some(ip)) => info!("Node IP changed: {} {} -> {}", node.name, old, ip),
            (Some(old), None) => info!("Node removed: {} ({})", node.name, old),
            (None, None) => {}
        }

        self.gate_and_render(&mut state, Phase::Steady).await
    }

    /// Bulk-load the table from the first complete listing and render it.
    ///
    /// Falling short of the minimum here is only a warning; the caller keeps
    /// watching and the first qualifying event renders.
    pub async fn on_initial_sync_complete(&self, nodes: Vec<NodeAddress>) -> Result<Outcome> {
        let mut state = self.state.lock().await;

        info!("Initial node discovery: {} nodes", nodes.len());
        state.table.replace_all(collect_entries(nodes));
        self.gate_and_render(&mut state, Phase::Startup).await
    }

    /// Replace the table with a fresh listing after the watch re-listed.
    ///
    /// Deletions missed while the watch was disconnected show up here.
    pub async fn on_relist(&self, nodes: Vec<NodeAddress>) -> Result<Outcome> {
        let mut state = self.state.lock().await;

        if !state.table.replace_all(collect_entries(nodes)) {
            debug!("Re-list matches current table, skipping render");
            return Ok(Outcome::NoChange);
        }
        info!("Re-list changed node table, now {} nodes", state.table.len());
        self.gate_and_render(&mut state, Phase::Steady).await
    }

    /// Render the current table if it differs from what was last applied.
    pub async fn maybe_render_and_execute(&self) -> Result<Outcome> {
        let mut state = self.state.lock().await;
        let State {
            table,
            last_applied,
        } = &mut *state;
        Ok(self.trigger.run_cycle(table, last_applied).await?.into())
    }

    /// Fingerprint of the last artifact that was written and reloaded.
    /// For inspection; takes the state lock.
    pub async fn last_applied(&self) -> Option<Fingerprint> {
        self.state.lock().await.last_applied.clone()
    }

    /// Number of nodes currently holding an address.  For inspection.
    pub async fn node_count(&self) -> usize {
        self.state.lock().await.table.len()
    }

    async fn gate_and_render(&self, state: &mut State, phase: Phase) -> Result<Outcome> {
        let live = state.table.len();
        let minimum = self.min_node_count;
        if !permit_render(live, minimum) {
            match phase {
                Phase::Startup => warn!(
                    "Node count below minimum, skipping initial render (current={}, minimum={})",
                    live, minimum
                ),
                Phase::Steady => error!(
                    "Safety check failed: node count below minimum (current={}, minimum={})",
                    live, minimum
                ),
            }
            return Ok(Outcome::BelowThreshold { live, minimum });
        }

        let State {
            table,
            last_applied,
        } = state;
        Ok(self.trigger.run_cycle(table, last_applied).await?.into())
    }

    /// Consume source events until shutdown is requested or the source goes
    /// away.
    ///
    /// The shutdown signal is only checked between events, so a render cycle
    /// that has started always finishes.  The source closing its channel is
    /// reported as [`Error::WatchSource`].
    pub async fn run(
        &self,
        mut events: mpsc::Receiver<SourceEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let mut synced = false;
        loop {
            let event = tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    info!("Shutdown requested, stopping event loop");
                    return Ok(());
                }
                event = events.recv() => event,
            };

            let Some(event) = event else {
                let reason = if synced {
                    "node event stream closed"
                } else {
                    "node event stream closed before initial sync"
                };
                return Err(Error::WatchSource(reason.into()));
            };

            match event {
                SourceEvent::Synced(nodes) if !synced => {
                    synced = true;
                    info!("Cache synced, performing initial sync");
                    match self.on_initial_sync_complete(nodes).await {
                        Ok(_) => info!("Initial sync complete, watching for node changes"),
                        Err(e) => error!("Initial render failed, will retry on node changes: {}", e),
                    }
                }
                SourceEvent::Synced(nodes) => {
                    if let Err(e) = self.on_relist(nodes).await {
                        error!("Failed to render and execute: {}", e);
                    }
                }
                SourceEvent::Node(event) => {
                    if let Err(e) = self.on_node_event(event).await {
                        error!("Failed to render and execute: {}", e);
                    }
                }
            }
        }
    }
}

fn collect_entries(nodes: Vec<NodeAddress>) -> Vec<(String, String)> {
    nodes
        .into_iter()
        .filter_map(|node| match node.address() {
            Some(ip) => {
                info!("Discovered node: {} -> {}", node.name, ip);
                Some((node.name.clone(), ip.to_string()))
            }
            None => {
                debug!("Node has no external IP: {}", node.name);
                None
            }
        })
        .collect()
}
