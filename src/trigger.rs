//! The render cycle: snapshot, fingerprint, compare, render, write, execute,
//! commit.
//!
//! [`RenderTrigger::run_cycle`] borrows the table and the last applied
//! fingerprint from its caller, which must hold the state lock for the whole
//! call.  The fingerprint is only advanced once both the write and the
//! command succeed, so any failure makes the next change retry the complete
//! cycle.

use log::{debug, info};

use crate::error::Result;
use crate::fingerprint::{fingerprint, Fingerprint};
use crate::output::{CommandRunner, Sink};
use crate::render::Renderer;
use crate::table::AddressTable;
use crate::types::RenderSnapshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing differs from the last applied artifact.
    Unchanged,
    /// A new artifact was written and the command succeeded.
    Applied(Fingerprint),
}

pub struct RenderTrigger {
    static_ips: Vec<String>,
    command: String,
    renderer: Box<dyn Renderer>,
    sink: Box<dyn Sink>,
    runner: Box<dyn CommandRunner>,
}

impl RenderTrigger {
    pub fn new(
        static_ips: Vec<String>,
        command: String,
        renderer: Box<dyn Renderer>,
        sink: Box<dyn Sink>,
        runner: Box<dyn CommandRunner>,
    ) -> Self {
        Self {
            static_ips,
            command,
            renderer,
            sink,
            runner,
        }
    }

    pub fn snapshot(&self, table: &AddressTable) -> RenderSnapshot {
        RenderSnapshot::new(table.snapshot_entries(), &self.static_ips)
    }

    pub async fn run_cycle(
        &self,
        table: &AddressTable,
        last_applied: &mut Option<Fingerprint>,
    ) -> Result<CycleOutcome> {
        let snapshot = self.snapshot(table);
        let next = fingerprint(&snapshot);
        if last_applied.as_ref() == Some(&next) {
            debug!("Fingerprint {} unchanged, skipping render", next);
            return Ok(CycleOutcome::Unchanged);
        }

        info!(
            "Rendering template to {} ({} nodes, {} static)",
            self.sink.location().display(),
            snapshot.nodes.len(),
            snapshot.static_ips.len()
        );
        let contents = self.renderer.render(&snapshot)?;
        self.sink.write(&contents).await?;

        info!(
            "Executing command: {} {}",
            self.command,
            self.sink.location().display()
        );
        self.runner.run(&self.command, self.sink.location()).await?;
        info!("Command executed successfully");

        *last_applied = Some(next.clone());
        Ok(CycleOutcome::Applied(next))
    }
}
