//! Keeps an external configuration artifact in sync with the external IPs
//! of a cluster's nodes.
//!
//! Node events from a [`source::NodeSource`] are applied to an
//! [`table::AddressTable`] by [`ingest::Watcher`].  Whenever the table
//! changes and enough nodes remain, the [`trigger::RenderTrigger`] renders
//! the template, writes the output file and runs the reload command, unless
//! the [`fingerprint`] shows the same data has already been applied.

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod ingest;
pub mod output;
pub mod render;
pub mod safety;
pub mod source;
pub mod table;
pub mod trigger;
pub mod types;

pub use error::{Error, Result};
pub use ingest::{Outcome, Watcher};
