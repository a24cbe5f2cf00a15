//! Order-independent digest of a [`RenderSnapshot`].
//!
//! Two snapshots get the same fingerprint when they contain the same
//! `(name, address)` pairs and the same static addresses.  Ordering and the
//! generation timestamp do not contribute.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::types::RenderSnapshot;

/// Hex-encoded SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn fingerprint(snapshot: &RenderSnapshot) -> Fingerprint {
    let mut nodes: Vec<(&str, &str)> = snapshot
        .nodes
        .iter()
        .map(|n| (n.name.as_str(), n.external_ip.as_str()))
        .collect();
    nodes.sort_unstable();

    let mut static_ips: Vec<&str> = snapshot.static_ips.iter().map(String::as_str).collect();
    static_ips.sort_unstable();

    let mut hasher = Sha256::new();
    hasher.update((nodes.len() as u64).to_le_bytes());
    for (name, ip) in nodes {
        write_field(&mut hasher, name);
        write_field(&mut hasher, ip);
    }
    hasher.update((static_ips.len() as u64).to_le_bytes());
    for ip in static_ips {
        write_field(&mut hasher, ip);
    }

    Fingerprint(hex::encode(hasher.finalize()))
}

// Length prefix keeps ("ab", "c") and ("a", "bc") apart.
fn write_field(hasher: &mut Sha256, field: &str) {
    hasher.update((field.len() as u64).to_le_bytes());
    hasher.update(field.as_bytes());
}
