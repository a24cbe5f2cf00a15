//! Minimum node count guard.
//!
//! A burst of delete events (for example during a rolling upgrade) must not
//! produce an artifact listing too few backends, which downstream load
//! balancers would read as "drain everything".

/// Whether a render with `live_nodes` entries may go ahead.
pub fn permit_render(live_nodes: usize, minimum: usize) -> bool {
    live_nodes >= minimum
}
