//! The fixed resource-lifecycle transition graph (§4.1).
//!
//! The graph never changes at runtime — it is not loaded from config — so it
//! is expressed directly as a match rather than a data structure built at
//! startup.

use orch_domain::ResourceState;

/// Contract so `orch-core::resource_manager` can be tested against a fake
/// graph without depending on the real one.
pub trait TransitionPolicy: Send + Sync {
    fn is_allowed(&self, from: Option<ResourceState>, to: ResourceState) -> bool;
}

/// The graph from §4.1's table. `None` as `from` is the initial
/// `∅ → requested` edge created by `CreateResourcesFromSpec`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedTransitionGraph;

impl TransitionPolicy for FixedTransitionGraph {
    fn is_allowed(&self, from: Option<ResourceState>, to: ResourceState) -> bool {
        use ResourceState::*;
        match (from, to) {
            (None, Requested) => true,
            (Some(Requested), Provisioning) | (Some(Requested), Failed) => true,
            (Some(Provisioning), Active) | (Some(Provisioning), Failed) => true,
            (Some(Active), Scaling) | (Some(Active), Updating) | (Some(Active), Degraded) | (Some(Active), Terminating) => true,
            (Some(Scaling), Active) | (Some(Scaling), Failed) | (Some(Scaling), Degraded) => true,
            (Some(Updating), Active) | (Some(Updating), Failed) | (Some(Updating), Degraded) => true,
            (Some(Degraded), Active) | (Some(Degraded), Terminating) | (Some(Degraded), Failed) => true,
            (Some(Terminating), Terminated) | (Some(Terminating), Failed) => true,
            (Some(Failed), Terminating) | (Some(Failed), Requested) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ResourceState::*;

    #[test]
    fn allows_every_edge_in_the_table() {
        let g = FixedTransitionGraph;
        assert!(g.is_allowed(None, Requested));
        assert!(g.is_allowed(Some(Requested), Provisioning));
        assert!(g.is_allowed(Some(Provisioning), Active));
        assert!(g.is_allowed(Some(Active), Degraded));
        assert!(g.is_allowed(Some(Degraded), Active));
        assert!(g.is_allowed(Some(Failed), Requested));
        assert!(g.is_allowed(Some(Terminating), Terminated));
    }

    #[test]
    fn rejects_edges_outside_the_table() {
        let g = FixedTransitionGraph;
        assert!(!g.is_allowed(Some(Terminated), Active));
        assert!(!g.is_allowed(Some(Requested), Active));
        assert!(!g.is_allowed(None, Active));
        assert!(!g.is_allowed(Some(Terminated), Requested));
    }
}
