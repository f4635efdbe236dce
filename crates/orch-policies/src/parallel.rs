//! Parallel-group failure policy (Open Question (c)).
//!
//! A `parallel_group` is a set of steps that run concurrently; this policy
//! only decides what happens to the *siblings still running* when one member
//! fails. It never affects steps outside the group.

pub use orch_domain::workflow::ParallelFailurePolicy;

pub trait ParallelGroupPolicy: Send + Sync {
    /// Called the moment one member of a group fails, while others may still
    /// be in flight. `true` means cancel the remaining siblings.
    fn cancel_remaining_on_failure(&self, policy: ParallelFailurePolicy) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultParallelGroupPolicy;

impl ParallelGroupPolicy for DefaultParallelGroupPolicy {
    fn cancel_remaining_on_failure(&self, policy: ParallelFailurePolicy) -> bool {
        matches!(policy, ParallelFailurePolicy::CancelRemaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_respects_the_workflow_definitions_choice() {
        let p = DefaultParallelGroupPolicy;
        assert!(p.cancel_remaining_on_failure(ParallelFailurePolicy::CancelRemaining));
        assert!(!p.cancel_remaining_on_failure(ParallelFailurePolicy::LetFinish));
    }
}
