//! Pluggable policies behind the orchestration kernel's fixed rules:
//! the resource transition graph (§4.1), step retry/backoff (§4.3), and
//! parallel-group failure handling (Open Question (c)).
//!
//! Kept as plain trait objects over `orch-domain` types so `orch-core` can
//! substitute a fake in tests without pulling in persistence or I/O.

pub mod parallel;
pub mod retry;
pub mod transition;

pub use parallel::{DefaultParallelGroupPolicy, ParallelFailurePolicy, ParallelGroupPolicy};
pub use retry::{FixedBackoffRetryPolicy, RetryPolicy};
pub use transition::{FixedTransitionGraph, TransitionPolicy};
