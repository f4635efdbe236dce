//! Pure data model for the orchestration kernel: no I/O, no async, no
//! persistence concerns. Every type here is `Serialize`/`Deserialize` so it
//! can cross the wire or be replayed from an event log unchanged.

pub mod admin_config;
pub mod event;
pub mod golden_path;
pub mod graph;
pub mod provider;
pub mod resource;
pub mod spec;
pub mod workflow;

pub use admin_config::AdminConfig;
pub use event::{Event, EventFilter, EventType};
pub use golden_path::{GoldenPath, GoldenPathsConfig};
pub use graph::{GraphAnnotation, GraphEdge, GraphNode};
pub use provider::{Provider, ProviderConflict, ProviderManifest, ProviderSource};
pub use resource::{Application, HealthStatus, Hint, ResourceHealthCheck, ResourceInstance, ResourceKind,
                    ResourceState, ResourceStateTransition};
pub use spec::{ParsedSpec, ScoreDocument, Spec};
pub use workflow::{ParallelFailurePolicy, StepExecution, StepStatus, WorkflowDefinition, WorkflowExecution,
                    WorkflowStatus};
