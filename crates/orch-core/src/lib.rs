//! orch-core: the orchestration kernel (§1).
//!
//! Owns the parts of the system the spec calls out as the hard engineering:
//! the resource-lifecycle state machine with its audit trail
//! (`resource_manager`), the workflow executor (`workflow_executor`), the
//! event bus (`event_bus`), and the repository contracts persistence must
//! satisfy (`repository`). Everything here is transport-agnostic: no HTTP,
//! no CLI, no concrete step executors (those live in `orch-adapters`) and no
//! database driver (that lives in `orch-persistence`).

pub mod constants;
pub mod errors;
pub mod event_bus;
pub mod hashing;
pub mod provisioner;
pub mod repository;
pub mod resource_manager;
pub mod step_executor;
pub mod templating;
pub mod workflow_executor;

pub use errors::{ErrorCategory, OrchError, OrchResult};
pub use event_bus::{EventBus, Subscription};
pub use provisioner::{Provisioner, ProvisionerRegistry};
pub use repository::{InMemoryResourceRepository, InMemorySpecRepository, InMemoryWorkflowRepository,
                      ResourceRepository, SharedResourceRepository, SharedSpecRepository, SharedWorkflowRepository,
                      SpecRepository, WorkflowRepository};
pub use resource_manager::{DeclaredResource, ResourceManager};
pub use step_executor::{StepContext, StepExecutor, StepExecutorRegistry};
pub use workflow_executor::WorkflowExecutor;
