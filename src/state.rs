//! Shared application state handed to every HTTP handler (§4, §6).

use std::sync::Arc;

use orch_core::repository::{SharedResourceRepository, SharedSpecRepository, SharedWorkflowRepository};
use orch_core::{EventBus, ProvisionerRegistry, ResourceManager, WorkflowExecutor};
use orch_domain::admin_config::AdminConfig;
use orch_domain::GoldenPath;
use orch_providers::ProviderRegistry;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct AppState {
    pub spec_repo: SharedSpecRepository,
    pub resource_repo: SharedResourceRepository,
    pub workflow_repo: SharedWorkflowRepository,
    pub resource_manager: Arc<ResourceManager>,
    pub workflow_executor: Arc<WorkflowExecutor>,
    pub provider_registry: Arc<ProviderRegistry>,
    pub provisioner_registry: Arc<ProvisionerRegistry>,
    pub bus: Arc<EventBus>,
    pub golden_paths: Arc<RwLock<Vec<GoldenPath>>>,
    pub admin_config: Arc<RwLock<AdminConfig>>,
}
