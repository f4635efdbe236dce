//! Orchestration engine tick loop (C7, §4.4).
//!
//! Every tick claims up to `max_concurrent_workflows` `requested` resources
//! (one row-locked `SELECT ... FOR UPDATE SKIP LOCKED` query, so a second
//! engine instance running against the same database never double-claims —
//! the "at-most-one guarantee"), then drives each to completion
//! concurrently: resolve its provider or provisioner, run the provisioning
//! work, and feed the result back into `ResourceManager`.

use std::sync::Arc;
use std::time::Duration;

use orch_core::repository::{SharedResourceRepository, SharedSpecRepository, SharedWorkflowRepository};
use orch_core::{EventBus, OrchResult, ProvisionerRegistry, ResourceManager, WorkflowExecutor};
use orch_domain::admin_config::EngineConfig;
use orch_domain::workflow::WorkflowDefinition;
use orch_domain::{Event, EventType, ResourceInstance, ResourceState, WorkflowExecution, WorkflowStatus};
use orch_providers::ProviderRegistry;

pub struct Engine {
    spec_repo: SharedSpecRepository,
    resource_repo: SharedResourceRepository,
    workflow_repo: SharedWorkflowRepository,
    resource_manager: Arc<ResourceManager>,
    workflow_executor: Arc<WorkflowExecutor>,
    provider_registry: Arc<ProviderRegistry>,
    provisioner_registry: Arc<ProvisionerRegistry>,
    bus: Arc<EventBus>,
    config: EngineConfig,
}

impl Engine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(spec_repo: SharedSpecRepository, resource_repo: SharedResourceRepository,
               workflow_repo: SharedWorkflowRepository, resource_manager: Arc<ResourceManager>,
               workflow_executor: Arc<WorkflowExecutor>, provider_registry: Arc<ProviderRegistry>,
               provisioner_registry: Arc<ProvisionerRegistry>, bus: Arc<EventBus>, config: EngineConfig)
               -> Arc<Self> {
        Arc::new(Self { spec_repo,
                         resource_repo,
                         workflow_repo,
                         resource_manager,
                         workflow_executor,
                         provider_registry,
                         provisioner_registry,
                         bus,
                         config })
    }

    /// Runs the poll loop until `shutdown` is signalled.
    pub async fn run(self: Arc<Self>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.config.poll_interval_seconds.max(1)));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        log::error!("engine tick failed: {e}");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        log::info!("engine loop shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Claims and processes one batch of `requested` resources. Returns how
    /// many were claimed, regardless of their eventual outcome.
    pub async fn tick(&self) -> OrchResult<usize> {
        let claimed = self.resource_repo.claim_requested_resources(self.config.max_concurrent_workflows).await?;
        let count = claimed.len();
        if count == 0 {
            return Ok(0);
        }
        log::info!("engine: claimed {count} requested resource(s)");

        let handles: Vec<_> = claimed.into_iter()
                                      .map(|resource| {
                                          let this_spec = self.spec_repo.clone();
                                          let this_workflow = self.workflow_repo.clone();
                                          let this_manager = self.resource_manager.clone();
                                          let this_executor = self.workflow_executor.clone();
                                          let this_providers = self.provider_registry.clone();
                                          let this_provisioners = self.provisioner_registry.clone();
                                          let this_bus = self.bus.clone();
                                          tokio::spawn(async move {
                                              process_resource(resource, this_spec, this_workflow, this_manager,
                                                                this_executor, this_providers, this_provisioners,
                                                                this_bus).await
                                          })
                                      })
                                      .collect();

        for handle in handles {
            if let Err(e) = handle.await {
                log::error!("engine: resource processing task panicked: {e}");
            }
        }
        Ok(count)
    }
}

#[allow(clippy::too_many_arguments)]
async fn process_resource(resource: ResourceInstance, spec_repo: SharedSpecRepository,
                           workflow_repo: SharedWorkflowRepository, manager: Arc<ResourceManager>,
                           executor: Arc<WorkflowExecutor>, providers: Arc<ProviderRegistry>,
                           provisioners: Arc<ProvisionerRegistry>, bus: Arc<EventBus>) {
    let app_name = spec_repo.get_application(resource.application_id).await.ok().map(|a| a.name);

    // Resolution happens before the provisioning transition so `provider.resolved`
    // is published ahead of `resource.provisioning`, matching the engine's
    // documented event order (S1: resource.created, resource.requested,
    // provider.resolved, resource.provisioning, workflow.started,
    // workflow.completed, resource.active).
    let resolved = providers.resolve(&resource.resource_type).await;
    if resolved.is_ok() {
        publish_provider_resolved(&bus, &resource, app_name.clone());
    }

    if let Err(e) = manager.transition_state(resource.id, ResourceState::Provisioning, "engine claimed resource",
                                              "engine", serde_json::Value::Null, app_name.clone())
                           .await
    {
        log::error!("engine: could not transition resource {} to provisioning: {e}", resource.id);
        if let Err(release_err) = manager.release_claim(resource.id).await {
            log::error!("engine: could not release claim on resource {}: {release_err}", resource.id);
        }
        return;
    }

    let outcome = match resolved {
        Ok((provider, _)) => run_via_workflow(&resource, &provider.workflow_file, workflow_repo, executor).await,
        Err(_) => {
            match provisioners.resolve(&resource.resource_type) {
                Ok(provisioner) => {
                    provisioner.provision(resource.id, &resource.configuration).await.map_err(|e| e.to_string())
                }
                Err(e) => Err(e.to_string()),
            }
        }
    };

    if let Err(e) = manager.record_provision_result(resource.id, app_name, outcome).await {
        log::error!("engine: could not record provision result for {}: {e}", resource.id);
    }
}

fn publish_provider_resolved(bus: &EventBus, resource: &ResourceInstance, app_name: Option<String>) {
    let mut payload = std::collections::HashMap::new();
    payload.insert("resource_id".to_string(), serde_json::json!(resource.id));
    payload.insert("resource_type".to_string(), serde_json::json!(resource.resource_type));
    bus.publish(Event::new(EventType::ProviderResolved, "orchestration_engine", app_name, payload));
}

async fn run_via_workflow(resource: &ResourceInstance, workflow_file: &str, workflow_repo: SharedWorkflowRepository,
                           executor: Arc<WorkflowExecutor>)
                           -> Result<serde_json::Value, String> {
    let raw = tokio::fs::read_to_string(workflow_file).await
                                                        .map_err(|e| format!("reading workflow file '{workflow_file}': {e}"))?;
    let definition: WorkflowDefinition =
        serde_yaml::from_str(&raw).map_err(|e| format!("parsing workflow file '{workflow_file}': {e}"))?;

    let mut inputs = std::collections::HashMap::new();
    inputs.insert("configuration".to_string(), resource.configuration.clone());

    let execution = WorkflowExecution::new(definition.name.clone(), resource.application_id.to_string(),
                                            Some(resource.id), inputs, definition.steps.len());
    workflow_repo.insert_execution(execution.clone()).await.map_err(|e| e.to_string())?;

    let result = executor.run(&definition, execution).await.map_err(|e| e.to_string())?;
    match result.status {
        WorkflowStatus::Completed => Ok(serde_json::to_value(&result.outputs).unwrap_or(serde_json::Value::Null)),
        _ => Err(result.error_message.unwrap_or_else(|| "workflow did not complete".to_string())),
    }
}
