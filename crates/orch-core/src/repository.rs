//! Repository traits (C1's contract as seen by the rest of the core).
//!
//! `orch-persistence` implements these against Postgres with the
//! transactional rules from §4.6 (state + audit row in one transaction,
//! step state + log append in one transaction). The in-memory
//! implementations here exist for tests and for running the engine without a
//! database.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use orch_domain::{Application, ResourceHealthCheck, ResourceInstance, ResourceStateTransition, Spec, StepExecution,
                   WorkflowExecution};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::{OrchError, OrchResult};

#[async_trait]
pub trait SpecRepository: Send + Sync {
    async fn insert_spec(&self, spec: Spec) -> OrchResult<()>;
    async fn get_spec(&self, id: Uuid) -> OrchResult<Spec>;
    async fn find_spec_by_name(&self, name: &str) -> OrchResult<Option<Spec>>;
    async fn list_specs(&self) -> OrchResult<Vec<Spec>>;

    async fn insert_application(&self, app: Application) -> OrchResult<()>;
    async fn get_application(&self, id: Uuid) -> OrchResult<Application>;
    async fn find_application_by_name(&self, name: &str) -> OrchResult<Option<Application>>;
    async fn list_applications(&self) -> OrchResult<Vec<Application>>;
    async fn delete_application(&self, id: Uuid) -> OrchResult<()>;
}

#[async_trait]
pub trait ResourceRepository: Send + Sync {
    async fn insert_resource(&self, resource: ResourceInstance) -> OrchResult<()>;
    async fn get_resource(&self, id: Uuid) -> OrchResult<ResourceInstance>;
    async fn find_resource_by_app_and_name(&self, application_id: Uuid, name: &str)
                                            -> OrchResult<Option<ResourceInstance>>;
    async fn list_resources_by_application(&self, application_id: Uuid) -> OrchResult<Vec<ResourceInstance>>;
    async fn list_resources(&self) -> OrchResult<Vec<ResourceInstance>>;

    /// Commits the updated resource row and the audit row in one
    /// transaction (§4.1 Invariant I2).
    async fn apply_transition(&self, resource: ResourceInstance, transition: ResourceStateTransition)
                               -> OrchResult<()>;

    async fn list_transitions(&self, resource_id: Uuid) -> OrchResult<Vec<ResourceStateTransition>>;

    async fn record_health_check(&self, resource: ResourceInstance, check: ResourceHealthCheck) -> OrchResult<()>;

    /// Claims up to `limit` `requested` resources with no pending workflow
    /// execution, under a row lock, so concurrent engine ticks or replicas
    /// never pick the same resource twice (§4.4 "at-most-one guarantee").
    async fn claim_requested_resources(&self, limit: usize) -> OrchResult<Vec<ResourceInstance>>;
}

#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    async fn insert_execution(&self, execution: WorkflowExecution) -> OrchResult<()>;
    async fn update_execution(&self, execution: WorkflowExecution) -> OrchResult<()>;
    async fn get_execution(&self, id: Uuid) -> OrchResult<WorkflowExecution>;
    async fn list_executions(&self) -> OrchResult<Vec<WorkflowExecution>>;

    async fn insert_step(&self, step: StepExecution) -> OrchResult<()>;
    /// Commits step status/output/error and the appended log lines together
    /// (§4.6 "Workflow step state changes commit together with log
    /// appends").
    async fn update_step(&self, step: StepExecution) -> OrchResult<()>;
    async fn list_steps(&self, workflow_execution_id: Uuid) -> OrchResult<Vec<StepExecution>>;
}

fn not_found(what: &str, id: Uuid) -> OrchError {
    OrchError::NotFound(format!("{what} {id} not found"))
}

#[derive(Default)]
pub struct InMemorySpecRepository {
    specs: RwLock<HashMap<Uuid, Spec>>,
    applications: RwLock<HashMap<Uuid, Application>>,
}

impl InMemorySpecRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SpecRepository for InMemorySpecRepository {
    async fn insert_spec(&self, spec: Spec) -> OrchResult<()> {
        self.specs.write().await.insert(spec.id, spec);
        Ok(())
    }

    async fn get_spec(&self, id: Uuid) -> OrchResult<Spec> {
        self.specs.read().await.get(&id).cloned().ok_or_else(|| not_found("spec", id))
    }

    async fn find_spec_by_name(&self, name: &str) -> OrchResult<Option<Spec>> {
        Ok(self.specs.read().await.values().find(|s| s.name == name).cloned())
    }

    async fn list_specs(&self) -> OrchResult<Vec<Spec>> {
        Ok(self.specs.read().await.values().cloned().collect())
    }

    async fn insert_application(&self, app: Application) -> OrchResult<()> {
        self.applications.write().await.insert(app.id, app);
        Ok(())
    }

    async fn get_application(&self, id: Uuid) -> OrchResult<Application> {
        self.applications.read().await.get(&id).cloned().ok_or_else(|| not_found("application", id))
    }

    async fn find_application_by_name(&self, name: &str) -> OrchResult<Option<Application>> {
        Ok(self.applications.read().await.values().find(|a| a.name == name).cloned())
    }

    async fn list_applications(&self) -> OrchResult<Vec<Application>> {
        Ok(self.applications.read().await.values().cloned().collect())
    }

    async fn delete_application(&self, id: Uuid) -> OrchResult<()> {
        self.applications.write().await.remove(&id);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryResourceRepository {
    resources: RwLock<HashMap<Uuid, ResourceInstance>>,
    transitions: RwLock<HashMap<Uuid, Vec<ResourceStateTransition>>>,
    health_checks: RwLock<HashMap<Uuid, Vec<ResourceHealthCheck>>>,
}

impl InMemoryResourceRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResourceRepository for InMemoryResourceRepository {
    async fn insert_resource(&self, resource: ResourceInstance) -> OrchResult<()> {
        self.resources.write().await.insert(resource.id, resource);
        Ok(())
    }

    async fn get_resource(&self, id: Uuid) -> OrchResult<ResourceInstance> {
        self.resources.read().await.get(&id).cloned().ok_or_else(|| not_found("resource", id))
    }

    async fn find_resource_by_app_and_name(&self, application_id: Uuid, name: &str)
                                            -> OrchResult<Option<ResourceInstance>> {
        Ok(self.resources
               .read()
               .await
               .values()
               .find(|r| r.application_id == application_id && r.name == name)
               .cloned())
    }

    async fn list_resources_by_application(&self, application_id: Uuid) -> OrchResult<Vec<ResourceInstance>> {
        Ok(self.resources.read().await.values().filter(|r| r.application_id == application_id).cloned().collect())
    }

    async fn list_resources(&self) -> OrchResult<Vec<ResourceInstance>> {
        Ok(self.resources.read().await.values().cloned().collect())
    }

    async fn apply_transition(&self, resource: ResourceInstance, transition: ResourceStateTransition)
                               -> OrchResult<()> {
        let mut resources = self.resources.write().await;
        let mut transitions = self.transitions.write().await;
        resources.insert(resource.id, resource);
        transitions.entry(transition.resource_id).or_default().push(transition);
        Ok(())
    }

    async fn list_transitions(&self, resource_id: Uuid) -> OrchResult<Vec<ResourceStateTransition>> {
        Ok(self.transitions.read().await.get(&resource_id).cloned().unwrap_or_default())
    }

    async fn record_health_check(&self, resource: ResourceInstance, check: ResourceHealthCheck) -> OrchResult<()> {
        let mut resources = self.resources.write().await;
        let mut checks = self.health_checks.write().await;
        checks.entry(check.resource_id).or_default().push(check);
        resources.insert(resource.id, resource);
        Ok(())
    }

    async fn claim_requested_resources(&self, limit: usize) -> OrchResult<Vec<ResourceInstance>> {
        use orch_domain::ResourceState;
        // Held for the read-filter-then-write sequence below, mirroring the
        // atomicity the Postgres backend gets from a single locked transaction
        // (§4.4 "at-most-one guarantee") — without it two concurrent callers
        // could both read the same unclaimed rows before either one claims them.
        let mut resources = self.resources.write().await;
        let ids: Vec<Uuid> = resources.values()
                                       .filter(|r| r.state == ResourceState::Requested && r.workflow_execution_id.is_none())
                                       .take(limit)
                                       .map(|r| r.id)
                                       .collect();

        let mut claimed = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(resource) = resources.get_mut(&id) {
                resource.workflow_execution_id = Some(Uuid::new_v4());
                resource.updated_at = chrono::Utc::now();
                claimed.push(resource.clone());
            }
        }
        Ok(claimed)
    }
}

#[derive(Default)]
pub struct InMemoryWorkflowRepository {
    executions: RwLock<HashMap<Uuid, WorkflowExecution>>,
    steps: RwLock<HashMap<Uuid, Vec<StepExecution>>>,
}

impl InMemoryWorkflowRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkflowRepository for InMemoryWorkflowRepository {
    async fn insert_execution(&self, execution: WorkflowExecution) -> OrchResult<()> {
        self.executions.write().await.insert(execution.id, execution);
        Ok(())
    }

    async fn update_execution(&self, execution: WorkflowExecution) -> OrchResult<()> {
        self.executions.write().await.insert(execution.id, execution);
        Ok(())
    }

    async fn get_execution(&self, id: Uuid) -> OrchResult<WorkflowExecution> {
        self.executions.read().await.get(&id).cloned().ok_or_else(|| not_found("workflow execution", id))
    }

    async fn list_executions(&self) -> OrchResult<Vec<WorkflowExecution>> {
        Ok(self.executions.read().await.values().cloned().collect())
    }

    async fn insert_step(&self, step: StepExecution) -> OrchResult<()> {
        self.steps.write().await.entry(step.workflow_execution_id).or_default().push(step);
        Ok(())
    }

    async fn update_step(&self, step: StepExecution) -> OrchResult<()> {
        let mut steps = self.steps.write().await;
        let list = steps.entry(step.workflow_execution_id).or_default();
        if let Some(slot) = list.iter_mut().find(|s| s.id == step.id) {
            *slot = step;
        } else {
            list.push(step);
        }
        Ok(())
    }

    async fn list_steps(&self, workflow_execution_id: Uuid) -> OrchResult<Vec<StepExecution>> {
        Ok(self.steps.read().await.get(&workflow_execution_id).cloned().unwrap_or_default())
    }
}

pub type SharedResourceRepository = Arc<dyn ResourceRepository>;
pub type SharedWorkflowRepository = Arc<dyn WorkflowRepository>;
pub type SharedSpecRepository = Arc<dyn SpecRepository>;
