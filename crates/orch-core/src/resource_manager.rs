//! Resource Manager (C4, §4.1): sole authority on resource state.

use std::collections::HashMap;
use std::sync::Arc;

use orch_domain::{Application, Event, EventType, HealthStatus, ResourceInstance, ResourceState,
                   ResourceStateTransition};
use orch_policies::{FixedTransitionGraph, TransitionPolicy};
use uuid::Uuid;

use crate::errors::{OrchError, OrchResult};
use crate::event_bus::EventBus;
use crate::hashing::hash_value;
use crate::repository::SharedResourceRepository;

/// A resource as declared in a Score spec, already resolved to its merged
/// `configuration` (params + properties).
pub struct DeclaredResource {
    pub name: String,
    pub resource_type: String,
    pub configuration: serde_json::Value,
}

pub struct ResourceManager {
    repository: SharedResourceRepository,
    bus: Arc<EventBus>,
    transition_policy: Arc<dyn TransitionPolicy>,
}

impl ResourceManager {
    pub fn new(repository: SharedResourceRepository, bus: Arc<EventBus>) -> Self {
        Self { repository, bus, transition_policy: Arc::new(FixedTransitionGraph) }
    }

    pub fn with_transition_policy(mut self, policy: Arc<dyn TransitionPolicy>) -> Self {
        self.transition_policy = policy;
        self
    }

    /// Inserts one `requested` resource per declared resource, idempotent on
    /// `(application, resource_name)`: existing resources are left
    /// untouched here (resubmission/patch semantics live in
    /// `reconcile_spec_update`, Open Question (a)).
    pub async fn create_resources_from_spec(&self, app: &Application, declared: Vec<DeclaredResource>,
                                             actor: &str)
                                             -> OrchResult<Vec<ResourceInstance>> {
        let mut created = Vec::with_capacity(declared.len());
        for d in declared {
            if self.repository.find_resource_by_app_and_name(app.id, &d.name).await?.is_some() {
                continue;
            }
            let hash = hash_value(&d.configuration);
            let resource = ResourceInstance::new(app.id, d.name, d.resource_type, d.configuration, hash);
            self.repository.insert_resource(resource.clone()).await?;

            let transition =
                ResourceStateTransition::new(resource.id, None, ResourceState::Requested, "created from spec", actor,
                                              serde_json::Value::Null);
            self.repository.apply_transition(resource.clone(), transition).await?;

            self.publish(EventType::ResourceCreated, Some(app.name.clone()), &resource);
            self.publish(EventType::ResourceRequested, Some(app.name.clone()), &resource);
            created.push(resource);
        }
        Ok(created)
    }

    /// Diffs the spec's resources against existing ones by
    /// `configuration_hash`: unchanged resources are untouched, changed ones
    /// are patched in place without a lifecycle transition, new names are
    /// created as `requested` (Open Question (a)).
    pub async fn reconcile_spec_update(&self, app: &Application, declared: Vec<DeclaredResource>)
                                        -> OrchResult<Vec<ResourceInstance>> {
        let mut touched = Vec::with_capacity(declared.len());
        for d in declared {
            let hash = hash_value(&d.configuration);
            match self.repository.find_resource_by_app_and_name(app.id, &d.name).await? {
                Some(mut existing) if existing.configuration_hash != hash => {
                    existing.configuration = d.configuration;
                    existing.configuration_hash = hash;
                    existing.updated_at = chrono::Utc::now();
                    self.repository.insert_resource(existing.clone()).await?;
                    touched.push(existing);
                }
                Some(existing) => touched.push(existing),
                None => {
                    let hash = hash_value(&d.configuration);
                    let resource = ResourceInstance::new(app.id, d.name, d.resource_type, d.configuration, hash);
                    self.repository.insert_resource(resource.clone()).await?;
                    let transition = ResourceStateTransition::new(resource.id, None, ResourceState::Requested,
                                                                    "created from spec update", "system",
                                                                    serde_json::Value::Null);
                    self.repository.apply_transition(resource.clone(), transition).await?;
                    self.publish(EventType::ResourceCreated, Some(app.name.clone()), &resource);
                    self.publish(EventType::ResourceRequested, Some(app.name.clone()), &resource);
                    touched.push(resource);
                }
            }
        }
        Ok(touched)
    }

    /// Validates `(current, new) ∈ allowed transitions`, then atomically
    /// updates the resource and appends the audit row (Invariant I1/I2).
    pub async fn transition_state(&self, resource_id: Uuid, new_state: ResourceState, reason: &str, actor: &str,
                                   metadata: serde_json::Value, app_name: Option<String>)
                                   -> OrchResult<ResourceInstance> {
        let mut resource = self.repository.get_resource(resource_id).await?;
        if resource.state == new_state {
            return Ok(resource);
        }
        if !self.transition_policy.is_allowed(Some(resource.state), new_state) {
            return Err(OrchError::InvalidTransition { from: resource.state.as_str().to_string(),
                                                        to: new_state.as_str().to_string() });
        }

        let from = Some(resource.state);
        resource.state = new_state;
        resource.updated_at = chrono::Utc::now();

        let transition = ResourceStateTransition::new(resource.id, from, new_state, reason, actor, metadata);
        self.repository.apply_transition(resource.clone(), transition).await?;

        self.publish(event_type_for_state(new_state), app_name, &resource);
        Ok(resource)
    }

    /// On success, transitions to `active` and stores outputs; on failure,
    /// transitions to `failed` with the error preserved (§4.1).
    pub async fn record_provision_result(&self, resource_id: Uuid, app_name: Option<String>,
                                          result: Result<serde_json::Value, String>)
                                          -> OrchResult<ResourceInstance> {
        match result {
            Ok(provider_metadata) => {
                let mut resource = self.repository.get_resource(resource_id).await?;
                resource.provider_metadata = provider_metadata;
                resource.error_message = None;
                self.repository.insert_resource(resource.clone()).await?;
                self.transition_state(resource_id, ResourceState::Active, "provisioning succeeded", "engine",
                                       serde_json::Value::Null, app_name)
                    .await
            }
            Err(error_message) => {
                let mut resource = self.repository.get_resource(resource_id).await?;
                resource.error_message = Some(error_message.clone());
                self.repository.insert_resource(resource.clone()).await?;
                self.transition_state(resource_id, ResourceState::Failed, &error_message, "engine",
                                       serde_json::Value::Null, app_name)
                    .await
            }
        }
    }

    pub async fn deprovision(&self, resource_id: Uuid, actor: &str, app_name: Option<String>)
                              -> OrchResult<ResourceInstance> {
        self.transition_state(resource_id, ResourceState::Terminating, "deprovision requested", actor,
                               serde_json::Value::Null, app_name.clone())
            .await?;
        self.transition_state(resource_id, ResourceState::Terminated, "deprovision completed", actor,
                               serde_json::Value::Null, app_name)
            .await
    }

    /// Updates `health_status` without a lifecycle transition (§4.1
    /// "Health-check failures ... do not change lifecycle state").
    pub async fn update_health(&self, resource_id: Uuid, status: HealthStatus, error: Option<String>)
                                -> OrchResult<ResourceInstance> {
        let mut resource = self.repository.get_resource(resource_id).await?;
        resource.health_status = status;
        if error.is_some() {
            resource.error_message = error;
        }
        resource.updated_at = chrono::Utc::now();
        self.repository.insert_resource(resource.clone()).await?;
        Ok(resource)
    }

    pub async fn record_health_check(&self, resource_id: Uuid, status: HealthStatus, message: Option<String>)
                                      -> OrchResult<()> {
        let mut resource = self.repository.get_resource(resource_id).await?;
        resource.health_status = status;
        resource.updated_at = chrono::Utc::now();
        let check = orch_domain::ResourceHealthCheck::new(resource_id, status, message);
        self.repository.record_health_check(resource, check).await
    }

    pub async fn update_hints(&self, resource_id: Uuid, hints: Vec<orch_domain::Hint>) -> OrchResult<()> {
        let mut resource = self.repository.get_resource(resource_id).await?;
        resource.hints = hints;
        resource.updated_at = chrono::Utc::now();
        self.repository.insert_resource(resource).await
    }

    /// Clears a claim (`workflow_execution_id`) taken by
    /// `claim_requested_resources` without having advanced the resource out
    /// of `requested`, so a later tick can claim it again instead of it
    /// being stranded (§4.4: a claim that never reaches `provisioning` must
    /// not permanently remove the resource from future claims).
    pub async fn release_claim(&self, resource_id: Uuid) -> OrchResult<()> {
        let mut resource = self.repository.get_resource(resource_id).await?;
        resource.workflow_execution_id = None;
        resource.updated_at = chrono::Utc::now();
        self.repository.insert_resource(resource).await
    }

    fn publish(&self, event_type: EventType, app_name: Option<String>, resource: &ResourceInstance) {
        let mut payload = HashMap::new();
        payload.insert("resource_id".to_string(), serde_json::json!(resource.id));
        payload.insert("resource_type".to_string(), serde_json::json!(resource.resource_type));
        payload.insert("state".to_string(), serde_json::json!(resource.state.as_str()));
        self.bus.publish(Event::new(event_type, "resource_manager", app_name, payload));
    }
}

fn event_type_for_state(state: ResourceState) -> EventType {
    match state {
        ResourceState::Requested => EventType::ResourceRequested,
        ResourceState::Provisioning => EventType::ResourceProvisioning,
        ResourceState::Active => EventType::ResourceActive,
        ResourceState::Failed => EventType::ResourceFailed,
        ResourceState::Terminated => EventType::ResourceTerminated,
        _ => EventType::ResourceProvisioning,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use orch_domain::EventFilter;
    use serde_json::json;

    use super::*;
    use crate::repository::InMemoryResourceRepository;

    fn manager() -> (ResourceManager, Arc<EventBus>) {
        let bus = Arc::new(EventBus::with_buffer(64));
        let repo = Arc::new(InMemoryResourceRepository::new());
        (ResourceManager::new(repo, bus.clone()), bus)
    }

    #[tokio::test]
    async fn create_resources_from_spec_is_idempotent_on_name() {
        let (mgr, _bus) = manager();
        let app = Application::new(Uuid::new_v4(), "checkout", "team-a");
        let declared =
            vec![DeclaredResource { name: "db".into(), resource_type: "postgres".into(), configuration: json!({}) }];

        let first = mgr.create_resources_from_spec(&app, declared, "alice").await.unwrap();
        assert_eq!(first.len(), 1);

        let declared_again =
            vec![DeclaredResource { name: "db".into(), resource_type: "postgres".into(), configuration: json!({}) }];
        let second = mgr.create_resources_from_spec(&app, declared_again, "alice").await.unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn illegal_transition_is_rejected_and_leaves_state_unchanged() {
        let (mgr, _bus) = manager();
        let app = Application::new(Uuid::new_v4(), "checkout", "team-a");
        let declared =
            vec![DeclaredResource { name: "db".into(), resource_type: "postgres".into(), configuration: json!({}) }];
        let created = mgr.create_resources_from_spec(&app, declared, "alice").await.unwrap();
        let resource_id = created[0].id;

        let err = mgr.transition_state(resource_id, ResourceState::Active, "skip ahead", "alice", json!(null), None)
                     .await
                     .unwrap_err();
        assert!(matches!(err, OrchError::InvalidTransition { .. }));

        let resource = mgr.repository.get_resource(resource_id).await.unwrap();
        assert_eq!(resource.state, ResourceState::Requested);
    }

    #[tokio::test]
    async fn legal_transition_appends_exactly_one_audit_row() {
        let (mgr, _bus) = manager();
        let app = Application::new(Uuid::new_v4(), "checkout", "team-a");
        let declared =
            vec![DeclaredResource { name: "db".into(), resource_type: "postgres".into(), configuration: json!({}) }];
        let created = mgr.create_resources_from_spec(&app, declared, "alice").await.unwrap();
        let resource_id = created[0].id;

        mgr.transition_state(resource_id, ResourceState::Provisioning, "picked up", "engine", json!(null), None)
           .await
           .unwrap();

        let transitions = mgr.repository.list_transitions(resource_id).await.unwrap();
        assert_eq!(transitions.len(), 2); // initial requested + provisioning
    }

    #[tokio::test]
    async fn reconcile_patches_only_changed_resources() {
        let (mgr, _bus) = manager();
        let app = Application::new(Uuid::new_v4(), "checkout", "team-a");
        let declared = vec![DeclaredResource { name: "db".into(),
                                                resource_type: "postgres".into(),
                                                configuration: json!({"size": "small"}) }];
        let created = mgr.create_resources_from_spec(&app, declared, "alice").await.unwrap();
        let original_hash = created[0].configuration_hash.clone();

        let patch = vec![DeclaredResource { name: "db".into(),
                                             resource_type: "postgres".into(),
                                             configuration: json!({"size": "large"}) }];
        let patched = mgr.reconcile_spec_update(&app, patch).await.unwrap();
        assert_ne!(patched[0].configuration_hash, original_hash);

        let transitions = mgr.repository.list_transitions(created[0].id).await.unwrap();
        assert_eq!(transitions.len(), 1, "configuration drift is not a lifecycle event");
    }

    #[tokio::test]
    async fn transitions_publish_events_subscribers_can_filter_on() {
        let (mgr, bus) = manager();
        let mut sub = bus.subscribe(EventFilter { app_name: None, types: vec![EventType::ResourceCreated] });
        let app = Application::new(Uuid::new_v4(), "checkout", "team-a");
        let declared =
            vec![DeclaredResource { name: "db".into(), resource_type: "postgres".into(), configuration: json!({}) }];
        mgr.create_resources_from_spec(&app, declared, "alice").await.unwrap();

        let event = sub.recv().await.unwrap();
        assert_eq!(event.event_type, EventType::ResourceCreated);
    }
}
