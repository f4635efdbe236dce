use std::collections::HashMap;

use orch_core::repository::{ResourceRepository, SpecRepository, WorkflowRepository};
use orch_domain::workflow::StepDefinitionConfig;
use orch_domain::{Application, ParsedSpec, ResourceInstance, ResourceState, ResourceStateTransition, Spec,
                   StepExecution, WorkflowExecution};
use orch_persistence::{build_dev_pool_from_env, PgResourceRepository, PgSpecRepository, PgWorkflowRepository,
                        PoolProvider};
use serde_json::json;

fn skip_without_db() -> bool {
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("DATABASE_URL not set - skipping Postgres integration test");
        true
    } else {
        false
    }
}

#[tokio::test]
async fn spec_and_application_roundtrip() {
    if skip_without_db() {
        return;
    }
    let pool = build_dev_pool_from_env().expect("pool");
    let repo = PgSpecRepository::new(PoolProvider { pool });

    let spec = Spec::new("roundtrip-app", "apiVersion: score.dev/v1b1".to_string(), ParsedSpec::default(), "owner-a");
    repo.insert_spec(spec.clone()).await.unwrap();

    let found = repo.find_spec_by_name("roundtrip-app").await.unwrap().expect("spec present");
    assert_eq!(found.id, spec.id);

    let app = Application::new(spec.id, "roundtrip-app-instance", "owner-a");
    repo.insert_application(app.clone()).await.unwrap();

    let fetched_app = repo.get_application(app.id).await.unwrap();
    assert_eq!(fetched_app.name, "roundtrip-app-instance");

    repo.delete_application(app.id).await.unwrap();
    assert!(repo.get_application(app.id).await.is_err());
}

#[tokio::test]
async fn resource_transition_commits_atomically() {
    if skip_without_db() {
        return;
    }
    let pool = build_dev_pool_from_env().expect("pool");
    let spec_repo = PgSpecRepository::new(PoolProvider { pool: pool.clone() });
    let resource_repo = PgResourceRepository::new(PoolProvider { pool });

    let spec = Spec::new("resource-app", "apiVersion: score.dev/v1b1".to_string(), ParsedSpec::default(), "owner-b");
    spec_repo.insert_spec(spec.clone()).await.unwrap();
    let app = Application::new(spec.id, "resource-app-instance", "owner-b");
    spec_repo.insert_application(app.clone()).await.unwrap();

    let mut resource =
        ResourceInstance::new(app.id, "db-main", "postgres", json!({"size": "small"}), "deadbeef".into());
    resource_repo.insert_resource(resource.clone()).await.unwrap();

    let claimed = resource_repo.claim_requested_resources(10).await.unwrap();
    assert!(claimed.iter().any(|r| r.id == resource.id));

    resource.state = ResourceState::Provisioning;
    resource.workflow_execution_id = Some(uuid::Uuid::new_v4());
    let transition = ResourceStateTransition::new(resource.id, Some(ResourceState::Requested),
                                                   ResourceState::Provisioning, "engine claimed resource", "engine",
                                                   json!({}));
    resource_repo.apply_transition(resource.clone(), transition).await.unwrap();

    let persisted = resource_repo.get_resource(resource.id).await.unwrap();
    assert_eq!(persisted.state, ResourceState::Provisioning);

    let history = resource_repo.list_transitions(resource.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].to_state, ResourceState::Provisioning);

    // Now claimed (workflow_execution_id set), it must not surface again.
    let still_pending = resource_repo.claim_requested_resources(10).await.unwrap();
    assert!(!still_pending.iter().any(|r| r.id == resource.id));
}

#[tokio::test]
async fn workflow_and_step_roundtrip() {
    if skip_without_db() {
        return;
    }
    let pool = build_dev_pool_from_env().expect("pool");
    let repo = PgWorkflowRepository::new(PoolProvider { pool });

    let execution = WorkflowExecution::new("provision-postgres", "resource-app-instance", None, HashMap::new(), 1);
    repo.insert_execution(execution.clone()).await.unwrap();

    let def = StepDefinitionConfig { name: "apply".into(),
                                      step_type: "terraform".into(),
                                      config: json!({}),
                                      timeout_seconds: None,
                                      retry: Default::default(),
                                      when: None,
                                      parallel_group: None };
    let mut step = StepExecution::new(execution.id, 0, &def, 300);
    repo.insert_step(step.clone()).await.unwrap();

    step.push_log("applying terraform plan");
    step.status = orch_domain::StepStatus::Running;
    repo.update_step(step.clone()).await.unwrap();

    let steps = repo.list_steps(execution.id).await.unwrap();
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].logs.len(), 1);
    assert_eq!(steps[0].status, orch_domain::StepStatus::Running);
}
