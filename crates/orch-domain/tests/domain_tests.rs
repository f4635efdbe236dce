use orch_domain::{AdminConfig, EventType, GoldenPathsConfig, ResourceInstance, ResourceState};
use serde_json::json;

#[test]
fn resource_instance_starts_requested() {
    let app_id = uuid::Uuid::new_v4();
    let r = ResourceInstance::new(app_id, "db", "postgres", json!({"size": "small"}), "deadbeef".into());
    assert_eq!(r.state, ResourceState::Requested);
    assert_eq!(r.health_status, orch_domain::HealthStatus::Unknown);
    assert!(r.provider_id.is_none());
}

#[test]
fn event_type_round_trips_through_wire_string() {
    for (wire, expected) in [("resource.active", EventType::ResourceActive), ("step.failed", EventType::StepFailed)] {
        let parsed = EventType::from_wire_str(wire).unwrap();
        assert_eq!(parsed.as_wire_str(), wire);
        assert_eq!(parsed, expected);
    }
    assert!(EventType::from_wire_str("not.a.real.event").is_none());
}

#[test]
fn admin_config_parses_minimal_yaml() {
    let yaml = r#"
providers:
  - name: core-infra
    type: filesystem
    path: ./providers/core-infra
    enabled: true
engine:
  poll_interval_seconds: 10
  max_concurrent_workflows: 4
"#;
    let cfg = AdminConfig::from_yaml_str(yaml).expect("valid admin config");
    assert_eq!(cfg.providers.len(), 1);
    assert_eq!(cfg.providers[0].name, "core-infra");
    assert_eq!(cfg.engine.poll_interval_seconds, 10);
}

#[test]
fn golden_paths_accept_shorthand_and_full_forms() {
    let yaml = r#"
quick-deploy: workflows/quick-deploy.yaml
full-stack:
  workflow: workflows/full-stack.yaml
  description: Provision a full stack
  category: deployment
  required_params: [app_name]
"#;
    let cfg = GoldenPathsConfig::from_yaml_str(yaml).expect("valid golden paths");
    let mut paths = cfg.into_golden_paths();
    paths.sort_by(|a, b| a.name.cmp(&b.name));
    assert_eq!(paths.len(), 2);
    assert_eq!(paths[1].name, "quick-deploy");
    assert_eq!(paths[1].workflow, "workflows/quick-deploy.yaml");
    assert_eq!(paths[0].required_params, vec!["app_name".to_string()]);
}
