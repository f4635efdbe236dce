//! `kubernetes` step executor (§4.5): renders/applies a manifest via
//! `kubectl apply -f -`, piping the manifest body on stdin so no temp file
//! management is needed.

use std::collections::HashMap;

use async_trait::async_trait;
use orch_core::{OrchError, StepContext, StepExecutor};
use serde::Deserialize;
use serde_json::Value;

use crate::process::{run, ProcessSpec};

#[derive(Deserialize)]
struct KubernetesConfig {
    manifest: String,
    #[serde(default)]
    context: Option<String>,
    #[serde(default)]
    namespace: Option<String>,
}

pub struct KubernetesExecutor;

#[async_trait]
impl StepExecutor for KubernetesExecutor {
    fn step_type(&self) -> &'static str {
        "kubernetes"
    }

    async fn execute(&self, _ctx: &StepContext, config: &Value) -> Result<Value, OrchError> {
        let cfg: KubernetesConfig = serde_json::from_value(config.clone())
            .map_err(|e| OrchError::Validation(format!("kubernetes step config: {e}")))?;

        let mut args = vec!["apply".to_string(), "-f".to_string(), "-".to_string()];
        if let Some(context) = &cfg.context {
            args.push(format!("--context={context}"));
        }
        if let Some(namespace) = &cfg.namespace {
            args.push(format!("--namespace={namespace}"));
        }

        run(ProcessSpec { program: "kubectl",
                          args,
                          cwd: None,
                          env: HashMap::new(),
                          stdin: Some(cfg.manifest) }).await
    }
}
