//! `ansible` step executor (§4.5): runs `ansible-playbook` against a
//! playbook file with an optional inventory and extra-vars payload.

use std::collections::HashMap;

use async_trait::async_trait;
use orch_core::{OrchError, StepContext, StepExecutor};
use serde::Deserialize;
use serde_json::Value;

use crate::process::{run, ProcessSpec};

#[derive(Deserialize)]
struct AnsibleConfig {
    playbook: String,
    #[serde(default)]
    inventory: Option<String>,
    #[serde(default)]
    extra_vars: Option<Value>,
}

pub struct AnsibleExecutor;

#[async_trait]
impl StepExecutor for AnsibleExecutor {
    fn step_type(&self) -> &'static str {
        "ansible"
    }

    async fn execute(&self, _ctx: &StepContext, config: &Value) -> Result<Value, OrchError> {
        let cfg: AnsibleConfig = serde_json::from_value(config.clone())
            .map_err(|e| OrchError::Validation(format!("ansible step config: {e}")))?;

        let mut args = vec![cfg.playbook.clone()];
        if let Some(inventory) = &cfg.inventory {
            args.push("-i".to_string());
            args.push(inventory.clone());
        }
        if let Some(extra_vars) = &cfg.extra_vars {
            args.push("--extra-vars".to_string());
            args.push(extra_vars.to_string());
        }

        run(ProcessSpec { program: "ansible-playbook",
                          args,
                          cwd: None,
                          env: HashMap::new(),
                          stdin: None }).await
    }
}
