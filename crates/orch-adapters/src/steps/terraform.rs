//! `terraform` step executor (§4.5): runs `terraform <action>` against a
//! working directory, returning the captured stdout/stderr/exit code as the
//! step's output.

use std::collections::HashMap;

use async_trait::async_trait;
use orch_core::{OrchError, StepContext, StepExecutor};
use serde::Deserialize;
use serde_json::Value;

use crate::process::{run, ProcessSpec};

#[derive(Deserialize)]
struct TerraformConfig {
    working_dir: String,
    #[serde(default = "default_action")]
    action: String,
    #[serde(default)]
    var_file: Option<String>,
}

fn default_action() -> String {
    "apply".to_string()
}

pub struct TerraformExecutor;

#[async_trait]
impl StepExecutor for TerraformExecutor {
    fn step_type(&self) -> &'static str {
        "terraform"
    }

    async fn execute(&self, _ctx: &StepContext, config: &Value) -> Result<Value, OrchError> {
        let cfg: TerraformConfig = serde_json::from_value(config.clone())
            .map_err(|e| OrchError::Validation(format!("terraform step config: {e}")))?;

        if !["plan", "apply", "destroy"].contains(&cfg.action.as_str()) {
            return Err(OrchError::Validation(format!("terraform action '{}' is not supported", cfg.action)));
        }

        let mut args = vec![cfg.action.clone()];
        if cfg.action != "plan" {
            args.push("-auto-approve".to_string());
        }
        if let Some(var_file) = &cfg.var_file {
            args.push(format!("-var-file={var_file}"));
        }

        run(ProcessSpec { program: "terraform",
                          args,
                          cwd: Some(&cfg.working_dir),
                          env: HashMap::new(),
                          stdin: None }).await
    }
}
