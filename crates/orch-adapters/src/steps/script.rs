//! `script` step executor (§4.5): runs an arbitrary local command. Unlike
//! the other executors this one deliberately has no network surface to
//! allow-list — it is meant for local glue (templating a file, invoking a
//! helper binary already present on the runner) rather than reaching
//! outward itself.

use std::collections::HashMap;

use async_trait::async_trait;
use orch_core::{OrchError, StepContext, StepExecutor};
use serde::Deserialize;
use serde_json::Value;

use crate::process::{run, ProcessSpec};

#[derive(Deserialize)]
struct ScriptConfig {
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    cwd: Option<String>,
    #[serde(default)]
    env: HashMap<String, String>,
}

pub struct ScriptExecutor;

#[async_trait]
impl StepExecutor for ScriptExecutor {
    fn step_type(&self) -> &'static str {
        "script"
    }

    async fn execute(&self, _ctx: &StepContext, config: &Value) -> Result<Value, OrchError> {
        let cfg: ScriptConfig = serde_json::from_value(config.clone())
            .map_err(|e| OrchError::Validation(format!("script step config: {e}")))?;

        run(ProcessSpec { program: &cfg.command,
                          args: cfg.args,
                          cwd: cfg.cwd.as_deref(),
                          env: cfg.env,
                          stdin: None }).await
    }
}
