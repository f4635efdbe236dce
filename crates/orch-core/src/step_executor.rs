//! Step-type dispatch (§4.3 "Step contract").
//!
//! `orch-adapters` registers the concrete executors (terraform, kubernetes,
//! ansible, git, http, script, and provider-specific wrappers); this module
//! only defines the trait and the registry that dispatches on the step's
//! `type` string.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::OrchError;

/// Context handed to a step executor: the resolved config (after `${name}`
/// substitution) and the accumulated outputs of prior steps, for executors
/// that want to look beyond their own config.
pub struct StepContext {
    pub workflow_name: String,
    pub step_name: String,
    pub attempt: u32,
    pub outputs_so_far: HashMap<String, Value>,
}

#[async_trait]
pub trait StepExecutor: Send + Sync {
    /// The `type` string this executor handles, e.g. `"kubernetes"`.
    fn step_type(&self) -> &'static str;

    /// Runs the step to completion or failure. Must itself honour
    /// cancellation promptly at its next suspension point (§5
    /// "Cancellation & timeouts") — the executor wraps this call in
    /// `tokio::time::timeout` and a cancellation token, but a step that
    /// ignores both will block the timeout from taking effect until it next
    /// awaits.
    async fn execute(&self, ctx: &StepContext, config: &Value) -> Result<Value, OrchError>;
}

/// Resolves a step's `type` string to its executor. Unknown types fail
/// immediately with `UnknownStepType` (§4.3), surfaced here as
/// `OrchError::Validation`.
#[derive(Default, Clone)]
pub struct StepExecutorRegistry {
    executors: HashMap<String, Arc<dyn StepExecutor>>,
}

impl StepExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, executor: Arc<dyn StepExecutor>) {
        self.executors.insert(executor.step_type().to_string(), executor);
    }

    pub fn resolve(&self, step_type: &str) -> Result<Arc<dyn StepExecutor>, OrchError> {
        self.executors
            .get(step_type)
            .cloned()
            .ok_or_else(|| OrchError::Validation(format!("UnknownStepType: '{step_type}'")))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;

    use super::*;

    struct EchoExecutor;

    #[async_trait]
    impl StepExecutor for EchoExecutor {
        fn step_type(&self) -> &'static str {
            "echo"
        }

        async fn execute(&self, _ctx: &StepContext, config: &Value) -> Result<Value, OrchError> {
            Ok(config.clone())
        }
    }

    #[tokio::test]
    async fn resolves_registered_type_and_dispatches() {
        let mut registry = StepExecutorRegistry::new();
        registry.register(Arc::new(EchoExecutor));

        let executor = registry.resolve("echo").unwrap();
        let ctx = StepContext { workflow_name: "wf".into(), step_name: "s1".into(), attempt: 1,
                                 outputs_so_far: HashMap::new() };
        let out = executor.execute(&ctx, &json!({"ok": true})).await.unwrap();
        assert_eq!(out, json!({"ok": true}));
    }

    #[test]
    fn unknown_type_fails_immediately() {
        let registry = StepExecutorRegistry::new();
        let err = match registry.resolve("nonexistent") {
            Err(e) => e,
            Ok(_) => panic!("expected resolve to fail"),
        };
        assert!(matches!(err, OrchError::Validation(_)));
    }
}
