//! Workflow Executor (C6, §4.3).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use orch_domain::workflow::StepDefinitionConfig;
use orch_domain::{Event, EventType, StepExecution, StepStatus, WorkflowDefinition, WorkflowExecution,
                   WorkflowStatus};
use orch_policies::{DefaultParallelGroupPolicy, FixedBackoffRetryPolicy, ParallelGroupPolicy, RetryPolicy};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::{OrchError, OrchResult};
use crate::event_bus::EventBus;
use crate::repository::SharedWorkflowRepository;
use crate::step_executor::{StepContext, StepExecutorRegistry};
use crate::templating::resolve_template;

#[derive(Clone)]
pub struct WorkflowExecutor {
    repository: SharedWorkflowRepository,
    bus: Arc<EventBus>,
    registry: Arc<StepExecutorRegistry>,
    retry_policy: Arc<dyn RetryPolicy>,
    parallel_policy: Arc<dyn ParallelGroupPolicy>,
}

impl WorkflowExecutor {
    pub fn new(repository: SharedWorkflowRepository, bus: Arc<EventBus>, registry: Arc<StepExecutorRegistry>)
               -> Self {
        Self { repository,
               bus,
               registry,
               retry_policy: Arc::new(FixedBackoffRetryPolicy),
               parallel_policy: Arc::new(DefaultParallelGroupPolicy) }
    }

    /// Runs the whole workflow to completion. Returns `Ok` with the
    /// execution in its terminal status even when steps failed — the
    /// `OrchError` channel is reserved for failures to even start the run
    /// (e.g. persistence unavailable); a failed step is a normal, recorded
    /// outcome, not a Rust error out of `run`.
    pub async fn run(&self, definition: &WorkflowDefinition, mut execution: WorkflowExecution)
                      -> OrchResult<WorkflowExecution> {
        execution.status = WorkflowStatus::Running;
        execution.started_at = Some(Utc::now());
        self.repository.update_execution(execution.clone()).await?;
        self.publish_workflow(EventType::WorkflowStarted, &execution);

        let mut available = execution.inputs.clone();
        let groups = group_steps(&definition.steps);
        let cancel_remaining = self.parallel_policy.cancel_remaining_on_failure(definition.parallel_failure_policy);

        let mut ordinal = 0usize;
        let mut failure: Option<OrchError> = None;

        for group in groups {
            if failure.is_some() {
                break;
            }
            let indexed: Vec<(usize, StepDefinitionConfig)> = group.into_iter()
                                                                     .map(|d| {
                                                                         let o = ordinal;
                                                                         ordinal += 1;
                                                                         (o, d)
                                                                     })
                                                                     .collect();
            let (outputs, group_failure) =
                self.run_group(indexed, execution.id, &definition.name, definition.default_step_timeout_seconds,
                                available.clone(), cancel_remaining)
                    .await;
            available.extend(outputs);
            failure = group_failure;
        }

        execution.outputs = available;
        execution.completed_at = Some(Utc::now());
        if let Some(err) = failure {
            execution.status = WorkflowStatus::Failed;
            execution.error_message = Some(err.to_string());
            self.repository.update_execution(execution.clone()).await?;
            self.publish_workflow(EventType::WorkflowFailed, &execution);
        } else {
            execution.status = WorkflowStatus::Completed;
            self.repository.update_execution(execution.clone()).await?;
            self.publish_workflow(EventType::WorkflowCompleted, &execution);
        }
        Ok(execution)
    }

    async fn run_group(&self, group: Vec<(usize, StepDefinitionConfig)>, execution_id: Uuid, workflow_name: &str,
                        default_timeout: u64, available: HashMap<String, Value>, cancel_remaining: bool)
                        -> (HashMap<String, Value>, Option<OrchError>) {
        let mut tasks = FuturesUnordered::new();
        let mut abort_handles = Vec::new();

        for (ordinal, def) in group {
            let this = self.clone();
            let available = available.clone();
            let workflow_name = workflow_name.to_string();
            let handle = tokio::spawn(async move {
                this.run_step(execution_id, ordinal, &def, &workflow_name, default_timeout, &available).await
            });
            abort_handles.push(handle.abort_handle());
            tasks.push(handle);
        }

        let mut outputs = HashMap::new();
        let mut failure = None;
        while let Some(joined) = tasks.next().await {
            match joined {
                Ok(Ok(Some((name, value)))) => {
                    outputs.insert(name, value);
                }
                Ok(Ok(None)) => {}
                Ok(Err(e)) => {
                    if failure.is_none() {
                        failure = Some(e);
                    }
                    if cancel_remaining {
                        for h in &abort_handles {
                            h.abort();
                        }
                    }
                }
                Err(join_err) if join_err.is_cancelled() => {}
                Err(join_err) => {
                    if failure.is_none() {
                        failure = Some(OrchError::from_panic(&join_err.to_string()));
                    }
                }
            }
        }
        (outputs, failure)
    }

    async fn run_step(&self, execution_id: Uuid, ordinal: usize, def: &StepDefinitionConfig, workflow_name: &str,
                       default_timeout: u64, available: &HashMap<String, Value>)
                       -> Result<Option<(String, Value)>, OrchError> {
        let timeout_seconds = def.timeout_seconds.unwrap_or(default_timeout);
        let mut step = StepExecution::new(execution_id, ordinal, def, timeout_seconds);
        self.repository.insert_step(step.clone()).await?;

        if let Some(cond) = &def.when {
            if !self.evaluate_when(cond, available)? {
                step.status = StepStatus::Skipped;
                step.completed_at = Some(Utc::now());
                self.repository.update_step(step.clone()).await?;
                self.publish_step(EventType::StepProgress, &step, workflow_name);
                return Ok(None);
            }
        }

        step.status = StepStatus::Running;
        step.started_at = Some(Utc::now());
        self.repository.update_step(step.clone()).await?;
        self.publish_step(EventType::StepStarted, &step, workflow_name);

        let executor = match self.registry.resolve(&def.step_type) {
            Ok(e) => e,
            Err(e) => return Err(self.fail_step(&mut step, e, workflow_name).await),
        };

        loop {
            step.attempts += 1;
            let resolved_config = match resolve_template(&step.config, available) {
                Ok(v) => v,
                Err(e) => return Err(self.fail_step(&mut step, e, workflow_name).await),
            };
            step.push_log(format!("attempt {} started", step.attempts));
            self.repository.update_step(step.clone()).await?;

            let ctx = StepContext { workflow_name: workflow_name.to_string(),
                                     step_name: def.name.clone(),
                                     attempt: step.attempts,
                                     outputs_so_far: available.clone() };
            let outcome = tokio::time::timeout(Duration::from_secs(timeout_seconds.max(1)),
                                                executor.execute(&ctx, &resolved_config))
                .await;

            let attempt_error = match outcome {
                Ok(Ok(value)) => {
                    step.status = StepStatus::Completed;
                    step.output = Some(value.clone());
                    step.completed_at = Some(Utc::now());
                    step.push_log(format!("attempt {} succeeded", step.attempts));
                    self.repository.update_step(step.clone()).await?;
                    self.publish_step(EventType::StepCompleted, &step, workflow_name);
                    return Ok(Some((def.name.clone(), value)));
                }
                Ok(Err(e)) => e,
                Err(_elapsed) => OrchError::Timeout(timeout_seconds),
            };

            step.push_log(format!("attempt {} failed: {attempt_error}", step.attempts));
            if self.retry_policy.should_retry(&def.retry, step.attempts) {
                self.repository.update_step(step.clone()).await?;
                tokio::time::sleep(self.retry_policy.backoff(&def.retry, step.attempts)).await;
                continue;
            }
            return Err(self.fail_step(&mut step, attempt_error, workflow_name).await);
        }
    }

    async fn fail_step(&self, step: &mut StepExecution, error: OrchError, workflow_name: &str) -> OrchError {
        step.status = StepStatus::Failed;
        step.error_message = Some(error.to_string());
        step.completed_at = Some(Utc::now());
        let _ = self.repository.update_step(step.clone()).await;
        self.publish_step(EventType::StepFailed, step, workflow_name);
        error
    }

    /// `when` conditions are resolved through the same `${name}` templating
    /// as step config, then read as a boolean: `true`/`false` literals, or
    /// truthiness of the resolved JSON value otherwise.
    fn evaluate_when(&self, condition: &str, available: &HashMap<String, Value>) -> Result<bool, OrchError> {
        let resolved = resolve_template(&Value::String(condition.to_string()), available)?;
        Ok(match resolved {
            Value::Bool(b) => b,
            Value::String(s) => matches!(s.as_str(), "true"),
            Value::Null => false,
            _ => true,
        })
    }

    fn publish_workflow(&self, event_type: EventType, execution: &WorkflowExecution) {
        let mut payload = HashMap::new();
        payload.insert("workflow_execution_id".to_string(), serde_json::json!(execution.id));
        payload.insert("workflow_name".to_string(), serde_json::json!(execution.workflow_name));
        self.bus.publish(Event::new(event_type, "workflow_executor",
                                     Some(execution.application_name.clone()), payload));
    }

    fn publish_step(&self, event_type: EventType, step: &StepExecution, workflow_name: &str) {
        let mut payload = HashMap::new();
        payload.insert("workflow_execution_id".to_string(), serde_json::json!(step.workflow_execution_id));
        payload.insert("step_name".to_string(), serde_json::json!(step.name));
        payload.insert("workflow_name".to_string(), serde_json::json!(workflow_name));
        payload.insert("status".to_string(), serde_json::json!(step.status));
        self.bus.publish(Event::new(event_type, "workflow_executor", None, payload));
    }
}

fn group_steps(steps: &[StepDefinitionConfig]) -> Vec<Vec<StepDefinitionConfig>> {
    let mut groups: Vec<Vec<StepDefinitionConfig>> = Vec::new();
    for step in steps {
        let joins_last = match (&step.parallel_group, groups.last()) {
            (Some(g), Some(last)) => last.first().and_then(|s| s.parallel_group.as_deref()) == Some(g.as_str()),
            _ => false,
        };
        if joins_last {
            groups.last_mut().unwrap().push(step.clone());
        } else {
            groups.push(vec![step.clone()]);
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use orch_domain::workflow::RetryConfig;
    use orch_domain::ParallelFailurePolicy;
    use serde_json::json;

    use super::*;
    use crate::repository::InMemoryWorkflowRepository;
    use crate::step_executor::StepExecutor;

    struct AlwaysOk;
    #[async_trait]
    impl StepExecutor for AlwaysOk {
        fn step_type(&self) -> &'static str {
            "ok"
        }

        async fn execute(&self, _ctx: &StepContext, config: &Value) -> Result<Value, OrchError> {
            Ok(config.clone())
        }
    }

    struct AlwaysFail;
    #[async_trait]
    impl StepExecutor for AlwaysFail {
        fn step_type(&self) -> &'static str {
            "fail"
        }

        async fn execute(&self, _ctx: &StepContext, _config: &Value) -> Result<Value, OrchError> {
            Err(OrchError::External("boom".into()))
        }
    }

    fn step(name: &str, step_type: &str) -> StepDefinitionConfig {
        StepDefinitionConfig { name: name.into(),
                                step_type: step_type.into(),
                                config: json!({}),
                                timeout_seconds: Some(5),
                                retry: RetryConfig { max_attempts: 1, backoff_seconds: 0 },
                                when: None,
                                parallel_group: None }
    }

    fn executor() -> WorkflowExecutor {
        let mut registry = StepExecutorRegistry::new();
        registry.register(Arc::new(AlwaysOk));
        registry.register(Arc::new(AlwaysFail));
        WorkflowExecutor::new(Arc::new(InMemoryWorkflowRepository::new()), Arc::new(EventBus::with_buffer(64)),
                               Arc::new(registry))
    }

    #[tokio::test]
    async fn all_steps_completed_marks_workflow_completed() {
        let exec = executor();
        let def = WorkflowDefinition { name: "wf".into(),
                                        steps: vec![step("a", "ok"), step("b", "ok")],
                                        parallel_failure_policy: ParallelFailurePolicy::CancelRemaining,
                                        default_step_timeout_seconds: 5 };
        let execution = WorkflowExecution::new("wf", "app", None, HashMap::new(), 2);
        let result = exec.run(&def, execution).await.unwrap();
        assert_eq!(result.status, WorkflowStatus::Completed);
    }

    #[tokio::test]
    async fn a_failed_step_stops_subsequent_steps() {
        let exec = executor();
        let def = WorkflowDefinition { name: "wf".into(),
                                        steps: vec![step("a", "fail"), step("b", "ok")],
                                        parallel_failure_policy: ParallelFailurePolicy::CancelRemaining,
                                        default_step_timeout_seconds: 5 };
        let execution = WorkflowExecution::new("wf", "app", None, HashMap::new(), 2);
        let result = exec.run(&def, execution).await.unwrap();
        assert_eq!(result.status, WorkflowStatus::Failed);

        let steps = exec.repository.list_steps(result.id).await.unwrap();
        assert_eq!(steps.len(), 1, "step b must never have been created");
    }

    #[tokio::test]
    async fn unknown_step_type_fails_the_workflow() {
        let exec = executor();
        let def = WorkflowDefinition { name: "wf".into(),
                                        steps: vec![step("a", "does-not-exist")],
                                        parallel_failure_policy: ParallelFailurePolicy::CancelRemaining,
                                        default_step_timeout_seconds: 5 };
        let execution = WorkflowExecution::new("wf", "app", None, HashMap::new(), 1);
        let result = exec.run(&def, execution).await.unwrap();
        assert_eq!(result.status, WorkflowStatus::Failed);
    }

    #[tokio::test]
    async fn step_outputs_are_available_to_later_steps_via_templating() {
        let exec = executor();
        let mut producer = step("producer", "ok");
        producer.config = json!("value-from-producer");
        let mut consumer = step("consumer", "ok");
        consumer.config = json!("${producer}");
        let def = WorkflowDefinition { name: "wf".into(),
                                        steps: vec![producer, consumer],
                                        parallel_failure_policy: ParallelFailurePolicy::CancelRemaining,
                                        default_step_timeout_seconds: 5 };
        let execution = WorkflowExecution::new("wf", "app", None, HashMap::new(), 2);
        let result = exec.run(&def, execution).await.unwrap();
        assert_eq!(result.status, WorkflowStatus::Completed);
        assert_eq!(result.outputs.get("consumer"), Some(&json!("value-from-producer")));
    }
}
