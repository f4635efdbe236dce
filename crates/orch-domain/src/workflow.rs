//! Workflow executor data model (§3, §4.3, §C.3).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default)]
    pub backoff_seconds: u64,
}

fn default_max_attempts() -> u32 {
    1
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 1, backoff_seconds: 0 }
    }
}

/// A declarative step, as authored in a workflow definition file. `config`
/// templates `${name}` references to prior steps' outputs lexically, resolved
/// at execution time (§4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDefinitionConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub step_type: String,
    #[serde(default)]
    pub config: serde_json::Value,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub when: Option<String>,
    #[serde(default)]
    pub parallel_group: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ParallelFailurePolicy {
    #[default]
    CancelRemaining,
    LetFinish,
}

/// A full workflow definition: an ordered list of steps plus the default
/// parallel-group failure policy (Open Question (c)) and a fallback timeout
/// for steps that don't set their own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub name: String,
    pub steps: Vec<StepDefinitionConfig>,
    #[serde(default)]
    pub parallel_failure_policy: ParallelFailurePolicy,
    #[serde(default = "default_workflow_timeout")]
    pub default_step_timeout_seconds: u64,
}

fn default_workflow_timeout() -> u64 {
    300
}

/// A single run of a `WorkflowDefinition`, bound to the resource it is
/// provisioning (§3 "WorkflowExecution").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowExecution {
    pub id: Uuid,
    pub workflow_name: String,
    pub application_name: String,
    pub parent_resource_id: Option<Uuid>,
    pub status: WorkflowStatus,
    pub inputs: HashMap<String, serde_json::Value>,
    pub outputs: HashMap<String, serde_json::Value>,
    pub total_steps: usize,
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkflowExecution {
    pub fn new(workflow_name: impl Into<String>, application_name: impl Into<String>,
               parent_resource_id: Option<Uuid>, inputs: HashMap<String, serde_json::Value>, total_steps: usize)
               -> Self {
        Self { id: Uuid::new_v4(),
               workflow_name: workflow_name.into(),
               application_name: application_name.into(),
               parent_resource_id,
               status: WorkflowStatus::Pending,
               inputs,
               outputs: HashMap::new(),
               total_steps,
               error_message: None,
               started_at: None,
               completed_at: None }
    }
}

/// One step's execution record, including its accumulated log lines
/// (SPEC_FULL §C.3: logs are appended per-attempt, not just at the end).
/// **Invariant I3**: `(workflow_execution_id, ordinal)` is unique and
/// ordinals are a contiguous, strictly increasing prefix within a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepExecution {
    pub id: Uuid,
    pub workflow_execution_id: Uuid,
    pub ordinal: usize,
    pub name: String,
    pub step_type: String,
    pub status: StepStatus,
    pub config: serde_json::Value,
    pub attempts: u32,
    pub max_attempts: u32,
    pub timeout_seconds: u64,
    pub output: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub logs: Vec<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl StepExecution {
    pub fn new(workflow_execution_id: Uuid, ordinal: usize, def: &StepDefinitionConfig, timeout_seconds: u64) -> Self {
        Self { id: Uuid::new_v4(),
               workflow_execution_id,
               ordinal,
               name: def.name.clone(),
               step_type: def.step_type.clone(),
               status: StepStatus::Pending,
               config: def.config.clone(),
               attempts: 0,
               max_attempts: def.retry.max_attempts.max(1),
               timeout_seconds,
               output: None,
               error_message: None,
               logs: Vec::new(),
               started_at: None,
               completed_at: None }
    }

    pub fn push_log(&mut self, line: impl Into<String>) {
        self.logs.push(format!("[{}] {}", Utc::now().to_rfc3339(), line.into()));
    }
}

/// Outputs of already-finished steps, keyed by step name, available to later
/// steps for `${name}` templating.
pub type StepOutputs = HashMap<String, serde_json::Value>;
