//! `/api/workflows` (§6): read access to workflow executions and their
//! steps, plus golden-path execution — a named, pre-validated entry point
//! into the same `WorkflowExecutor` the engine drives (SPEC_FULL §C.2).

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::Json;
use orch_domain::workflow::WorkflowDefinition;
use orch_domain::{StepExecution, WorkflowExecution};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use orch_core::OrchError;

use crate::http::error::ApiResult;
use crate::state::AppState;

pub async fn list_workflows(State(state): State<AppState>) -> ApiResult<Json<Vec<WorkflowExecution>>> {
    Ok(Json(state.workflow_repo.list_executions().await?))
}

#[derive(Serialize)]
pub struct WorkflowDetail {
    #[serde(flatten)]
    pub execution: WorkflowExecution,
    pub steps: Vec<StepExecution>,
}

pub async fn get_workflow(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<WorkflowDetail>> {
    let execution = state.workflow_repo.get_execution(id).await?;
    let steps = state.workflow_repo.list_steps(id).await?;
    Ok(Json(WorkflowDetail { execution, steps }))
}

#[derive(Deserialize, Default)]
pub struct ExecuteGoldenPathRequest {
    #[serde(default)]
    pub params: HashMap<String, serde_json::Value>,
    #[serde(default = "default_application_name")]
    pub application_name: String,
}

fn default_application_name() -> String {
    "golden-path".to_string()
}

pub async fn execute_golden_path(State(state): State<AppState>, Path(name): Path<String>,
                                  Json(req): Json<ExecuteGoldenPathRequest>)
                                  -> ApiResult<Json<WorkflowExecution>> {
    let golden_path = state.golden_paths
                            .read()
                            .await
                            .iter()
                            .find(|g| g.name == name)
                            .cloned()
                            .ok_or_else(|| OrchError::NotFound(format!("golden path '{name}' not found")))?;

    for required in &golden_path.required_params {
        if !req.params.contains_key(required) {
            return Err(OrchError::Validation(format!("golden path '{name}' requires param '{required}'")).into());
        }
    }

    let raw = tokio::fs::read_to_string(&golden_path.workflow).await
        .map_err(|e| OrchError::External(format!("reading workflow file '{}': {e}", golden_path.workflow)))?;
    let definition: WorkflowDefinition = serde_yaml::from_str(&raw)
        .map_err(|e| OrchError::Validation(format!("parsing workflow file '{}': {e}", golden_path.workflow)))?;

    let mut inputs = golden_path.optional_params.clone();
    inputs.extend(req.params);

    let execution =
        WorkflowExecution::new(definition.name.clone(), req.application_name, None, inputs, definition.steps.len());
    state.workflow_repo.insert_execution(execution.clone()).await?;

    let result = state.workflow_executor.run(&definition, execution).await?;
    Ok(Json(result))
}
