//! `/api/golden-paths` (§6): read-only listing of `goldenpaths.yaml`.

use axum::extract::{Path, State};
use axum::Json;
use orch_domain::GoldenPath;

use orch_core::OrchError;

use crate::http::error::ApiResult;
use crate::state::AppState;

pub async fn list_golden_paths(State(state): State<AppState>) -> Json<Vec<GoldenPath>> {
    Json(state.golden_paths.read().await.clone())
}

pub async fn get_golden_path(State(state): State<AppState>, Path(name): Path<String>) -> ApiResult<Json<GoldenPath>> {
    state.golden_paths
         .read()
         .await
         .iter()
         .find(|g| g.name == name)
         .cloned()
         .map(Json)
         .ok_or_else(|| OrchError::NotFound(format!("golden path '{name}' not found")).into())
}
