//! `/api/resources` (§6): read access to resource instances and their audit
//! trail, plus the two lifecycle sub-actions the API owns directly (a
//! manual state transition and a health-check report) — everything else
//! about provisioning is driven by the engine, not the API.

use std::str::FromStr;

use axum::extract::{Path, Query, State};
use axum::Json;
use orch_domain::{HealthStatus, ResourceInstance, ResourceState, ResourceStateTransition};
use serde::Deserialize;
use uuid::Uuid;

use orch_core::OrchError;

use crate::http::error::ApiResult;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ListResourcesQuery {
    pub application_id: Option<Uuid>,
}

pub async fn list_resources(State(state): State<AppState>, Query(q): Query<ListResourcesQuery>)
                             -> ApiResult<Json<Vec<ResourceInstance>>> {
    let resources = match q.application_id {
        Some(app_id) => state.resource_repo.list_resources_by_application(app_id).await?,
        None => state.resource_repo.list_resources().await?,
    };
    Ok(Json(resources))
}

pub async fn get_resource(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<ResourceInstance>> {
    Ok(Json(state.resource_repo.get_resource(id).await?))
}

pub async fn list_transitions(State(state): State<AppState>, Path(id): Path<Uuid>)
                               -> ApiResult<Json<Vec<ResourceStateTransition>>> {
    Ok(Json(state.resource_repo.list_transitions(id).await?))
}

#[derive(Deserialize)]
pub struct TransitionRequest {
    pub to_state: String,
    pub reason: String,
    #[serde(default = "default_actor")]
    pub actor: String,
}

fn default_actor() -> String {
    "operator".to_string()
}

pub async fn transition_resource(State(state): State<AppState>, Path(id): Path<Uuid>,
                                  Json(req): Json<TransitionRequest>)
                                  -> ApiResult<Json<ResourceInstance>> {
    let to_state = ResourceState::from_str(&req.to_state).map_err(OrchError::Validation)?;
    let resource = state.resource_repo.get_resource(id).await?;
    let app_name = state.spec_repo.get_application(resource.application_id).await.ok().map(|a| a.name);
    let updated = state.resource_manager
                        .transition_state(id, to_state, &req.reason, &req.actor, serde_json::Value::Null, app_name)
                        .await?;
    Ok(Json(updated))
}

#[derive(Deserialize)]
pub struct HealthCheckRequest {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

pub async fn record_health_check(State(state): State<AppState>, Path(id): Path<Uuid>,
                                  Json(req): Json<HealthCheckRequest>)
                                  -> ApiResult<Json<()>> {
    let status = HealthStatus::from_str(&req.status).map_err(OrchError::Validation)?;
    state.resource_manager.record_health_check(id, status, req.message).await?;
    Ok(Json(()))
}
