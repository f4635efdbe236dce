//! `/api/applications` (§6): accepts a Score document, resolves it into a
//! `Spec` + `Application`, and materializes its declared resources as
//! `requested` (§4.1 `create_resources_from_spec`).

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::Json;
use orch_core::{DeclaredResource, OrchError};
use orch_domain::{Application, Event, EventType, ParsedSpec, ScoreDocument, Spec};
use serde::{Deserialize, Serialize};

use crate::http::error::ApiResult;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SubmitApplicationRequest {
    pub app_name: String,
    pub owner: String,
    /// Raw Score YAML document text.
    pub score: String,
}

#[derive(Serialize)]
pub struct ApplicationResponse {
    #[serde(flatten)]
    pub application: Application,
    pub spec_name: String,
}

pub async fn list_applications(State(state): State<AppState>) -> ApiResult<Json<Vec<Application>>> {
    Ok(Json(state.spec_repo.list_applications().await?))
}

pub async fn get_application(State(state): State<AppState>, Path(name): Path<String>)
                              -> ApiResult<Json<Application>> {
    let app = state.spec_repo
                    .find_application_by_name(&name)
                    .await?
                    .ok_or_else(|| OrchError::NotFound(format!("application '{name}' not found")))?;
    Ok(Json(app))
}

pub async fn delete_application(State(state): State<AppState>, Path(name): Path<String>) -> ApiResult<Json<()>> {
    let app = state.spec_repo
                    .find_application_by_name(&name)
                    .await?
                    .ok_or_else(|| OrchError::NotFound(format!("application '{name}' not found")))?;
    state.spec_repo.delete_application(app.id).await?;
    Ok(Json(()))
}

pub async fn create_application(State(state): State<AppState>, Json(req): Json<SubmitApplicationRequest>)
                                 -> ApiResult<Json<ApplicationResponse>> {
    if state.spec_repo.find_application_by_name(&req.app_name).await?.is_some() {
        return Err(OrchError::Conflict(format!("application '{}' already exists", req.app_name)).into());
    }

    let doc: ScoreDocument =
        serde_yaml::from_str(&req.score).map_err(|e| OrchError::Validation(format!("invalid Score document: {e}")))?;
    let spec_name = doc.metadata.name.clone();
    let parsed: ParsedSpec = doc.into();

    let spec = match state.spec_repo.find_spec_by_name(&spec_name).await? {
        Some(existing) => existing,
        None => {
            let spec = Spec::new(&spec_name, req.score.clone(), parsed.clone(), &req.owner);
            state.spec_repo.insert_spec(spec.clone()).await?;
            spec
        }
    };

    let app = Application::new(spec.id, &req.app_name, &req.owner);
    state.spec_repo.insert_application(app.clone()).await?;

    let declared: Vec<DeclaredResource> =
        parsed.resources
              .into_iter()
              .map(|(name, rs)| {
                  let configuration = rs.merged_configuration();
                  DeclaredResource { name, resource_type: rs.resource_type, configuration }
              })
              .collect();
    state.resource_manager.create_resources_from_spec(&app, declared, &req.owner).await?;

    let mut payload = HashMap::new();
    payload.insert("spec_id".to_string(), serde_json::json!(spec.id));
    payload.insert("application_id".to_string(), serde_json::json!(app.id));
    state.bus.publish(Event::new(EventType::SpecSubmitted, "http", Some(app.name.clone()), payload));

    Ok(Json(ApplicationResponse { application: app, spec_name: spec.name }))
}
