//! `/health`, `/ready`, `/metrics` (§6). Liveness never touches the
//! database; readiness does, since a server that can't reach Postgres
//! can't serve anything meaningful.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

pub async fn liveness() -> &'static str {
    "ok"
}

#[derive(Serialize)]
pub struct ReadinessBody {
    ready: bool,
    detail: Option<String>,
}

pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<ReadinessBody>) {
    match state.spec_repo.list_specs().await {
        Ok(_) => (StatusCode::OK, Json(ReadinessBody { ready: true, detail: None })),
        Err(e) => {
            (StatusCode::SERVICE_UNAVAILABLE, Json(ReadinessBody { ready: false, detail: Some(e.to_string()) }))
        }
    }
}

pub async fn metrics(State(state): State<AppState>) -> String {
    let applications = state.spec_repo.list_applications().await.map(|a| a.len()).unwrap_or(0);
    let resources = state.resource_repo.list_resources().await.map(|r| r.len()).unwrap_or(0);
    let subscribers = state.bus.subscriber_count();
    format!("orchestrator_applications_total {applications}\norchestrator_resources_total {resources}\norchestrator_event_subscribers {subscribers}\n")
}
