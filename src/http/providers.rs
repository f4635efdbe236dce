//! `/api/providers` and `/api/admin/reload` (§6, C5): read access to the
//! resolved capability index, and the admin action that re-reads
//! `admin-config.yaml`'s provider list from disk and atomically swaps in a
//! fresh index (§4.2 "Reload", Open Question (b): in-use resource types
//! block a reload that would drop their coverage).

use std::collections::HashSet;

use axum::extract::{Path, State};
use axum::Json;
use orch_domain::{Provider, ResourceState};
use orch_providers::load_configured_providers;
use serde::Serialize;

use orch_core::OrchError;

use crate::http::error::ApiResult;
use crate::state::AppState;

pub async fn list_providers(State(state): State<AppState>) -> Json<Vec<Provider>> {
    let snapshot = state.provider_registry.snapshot().await;
    Json(snapshot.providers().cloned().collect())
}

pub async fn get_provider(State(state): State<AppState>, Path(name): Path<String>) -> ApiResult<Json<Provider>> {
    let snapshot = state.provider_registry.snapshot().await;
    let provider = snapshot.providers()
                            .find(|p| p.name == name)
                            .cloned()
                            .ok_or_else(|| OrchError::NotFound(format!("provider '{name}' not found")))?;
    Ok(Json(provider))
}

#[derive(Serialize)]
pub struct ReloadReport {
    pub loaded: usize,
    pub failures: Vec<(String, String)>,
    pub conflicts: Vec<orch_domain::ProviderConflict>,
}

pub async fn reload_providers(State(state): State<AppState>) -> ApiResult<Json<ReloadReport>> {
    let entries = state.admin_config.read().await.providers.clone();
    let (providers, failures) = load_configured_providers(&entries).await;

    let in_use: HashSet<String> = state.resource_repo
                                        .list_resources()
                                        .await?
                                        .into_iter()
                                        .filter(|r| !r.state.is_terminal() && r.state != ResourceState::Requested)
                                        .map(|r| r.resource_type)
                                        .collect();

    let loaded = providers.len();
    let conflicts = state.provider_registry.reload(providers, &in_use).await?;

    Ok(Json(ReloadReport { loaded,
                            failures: failures.into_iter().map(|(name, e)| (name, e.to_string())).collect(),
                            conflicts }))
}
