//! HTTP surface (§6): thin axum handlers over the `orch-*` crates. No
//! business logic lives here beyond request parsing and response shaping —
//! everything that matters is delegated to `ResourceManager`,
//! `WorkflowExecutor`, `ProviderRegistry`, or a repository.

pub mod applications;
pub mod error;
pub mod events;
pub mod golden_paths;
pub mod health;
pub mod providers;
pub mod resources;
pub mod workflows;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new().route("/health", get(health::liveness))
                  .route("/ready", get(health::readiness))
                  .route("/metrics", get(health::metrics))
                  .route("/api/applications", get(applications::list_applications).post(applications::create_application))
                  .route("/api/applications/:name",
                         get(applications::get_application).delete(applications::delete_application))
                  .route("/api/resources", get(resources::list_resources))
                  .route("/api/resources/:id", get(resources::get_resource))
                  .route("/api/resources/:id/transitions",
                         get(resources::list_transitions).post(resources::transition_resource))
                  .route("/api/resources/:id/health", post(resources::record_health_check))
                  .route("/api/workflows", get(workflows::list_workflows))
                  .route("/api/workflows/:id", get(workflows::get_workflow))
                  .route("/api/workflows/golden-paths/:name/execute", post(workflows::execute_golden_path))
                  .route("/api/providers", get(providers::list_providers))
                  .route("/api/providers/:name", get(providers::get_provider))
                  .route("/api/admin/reload", post(providers::reload_providers))
                  .route("/api/golden-paths", get(golden_paths::list_golden_paths))
                  .route("/api/golden-paths/:name", get(golden_paths::get_golden_path))
                  .route("/api/events/stream", get(events::events_stream))
                  .layer(TraceLayer::new_for_http())
                  .layer(CorsLayer::permissive())
                  .with_state(state)
}
