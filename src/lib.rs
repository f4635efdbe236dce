//! Root crate: HTTP wiring for the orchestration server. The domain model,
//! kernel, policies, adapters, persistence, and runtime loop all live in the
//! `orch-*` workspace members; this crate only assembles them behind axum.

pub mod http;
pub mod state;

pub use state::AppState;
