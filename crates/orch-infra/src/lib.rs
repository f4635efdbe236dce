//! Runtime glue for the orchestration server: the engine tick loop that
//! drives claimed resources to completion (C7, §4.4) and the SSE broker
//! that turns `EventBus` subscriptions into a transport-agnostic event
//! stream (C3, §4.7). HTTP wiring (axum routes, SSE encoding) lives in the
//! root crate; this crate stays free of any specific web framework.

pub mod engine;
pub mod sse;

pub use engine::Engine;
pub use sse::{stream_events, SseFrame};
