//! `GET /api/events/stream` (§4.7, C3): bridges `orch_infra::stream_events`
//! into an axum SSE response. Disconnect cleanup is implicit — dropping the
//! response body drops the underlying `Subscription`, which unsubscribes
//! from the bus.

use std::convert::Infallible;

use axum::extract::{Query, State};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use futures::stream::Stream;
use futures::StreamExt;
use orch_domain::{EventFilter, EventType};
use serde::Deserialize;

use orch_infra::{stream_events, SseFrame};

use crate::state::AppState;

#[derive(Deserialize)]
pub struct StreamQuery {
    pub app: Option<String>,
    #[serde(default)]
    pub types: Option<String>,
}

pub async fn events_stream(State(state): State<AppState>,
                            Query(q): Query<StreamQuery>)
                            -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let types = q.types
                 .map(|raw| raw.split(',').filter_map(EventType::from_wire_str).collect())
                 .unwrap_or_default();
    let filter = EventFilter { app_name: q.app, types };

    let frames = stream_events(state.bus.clone(), filter).map(|frame| {
                                                               Ok(match frame {
                                                                   SseFrame::Data(event) => {
                                                                       SseEvent::default().event(event.event_type
                                                                                                       .as_wire_str())
                                                                                          .json_data(&event)
                                                                                          .unwrap_or_else(|_| {
                                                                                              SseEvent::default()
                                                                                          })
                                                                   }
                                                                   SseFrame::Keepalive => {
                                                                       SseEvent::default().comment("keepalive")
                                                                   }
                                                               })
                                                           });

    Sse::new(frames).keep_alive(KeepAlive::default())
}
