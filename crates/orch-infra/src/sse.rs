//! SSE broker (C3, §4.7): bridges `EventBus::subscribe` into a stream a
//! transport-layer handler (axum, in the root crate) can turn into
//! `text/event-stream` frames, with a periodic keepalive so idle
//! connections aren't reaped by intermediate proxies.

use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use orch_core::EventBus;
use orch_core::constants::SSE_KEEPALIVE_SECONDS;
use orch_domain::{Event, EventFilter};

#[derive(Debug, Clone)]
pub enum SseFrame {
    Data(Event),
    Keepalive,
}

/// Subscribes to `bus` with `filter` and yields a frame for every matching
/// event, or a `Keepalive` frame after `SSE_KEEPALIVE_SECONDS` of silence.
/// Ends when the bus itself is closed (i.e. the last `EventBus` was dropped).
pub fn stream_events(bus: Arc<EventBus>, filter: EventFilter) -> impl Stream<Item = SseFrame> {
    async_stream::stream! {
        let mut sub = bus.subscribe(filter);
        loop {
            tokio::select! {
                event = sub.recv() => {
                    match event {
                        Some(e) => yield SseFrame::Data(e),
                        None => break,
                    }
                }
                _ = tokio::time::sleep(Duration::from_secs(SSE_KEEPALIVE_SECONDS)) => {
                    yield SseFrame::Keepalive;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use futures::StreamExt;
    use orch_domain::EventType;

    use super::*;

    #[tokio::test]
    async fn stream_yields_matching_events() {
        let bus = Arc::new(EventBus::with_buffer(8));
        let mut stream =
            Box::pin(stream_events(bus.clone(), EventFilter { app_name: None, types: vec![EventType::ResourceActive] }));

        bus.publish(Event::new(EventType::ResourceActive, "test", Some("app-a".into()), HashMap::new()));

        let frame = stream.next().await.expect("frame");
        match frame {
            SseFrame::Data(e) => assert_eq!(e.event_type, EventType::ResourceActive),
            SseFrame::Keepalive => panic!("expected a data frame"),
        }
    }

    #[tokio::test]
    async fn stream_filters_out_non_matching_events() {
        let bus = Arc::new(EventBus::with_buffer(8));
        let mut stream = Box::pin(stream_events(bus.clone(),
                                                  EventFilter { app_name: Some("app-a".into()), types: vec![] }));

        bus.publish(Event::new(EventType::ResourceActive, "test", Some("app-b".into()), HashMap::new()));
        bus.publish(Event::new(EventType::ResourceActive, "test", Some("app-a".into()), HashMap::new()));

        let frame = stream.next().await.expect("frame");
        match frame {
            SseFrame::Data(e) => assert_eq!(e.app_name.as_deref(), Some("app-a")),
            SseFrame::Keepalive => panic!("expected a data frame"),
        }
    }
}
