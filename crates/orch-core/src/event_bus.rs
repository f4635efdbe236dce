//! Bus de eventos en proceso (C2, §4.7).
//!
//! `Publish` nunca bloquea: se apoya en `tokio::sync::broadcast`, cuyo
//! `send` es síncrono y no espera a los suscriptores. Cuando un suscriptor
//! lento se queda atrás, el próximo `recv` le devuelve `Lagged(n)` en vez de
//! los eventos perdidos — eso es exactamente la semántica pedida: se
//! descartan los eventos más antiguos de ESE suscriptor, nunca se bloquea al
//! publicador, y se puede contar cuántos se perdieron.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use orch_domain::{Event, EventFilter};
use tokio::sync::broadcast;

use crate::constants::DEFAULT_SUBSCRIBER_BUFFER;

pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_SUBSCRIBER_BUFFER)
    }

    pub fn with_buffer(buffer: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer.max(1));
        Self { sender }
    }

    /// Publica un evento. Devuelve el número de suscriptores activos en el
    /// momento del envío (0 si no hay ninguno — no es un error).
    pub fn publish(&self, event: Event) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Crea un nuevo suscriptor con el filtro dado. Cerrar la suscripción
    /// (`drop`) libera el receptor subyacente.
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        Subscription { receiver: self.sender.subscribe(), filter, dropped: Arc::new(AtomicU64::new(0)) }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Un suscriptor activo. `recv` filtra internamente: sólo devuelve eventos
/// que matchean `filter`, y nunca devuelve `Lagged` — esos incrementan
/// `dropped` y se reintenta.
pub struct Subscription {
    receiver: broadcast::Receiver<Event>,
    filter: EventFilter,
    dropped: Arc<AtomicU64>,
}

impl Subscription {
    /// Espera el próximo evento que matchea el filtro. `None` significa que
    /// el bus fue cerrado (todos los `EventBus` fueron liberados).
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        return Some(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    self.dropped.fetch_add(n, Ordering::Relaxed);
                    log::warn!("event_bus: subscriber lagged, dropped={n}");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use orch_domain::EventType;

    use super::*;

    fn mk_event(event_type: EventType, app: &str) -> Event {
        Event::new(event_type, "test", Some(app.to_string()), HashMap::new())
    }

    #[tokio::test]
    async fn subscriber_receives_matching_events_only() {
        let bus = EventBus::with_buffer(8);
        let mut sub = bus.subscribe(EventFilter { app_name: Some("app-a".into()), types: vec![] });

        bus.publish(mk_event(EventType::ResourceActive, "app-b"));
        bus.publish(mk_event(EventType::ResourceActive, "app-a"));

        let received = sub.recv().await.unwrap();
        assert_eq!(received.app_name.as_deref(), Some("app-a"));
    }

    #[tokio::test]
    async fn overflow_drops_oldest_and_counts_them() {
        let bus = EventBus::with_buffer(2);
        let mut sub = bus.subscribe(EventFilter::default());

        for _ in 0..5 {
            bus.publish(mk_event(EventType::StepProgress, "app-a"));
        }

        let _ = sub.recv().await;
        assert!(sub.dropped_count() > 0);
    }

    #[tokio::test]
    async fn unsubscribe_releases_the_receiver() {
        let bus = EventBus::with_buffer(8);
        let sub = bus.subscribe(EventFilter::default());
        assert_eq!(bus.subscriber_count(), 1);
        drop(sub);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
