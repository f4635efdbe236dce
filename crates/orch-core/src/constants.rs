//! Constantes del core.
//!
//! `ENGINE_VERSION` participa en el cálculo de `configuration_hash`
//! (ver `hashing`), de forma que un cambio incompatible en cómo se arma la
//! configuración invalida los hashes existentes de manera determinista.

pub const ENGINE_VERSION: &str = "orch-core/1";

/// Tamaño por defecto del buffer acotado por suscriptor del bus de eventos
/// (§4.7).
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 256;

/// Intervalo del keepalive del broker SSE (§4.7).
pub const SSE_KEEPALIVE_SECONDS: u64 = 30;
