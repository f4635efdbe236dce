//! Hashing y canonicalización JSON.
//!
//! `hash_value` se usa para computar `configuration_hash` sobre la
//! configuración resuelta de un `ResourceInstance` (ver `resource_manager`):
//! una resubmisión del spec sólo parchea un recurso cuando este hash cambia
//! (Open Question (a)).

pub mod canonical_json;
pub mod hash;

pub use canonical_json::to_canonical_json;
pub use hash::{hash_str, hash_value};
