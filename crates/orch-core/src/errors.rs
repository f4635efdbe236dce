//! Taxonomía de errores del core (§7).
//!
//! `OrchError` es el único tipo de error que cruza los límites entre
//! `orch-core` y sus llamadores. Cada variante se clasifica en una
//! `ErrorCategory`, que es lo único que el transporte HTTP (fuera de este
//! crate) necesita para decidir el código de estado.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Conflict,
    InvalidTransition,
    Timeout,
    External,
    Internal,
}

impl ErrorCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::Conflict => "conflict",
            ErrorCategory::InvalidTransition => "invalid_transition",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::External => "external",
            ErrorCategory::Internal => "internal",
        }
    }
}

#[derive(Debug, Error, Clone, Serialize, Deserialize)]
pub enum OrchError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("timed out after {0}s")]
    Timeout(u64),

    #[error("external failure: {0}")]
    External(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl OrchError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            OrchError::Validation(_) => ErrorCategory::Validation,
            OrchError::NotFound(_) => ErrorCategory::NotFound,
            OrchError::Conflict(_) => ErrorCategory::Conflict,
            OrchError::InvalidTransition { .. } => ErrorCategory::InvalidTransition,
            OrchError::Timeout(_) => ErrorCategory::Timeout,
            OrchError::External(_) => ErrorCategory::External,
            OrchError::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// A step executor that panics is recovered and treated as a failed step
    /// with category `internal` (§7).
    pub fn from_panic(payload: &str) -> Self {
        OrchError::Internal(format!("step executor panicked: {payload}"))
    }
}

pub type OrchResult<T> = Result<T, OrchError>;
