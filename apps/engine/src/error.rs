use thiserror::Error;

use crate::errors::domain::DomainError;

/// Engine-level error returned to the transport layer.
///
/// Per-action errors are typed results returned to the immediate caller;
/// nothing is thrown across the router/scheduler boundary.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{0}")]
    Domain(#[from] DomainError),
    #[error("Booster generation failed: {detail}")]
    Generator { detail: String },
    #[error("Configuration error: {detail}")]
    Config { detail: String },
    #[error("Internal error: {detail}")]
    Internal { detail: String },
}

impl EngineError {
    pub fn generator(detail: impl Into<String>) -> Self {
        Self::Generator {
            detail: detail.into(),
        }
    }

    pub fn config(detail: impl Into<String>) -> Self {
        Self::Config {
            detail: detail.into(),
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal {
            detail: detail.into(),
        }
    }

    /// Stable machine-readable code for transport-side mapping.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Domain(DomainError::ProtocolViolation(..)) => "PROTOCOL_VIOLATION",
            EngineError::Domain(DomainError::InvalidSetup(_)) => "INVALID_SETUP",
            EngineError::Domain(DomainError::Invariant(..)) => "INVARIANT_BREACH",
            EngineError::Generator { .. } => "GENERATOR_ERROR",
            EngineError::Config { .. } => "CONFIG_ERROR",
            EngineError::Internal { .. } => "INTERNAL",
        }
    }
}
