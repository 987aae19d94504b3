//! Domain-level error type used across the draft engine.
//!
//! This error type is transport-agnostic. Callers should return
//! `Result<T, crate::error::EngineError>` and convert from `DomainError`
//! using the provided `From<DomainError> for EngineError` implementation.

use std::error::Error;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Protocol violations: a caller tried an action the live state forbids.
/// These are rejected synchronously with no mutation; the caller is expected
/// to resynchronize from the next snapshot push.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProtocolViolationKind {
    /// The acting seat does not exist or is not allowed to act.
    WrongSeat,
    /// The seat holds no pack, or referenced a pack it no longer owns.
    StalePack,
    /// Picked/burned index out of bounds or duplicated.
    BadIndex,
    /// Pick or burn count does not match what this action requires.
    WrongCount,
    /// Effect request invalid, already spent, or not owned by the seat.
    InvalidEffect,
    /// The seat is under a forced-skip exception and must skip.
    MustSkip,
    /// The seat has no forced-skip exception to consume.
    NothingToSkip,
    /// The draft is paused, ended, or was never started.
    NotRunning,
    Other(String),
}

/// Internal invariant breaches. Fatal for the current draft only: logged with
/// full context and the draft is ended defensively.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvariantKind {
    /// A routed pack found no valid destination.
    NoDestination,
    /// Card conservation failed at a quiescent point.
    ConservationBroken,
    Other(String),
}

/// Central domain error type.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Input validation or draft-rule violation; no mutation happened.
    ProtocolViolation(ProtocolViolationKind, String),
    /// Bad configuration or start-time input.
    InvalidSetup(String),
    /// Internal invariant breach; the draft must end defensively.
    Invariant(InvariantKind, String),
}

impl Display for DomainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            DomainError::ProtocolViolation(kind, d) => {
                write!(f, "protocol violation {kind:?}: {d}")
            }
            DomainError::InvalidSetup(d) => write!(f, "invalid setup: {d}"),
            DomainError::Invariant(kind, d) => write!(f, "invariant breach {kind:?}: {d}"),
        }
    }
}

impl Error for DomainError {}

impl DomainError {
    pub fn violation(kind: ProtocolViolationKind, detail: impl Into<String>) -> Self {
        Self::ProtocolViolation(kind, detail.into())
    }
    pub fn invalid_setup(detail: impl Into<String>) -> Self {
        Self::InvalidSetup(detail.into())
    }
    pub fn invariant(kind: InvariantKind, detail: impl Into<String>) -> Self {
        Self::Invariant(kind, detail.into())
    }

    /// True for errors that must defensively end the current draft.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DomainError::Invariant(..))
    }
}
