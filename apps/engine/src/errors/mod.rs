//! Error types shared across the engine.

pub mod domain;

pub use domain::{DomainError, InvariantKind, ProtocolViolationKind};
