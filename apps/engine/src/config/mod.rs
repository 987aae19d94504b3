//! Engine configuration.

pub mod draft;

pub use draft::{DraftConfig, OracleConfig, TimerContext, TimerMode, TimerPolicy};
