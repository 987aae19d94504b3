#![deny(clippy::wildcard_imports)]
#![cfg_attr(test, allow(clippy::wildcard_imports))]

pub mod ai;
pub mod bracket;
pub mod config;
pub mod domain;
pub mod error;
pub mod errors;
pub mod generator;
pub mod hub;
pub mod logging;
pub mod services;

#[cfg(test)]
pub mod test_bootstrap;

// Re-exports for public API
pub use config::{DraftConfig, TimerPolicy};
pub use domain::cards::{Card, CardId, Color, Pack, PackId};
pub use domain::snapshot::{SeatSnapshot, TableSnapshot};
pub use domain::state::SeatId;
pub use error::EngineError;
pub use generator::BoosterGenerator;
pub use hub::{TableEvent, TableHub};
pub use logging::draft_log::DraftLogSink;
pub use services::draft_flow::{DraftEngine, EngineDeps, SeatPlan};

// Auto-initialize logging for unit tests
#[cfg(test)]
#[ctor::ctor]
fn init_test_logging() {
    test_bootstrap::logging::init();
}
