//! Draft agents - automated pick decisions and display recommendations.
//!
//! This module provides:
//! - The `DraftAgent` trait driven by the bot scheduler
//! - `HeuristicAgent`: deterministic local fallback (rating + color affinity)
//! - `RandomAgent`: random legal picks (seedable for tests)
//! - `OracleAgent`: network scoring oracle with built-in local fallback
//! - A static agent registry

mod heuristic;
mod oracle;
mod random;
pub mod registry;
mod trait_def;

pub use heuristic::HeuristicAgent;
pub use oracle::{HttpScoringOracle, OracleAgent, OracleError, Recommendation, ScoringOracle};
pub use random::RandomAgent;
pub use trait_def::{AgentError, DraftAgent, RoundInfo};

/// Create a local agent from a registered name.
///
/// Returns `None` if the name is unrecognized.
pub fn create_agent(name: &str, seed: Option<u64>) -> Option<Box<dyn DraftAgent + Send>> {
    registry::by_name(name).map(|factory| (factory.make)(seed))
}
