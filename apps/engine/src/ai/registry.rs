//! How to register a local agent
//!
//! 1) Implement `DraftAgent` for your type in its module.
//! 2) Add an `AgentFactory` entry to the static list with stable `name` and
//!    `version`.
//! 3) Keep ordering stable; avoid side effects in constructors.
//! 4) Determinism: same seed, same behavior (where applicable).
//!
//! The oracle-backed agent is not listed here: it needs a live
//! `ScoringOracle` handle and is constructed by the engine when an oracle is
//! configured.

use crate::ai::{DraftAgent, HeuristicAgent, RandomAgent};

/// Factory definition for constructing local agent implementations.
pub struct AgentFactory {
    pub name: &'static str,
    pub version: &'static str,
    pub make: fn(seed: Option<u64>) -> Box<dyn DraftAgent + Send>,
}

static AGENT_FACTORIES: &[AgentFactory] = &[
    AgentFactory {
        name: HeuristicAgent::NAME,
        version: HeuristicAgent::VERSION,
        make: make_heuristic,
    },
    AgentFactory {
        name: RandomAgent::NAME,
        version: RandomAgent::VERSION,
        make: make_random,
    },
];

/// Returns the statically registered agent factories.
pub fn registered_agents() -> &'static [AgentFactory] {
    AGENT_FACTORIES
}

/// Finds a registered agent factory by its name.
pub fn by_name(name: &str) -> Option<&'static AgentFactory> {
    registered_agents().iter().find(|factory| factory.name == name)
}

fn make_heuristic(_seed: Option<u64>) -> Box<dyn DraftAgent + Send> {
    Box::new(HeuristicAgent::new())
}

fn make_random(seed: Option<u64>) -> Box<dyn DraftAgent + Send> {
    Box::new(RandomAgent::new(seed))
}

#[cfg(test)]
mod agent_registry_smoke {
    use super::*;

    #[test]
    fn enumerates_registered_agents() {
        let agents = registered_agents();
        assert!(
            agents.iter().any(|f| f.name == HeuristicAgent::NAME),
            "heuristic factory should be present"
        );
        assert!(
            agents.iter().any(|f| f.name == RandomAgent::NAME),
            "random factory should be present"
        );
    }

    #[test]
    fn constructs_by_name() {
        let factory = by_name(HeuristicAgent::NAME).expect("heuristic must be discoverable");
        let agent = (factory.make)(None);
        assert_eq!(agent.name(), HeuristicAgent::NAME);
    }
}
