//! Draft agent trait definition.

use std::fmt;

use async_trait::async_trait;

use crate::domain::cards::{Card, Pack};

/// Errors that can occur during agent decision-making.
#[derive(Debug)]
pub enum AgentError {
    /// The agent failed to decide within its deadline.
    Timeout,
    /// The backing service could not be reached.
    Unreachable(String),
    /// The agent produced an unusable decision (index out of bounds, ...).
    InvalidDecision(String),
    /// Internal agent failure.
    Internal(String),
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentError::Timeout => write!(f, "agent decision timeout"),
            AgentError::Unreachable(msg) => write!(f, "agent backend unreachable: {msg}"),
            AgentError::InvalidDecision(msg) => write!(f, "agent invalid decision: {msg}"),
            AgentError::Internal(msg) => write!(f, "agent internal error: {msg}"),
        }
    }
}

impl std::error::Error for AgentError {}

/// Round context handed to agents alongside the pack.
#[derive(Debug, Clone, Copy)]
pub struct RoundInfo {
    pub round_number: u8,
    pub rounds_total: u8,
    /// Zero-based action number within the round.
    pub pick_number: usize,
    /// Pack size at the start of the round.
    pub cards_per_pack: usize,
}

/// One seat's automated decision maker.
///
/// An instance is bound to a single seat for the draft's duration and holds
/// that seat's pick history; promotion seeds a fresh instance with the
/// human-picked prefix through `add_picked`.
#[async_trait]
pub trait DraftAgent: Send {
    /// Index into `pack` of the card to pick next.
    async fn pick(&mut self, pack: &Pack, round: &RoundInfo) -> Result<usize, AgentError>;

    /// Index into `pack` of the card to burn next.
    async fn burn(&mut self, pack: &Pack, round: &RoundInfo) -> Result<usize, AgentError>;

    /// Per-card scores for display alongside a human's booster, best effort.
    async fn scores(&mut self, pack: &Pack, round: &RoundInfo) -> Result<Vec<f32>, AgentError>;

    /// Record a card into the agent's internal pool (its own picks, and the
    /// human history prefix when a promoted seat is handed over).
    fn add_picked(&mut self, card: &Card);

    fn name(&self) -> &'static str;
}
