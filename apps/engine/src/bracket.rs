//! Tournament-bracket pairing interface.
//!
//! Pairing itself is a separate, self-contained module outside this crate;
//! the engine only hands over the finished standings.

use crate::domain::state::SeatId;

/// One match-up produced by a pairing algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pairing {
    pub higher: SeatId,
    pub lower: SeatId,
}

/// Consumed by session hosts that run a bracket after the draft ends.
pub trait BracketPairing: Send + Sync {
    /// Pair the given seats (draft seating order) for the first round of play.
    fn initial_pairings(&self, seats: &[SeatId]) -> Vec<Pairing>;
}
