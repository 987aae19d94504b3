//! Shared capability contract for turn-based draft variants.
//!
//! The simpler shared-pool variants (one acting seat at a time) live outside
//! this crate; they and this table implement the same minimal contract so a
//! session host can drive either without knowing its internals.

use crate::domain::snapshot::SeatSnapshot;
use crate::domain::state::{DraftState, SeatId};

pub trait TurnBased {
    /// The single seat required to act, when exactly one exists.
    ///
    /// A free-for-all table reports `Some` only in the degenerate case where
    /// exactly one seat still holds packs.
    fn current_actor(&self) -> Option<SeatId>;

    /// The view one seat needs to resynchronize after (re)connecting.
    fn sync_data(&self, seat: SeatId) -> SeatSnapshot;
}

impl TurnBased for DraftState {
    fn current_actor(&self) -> Option<SeatId> {
        let mut holding = self.seats.iter().filter(|s| !s.pending.is_empty());
        match (holding.next(), holding.next()) {
            (Some(only), None) => Some(only.seat_id),
            _ => None,
        }
    }

    fn sync_data(&self, seat: SeatId) -> SeatSnapshot {
        SeatSnapshot::capture(self, seat, None)
    }
}
