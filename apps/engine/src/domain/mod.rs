//! Pure draft logic: cards, packs, seats, turn order, effects, snapshots.
//!
//! Nothing in this module performs I/O, spawns tasks, or takes locks; the
//! service layer owns all of that. Keeping the domain synchronous is what
//! makes the invariants here testable in isolation.

pub mod cards;
pub mod effects;
pub mod snapshot;
pub mod state;
pub mod turn_based;

pub use cards::{Card, CardId, Color, DraftEffectTag, Pack, PackId, PickedCard};
pub use effects::{EffectRequest, OptionalEffectRequest, Resolution, UsableEffectRequest};
pub use snapshot::{DisconnectedSeatRecord, SeatSnapshot, TableSnapshot};
pub use state::{next_seat, pass_delta, DraftPhase, DraftState, RuleException, SeatId, SeatState};
pub use turn_based::TurnBased;

#[cfg(test)]
mod tests_props;
