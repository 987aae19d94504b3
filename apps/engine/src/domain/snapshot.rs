//! Public snapshot API for observing table state without exposing internals,
//! plus the versioned record kept for disconnected seats.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::cards::{Card, Pack, PickedCard};
use crate::domain::state::{DraftPhase, DraftState, SeatId};

/// Public info about a single seat, visible to the whole table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeatPublic {
    pub seat: SeatId,
    pub display_name: String,
    pub is_ai: bool,
    pub connected: bool,
    pub pending_packs: usize,
    pub pick_cursor: usize,
    /// Face-up cards are public: capabilities, markers, noted colors.
    pub face_up: Vec<PickedCard>,
}

impl SeatPublic {
    fn capture(state: &DraftState, seat: SeatId) -> Self {
        let s = &state.seats[seat as usize];
        Self {
            seat,
            display_name: s.display_name.clone(),
            is_ai: s.is_ai,
            connected: s.connected,
            pending_packs: s.pending.len(),
            pick_cursor: s.pick_cursor,
            face_up: s.picked.iter().filter(|p| p.face_up).cloned().collect(),
        }
    }
}

/// Everything one seat needs to render its own view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeatSnapshot {
    pub seat: SeatId,
    pub round_number: u8,
    pub rounds_total: u8,
    pub phase: DraftPhase,
    pub pending_packs: usize,
    /// The pack this seat may currently act on, if any.
    pub current_pack: Option<Pack>,
    pub pick_cursor: usize,
    pub picked: Vec<PickedCard>,
    /// Remaining countdown seconds; `None` when no timer is running.
    pub remaining_seconds: Option<u32>,
    /// The seat must call `skip` before any pick is legal.
    pub mandatory_skip: bool,
    pub picking_randomly: bool,
    pub table: Vec<SeatPublic>,
}

impl SeatSnapshot {
    /// Capture the view for `seat`. `remaining_seconds` is supplied by the
    /// service layer, which owns the countdown runtime.
    pub fn capture(
        state: &DraftState,
        seat: SeatId,
        remaining_seconds: Option<u32>,
    ) -> Self {
        let s = &state.seats[seat as usize];
        Self {
            seat,
            round_number: state.round_number,
            rounds_total: state.rounds_total,
            phase: state.phase,
            pending_packs: s.pending.len(),
            current_pack: s.front_pack().cloned(),
            pick_cursor: s.pick_cursor,
            picked: s.picked.clone(),
            remaining_seconds,
            mandatory_skip: s.must_skip(),
            picking_randomly: s.picking_randomly(),
            table: (0..state.seat_count() as SeatId)
                .map(|id| SeatPublic::capture(state, id))
                .collect(),
        }
    }
}

/// Whole-table summary, used by spectators and the draft log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub round_number: u8,
    pub rounds_total: u8,
    pub phase: DraftPhase,
    pub seats: Vec<SeatPublic>,
}

impl TableSnapshot {
    pub fn capture(state: &DraftState) -> Self {
        Self {
            round_number: state.round_number,
            rounds_total: state.rounds_total,
            phase: state.phase,
            seats: (0..state.seat_count() as SeatId)
                .map(|id| SeatPublic::capture(state, id))
                .collect(),
        }
    }
}

/// Version of the disconnect record layout. Bumped whenever a field is added
/// or reinterpreted so a restore never silently misreads an old capture.
pub const DISCONNECT_RECORD_VERSION: u16 = 1;

/// Snapshot taken when a seat disconnects; exists only while the seat is
/// offline and is consumed (discarded) on reconnect.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisconnectedSeatRecord {
    pub version: u16,
    pub seat: SeatId,
    /// Cards picked up to the disconnect, for restore verification and for
    /// seeding an AI agent on promotion.
    pub picked_at_disconnect: Vec<Card>,
    pub pick_cursor_at_disconnect: usize,
    pub pending_packs_at_disconnect: usize,
    /// Countdown seconds left when the seat went away.
    pub remaining_seconds: Option<u32>,
    /// Set once the grace period elapsed and the seat was handed to an AI.
    pub promoted_to_ai: bool,
    pub captured_at: OffsetDateTime,
}

impl DisconnectedSeatRecord {
    pub fn capture(
        state: &DraftState,
        seat: SeatId,
        remaining_seconds: Option<u32>,
    ) -> Self {
        let s = &state.seats[seat as usize];
        Self {
            version: DISCONNECT_RECORD_VERSION,
            seat,
            picked_at_disconnect: s.picked.iter().map(|p| p.card.clone()).collect(),
            pick_cursor_at_disconnect: s.pick_cursor,
            pending_packs_at_disconnect: s.pending.len(),
            remaining_seconds,
            promoted_to_ai: false,
            captured_at: OffsetDateTime::now_utc(),
        }
    }
}
