//! Seat and table state plus turn-order math.
//!
//! Seat math lives here so every layer (router, scheduler, snapshots) shares
//! a single source of truth for rotation and "who receives this pack next".

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::domain::cards::{Card, DraftEffectTag, Pack, PickedCard};
use crate::errors::domain::{DomainError, InvariantKind, ProtocolViolationKind};

/// Seat position at the table (0-based, clockwise).
pub type SeatId = u8;

/// Passing direction for a round. Packs alternate direction each round
/// ("boomerang" seating): even rounds pass clockwise, odd rounds pass
/// counter-clockwise.
#[inline]
pub fn pass_delta(round_number: u8) -> i8 {
    if round_number % 2 == 0 {
        1
    } else {
        -1
    }
}

/// Offset a seat by `delta` positions around a table of `seat_count` seats.
#[inline]
pub fn seat_offset(seat: SeatId, delta: i8, seat_count: usize) -> SeatId {
    let seat_i = seat as i16;
    let delta_i = delta as i16;
    (seat_i + delta_i).rem_euclid(seat_count as i16) as SeatId
}

/// The seat a pack leaving `seat` is delivered to under `round_number`'s
/// parity direction.
#[inline]
pub fn next_seat(seat: SeatId, seat_count: usize, round_number: u8) -> SeatId {
    seat_offset(seat, pass_delta(round_number), seat_count)
}

/// An active exception to the default one-pick-then-pass rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleException {
    /// The seat's next `n` actions are forced skips.
    SkipNextPicks(u8),
    /// The seat's picks are chosen uniformly at random from now on.
    PickingRandomly,
}

/// Overall table phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DraftPhase {
    Running,
    Paused,
    Ended,
}

/// Per-participant record.
///
/// One per participant; created at draft start, destroyed at draft end.
/// Runtime concerns (agent instance, countdown task, in-flight flag) are
/// owned by the service layer, not here.
#[derive(Debug, Clone)]
pub struct SeatState {
    pub seat_id: SeatId,
    pub display_name: String,
    /// True for native bots and for promoted disconnected humans.
    pub is_ai: bool,
    /// Humans only; native bots are always considered connected.
    pub connected: bool,
    /// Packs queued for this seat, front first. Exclusive ownership.
    pub pending: VecDeque<Pack>,
    /// Actions taken this round; strictly increasing within a round.
    pub pick_cursor: usize,
    pub picked: Vec<PickedCard>,
    pub burned: Vec<Card>,
    pub rule_exception: Option<RuleException>,
}

impl SeatState {
    pub fn new(seat_id: SeatId, display_name: String, is_ai: bool) -> Self {
        Self {
            seat_id,
            display_name,
            is_ai,
            connected: !is_ai,
            pending: VecDeque::new(),
            pick_cursor: 0,
            picked: Vec::new(),
            burned: Vec::new(),
            rule_exception: None,
        }
    }

    pub fn front_pack(&self) -> Option<&Pack> {
        self.pending.front()
    }

    /// True if this seat holds the given marker face up (spent or not; the
    /// redirect marker is never consumed).
    pub fn holds_marker(&self, tag: DraftEffectTag) -> bool {
        self.picked
            .iter()
            .any(|p| p.face_up && p.card.effect == Some(tag))
    }

    /// Index into `picked` of an unspent face-up capability, if any.
    pub fn unspent_capability(&self, tag: DraftEffectTag) -> Option<usize> {
        self.picked
            .iter()
            .position(|p| p.face_up && !p.spent && p.card.effect == Some(tag))
    }

    /// A forced skip is due before any pick is legal.
    pub fn must_skip(&self) -> bool {
        matches!(self.rule_exception, Some(RuleException::SkipNextPicks(n)) if n > 0)
    }

    /// Consume one forced skip, clearing the exception when exhausted.
    pub fn consume_skip(&mut self) {
        if let Some(RuleException::SkipNextPicks(n)) = self.rule_exception {
            if n <= 1 {
                self.rule_exception = None;
            } else {
                self.rule_exception = Some(RuleException::SkipNextPicks(n - 1));
            }
        }
    }

    pub fn picking_randomly(&self) -> bool {
        matches!(self.rule_exception, Some(RuleException::PickingRandomly))
    }
}

/// Aggregate table state: ordered seats plus round bookkeeping.
///
/// One instance per active draft. All mutation goes through the service
/// layer's transactions.
#[derive(Debug, Clone)]
pub struct DraftState {
    pub seats: Vec<SeatState>,
    /// 0-based round number; parity selects the passing direction.
    pub round_number: u8,
    pub rounds_total: u8,
    /// Pack size at the start of the current round, for timer derivation.
    pub pack_size_this_round: usize,
    /// Guards reentrant distribution while a routing cascade is in progress.
    pub distribution_in_flight: bool,
    /// Undistributed packs, one per seat per remaining round.
    pub reserve: VecDeque<Pack>,
    pub phase: DraftPhase,
    /// Conservation counters. `cards_dealt` grows at distribution,
    /// `cards_injected` only through explicitly logged injections,
    /// `cards_discarded` when the router drops a pack at the threshold.
    pub cards_dealt: usize,
    pub cards_injected: usize,
    pub cards_discarded: usize,
}

impl DraftState {
    pub fn new(seats: Vec<SeatState>, reserve: VecDeque<Pack>, rounds_total: u8) -> Self {
        Self {
            seats,
            round_number: 0,
            rounds_total,
            pack_size_this_round: 0,
            distribution_in_flight: false,
            reserve,
            phase: DraftPhase::Running,
            cards_dealt: 0,
            cards_injected: 0,
            cards_discarded: 0,
        }
    }

    pub fn seat_count(&self) -> usize {
        self.seats.len()
    }

    pub fn seat(&self, seat_id: SeatId) -> Result<&SeatState, DomainError> {
        self.seats.get(seat_id as usize).ok_or_else(|| {
            DomainError::violation(
                ProtocolViolationKind::WrongSeat,
                format!("no seat {seat_id} at this table"),
            )
        })
    }

    pub fn seat_mut(&mut self, seat_id: SeatId) -> Result<&mut SeatState, DomainError> {
        self.seats.get_mut(seat_id as usize).ok_or_else(|| {
            DomainError::violation(
                ProtocolViolationKind::WrongSeat,
                format!("no seat {seat_id} at this table"),
            )
        })
    }

    /// The round-completion predicate: re-evaluated after every routing
    /// event, insensitive to the order in which seats finish.
    pub fn all_queues_empty(&self) -> bool {
        self.seats.iter().all(|s| s.pending.is_empty())
    }

    /// Natural-end predicate: no packs remain anywhere.
    pub fn packs_remain_anywhere(&self) -> bool {
        !self.reserve.is_empty() || self.seats.iter().any(|s| !s.pending.is_empty())
    }

    /// Seats currently holding the last-card redirect marker.
    pub fn redirect_holders(&self) -> Vec<SeatId> {
        self.seats
            .iter()
            .filter(|s| s.holds_marker(DraftEffectTag::LastCardRedirect))
            .map(|s| s.seat_id)
            .collect()
    }

    /// Audit card conservation:
    /// `dealt + injected == pending + picked + burned + discarded` for every
    /// card that has left the reserve. Called at quiescent points in tests
    /// and before round advancement.
    pub fn audit_conservation(&self) -> Result<(), DomainError> {
        let in_play: usize = self
            .seats
            .iter()
            .map(|s| {
                s.pending.iter().map(Pack::len).sum::<usize>() + s.picked.len() + s.burned.len()
            })
            .sum();
        let accounted = in_play + self.cards_discarded;
        let expected = self.cards_dealt + self.cards_injected;
        if accounted != expected {
            return Err(DomainError::invariant(
                InvariantKind::ConservationBroken,
                format!(
                    "{accounted} cards accounted for, expected {expected} \
                     (dealt {} + injected {}, discarded {})",
                    self.cards_dealt, self.cards_injected, self.cards_discarded
                ),
            ));
        }
        Ok(())
    }
}
