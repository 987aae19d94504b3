//! The pass-the-pack engine.
//!
//! `route` is the single choke point every pack moves through: it either
//! discards the pack (at or below the table's threshold) and re-evaluates
//! round completion, or delivers it to the next eligible seat and triggers
//! that seat's next action. Ownership transfers atomically under the table
//! lock; a pack is never in two queues.

use std::sync::Arc;

use rand::Rng;
use tracing::{debug, info};

use crate::domain::cards::Pack;
use crate::domain::state::{next_seat, SeatId};
use crate::errors::domain::{DomainError, InvariantKind};
use crate::hub::TableEvent;
use crate::logging::draft_log::DraftLogEvent;

use super::{countdown, rounds, scheduler, DraftTable, EngineInner};

/// Where a pack leaving `from` goes next.
///
/// Normal case: the parity neighbor for the current round. Quirk, preserved
/// from the source rules: a pack reduced to exactly one card goes to a seat
/// holding the redirect marker, chosen uniformly at random when several
/// qualify.
pub(crate) fn destination(
    inner: &Arc<EngineInner>,
    table: &DraftTable,
    pack: &Pack,
    from: SeatId,
) -> Result<SeatId, DomainError> {
    let seat_count = table.state.seat_count();
    if seat_count == 0 {
        return Err(DomainError::invariant(
            InvariantKind::NoDestination,
            "no seats at the table",
        ));
    }
    if pack.len() == 1 {
        let holders = table.state.redirect_holders();
        if !holders.is_empty() {
            let choice = holders[inner.rng.lock().random_range(0..holders.len())];
            inner.log_event(DraftLogEvent::PackRedirected {
                to: choice,
                card: pack.cards[0].id.clone(),
            });
            info!(from, to = choice, "last card redirected to marker holder");
            return Ok(choice);
        }
    }
    Ok(next_seat(from, seat_count, table.state.round_number))
}

/// Route one pack: discard it or deliver it to `to`.
///
/// Always broadcasts updated pending-pack counts for the affected seat, and
/// re-evaluates the round-completion predicate after a discard.
pub(crate) fn route(
    inner: &Arc<EngineInner>,
    table: &mut DraftTable,
    pack: Pack,
    to: SeatId,
) -> Result<(), crate::error::EngineError> {
    if pack.len() <= inner.config.discard_threshold {
        let cards_left = pack.len();
        table.state.cards_discarded += cards_left;
        inner.log_event(DraftLogEvent::PackDiscarded { cards_left });
        debug!(cards_left, "pack discarded");
        if table.state.all_queues_empty() {
            rounds::advance(inner, table)?;
        }
        return Ok(());
    }

    if table.state.seat(to).is_err() {
        return Err(DomainError::invariant(
            InvariantKind::NoDestination,
            format!("routed pack has no valid destination seat {to}"),
        )
        .into());
    }
    let seat = &mut table.state.seats[to as usize];
    seat.pending.push_back(pack);
    let pending = seat.pending.len();
    inner.hub.broadcast(TableEvent::PackQueued {
        seat: to,
        pending_packs: pending,
    });
    // A newly front pack means the seat can act; deeper queue positions wait
    // their turn.
    if pending == 1 {
        activate_seat(inner, table, to);
    }
    Ok(())
}

/// Send a pack onward from a seat that just acted on it, then wake the seat
/// up again if more packs were already waiting behind it. (A pack routed
/// back to the same seat wakes it through the normal delivery path.)
pub(crate) fn route_onward(
    inner: &Arc<EngineInner>,
    table: &mut DraftTable,
    seat: SeatId,
    pack: Pack,
) -> Result<(), crate::error::EngineError> {
    let pending = table.state.seats[seat as usize].pending.len();
    inner.hub.broadcast(TableEvent::PackQueued {
        seat,
        pending_packs: pending,
    });
    let had_more = pending > 0;
    let to = destination(inner, table, &pack, seat)?;
    route(inner, table, pack, to)?;
    if had_more {
        activate_seat(inner, table, seat);
    }
    Ok(())
}

/// Trigger whatever the seat's front pack calls for: a bot cycle for an
/// AI-controlled (or promoted) seat, a countdown plus display recommendation
/// for a connected human. Disconnected, not-yet-promoted seats just queue.
pub(crate) fn activate_seat(inner: &Arc<EngineInner>, table: &mut DraftTable, seat: SeatId) {
    let Some(front) = table.state.seats[seat as usize].front_pack() else {
        return;
    };
    let pack = front.clone();
    let seat_state = &table.state.seats[seat as usize];
    if seat_state.is_ai {
        scheduler::ensure_running(inner, table, seat);
        return;
    }
    if !seat_state.connected {
        return;
    }
    let pick_number = seat_state.pick_cursor;
    inner.hub.send_to(
        seat,
        TableEvent::NewPack {
            seat,
            pack,
            pick_number,
        },
    );
    countdown::start(inner, table, seat, None);
    scheduler::spawn_recommendation(inner, table, seat);
}
