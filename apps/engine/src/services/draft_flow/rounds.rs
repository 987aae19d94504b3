//! Round lifecycle: distribution, advancement, draft end.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::cards::Pack;
use crate::domain::state::{DraftPhase, RuleException, SeatId};
use crate::hub::TableEvent;
use crate::logging::draft_log::DraftLogEvent;

use super::{router, DraftTable, EngineInner};

/// Deal one pack per seat for the current round and trigger every seat's
/// first action. Reentrant calls during the routing cascade are ignored.
pub(crate) fn distribute(
    inner: &Arc<EngineInner>,
    table: &mut DraftTable,
) -> Result<(), crate::error::EngineError> {
    if table.state.distribution_in_flight {
        return Ok(());
    }
    table.state.distribution_in_flight = true;

    let seat_count = table.state.seat_count();
    table.state.pack_size_this_round = table
        .state
        .reserve
        .front()
        .map(Pack::len)
        .unwrap_or_default();

    for seat_id in 0..seat_count as SeatId {
        let pack = match table.state.reserve.pop_front() {
            Some(pack) => pack,
            None => {
                table.state.distribution_in_flight = false;
                return Err(crate::errors::domain::DomainError::invariant(
                    crate::errors::domain::InvariantKind::Other("short reserve".into()),
                    format!("reserve ran out while dealing seat {seat_id}"),
                )
                .into());
            }
        };
        table.state.cards_dealt += pack.len();
        let seat = &mut table.state.seats[seat_id as usize];
        seat.pick_cursor = 0;
        // Forced skips do not outlive the round that created them; random
        // picking is permanent.
        if matches!(seat.rule_exception, Some(RuleException::SkipNextPicks(_))) {
            seat.rule_exception = None;
        }
        seat.pending.push_back(pack);
        let pending = seat.pending.len();
        inner.hub.broadcast(TableEvent::PackQueued {
            seat: seat_id,
            pending_packs: pending,
        });
    }

    let round_number = table.state.round_number;
    let pack_size = table.state.pack_size_this_round;
    inner.log_event(DraftLogEvent::RoundStarted {
        round_number,
        pack_size,
    });
    inner.hub.broadcast(TableEvent::RoundStarted {
        round_number,
        pack_size,
    });
    info!(round_number, pack_size, "round distributed");

    for seat_id in 0..seat_count as SeatId {
        router::activate_seat(inner, table, seat_id);
    }

    table.state.distribution_in_flight = false;
    Ok(())
}

/// Round advancement: called whenever every pending queue is simultaneously
/// empty. Starts the next round, or ends the draft when no packs remain
/// anywhere.
pub(crate) fn advance(
    inner: &Arc<EngineInner>,
    table: &mut DraftTable,
) -> Result<(), crate::error::EngineError> {
    if table.state.phase == DraftPhase::Ended {
        return Ok(());
    }
    if let Err(err) = table.state.audit_conservation() {
        warn!(error = %err, "conservation audit failed at round boundary");
        end_draft(inner, table, "invariant breach");
        return Err(err.into());
    }
    if table.state.reserve.is_empty() {
        end_draft(inner, table, "natural end");
        return Ok(());
    }
    table.state.round_number += 1;
    info!(round_number = table.state.round_number, "advancing to next round");
    distribute(inner, table)
}

/// End the draft: cancel every background task, finalize the log, tell the
/// table. Idempotent.
pub(crate) fn end_draft(inner: &Arc<EngineInner>, table: &mut DraftTable, reason: &str) {
    if table.state.phase == DraftPhase::Ended {
        return;
    }
    table.state.phase = DraftPhase::Ended;
    inner.shutdown.cancel();

    for seat_id in 0..table.state.seat_count() as SeatId {
        super::countdown::stop(table, seat_id);
        let runtime = &mut table.runtime[seat_id as usize];
        if let Some(task) = runtime.grace_task.take() {
            task.abort();
        }
    }
    // Dropping outstanding choice senders unblocks their waiters.
    inner.choices.lock().clear();

    inner.log_event(DraftLogEvent::DraftEnded {
        reason: reason.to_string(),
    });
    inner.log.finalize();
    inner.hub.broadcast(TableEvent::DraftEnded {
        phase: DraftPhase::Ended,
        reason: reason.to_string(),
    });
    info!(reason, "draft ended");
}
