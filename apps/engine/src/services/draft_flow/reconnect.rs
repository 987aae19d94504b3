//! Disconnect, reconnect, and AI promotion.
//!
//! A disconnect is not an error: the seat's view is captured in a versioned
//! record, the table is notified, and a grace timer starts. If the human
//! comes back in time the record is consumed and the exact view restored;
//! otherwise the seat is promoted to AI control without blocking the table.

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::snapshot::{DisconnectedSeatRecord, SeatSnapshot};
use crate::domain::state::{DraftPhase, SeatId};
use crate::errors::domain::{DomainError, ProtocolViolationKind};
use crate::hub::TableEvent;
use crate::logging::draft_log::DraftLogEvent;

use super::{countdown, scheduler, DraftTable, EngineInner};

/// Capture the seat's state, notify the table, and arm the promotion grace
/// timer. Idempotent for seats that are already offline; ignored for native
/// bots.
pub(crate) fn handle_disconnect(
    inner: &Arc<EngineInner>,
    table: &mut DraftTable,
    seat: SeatId,
) -> Result<(), crate::error::EngineError> {
    table.state.seat(seat)?;
    if table.runtime[seat as usize].disconnect_record.is_some() {
        return Ok(());
    }
    if table.state.seats[seat as usize].is_ai {
        // Native bots have no transport to lose.
        return Ok(());
    }
    if !table.state.seats[seat as usize].connected {
        return Ok(());
    }

    let remaining = countdown::remaining_seconds(table, seat);
    countdown::stop(table, seat);
    table.state.seats[seat as usize].connected = false;
    let record = DisconnectedSeatRecord::capture(&table.state, seat, remaining);
    table.runtime[seat as usize].disconnect_record = Some(record);

    inner.log_event(DraftLogEvent::SeatDisconnected { seat });
    inner.hub.broadcast(TableEvent::SeatDisconnected { seat });
    info!(seat, "seat disconnected, grace timer armed");

    let grace = inner.config.reconnect_grace;
    let task_inner = inner.clone();
    table.runtime[seat as usize].grace_task = Some(tokio::spawn(async move {
        tokio::select! {
            _ = task_inner.shutdown.cancelled() => return,
            _ = tokio::time::sleep(grace) => {}
        }
        let mut table = task_inner.table.lock().await;
        if table.state.phase == DraftPhase::Ended {
            return;
        }
        let still_away = table
            .state
            .seats
            .get(seat as usize)
            .map(|s| !s.connected && !s.is_ai)
            .unwrap_or(false);
        if still_away {
            promote_to_ai(&task_inner, &mut table, seat);
        }
    }));
    Ok(())
}

/// Hand a disconnected seat to AI control. The seat's display agent has seen
/// every human pick already, so the AI starts from the human history prefix.
pub(crate) fn promote_to_ai(inner: &Arc<EngineInner>, table: &mut DraftTable, seat: SeatId) {
    let seat_state = &mut table.state.seats[seat as usize];
    if seat_state.is_ai {
        return;
    }
    seat_state.is_ai = true;
    if let Some(record) = table.runtime[seat as usize].disconnect_record.as_mut() {
        record.promoted_to_ai = true;
    }
    inner.log_event(DraftLogEvent::SeatPromoted { seat });
    inner.hub.broadcast(TableEvent::SeatPromoted { seat });
    info!(seat, "seat promoted to AI control");
    scheduler::ensure_running(inner, table, seat);
}

/// Consume the disconnect record and rebuild the seat's exact view:
/// remaining packs, picked cards, live timer. A promoted seat returns to
/// human control; its in-flight bot cycle aborts at re-validation.
pub(crate) fn handle_reconnect(
    inner: &Arc<EngineInner>,
    table: &mut DraftTable,
    seat: SeatId,
) -> Result<SeatSnapshot, crate::error::EngineError> {
    table.state.seat(seat)?;
    let record = table.runtime[seat as usize]
        .disconnect_record
        .take()
        .ok_or_else(|| {
            DomainError::violation(
                ProtocolViolationKind::Other("not disconnected".into()),
                format!("seat {seat} has no disconnect record to restore"),
            )
        })?;
    if let Some(task) = table.runtime[seat as usize].grace_task.take() {
        task.abort();
    }

    let was_promoted = record.promoted_to_ai;
    {
        let seat_state = &mut table.state.seats[seat as usize];
        seat_state.connected = true;
        seat_state.is_ai = false;
    }

    inner.log_event(DraftLogEvent::SeatReconnected { seat });
    inner.hub.broadcast(TableEvent::SeatReconnected { seat });
    info!(seat, was_promoted, "seat reconnected");

    if table.state.seats[seat as usize].front_pack().is_some()
        && table.state.phase == DraftPhase::Running
    {
        // A promoted seat's timer state is stale; it gets a fresh countdown.
        let resume_from = if was_promoted {
            None
        } else {
            record.remaining_seconds
        };
        countdown::start(inner, table, seat, resume_from);
        scheduler::spawn_recommendation(inner, table, seat);
    }
    debug!(seat, pending = table.state.seats[seat as usize].pending.len(), "view restored");

    let remaining = countdown::remaining_seconds(table, seat);
    Ok(SeatSnapshot::capture(&table.state, seat, remaining))
}
