//! Per-seat countdown state machine.
//!
//! Idle -> Running (ticks, broadcasts) -> Expired (grace, action still
//! accepted) -> ForceDisconnect, or -> Stopped when the action completes or
//! the draft pauses. One tokio interval task per running countdown; ticks
//! take the table lock briefly and never outlive the engine (they watch the
//! shutdown token).

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::TimerContext;
use crate::domain::state::{DraftPhase, SeatId};
use crate::hub::TableEvent;

use super::{reconnect, DraftTable, EngineInner};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CountdownPhase {
    Idle,
    Running { remaining: u32 },
    Expired { grace_left: u32 },
    Stopped,
}

pub(crate) struct CountdownState {
    pub(crate) phase: CountdownPhase,
    task: Option<JoinHandle<()>>,
}

impl CountdownState {
    pub(crate) fn new() -> Self {
        Self {
            phase: CountdownPhase::Idle,
            task: None,
        }
    }
}

/// Seconds left on a running (or just-expired) countdown, for snapshots.
pub(crate) fn remaining_seconds(table: &DraftTable, seat: SeatId) -> Option<u32> {
    match table.runtime.get(seat as usize)?.countdown.phase {
        CountdownPhase::Running { remaining } => Some(remaining),
        CountdownPhase::Expired { .. } => Some(0),
        CountdownPhase::Idle | CountdownPhase::Stopped => None,
    }
}

/// Start (or restart) the countdown for a connected human's front pack.
///
/// `resume_from` carries a reconnecting seat's live timer value; otherwise
/// the initial value comes from the configured timer policy.
pub(crate) fn start(
    inner: &Arc<EngineInner>,
    table: &mut DraftTable,
    seat: SeatId,
    resume_from: Option<u32>,
) {
    if inner.config.timer.is_disabled() {
        inner.hub.send_to(seat, TableEvent::TimerDisabled { seat });
        return;
    }
    let Some(front_len) = table.state.seats[seat as usize].front_pack().map(|p| p.len())
    else {
        return;
    };
    let initial = resume_from.unwrap_or_else(|| {
        inner.config.timer.initial_seconds(&TimerContext {
            pick_number: table.state.seats[seat as usize].pick_cursor,
            cards_per_pack: table.state.pack_size_this_round,
            cards_remaining: front_len,
        })
    });

    stop(table, seat);
    let runtime = &mut table.runtime[seat as usize];
    runtime.countdown.phase = CountdownPhase::Running { remaining: initial };
    inner.hub.broadcast(TableEvent::Timer {
        seat,
        remaining_seconds: initial,
    });
    debug!(seat, initial, "countdown started");
    runtime.countdown.task = Some(tokio::spawn(tick_loop(inner.clone(), seat)));
}

/// Stop and clear the seat's countdown (action completed or seat left).
pub(crate) fn stop(table: &mut DraftTable, seat: SeatId) {
    let runtime = &mut table.runtime[seat as usize];
    if let Some(task) = runtime.countdown.task.take() {
        task.abort();
    }
    runtime.countdown.phase = CountdownPhase::Stopped;
}

async fn tick_loop(inner: Arc<EngineInner>, seat: SeatId) {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    // The first tick completes immediately; consume it so the initial value
    // stands for a full second.
    interval.tick().await;
    loop {
        tokio::select! {
            _ = inner.shutdown.cancelled() => return,
            _ = interval.tick() => {}
        }
        let mut table = inner.table.lock().await;
        match table.state.phase {
            DraftPhase::Ended => return,
            // Paused drafts keep their timer value frozen.
            DraftPhase::Paused => continue,
            DraftPhase::Running => {}
        }
        let phase = table.runtime[seat as usize].countdown.phase;
        match phase {
            CountdownPhase::Running { remaining } => {
                let remaining = remaining.saturating_sub(1);
                inner.hub.broadcast(TableEvent::Timer {
                    seat,
                    remaining_seconds: remaining,
                });
                table.runtime[seat as usize].countdown.phase = if remaining == 0 {
                    info!(seat, "countdown expired, entering grace");
                    CountdownPhase::Expired {
                        grace_left: inner.config.expiry_grace_seconds,
                    }
                } else {
                    CountdownPhase::Running { remaining }
                };
            }
            CountdownPhase::Expired { grace_left } => {
                let grace_left = grace_left.saturating_sub(1);
                if grace_left == 0 {
                    info!(seat, "grace elapsed, force-disconnecting stalled seat");
                    inner.hub.send_to(seat, TableEvent::ForceDisconnect { seat });
                    table.runtime[seat as usize].countdown.phase = CountdownPhase::Stopped;
                    table.runtime[seat as usize].countdown.task = None;
                    // Expiry becomes an ordinary disconnect: snapshot, grace
                    // period, then AI promotion.
                    if let Err(err) = reconnect::handle_disconnect(&inner, &mut table, seat) {
                        debug!(seat, error = %err, "force-disconnect bookkeeping failed");
                    }
                    return;
                }
                table.runtime[seat as usize].countdown.phase =
                    CountdownPhase::Expired { grace_left };
            }
            CountdownPhase::Idle | CountdownPhase::Stopped => return,
        }
    }
}
