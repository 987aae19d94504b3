//! Bot scheduling: one asynchronous pick cycle per AI seat.
//!
//! `ensure_running` is idempotent: the `bot_in_flight` flag guarantees at
//! most one cycle (or recommendation task) holds a seat's agent at a time.
//! A cycle is an explicit loop, never awaited recursion: gather inputs under
//! the lock, decide with the lock released, re-validate on re-entry, apply,
//! yield, repeat. Failures are caught and converted into "clear the flag and
//! stop"; nothing unwinds across this boundary into other seats.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::ai::{AgentError, DraftAgent, RoundInfo};
use crate::domain::cards::Pack;
use crate::domain::state::{DraftPhase, SeatId};
use crate::hub::TableEvent;

use super::{actions, DraftTable, EngineInner};

/// Start a pick cycle for an AI-controlled seat with a front pack. No-op if
/// one is already in flight, the seat is not AI, or there is nothing to do.
pub(crate) fn ensure_running(inner: &Arc<EngineInner>, table: &mut DraftTable, seat: SeatId) {
    if table.state.phase == DraftPhase::Ended {
        return;
    }
    {
        let seat_state = &table.state.seats[seat as usize];
        if !seat_state.is_ai || seat_state.front_pack().is_none() {
            return;
        }
    }
    let runtime = &mut table.runtime[seat as usize];
    if runtime.bot_in_flight {
        return;
    }
    // The agent may be out with a recommendation task; its return path calls
    // back into ensure_running.
    let Some(agent) = runtime.agent.take() else {
        return;
    };
    runtime.bot_in_flight = true;
    debug!(seat, "bot cycle starting");
    tokio::spawn(run_cycle(inner.clone(), seat, agent));
}

/// What one cycle iteration found under the lock.
enum Step {
    /// Draft over, seat no longer AI, or queue empty: stop silently.
    Exit,
    /// A forced skip is due; consumed under the same lock.
    Skipped,
    /// Decide on this pack with the lock released.
    Decide {
        pack: Pack,
        round: RoundInfo,
        picks: usize,
        burns: usize,
        random: bool,
    },
}

async fn run_cycle(inner: Arc<EngineInner>, seat: SeatId, mut agent: Box<dyn DraftAgent + Send>) {
    loop {
        let step = {
            let mut table = inner.table.lock().await;
            // Picks applied on our behalf land in the deferred history while
            // we hold the agent; replay them before the next decision.
            for card in table.runtime[seat as usize].deferred_history.drain(..) {
                agent.add_picked(&card);
            }
            match gather_step(&inner, &mut table, seat) {
                Ok(step) => step,
                Err(err) => {
                    warn!(seat, error = %err, "bot cycle failed, clearing in-flight flag");
                    finish(&mut table, seat, agent);
                    return;
                }
            }
        };

        let (pack, round, picks, burns, random) = match step {
            Step::Exit => {
                let mut table = inner.table.lock().await;
                finish(&mut table, seat, agent);
                return;
            }
            Step::Skipped => {
                tokio::task::yield_now().await;
                continue;
            }
            Step::Decide {
                pack,
                round,
                picks,
                burns,
                random,
            } => (pack, round, picks, burns, random),
        };

        // Decide without the lock; the oracle round-trip may take seconds
        // and must not block other seats.
        let decision = if random {
            Ok(actions::random_indices(&inner, pack.len(), picks, burns))
        } else {
            tokio::select! {
                _ = inner.shutdown.cancelled() => {
                    let mut table = inner.table.lock().await;
                    finish(&mut table, seat, agent);
                    return;
                }
                decision = decide(&mut agent, &pack, &round, picks, burns) => decision,
            }
        };

        let mut table = inner.table.lock().await;

        // Re-validate: the draft may have ended, or the human may have
        // reconnected mid-call. Abort silently when invalidated.
        let still_valid = table.state.phase != DraftPhase::Ended
            && table
                .state
                .seats
                .get(seat as usize)
                .map(|s| s.is_ai && s.front_pack().map(|p| p.id) == Some(pack.id))
                .unwrap_or(false);
        if !still_valid {
            debug!(seat, "bot cycle invalidated, aborting silently");
            finish(&mut table, seat, agent);
            return;
        }

        let (mut picked, mut burned) = match decision {
            Ok(decision) => decision,
            Err(err) => {
                warn!(seat, error = %err, "bot decision failed, stopping cycle");
                finish(&mut table, seat, agent);
                return;
            }
        };
        let whole_pack = actions::decision_takes_whole_pack(&pack, &picked);
        actions::expand_whole_pack_decision(pack.len(), &mut picked, &mut burned, whole_pack);

        if let Err(err) = actions::apply_action(&inner, &mut table, seat, &picked, &burned, None) {
            warn!(seat, error = %err, "bot action rejected, stopping cycle");
            finish(&mut table, seat, agent);
            return;
        }

        if table.state.seats[seat as usize].front_pack().is_none() {
            finish(&mut table, seat, agent);
            return;
        }
        // More packs pending: release the lock and let other seats
        // interleave before the next iteration.
        drop(table);
        tokio::task::yield_now().await;
    }
}

/// Inspect the seat under the lock; consumes a due forced skip in place.
fn gather_step(
    inner: &Arc<EngineInner>,
    table: &mut DraftTable,
    seat: SeatId,
) -> Result<Step, crate::error::EngineError> {
    if table.state.phase == DraftPhase::Ended {
        return Ok(Step::Exit);
    }
    let must_skip = match table.state.seats.get(seat as usize) {
        Some(s) if s.is_ai && s.front_pack().is_some() => s.must_skip(),
        _ => return Ok(Step::Exit),
    };
    if must_skip {
        actions::skip_core(inner, table, seat)?;
        return Ok(Step::Skipped);
    }
    let seat_state = &table.state.seats[seat as usize];
    let pack = seat_state.front_pack().cloned().expect("front pack checked");
    let random = seat_state.picking_randomly();
    let round = RoundInfo {
        round_number: table.state.round_number,
        rounds_total: table.state.rounds_total,
        pick_number: seat_state.pick_cursor,
        cards_per_pack: table.state.pack_size_this_round,
    };
    let (picks, burns) = actions::plain_counts(inner, pack.len());
    Ok(Step::Decide {
        pack,
        round,
        picks,
        burns,
        random,
    })
}

/// Return the agent and clear the single-flight flag.
fn finish(table: &mut DraftTable, seat: SeatId, agent: Box<dyn DraftAgent + Send>) {
    if let Some(runtime) = table.runtime.get_mut(seat as usize) {
        runtime.put_agent(agent);
        runtime.bot_in_flight = false;
    }
}

/// Decide picks-then-burns on a working copy of the pack, translating the
/// agent's shrinking-pack indices back to positions in the original.
async fn decide(
    agent: &mut Box<dyn DraftAgent + Send>,
    pack: &Pack,
    round: &RoundInfo,
    picks: usize,
    burns: usize,
) -> Result<(Vec<usize>, Vec<usize>), AgentError> {
    let mut working = pack.clone();
    let mut positions: Vec<usize> = (0..working.len()).collect();
    let mut picked = Vec::with_capacity(picks);
    for _ in 0..picks {
        let idx = agent.pick(&working, round).await?;
        if idx >= working.len() {
            return Err(AgentError::InvalidDecision(format!(
                "pick index {idx} out of bounds ({})",
                working.len()
            )));
        }
        picked.push(positions.remove(idx));
        working.cards.remove(idx);
    }
    let mut burned = Vec::with_capacity(burns);
    for _ in 0..burns {
        let idx = agent.burn(&working, round).await?;
        if idx >= working.len() {
            return Err(AgentError::InvalidDecision(format!(
                "burn index {idx} out of bounds ({})",
                working.len()
            )));
        }
        burned.push(positions.remove(idx));
        working.cards.remove(idx);
    }
    Ok((picked, burned))
}

/// Push a best-effort recommendation for a connected human's front pack.
///
/// Takes the seat's agent under the same single-flight flag as a bot cycle;
/// if the seat was promoted while the scores were being computed, the return
/// path restarts the scheduler so the promotion is never lost.
pub(crate) fn spawn_recommendation(inner: &Arc<EngineInner>, table: &mut DraftTable, seat: SeatId) {
    let Some(pack) = table.state.seats[seat as usize].front_pack().cloned() else {
        return;
    };
    let round = RoundInfo {
        round_number: table.state.round_number,
        rounds_total: table.state.rounds_total,
        pick_number: table.state.seats[seat as usize].pick_cursor,
        cards_per_pack: table.state.pack_size_this_round,
    };
    let runtime = &mut table.runtime[seat as usize];
    if runtime.bot_in_flight {
        return;
    }
    let Some(agent) = runtime.agent.take() else {
        return;
    };
    runtime.bot_in_flight = true;

    let inner = inner.clone();
    tokio::spawn(async move {
        let mut agent = agent;
        let scores = tokio::select! {
            _ = inner.shutdown.cancelled() => None,
            scores = agent.scores(&pack, &round) => scores.ok(),
        };
        let mut table = inner.table.lock().await;
        finish(&mut table, seat, agent);
        if table.state.phase == DraftPhase::Ended {
            return;
        }
        let front_matches = table.state.seats[seat as usize]
            .front_pack()
            .map(|p| p.id == pack.id)
            .unwrap_or(false);
        if let Some(scores) = scores {
            if front_matches {
                inner.hub.send_to(
                    seat,
                    TableEvent::Recommendation {
                        seat,
                        pack_id: pack.id,
                        scores,
                    },
                );
            }
        }
        // Promotion may have happened while we held the agent.
        ensure_running(&inner, &mut table, seat);
    });
}
