//! Pick and skip transactions.
//!
//! Everything here runs under the table lock. Validation happens against
//! live state before any mutation; a returned error means nothing changed.

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::cards::{Card, DraftEffectTag, PickedCard};
use crate::domain::effects::{self, EffectRequest};
use crate::domain::state::{RuleException, SeatId};
use crate::errors::domain::{DomainError, ProtocolViolationKind};
use crate::generator::GeneratorConstraints;
use crate::hub::TableEvent;
use crate::logging::draft_log::DraftLogEvent;

use super::{countdown, router, DraftTable, EngineInner};

/// A connected human's pick. Seats under a random-picking exception have
/// their selection (and any effect request) replaced by a uniform random
/// one; seats under a forced skip must call `skip` instead.
pub(crate) fn apply_pick(
    inner: &Arc<EngineInner>,
    table: &mut DraftTable,
    seat: SeatId,
    picked_indices: &[usize],
    burned_indices: &[usize],
    request: Option<&EffectRequest>,
) -> Result<(), crate::error::EngineError> {
    let seat_state = table.state.seat(seat)?;
    let front_len = seat_state
        .front_pack()
        .map(|p| p.len())
        .ok_or_else(|| {
            DomainError::violation(
                ProtocolViolationKind::StalePack,
                format!("seat {seat} holds no pack"),
            )
        })?;
    if seat_state.must_skip() {
        return Err(DomainError::violation(
            ProtocolViolationKind::MustSkip,
            format!("seat {seat} must skip this action"),
        )
        .into());
    }

    if seat_state.picking_randomly() {
        let picks = inner.config.picks_per_action.min(front_len);
        let burns = inner.config.burns_per_action.min(front_len - picks);
        let (mut random_picks, mut random_burns) = random_indices(inner, front_len, picks, burns);
        let whole_pack = {
            let pack = table.state.seats[seat as usize].front_pack().expect("front pack");
            decision_takes_whole_pack(pack, &random_picks)
        };
        expand_whole_pack_decision(front_len, &mut random_picks, &mut random_burns, whole_pack);
        debug!(seat, "substituting random selection for randomly-picking seat");
        return apply_action(inner, table, seat, &random_picks, &random_burns, None);
    }

    apply_action(inner, table, seat, picked_indices, burned_indices, request)
}

/// Distinct random indices for a randomly-picking seat: `picks` then `burns`
/// drawn without replacement from the front pack.
pub(crate) fn random_indices(
    inner: &Arc<EngineInner>,
    pack_len: usize,
    picks: usize,
    burns: usize,
) -> (Vec<usize>, Vec<usize>) {
    let mut rng = inner.rng.lock();
    let drawn = rand::seq::index::sample(&mut *rng, pack_len, picks + burns).into_vec();
    let picked = drawn[..picks].to_vec();
    let burned = drawn[picks..].to_vec();
    (picked, burned)
}

/// The shared transaction body for humans and bot cycles.
///
/// Validates the action through the effect resolver, mutates the seat, logs,
/// and routes the remainder of the pack onward. Index sets must refer to the
/// seat's current front pack.
pub(crate) fn apply_action(
    inner: &Arc<EngineInner>,
    table: &mut DraftTable,
    seat: SeatId,
    picked_indices: &[usize],
    burned_indices: &[usize],
    request: Option<&EffectRequest>,
) -> Result<(), crate::error::EngineError> {
    let round_number = table.state.round_number;
    let rounds_total = table.state.rounds_total;
    let pack_size_this_round = table.state.pack_size_this_round;

    let resolution = {
        let seat_state = table.state.seat(seat)?;
        let pack = seat_state.front_pack().ok_or_else(|| {
            DomainError::violation(
                ProtocolViolationKind::StalePack,
                format!("seat {seat} holds no pack"),
            )
        })?;
        effects::resolve_action(
            seat_state,
            pack,
            picked_indices,
            burned_indices,
            request,
            inner.config.picks_per_action,
            inner.config.burns_per_action,
        )?
    };

    // Generate the injected booster before mutating anything so a generator
    // failure leaves the action untouched.
    let injected_pack = if resolution.inject_booster {
        let generator = inner.generator.as_ref().ok_or_else(|| {
            DomainError::violation(
                ProtocolViolationKind::InvalidEffect,
                "this table has no booster generator for injections",
            )
        })?;
        let constraints = GeneratorConstraints {
            cards_per_pack: pack_size_this_round,
            pool: None,
        };
        let mut packs = generator
            .generate(1, &constraints)
            .map_err(|err| crate::error::EngineError::generator(err.to_string()))?;
        packs.pop()
    } else {
        None
    };

    countdown::stop(table, seat);

    let seat_state = &mut table.state.seats[seat as usize];
    let mut pack = seat_state.pending.pop_front().expect("validated front pack");
    let pick_number = seat_state.pick_cursor;

    inner.log_event(DraftLogEvent::Picked {
        seat,
        round_number,
        pick_number,
        pack: pack.cards.iter().map(|c| c.id.clone()).collect(),
        picked: picked_indices.to_vec(),
        burned: burned_indices.to_vec(),
    });

    // Remove picks and burns in one sweep (highest index first internally),
    // keeping the caller's pick ordering for effect ordinals.
    let picked_cards = pack.remove_indices(picked_indices);
    let shifted_burns = reindex_after_removal(burned_indices, picked_indices);
    let burned_cards = pack.remove_indices(&shifted_burns);

    // Spend the exchange capability: the card physically returns to the pack
    // and can be drafted again downstream.
    if let Some(capability_idx) = resolution.spend_exchange {
        let capability = seat_state.picked.remove(capability_idx);
        pack.cards.push(capability.card);
    }

    // A card picked earlier may be waiting to note this action's first pick.
    let mut updated_cards: Vec<(usize, PickedCard)> = Vec::new();
    if let Some(first_pick) = picked_cards.first() {
        for (idx, previous) in seat_state.picked.iter_mut().enumerate() {
            if previous.awaiting_pick_name {
                previous.noted_name = Some(first_pick.name.clone());
                previous.awaiting_pick_name = false;
                inner.log_event(DraftLogEvent::NameNoted {
                    seat,
                    onto: previous.card.id.clone(),
                    name: first_pick.name.clone(),
                });
                updated_cards.push((idx, previous.clone()));
            }
        }
    }

    let picked_len_before = seat_state.picked.len();
    let mut revealed: Vec<Card> = Vec::new();
    for (ordinal, card) in picked_cards.iter().enumerate() {
        if resolution.reveals.contains(&ordinal) {
            revealed.push(card.clone());
        }
        seat_state.picked.push(PickedCard::new(card.clone()));
    }
    seat_state.burned.extend(burned_cards);
    seat_state.pick_cursor += 1;

    // Exception bookkeeping: random picking is permanent and survives any
    // transient skip the same action would have added.
    match (seat_state.rule_exception, effects::exception_after(&resolution)) {
        (Some(RuleException::PickingRandomly), Some(RuleException::SkipNextPicks(_))) => {}
        (_, Some(new_exception)) => seat_state.rule_exception = Some(new_exception),
        (_, None) => {}
    }

    let pick_cursor = seat_state.pick_cursor;
    for card in &picked_cards {
        table.runtime[seat as usize].record_pick(card);
    }

    inner.hub.broadcast(TableEvent::SeatActed { seat, pick_cursor });
    for (picked_index, card) in updated_cards {
        inner.hub.broadcast(TableEvent::CardUpdated {
            seat,
            picked_index,
            card,
        });
    }
    if !revealed.is_empty() {
        inner.hub.broadcast(TableEvent::CardsRevealed {
            seat,
            cards: revealed,
        });
    }
    info!(
        seat,
        round_number,
        pick_number,
        picked = picked_indices.len(),
        burned = burned_indices.len(),
        "action applied"
    );

    if let Some(injected) = injected_pack {
        table.state.cards_injected += injected.len();
        inner.log_event(DraftLogEvent::BoosterInjected {
            seat,
            pack: injected.cards.iter().map(|c| c.id.clone()).collect(),
        });
        let seat_state = &mut table.state.seats[seat as usize];
        seat_state.pending.push_back(injected);
        let pending = seat_state.pending.len();
        inner.hub.broadcast(TableEvent::PackQueued {
            seat,
            pending_packs: pending,
        });
        info!(seat, "booster injected");
    }

    // Cross-participant color noting runs after the transaction; the table
    // stays responsive while choosers think.
    for &ordinal in &resolution.note_colors {
        let picked_index = picked_len_before + ordinal;
        let card = picked_cards[ordinal].clone();
        super::choices::spawn_note_colors(inner, seat, picked_index, card);
    }

    router::route_onward(inner, table, seat, pack)?;
    table.state.audit_conservation()?;
    Ok(())
}

/// Map burn indices (given against the original pack) to their positions
/// after the picked indices were removed.
fn reindex_after_removal(burned: &[usize], removed: &[usize]) -> Vec<usize> {
    burned
        .iter()
        .map(|&b| b - removed.iter().filter(|&&r| r < b).count())
        .collect()
}

/// A connected human consuming a forced skip.
pub(crate) fn apply_skip(
    inner: &Arc<EngineInner>,
    table: &mut DraftTable,
    seat: SeatId,
) -> Result<(), crate::error::EngineError> {
    let seat_state = table.state.seat(seat)?;
    if seat_state.is_ai {
        return Err(DomainError::violation(
            ProtocolViolationKind::WrongSeat,
            format!("seat {seat} is AI-controlled"),
        )
        .into());
    }
    if !seat_state.connected {
        return Err(DomainError::violation(
            ProtocolViolationKind::WrongSeat,
            format!("seat {seat} is disconnected"),
        )
        .into());
    }
    skip_core(inner, table, seat)
}

/// The skip transaction body, shared with bot cycles.
pub(crate) fn skip_core(
    inner: &Arc<EngineInner>,
    table: &mut DraftTable,
    seat: SeatId,
) -> Result<(), crate::error::EngineError> {
    let round_number = table.state.round_number;
    {
        let seat_state = table.state.seat(seat)?;
        if seat_state.front_pack().is_none() {
            return Err(DomainError::violation(
                ProtocolViolationKind::StalePack,
                format!("seat {seat} holds no pack"),
            )
            .into());
        }
        if !seat_state.must_skip() {
            return Err(DomainError::violation(
                ProtocolViolationKind::NothingToSkip,
                format!("seat {seat} has no forced skip to consume"),
            )
            .into());
        }
    }

    countdown::stop(table, seat);
    let seat_state = &mut table.state.seats[seat as usize];
    seat_state.consume_skip();
    seat_state.pick_cursor += 1;
    let pick_cursor = seat_state.pick_cursor;
    let pack = seat_state.pending.pop_front().expect("validated front pack");

    inner.log_event(DraftLogEvent::Skipped { seat, round_number });
    inner.hub.broadcast(TableEvent::SeatActed { seat, pick_cursor });
    info!(seat, round_number, "forced skip consumed");

    router::route_onward(inner, table, seat, pack)?;
    table.state.audit_conservation()?;
    Ok(())
}

/// Base pick/burn counts for a plain (effect-free) action on a pack of
/// `pack_len` cards.
pub(crate) fn plain_counts(inner: &Arc<EngineInner>, pack_len: usize) -> (usize, usize) {
    let picks = inner.config.picks_per_action.min(pack_len);
    let burns = inner.config.burns_per_action.min(pack_len - picks);
    (picks, burns)
}

/// Expand a bot decision that landed on a take-the-whole-pack card: the
/// action must then pick every index and burn nothing.
pub(crate) fn expand_whole_pack_decision(
    pack_len: usize,
    picked: &mut Vec<usize>,
    burned: &mut Vec<usize>,
    takes_whole_pack: bool,
) {
    if takes_whole_pack {
        let mut all: Vec<usize> = picked.clone();
        for idx in 0..pack_len {
            if !all.contains(&idx) {
                all.push(idx);
            }
        }
        *picked = all;
        burned.clear();
    }
}

/// Whether any of the decided picks carries the whole-pack tag.
pub(crate) fn decision_takes_whole_pack(
    pack: &crate::domain::cards::Pack,
    picked: &[usize],
) -> bool {
    picked
        .iter()
        .any(|&idx| pack.cards.get(idx).map(|c| c.effect) == Some(Some(DraftEffectTag::TakeWholePack)))
}
