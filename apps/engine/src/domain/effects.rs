//! Interpretation of protocol-altering card effects.
//!
//! `resolve_action` is called synchronously before any mutation. It validates
//! the whole action — indices, counts, requested effects — against the
//! invoking seat's live state and returns the adjustments the service layer
//! must apply. Errors fail the action atomically: nothing has been mutated
//! when a `DomainError` comes back.

use serde::{Deserialize, Serialize};

use crate::domain::cards::{DraftEffectTag, Pack};
use crate::domain::state::{RuleException, SeatState};
use crate::errors::domain::{DomainError, ProtocolViolationKind};

/// A spendable capability invocation: the seat spends a previously picked,
/// face-up, unspent card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsableEffectRequest {
    /// Pick one additional card this action; the capability card returns to
    /// the pack in exchange.
    ExtraPickExchange,
}

/// An optional effect tied to one of the cards being picked this action.
/// `pick_ordinal` indexes into the action's `picked_indices`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionalEffectRequest {
    /// Append a fresh booster to the picking seat's own queue.
    InjectBooster { pick_ordinal: usize },
    /// Pick one additional card now; the seat's next action is a forced skip.
    ExtraPickThenSkip { pick_ordinal: usize },
}

/// Player-invoked effects attached to one pick call. Ephemeral: validated and
/// consumed within a single transaction, never persisted.
///
/// At most one usable plus one optional effect may combine per action; the
/// two `Option` fields enforce that shape by construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectRequest {
    pub usable: Option<UsableEffectRequest>,
    pub optional: Option<OptionalEffectRequest>,
}

/// The validated adjustments one action must apply.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Exact number of cards this action must pick.
    pub required_picks: usize,
    /// Exact number of cards this action must burn.
    pub required_burns: usize,
    /// Index into `seat.picked` of the exchange capability to return to the
    /// pack.
    pub spend_exchange: Option<usize>,
    /// A fresh booster is appended to the seat's queue (logged injection).
    pub inject_booster: bool,
    /// Forced skips to add after this action.
    pub skip_next: u8,
    /// The seat switches to random picking after this action.
    pub set_random: bool,
    /// Ordinals (into `picked_indices`) of cards revealed to the table.
    pub reveals: Vec<usize>,
    /// Ordinals of cards that collect noted colors asynchronously.
    pub note_colors: Vec<usize>,
    /// The action takes the whole pack.
    pub takes_whole_pack: bool,
}

fn violation(kind: ProtocolViolationKind, detail: String) -> DomainError {
    DomainError::violation(kind, detail)
}

fn check_indices(
    pack: &Pack,
    picked: &[usize],
    burned: &[usize],
) -> Result<(), DomainError> {
    let mut seen = vec![false; pack.len()];
    for &idx in picked.iter().chain(burned.iter()) {
        if idx >= pack.len() {
            return Err(violation(
                ProtocolViolationKind::BadIndex,
                format!("index {idx} out of bounds for pack of {}", pack.len()),
            ));
        }
        if seen[idx] {
            return Err(violation(
                ProtocolViolationKind::BadIndex,
                format!("index {idx} referenced twice"),
            ));
        }
        seen[idx] = true;
    }
    Ok(())
}

/// Validate one action and compute its effective shape.
///
/// `base_picks`/`base_burns` are the table defaults before effects adjust
/// them. Both are clamped to the pack like the defaults always were: a
/// two-card pack with one pick and two burns per action picks one and burns
/// one.
pub fn resolve_action(
    seat: &SeatState,
    pack: &Pack,
    picked_indices: &[usize],
    burned_indices: &[usize],
    request: Option<&EffectRequest>,
    base_picks: usize,
    base_burns: usize,
) -> Result<Resolution, DomainError> {
    check_indices(pack, picked_indices, burned_indices)?;

    let mut resolution = Resolution {
        required_picks: base_picks.min(pack.len()),
        required_burns: 0,
        spend_exchange: None,
        inject_booster: false,
        skip_next: 0,
        set_random: false,
        reveals: Vec::new(),
        note_colors: Vec::new(),
        takes_whole_pack: false,
    };

    // Automatic on-pick effects carried by the selected cards.
    for (ordinal, &idx) in picked_indices.iter().enumerate() {
        let Some(tag) = pack.cards[idx].effect else {
            continue;
        };
        if tag.revealed_on_pick() {
            resolution.reveals.push(ordinal);
        }
        match tag {
            DraftEffectTag::TakeWholePack => resolution.takes_whole_pack = true,
            DraftEffectTag::RandomPicksFromNowOn => resolution.set_random = true,
            DraftEffectTag::NoteColors => resolution.note_colors.push(ordinal),
            _ => {}
        }
    }

    let request = request.cloned().unwrap_or_default();

    if let Some(UsableEffectRequest::ExtraPickExchange) = request.usable {
        if resolution.takes_whole_pack {
            return Err(violation(
                ProtocolViolationKind::InvalidEffect,
                "cannot combine an extra pick with taking the whole pack".into(),
            ));
        }
        let capability = seat
            .unspent_capability(DraftEffectTag::ExtraPickExchange)
            .ok_or_else(|| {
                violation(
                    ProtocolViolationKind::InvalidEffect,
                    "no unspent exchange capability at this seat".into(),
                )
            })?;
        if pack.len() < resolution.required_picks + 1 {
            return Err(violation(
                ProtocolViolationKind::InvalidEffect,
                format!(
                    "pack of {} too small for an additional pick",
                    pack.len()
                ),
            ));
        }
        resolution.required_picks += 1;
        resolution.spend_exchange = Some(capability);
    }

    match request.optional {
        None => {}
        Some(opt) => {
            if resolution.takes_whole_pack {
                return Err(violation(
                    ProtocolViolationKind::InvalidEffect,
                    "cannot combine an optional effect with taking the whole pack".into(),
                ));
            }
            let (ordinal, wanted) = match opt {
                OptionalEffectRequest::InjectBooster { pick_ordinal } => {
                    (pick_ordinal, DraftEffectTag::InjectBooster)
                }
                OptionalEffectRequest::ExtraPickThenSkip { pick_ordinal } => {
                    (pick_ordinal, DraftEffectTag::ExtraPickThenSkip)
                }
            };
            let idx = picked_indices.get(ordinal).copied().ok_or_else(|| {
                violation(
                    ProtocolViolationKind::InvalidEffect,
                    format!("pick ordinal {ordinal} outside this action"),
                )
            })?;
            if pack.cards[idx].effect != Some(wanted) {
                return Err(violation(
                    ProtocolViolationKind::InvalidEffect,
                    format!("picked card '{}' does not carry that effect", pack.cards[idx].name),
                ));
            }
            match opt {
                OptionalEffectRequest::InjectBooster { .. } => {
                    resolution.inject_booster = true;
                }
                OptionalEffectRequest::ExtraPickThenSkip { .. } => {
                    if pack.len() < resolution.required_picks + 1 {
                        return Err(violation(
                            ProtocolViolationKind::InvalidEffect,
                            format!(
                                "pack of {} too small for an additional pick",
                                pack.len()
                            ),
                        ));
                    }
                    resolution.required_picks += 1;
                    resolution.skip_next += 1;
                }
            }
        }
    }

    if resolution.takes_whole_pack {
        resolution.required_picks = pack.len();
        // Skips for the remainder of the round; cleared at the next
        // distribution, so overshooting is harmless.
        resolution.skip_next = pack.len().min(u8::MAX as usize) as u8;
    }

    resolution.required_burns = base_burns.min(pack.len() - resolution.required_picks);

    if picked_indices.len() != resolution.required_picks {
        return Err(violation(
            ProtocolViolationKind::WrongCount,
            format!(
                "action requires exactly {} pick(s), got {}",
                resolution.required_picks,
                picked_indices.len()
            ),
        ));
    }
    if burned_indices.len() != resolution.required_burns {
        return Err(violation(
            ProtocolViolationKind::WrongCount,
            format!(
                "action requires exactly {} burn(s), got {}",
                resolution.required_burns,
                burned_indices.len()
            ),
        ));
    }

    Ok(resolution)
}

/// The exception an action's resolution leaves on the seat, if any.
///
/// Random picking is permanent and wins over transient skips.
pub fn exception_after(resolution: &Resolution) -> Option<RuleException> {
    if resolution.set_random {
        Some(RuleException::PickingRandomly)
    } else if resolution.skip_next > 0 {
        Some(RuleException::SkipNextPicks(resolution.skip_next))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cards::{Card, PickedCard};
    use crate::domain::state::SeatState;

    fn pack_of(n: usize) -> Pack {
        Pack::new(
            (0..n)
                .map(|i| Card::plain(format!("c{i}"), format!("card {i}"), i as f32))
                .collect(),
        )
    }

    fn seat() -> SeatState {
        SeatState::new(0, "seat 0".into(), false)
    }

    fn seat_with_exchange_capability() -> SeatState {
        let mut s = seat();
        s.picked.push(PickedCard::new(
            Card::plain("cap", "exchange card", 3.0)
                .with_effect(DraftEffectTag::ExtraPickExchange),
        ));
        s
    }

    #[test]
    fn plain_single_pick_resolves() {
        let pack = pack_of(5);
        let r = resolve_action(&seat(), &pack, &[2], &[], None, 1, 0).unwrap();
        assert_eq!(r.required_picks, 1);
        assert_eq!(r.required_burns, 0);
        assert!(exception_after(&r).is_none());
    }

    #[test]
    fn extra_pick_requires_exactly_two() {
        let s = seat_with_exchange_capability();
        let pack = pack_of(4);
        let request = EffectRequest {
            usable: Some(UsableEffectRequest::ExtraPickExchange),
            optional: None,
        };
        // One pick is rejected outright.
        let err = resolve_action(&s, &pack, &[0], &[], Some(&request), 1, 0).unwrap_err();
        assert!(matches!(
            err,
            DomainError::ProtocolViolation(ProtocolViolationKind::WrongCount, _)
        ));
        // Two picks resolve, spending the capability.
        let r = resolve_action(&s, &pack, &[0, 3], &[], Some(&request), 1, 0).unwrap();
        assert_eq!(r.required_picks, 2);
        assert_eq!(r.spend_exchange, Some(0));
    }

    #[test]
    fn extra_pick_without_capability_is_invalid() {
        let pack = pack_of(4);
        let request = EffectRequest {
            usable: Some(UsableEffectRequest::ExtraPickExchange),
            optional: None,
        };
        let err = resolve_action(&seat(), &pack, &[0, 1], &[], Some(&request), 1, 0).unwrap_err();
        assert!(matches!(
            err,
            DomainError::ProtocolViolation(ProtocolViolationKind::InvalidEffect, _)
        ));
    }

    #[test]
    fn burns_are_clamped_to_what_remains() {
        let pack = pack_of(2);
        // Two burns configured, but after one pick only one card remains.
        let r = resolve_action(&seat(), &pack, &[0], &[1], None, 1, 2).unwrap();
        assert_eq!(r.required_burns, 1);
    }

    #[test]
    fn take_whole_pack_requires_every_index() {
        let mut pack = pack_of(3);
        pack.cards[1] = Card::plain("w", "whole pack card", 1.0)
            .with_effect(DraftEffectTag::TakeWholePack);
        let err = resolve_action(&seat(), &pack, &[1], &[], None, 1, 0).unwrap_err();
        assert!(matches!(
            err,
            DomainError::ProtocolViolation(ProtocolViolationKind::WrongCount, _)
        ));
        let r = resolve_action(&seat(), &pack, &[1, 0, 2], &[], None, 1, 0).unwrap();
        assert!(r.takes_whole_pack);
        assert_eq!(r.required_picks, 3);
        assert!(matches!(
            exception_after(&r),
            Some(RuleException::SkipNextPicks(_))
        ));
    }

    #[test]
    fn optional_effect_must_point_at_the_tagged_card() {
        let mut pack = pack_of(3);
        pack.cards[0] = Card::plain("i", "inject card", 1.0)
            .with_effect(DraftEffectTag::InjectBooster);
        let bad = EffectRequest {
            usable: None,
            optional: Some(OptionalEffectRequest::InjectBooster { pick_ordinal: 0 }),
        };
        // Picked card 1 does not carry the tag.
        let err = resolve_action(&seat(), &pack, &[1], &[], Some(&bad), 1, 0).unwrap_err();
        assert!(matches!(
            err,
            DomainError::ProtocolViolation(ProtocolViolationKind::InvalidEffect, _)
        ));
        let good = EffectRequest {
            usable: None,
            optional: Some(OptionalEffectRequest::InjectBooster { pick_ordinal: 0 }),
        };
        let r = resolve_action(&seat(), &pack, &[0], &[], Some(&good), 1, 0).unwrap();
        assert!(r.inject_booster);
    }

    #[test]
    fn random_picking_exception_wins_over_skip() {
        let mut pack = pack_of(4);
        pack.cards[0] = Card::plain("r", "random card", 1.0)
            .with_effect(DraftEffectTag::RandomPicksFromNowOn);
        pack.cards[1] = Card::plain("s", "skip card", 1.0)
            .with_effect(DraftEffectTag::ExtraPickThenSkip);
        let request = EffectRequest {
            usable: None,
            optional: Some(OptionalEffectRequest::ExtraPickThenSkip { pick_ordinal: 1 }),
        };
        let r = resolve_action(&seat(), &pack, &[0, 1], &[], Some(&request), 1, 0).unwrap();
        assert!(r.set_random);
        assert_eq!(r.skip_next, 1);
        assert_eq!(exception_after(&r), Some(RuleException::PickingRandomly));
    }

    #[test]
    fn duplicate_indices_rejected() {
        let pack = pack_of(4);
        let err = resolve_action(&seat(), &pack, &[1], &[1], None, 1, 1).unwrap_err();
        assert!(matches!(
            err,
            DomainError::ProtocolViolation(ProtocolViolationKind::BadIndex, _)
        ));
    }
}
