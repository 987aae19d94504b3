//! End-to-end draft flow tests: full tables of bots and humans, disconnects,
//! promotions, effects, and termination.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use draft_engine::ai::{OracleError, Recommendation, RoundInfo, ScoringOracle};
use draft_engine::config::{DraftConfig, TimerMode};
use draft_engine::domain::cards::{Card, CardId, Color, DraftEffectTag, Pack};
use draft_engine::domain::effects::{EffectRequest, OptionalEffectRequest, UsableEffectRequest};
use draft_engine::errors::domain::{DomainError, ProtocolViolationKind};
use draft_engine::generator::{BoosterGenerator, GeneratorConstraints, GeneratorError};
use draft_engine::logging::draft_log::{DraftLogEvent, MemoryLogSink};
use draft_engine::EngineError;
use draft_engine::{DraftEngine, EngineDeps, SeatPlan};

#[ctor::ctor]
fn init_logging() {
    engine_test_support::logging::init();
}

/// Oracle that always fails: the whole table must fall back to the local
/// heuristic and still finish.
struct FailingOracle;

#[async_trait]
impl ScoringOracle for FailingOracle {
    async fn recommend(
        &self,
        _history: &[CardId],
        _pack: &Pack,
        _round: &RoundInfo,
    ) -> Result<Recommendation, OracleError> {
        Err(OracleError::Unreachable("wire cut".into()))
    }
}

/// Oracle that answers slowly, to force real interleaving between seats.
struct SlowOracle;

#[async_trait]
impl ScoringOracle for SlowOracle {
    async fn recommend(
        &self,
        _history: &[CardId],
        pack: &Pack,
        _round: &RoundInfo,
    ) -> Result<Recommendation, OracleError> {
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok(Recommendation {
            chosen_index: 0,
            scores: vec![1.0; pack.len()],
        })
    }
}

struct StubGenerator {
    cards_per_pack: usize,
}

impl BoosterGenerator for StubGenerator {
    fn generate(
        &self,
        quantity: usize,
        _constraints: &GeneratorConstraints,
    ) -> Result<Vec<Pack>, GeneratorError> {
        Ok((0..quantity)
            .map(|p| {
                Pack::new(
                    (0..self.cards_per_pack)
                        .map(|i| Card::plain(format!("gen-{p}-{i}"), format!("gen {p} {i}"), 1.0))
                        .collect(),
                )
            })
            .collect())
    }
}

fn plain_packs(count: usize, cards_per_pack: usize) -> Vec<Pack> {
    (0..count)
        .map(|p| {
            Pack::new(
                (0..cards_per_pack)
                    .map(|i| {
                        Card::plain(format!("p{p}-c{i}"), format!("pack {p} card {i}"), i as f32)
                    })
                    .collect(),
            )
        })
        .collect()
}

fn no_timer_config() -> DraftConfig {
    DraftConfig {
        timer: TimerMode::Disabled,
        ..DraftConfig::default()
    }
}

async fn wait_until<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 5 seconds");
}

/// Wait until `seat` has a front pack to act on.
async fn wait_for_pack(engine: &DraftEngine, seat: u8) {
    for _ in 0..500 {
        let ready = engine
            .state_for(seat)
            .await
            .map(|s| s.current_pack.is_some())
            .unwrap_or(false);
        if ready {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("seat {seat} never received a pack");
}

async fn wait_for_end(engine: &DraftEngine) {
    for _ in 0..500 {
        if engine.is_ended().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("draft did not end within 5 seconds");
}

fn assert_protocol_violation(err: EngineError, kind: ProtocolViolationKind) {
    match err {
        EngineError::Domain(DomainError::ProtocolViolation(actual, _)) => {
            assert_eq!(actual, kind)
        }
        other => panic!("expected protocol violation {kind:?}, got {other}"),
    }
}

#[tokio::test]
async fn failing_oracle_still_finishes_a_full_bot_draft() {
    let log = Arc::new(MemoryLogSink::new());
    let deps = EngineDeps {
        oracle: Some(Arc::new(FailingOracle)),
        log: log.clone(),
        ..EngineDeps::default()
    };
    let plan = SeatPlan {
        humans: vec![],
        bot_count: 4,
    };
    // Two rounds of 4 packs with 4 cards: every seat ends with 8 picks.
    let engine = DraftEngine::start(plan, plain_packs(8, 4), no_timer_config(), deps)
        .await
        .unwrap();

    wait_for_end(&engine).await;

    for seat in 0..4 {
        let snapshot = engine.state_for(seat).await.unwrap();
        assert_eq!(snapshot.picked.len(), 8, "seat {seat} pick count");
        assert_eq!(snapshot.pending_packs, 0);
    }
    let events = log.records();
    assert!(events
        .iter()
        .any(|r| matches!(r.event, DraftLogEvent::RoundStarted { round_number: 1, .. })));
    assert!(events
        .iter()
        .any(|r| matches!(r.event, DraftLogEvent::DraftEnded { .. })));
}

#[tokio::test]
async fn slow_oracle_interleaves_and_conserves_cards() {
    let deps = EngineDeps {
        oracle: Some(Arc::new(SlowOracle)),
        ..EngineDeps::default()
    };
    let plan = SeatPlan {
        humans: vec![],
        bot_count: 4,
    };
    let mut config = no_timer_config();
    config.burns_per_action = 1;
    // Packs of 8 with one pick and one burn per action: four visits per
    // pack, four picks and four burns per seat.
    let engine = DraftEngine::start(plan, plain_packs(4, 8), config, deps)
        .await
        .unwrap();

    wait_for_end(&engine).await;

    for seat in 0..4 {
        let snapshot = engine.state_for(seat).await.unwrap();
        assert_eq!(snapshot.picked.len(), 4, "seat {seat} pick count");
    }
}

#[tokio::test]
async fn human_round_advances_when_all_queues_empty() {
    let log = Arc::new(MemoryLogSink::new());
    let deps = EngineDeps {
        log: log.clone(),
        ..EngineDeps::default()
    };
    let plan = SeatPlan::humans(&["ana", "bo"]);
    // Two rounds of two-card packs.
    let engine = DraftEngine::start(plan, plain_packs(4, 2), no_timer_config(), deps)
        .await
        .unwrap();

    for _round in 0..2 {
        for _visit in 0..2 {
            for seat in 0..2 {
                wait_for_pack(&engine, seat).await;
                engine.pick(seat, &[0], &[], None).await.unwrap();
            }
        }
    }

    wait_for_end(&engine).await;
    let events = log.records();
    assert!(events
        .iter()
        .any(|r| matches!(r.event, DraftLogEvent::RoundStarted { round_number: 1, .. })));
    for seat in 0..2 {
        let snapshot = engine.state_for(seat).await.unwrap();
        assert_eq!(snapshot.picked.len(), 4);
    }
}

#[tokio::test]
async fn disconnected_seat_is_promoted_and_keeps_history() {
    let log = Arc::new(MemoryLogSink::new());
    let deps = EngineDeps {
        log: log.clone(),
        ..EngineDeps::default()
    };
    let mut config = no_timer_config();
    config.reconnect_grace = Duration::from_millis(50);
    let plan = SeatPlan::humans(&["ana", "bo"]);
    let engine = DraftEngine::start(plan, plain_packs(2, 2), config, deps)
        .await
        .unwrap();

    // Seat 1 picks as a human first, then drops.
    engine.pick(1, &[0], &[], None).await.unwrap();
    engine.pick(0, &[0], &[], None).await.unwrap();
    wait_for_pack(&engine, 1).await;
    engine.on_disconnect(1).await.unwrap();

    // Grace elapses, the seat is promoted, and the bot finishes its packs.
    wait_until(|| {
        log.records()
            .iter()
            .any(|r| matches!(r.event, DraftLogEvent::SeatPromoted { seat: 1 }))
    })
    .await;

    // Seat 0 still has its own last pick to make.
    wait_for_pack(&engine, 0).await;
    engine.pick(0, &[0], &[], None).await.unwrap();

    wait_for_end(&engine).await;
    let snapshot = engine.state_for(1).await.unwrap();
    assert_eq!(snapshot.picked.len(), 2);
    // The human's own pick is still the first entry of the seat's history.
    assert_eq!(snapshot.picked[0].card.name, "pack 1 card 0");
}

#[tokio::test]
async fn reconnect_restores_an_identical_view() {
    let deps = EngineDeps::default();
    let mut config = DraftConfig::default();
    config.reconnect_grace = Duration::from_secs(60);
    let plan = SeatPlan::humans(&["ana", "bo", "cy"]);
    let engine = DraftEngine::start(plan, plain_packs(3, 5), config, deps)
        .await
        .unwrap();

    let before = engine.state_for(2).await.unwrap();
    assert!(before.remaining_seconds.is_some());

    engine.on_disconnect(2).await.unwrap();
    let after = engine.on_reconnect(2).await.unwrap();

    assert_eq!(before.pending_packs, after.pending_packs);
    assert_eq!(before.current_pack, after.current_pack);
    assert_eq!(before.pick_cursor, after.pick_cursor);
    assert_eq!(before.remaining_seconds, after.remaining_seconds);

    // A second reconnect without a disconnect is a protocol violation.
    let err = engine.on_reconnect(2).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Domain(DomainError::ProtocolViolation(..))
    ));
}

#[tokio::test]
async fn extra_pick_effect_requires_exactly_two_picks() {
    let deps = EngineDeps::default();
    let plan = SeatPlan::humans(&["ana", "bo"]);
    let mut packs = plain_packs(2, 3);
    packs[0].cards[0] = Card::plain("x", "exchange card", 9.0)
        .with_effect(DraftEffectTag::ExtraPickExchange);
    let engine = DraftEngine::start(plan, packs, no_timer_config(), deps)
        .await
        .unwrap();

    // Seat 0 drafts the capability card; seat 1 passes its pack along.
    engine.pick(0, &[0], &[], None).await.unwrap();
    engine.pick(1, &[0], &[], None).await.unwrap();
    wait_for_pack(&engine, 0).await;

    let request = EffectRequest {
        usable: Some(UsableEffectRequest::ExtraPickExchange),
        optional: None,
    };
    // One pick with the effect active is rejected with no mutation.
    let err = engine
        .pick(0, &[0], &[], Some(request.clone()))
        .await
        .unwrap_err();
    assert_protocol_violation(err, ProtocolViolationKind::WrongCount);
    let snapshot = engine.state_for(0).await.unwrap();
    assert_eq!(snapshot.picked.len(), 1);

    // Two picks resolve; the capability card goes back into the pack.
    engine.pick(0, &[0, 1], &[], Some(request)).await.unwrap();
    let snapshot = engine.state_for(0).await.unwrap();
    assert_eq!(snapshot.picked.len(), 2);
    assert!(snapshot.picked.iter().all(|p| p.card.name != "exchange card"));
}

#[tokio::test]
async fn last_card_routes_to_redirect_marker_holder() {
    let deps = EngineDeps::default();
    let plan = SeatPlan::humans(&["ana", "bo", "cy"]);
    let mut packs = plain_packs(3, 2);
    packs[2].cards[0] =
        Card::plain("m", "marker card", 9.0).with_effect(DraftEffectTag::LastCardRedirect);
    let engine = DraftEngine::start(plan, packs, no_timer_config(), deps)
        .await
        .unwrap();

    // Seat 2 drafts the marker first.
    engine.pick(2, &[0], &[], None).await.unwrap();
    let marked = engine.state_for(2).await.unwrap();
    assert!(marked.table[2].face_up.iter().any(|c| c.card.name == "marker card"));

    // Seat 0 reduces its pack to one card; parity says seat 1, the marker
    // says seat 2.
    engine.pick(0, &[0], &[], None).await.unwrap();
    let redirected = engine.state_for(2).await.unwrap();
    assert_eq!(redirected.pending_packs, 2);
    let bystander = engine.state_for(1).await.unwrap();
    assert_eq!(bystander.pending_packs, 1);
}

#[tokio::test]
async fn booster_injection_queues_a_logged_extra_pack() {
    let log = Arc::new(MemoryLogSink::new());
    let deps = EngineDeps {
        log: log.clone(),
        generator: Some(Arc::new(StubGenerator { cards_per_pack: 3 })),
        ..EngineDeps::default()
    };
    let plan = SeatPlan::humans(&["ana", "bo"]);
    let mut packs = plain_packs(2, 3);
    packs[0].cards[1] =
        Card::plain("i", "inject card", 9.0).with_effect(DraftEffectTag::InjectBooster);
    let engine = DraftEngine::start(plan, packs, no_timer_config(), deps)
        .await
        .unwrap();

    let request = EffectRequest {
        usable: None,
        optional: Some(OptionalEffectRequest::InjectBooster { pick_ordinal: 0 }),
    };
    engine.pick(0, &[1], &[], Some(request)).await.unwrap();

    let snapshot = engine.state_for(0).await.unwrap();
    // The passed pack went to seat 1; the injected booster is queued here.
    assert_eq!(snapshot.pending_packs, 1);
    assert_eq!(snapshot.current_pack.as_ref().unwrap().len(), 3);
    assert!(log
        .records()
        .iter()
        .any(|r| matches!(r.event, DraftLogEvent::BoosterInjected { seat: 0, .. })));
}

#[tokio::test]
async fn forced_skip_must_be_consumed_through_skip() {
    let deps = EngineDeps::default();
    let plan = SeatPlan::humans(&["ana", "bo"]);
    let mut packs = plain_packs(2, 3);
    packs[0].cards[0] = Card::plain("s", "skip card", 9.0)
        .with_effect(DraftEffectTag::ExtraPickThenSkip);
    let engine = DraftEngine::start(plan, packs, no_timer_config(), deps)
        .await
        .unwrap();

    let request = EffectRequest {
        usable: None,
        optional: Some(OptionalEffectRequest::ExtraPickThenSkip { pick_ordinal: 0 }),
    };
    engine.pick(0, &[0, 1], &[], Some(request)).await.unwrap();
    engine.pick(1, &[0], &[], None).await.unwrap();
    wait_for_pack(&engine, 0).await;

    let snapshot = engine.state_for(0).await.unwrap();
    assert!(snapshot.mandatory_skip);

    let err = engine.pick(0, &[0], &[], None).await.unwrap_err();
    assert_protocol_violation(err, ProtocolViolationKind::MustSkip);

    engine.skip(0).await.unwrap();
    let snapshot = engine.state_for(0).await.unwrap();
    assert!(!snapshot.mandatory_skip);

    // Seat 1 keeps passing so seat 0 holds a pack again, with no skip due.
    wait_for_pack(&engine, 1).await;
    engine.pick(1, &[0], &[], None).await.unwrap();
    wait_for_pack(&engine, 1).await;
    engine.pick(1, &[0], &[], None).await.unwrap();
    wait_for_pack(&engine, 0).await;
    let err = engine.skip(0).await.unwrap_err();
    assert_protocol_violation(err, ProtocolViolationKind::NothingToSkip);
}

#[tokio::test]
async fn note_colors_falls_back_for_silent_choosers() {
    let log = Arc::new(MemoryLogSink::new());
    let deps = EngineDeps {
        log: log.clone(),
        ..EngineDeps::default()
    };
    let mut config = no_timer_config();
    config.choice_timeout = Duration::from_millis(30);
    let plan = SeatPlan::humans(&["ana", "bo", "cy"]);
    let mut packs = plain_packs(3, 2);
    packs[0].cards[0] =
        Card::plain("n", "noted card", 9.0).with_effect(DraftEffectTag::NoteColors);
    let engine = DraftEngine::start(plan, packs, config, deps)
        .await
        .unwrap();

    engine.pick(0, &[0], &[], None).await.unwrap();

    // Nobody answers: all three notes resolve by random fallback.
    wait_until(|| {
        log.records()
            .iter()
            .filter(|r| matches!(r.event, DraftLogEvent::ColorNoted { seat: 0, .. }))
            .count()
            == 3
    })
    .await;

    let snapshot = engine.state_for(0).await.unwrap();
    let noted = &snapshot.picked[0].noted_colors;
    assert_eq!(noted.len(), 3);
    let distinct: std::collections::HashSet<Color> = noted.iter().copied().collect();
    assert_eq!(distinct.len(), 3, "noted colors must not repeat");
}

#[tokio::test]
async fn stop_ends_the_draft_and_rejects_further_actions() {
    let log = Arc::new(MemoryLogSink::new());
    let deps = EngineDeps {
        log: log.clone(),
        ..EngineDeps::default()
    };
    let plan = SeatPlan::humans(&["ana", "bo"]);
    let engine = DraftEngine::start(plan, plain_packs(2, 3), no_timer_config(), deps)
        .await
        .unwrap();

    engine.stop().await;
    assert!(engine.is_ended().await);

    let err = engine.pick(0, &[0], &[], None).await.unwrap_err();
    assert_protocol_violation(err, ProtocolViolationKind::NotRunning);

    assert!(log
        .records()
        .iter()
        .any(|r| matches!(r.event, DraftLogEvent::DraftEnded { .. })));
}

#[tokio::test]
async fn pause_blocks_picks_until_resume() {
    let deps = EngineDeps::default();
    let plan = SeatPlan::humans(&["ana", "bo"]);
    let engine = DraftEngine::start(plan, plain_packs(2, 3), no_timer_config(), deps)
        .await
        .unwrap();

    engine.pause().await.unwrap();
    let err = engine.pick(0, &[0], &[], None).await.unwrap_err();
    assert_protocol_violation(err, ProtocolViolationKind::NotRunning);

    engine.resume().await.unwrap();
    engine.pick(0, &[0], &[], None).await.unwrap();
}

#[tokio::test]
async fn uneven_pack_count_aborts_before_any_seat_exists() {
    let deps = EngineDeps::default();
    let plan = SeatPlan::humans(&["ana", "bo"]);
    let err = DraftEngine::start(plan, plain_packs(3, 3), no_timer_config(), deps)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Domain(DomainError::InvalidSetup(_))
    ));
}

#[tokio::test]
async fn generator_failure_aborts_start() {
    struct BrokenGenerator;
    impl BoosterGenerator for BrokenGenerator {
        fn generate(
            &self,
            _quantity: usize,
            _constraints: &GeneratorConstraints,
        ) -> Result<Vec<Pack>, GeneratorError> {
            Err(GeneratorError {
                detail: "card pool exhausted".into(),
            })
        }
    }

    let deps = EngineDeps {
        generator: Some(Arc::new(BrokenGenerator)),
        ..EngineDeps::default()
    };
    let plan = SeatPlan::humans(&["ana", "bo"]);
    let err = DraftEngine::start_with_generator(
        plan,
        2,
        &GeneratorConstraints::default(),
        no_timer_config(),
        deps,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, EngineError::Generator { .. }));
}
