//! Draft flow orchestration - the stateful engine over the pure domain.
//!
//! One `DraftEngine` instance coordinates one table. All state mutation
//! happens under a single `tokio::sync::Mutex`: every externally triggered
//! action is a transaction (lock, validate against live state, mutate,
//! release). Suspension points - oracle calls, cross-participant choices,
//! timers, grace periods - never hold the lock, and re-validate against live
//! state when they come back.

mod actions;
mod choices;
mod countdown;
mod reconnect;
mod router;
mod rounds;
mod scheduler;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex as SyncMutex;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::sync::{oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::ai::{create_agent, DraftAgent, HttpScoringOracle, OracleAgent, ScoringOracle};
use crate::config::DraftConfig;
use crate::domain::cards::{Card, Color, Pack};
use crate::domain::effects::EffectRequest;
use crate::domain::snapshot::{DisconnectedSeatRecord, SeatSnapshot, TableSnapshot};
use crate::domain::state::{DraftPhase, DraftState, SeatId, SeatState};
use crate::error::EngineError;
use crate::errors::domain::{DomainError, ProtocolViolationKind};
use crate::generator::BoosterGenerator;
use crate::hub::{TableEvent, TableHub};
use crate::logging::draft_log::{DraftLogEvent, DraftLogRecord, DraftLogSink, TracingLogSink};

use self::countdown::CountdownState;

/// Who sits where at draft start. Requested bots are interleaved evenly
/// between the human seats.
#[derive(Debug, Clone)]
pub struct SeatPlan {
    pub humans: Vec<String>,
    pub bot_count: usize,
}

impl SeatPlan {
    pub fn humans(names: &[&str]) -> Self {
        Self {
            humans: names.iter().map(|n| n.to_string()).collect(),
            bot_count: 0,
        }
    }

    pub fn with_bots(mut self, bot_count: usize) -> Self {
        self.bot_count = bot_count;
        self
    }

    /// Build the seat list, spreading bots around the table so no human
    /// faces a long run of bot neighbors.
    fn build(&self) -> Result<Vec<SeatState>, DomainError> {
        if self.humans.is_empty() && self.bot_count == 0 {
            return Err(DomainError::invalid_setup("a draft needs participants"));
        }
        #[derive(Clone)]
        struct Slot {
            name: String,
            is_ai: bool,
        }
        let mut slots: Vec<Slot> = self
            .humans
            .iter()
            .map(|name| Slot {
                name: name.clone(),
                is_ai: false,
            })
            .collect();
        if slots.is_empty() {
            for i in 0..self.bot_count {
                slots.push(Slot {
                    name: format!("Bot #{}", i + 1),
                    is_ai: true,
                });
            }
        } else {
            let mut idx = 0usize;
            for i in 0..self.bot_count {
                // Find the next human and insert the bot right after it.
                while slots[idx].is_ai {
                    idx = (idx + 1) % slots.len();
                }
                idx += 1;
                slots.insert(
                    idx,
                    Slot {
                        name: format!("Bot #{}", i + 1),
                        is_ai: true,
                    },
                );
            }
        }
        if slots.len() < 2 {
            return Err(DomainError::invalid_setup(
                "a draft needs at least two seats",
            ));
        }
        if slots.len() > SeatId::MAX as usize {
            return Err(DomainError::invalid_setup("too many seats"));
        }
        Ok(slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| SeatState::new(i as SeatId, slot.name, slot.is_ai))
            .collect())
    }
}

/// Collaborators injected into the engine. Everything has a sensible default
/// so tests can spin up a table with `EngineDeps::default()`.
pub struct EngineDeps {
    pub hub: Arc<TableHub>,
    pub log: Arc<dyn DraftLogSink>,
    /// Overrides the HTTP oracle built from `DraftConfig::oracle`.
    pub oracle: Option<Arc<dyn ScoringOracle>>,
    /// Required for booster injection effects and `start_with_generator`.
    pub generator: Option<Arc<dyn BoosterGenerator>>,
    /// Registry name of the local agent used when no oracle is configured.
    pub agent: String,
}

impl Default for EngineDeps {
    fn default() -> Self {
        Self {
            hub: Arc::new(TableHub::new()),
            log: Arc::new(TracingLogSink),
            oracle: None,
            generator: None,
            agent: "heuristic".to_string(),
        }
    }
}

/// Per-seat runtime owned by the service layer: the agent instance, the
/// single-flight flag, timer and reconnection state.
pub(crate) struct SeatRuntime {
    /// `None` while a bot cycle or a recommendation task holds the agent.
    pub(crate) agent: Option<Box<dyn DraftAgent + Send>>,
    /// Picks applied while the agent was taken; replayed on return.
    pub(crate) deferred_history: Vec<Card>,
    /// Single-flight guard: at most one asynchronous cycle per seat.
    pub(crate) bot_in_flight: bool,
    pub(crate) countdown: CountdownState,
    /// Grace timer armed at disconnect.
    pub(crate) grace_task: Option<tokio::task::JoinHandle<()>>,
    /// Exists only while the seat is offline.
    pub(crate) disconnect_record: Option<DisconnectedSeatRecord>,
}

impl SeatRuntime {
    fn new(agent: Box<dyn DraftAgent + Send>) -> Self {
        Self {
            agent: Some(agent),
            deferred_history: Vec::new(),
            bot_in_flight: false,
            countdown: CountdownState::new(),
            grace_task: None,
            disconnect_record: None,
        }
    }

    /// Return a taken agent, replaying any picks it missed.
    pub(crate) fn put_agent(&mut self, mut agent: Box<dyn DraftAgent + Send>) {
        for card in self.deferred_history.drain(..) {
            agent.add_picked(&card);
        }
        self.agent = Some(agent);
    }

    /// Record a pick on the agent, deferring it if the agent is out.
    pub(crate) fn record_pick(&mut self, card: &Card) {
        match self.agent.as_mut() {
            Some(agent) => agent.add_picked(card),
            None => self.deferred_history.push(card.clone()),
        }
    }
}

/// Domain state plus per-seat runtime, guarded by one lock.
pub(crate) struct DraftTable {
    pub(crate) state: DraftState,
    pub(crate) runtime: Vec<SeatRuntime>,
}

pub(crate) struct EngineInner {
    pub(crate) table: Mutex<DraftTable>,
    pub(crate) config: DraftConfig,
    pub(crate) hub: Arc<TableHub>,
    pub(crate) log: Arc<dyn DraftLogSink>,
    pub(crate) generator: Option<Arc<dyn BoosterGenerator>>,
    /// Table RNG: redirect tie-breaks, random-pick substitution, choice
    /// fallbacks. Seedable for reproducible tests.
    pub(crate) rng: SyncMutex<ChaCha8Rng>,
    pub(crate) shutdown: CancellationToken,
    /// Outstanding cross-participant choices, keyed by request id.
    pub(crate) choices: SyncMutex<HashMap<Uuid, oneshot::Sender<Color>>>,
}

impl EngineInner {
    pub(crate) fn log_event(&self, event: DraftLogEvent) {
        self.log.append(DraftLogRecord::now(event));
    }
}

/// The draft engine: one instance per active draft.
///
/// All public methods must be called from within a tokio runtime; the engine
/// spawns countdowns, bot cycles, and grace timers as tasks.
#[derive(Clone)]
pub struct DraftEngine {
    inner: Arc<EngineInner>,
}

impl std::fmt::Debug for DraftEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DraftEngine").finish_non_exhaustive()
    }
}

impl DraftEngine {
    /// Start a draft with pre-generated packs.
    ///
    /// `packs.len()` must be a positive multiple of the seat count; each
    /// round deals one pack per seat.
    pub async fn start(
        plan: SeatPlan,
        packs: Vec<Pack>,
        config: DraftConfig,
        deps: EngineDeps,
    ) -> Result<Self, EngineError> {
        let seats = plan.build()?;
        let seat_count = seats.len();
        if packs.is_empty() || packs.len() % seat_count != 0 {
            return Err(DomainError::invalid_setup(format!(
                "{} packs cannot be dealt evenly to {seat_count} seats",
                packs.len()
            ))
            .into());
        }
        let rounds_total = packs.len() / seat_count;
        if rounds_total > u8::MAX as usize {
            return Err(DomainError::invalid_setup("too many rounds").into());
        }

        let oracle: Option<Arc<dyn ScoringOracle>> = match (&deps.oracle, &config.oracle) {
            (Some(oracle), _) => Some(oracle.clone()),
            (None, Some(cfg)) => Some(Arc::new(
                HttpScoringOracle::new(cfg)
                    .map_err(|err| EngineError::config(err.to_string()))?,
            )),
            (None, None) => None,
        };

        let runtime = seats
            .iter()
            .map(|seat| {
                let agent: Box<dyn DraftAgent + Send> = match &oracle {
                    Some(oracle) => Box::new(OracleAgent::new(oracle.clone())),
                    None => {
                        let seed = config.rng_seed.map(|s| s + seat.seat_id as u64);
                        create_agent(&deps.agent, seed).ok_or_else(|| {
                            EngineError::config(format!("unknown agent '{}'", deps.agent))
                        })?
                    }
                };
                Ok(SeatRuntime::new(agent))
            })
            .collect::<Result<Vec<_>, EngineError>>()?;

        let rng = match config.rng_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_os_rng(),
        };

        let state = DraftState::new(seats, packs.into(), rounds_total as u8);
        let inner = Arc::new(EngineInner {
            table: Mutex::new(DraftTable { state, runtime }),
            config,
            hub: deps.hub,
            log: deps.log,
            generator: deps.generator,
            rng: SyncMutex::new(rng),
            shutdown: CancellationToken::new(),
            choices: SyncMutex::new(HashMap::new()),
        });

        let engine = Self { inner };
        {
            let inner = engine.inner.clone();
            let mut table = inner.table.lock().await;
            let cards_per_pack = table
                .state
                .reserve
                .front()
                .map(Pack::len)
                .unwrap_or_default();
            inner.log_event(DraftLogEvent::DraftStarted {
                seats: seat_count,
                rounds_total: rounds_total as u8,
                cards_per_pack,
            });
            info!(seats = seat_count, rounds_total, "draft started");
            rounds::distribute(&inner, &mut table)?;
        }
        Ok(engine)
    }

    /// Start a draft, generating the packs first. Generation failure aborts
    /// before any seat state exists.
    pub async fn start_with_generator(
        plan: SeatPlan,
        rounds: usize,
        constraints: &crate::generator::GeneratorConstraints,
        config: DraftConfig,
        deps: EngineDeps,
    ) -> Result<Self, EngineError> {
        let generator = deps
            .generator
            .clone()
            .ok_or_else(|| EngineError::config("no booster generator supplied"))?;
        let seat_count = plan.build()?.len();
        let packs = generator
            .generate(seat_count * rounds, constraints)
            .map_err(|err| EngineError::generator(err.to_string()))?;
        Self::start(plan, packs, config, deps).await
    }

    /// One pick transaction for a connected human seat.
    pub async fn pick(
        &self,
        seat: SeatId,
        picked_indices: &[usize],
        burned_indices: &[usize],
        effect: Option<EffectRequest>,
    ) -> Result<SeatSnapshot, EngineError> {
        let inner = &self.inner;
        let mut table = inner.table.lock().await;
        self.ensure_running_phase(&table)?;
        {
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
        }
        let outcome = actions::apply_pick(
            inner,
            &mut table,
            seat,
            picked_indices,
            burned_indices,
            effect.as_ref(),
        );
        match outcome {
            Ok(()) => {
                let remaining = countdown::remaining_seconds(&table, seat);
                Ok(SeatSnapshot::capture(&table.state, seat, remaining))
            }
            Err(err) => {
                self.handle_action_error(&mut table, err)
            }
        }
    }

    /// Consume one forced skip for a seat under a skip exception.
    pub async fn skip(&self, seat: SeatId) -> Result<SeatSnapshot, EngineError> {
        let inner = &self.inner;
        let mut table = inner.table.lock().await;
        self.ensure_running_phase(&table)?;
        let outcome = actions::apply_skip(inner, &mut table, seat);
        match outcome {
            Ok(()) => {
                let remaining = countdown::remaining_seconds(&table, seat);
                Ok(SeatSnapshot::capture(&table.state, seat, remaining))
            }
            Err(err) => self.handle_action_error(&mut table, err),
        }
    }

    /// Answer an outstanding cross-participant choice.
    pub async fn resolve_choice(
        &self,
        request_id: Uuid,
        color: Color,
    ) -> Result<(), EngineError> {
        let sender = self.inner.choices.lock().remove(&request_id);
        match sender {
            Some(sender) => {
                let _ = sender.send(color);
                Ok(())
            }
            None => Err(DomainError::violation(
                ProtocolViolationKind::Other("unknown choice".into()),
                format!("no outstanding choice {request_id}"),
            )
            .into()),
        }
    }

    /// Current view for one seat.
    pub async fn state_for(&self, seat: SeatId) -> Result<SeatSnapshot, EngineError> {
        let table = self.inner.table.lock().await;
        table.state.seat(seat)?;
        let remaining = countdown::remaining_seconds(&table, seat);
        Ok(SeatSnapshot::capture(&table.state, seat, remaining))
    }

    /// Whole-table summary.
    pub async fn table_snapshot(&self) -> TableSnapshot {
        let table = self.inner.table.lock().await;
        TableSnapshot::capture(&table.state)
    }

    /// Transport reports a seat's connection went away.
    pub async fn on_disconnect(&self, seat: SeatId) -> Result<(), EngineError> {
        let inner = &self.inner;
        let mut table = inner.table.lock().await;
        if table.state.phase == DraftPhase::Ended {
            return Ok(());
        }
        reconnect::handle_disconnect(inner, &mut table, seat)?;
        Ok(())
    }

    /// Transport reports a seat came back; returns the restored view.
    pub async fn on_reconnect(&self, seat: SeatId) -> Result<SeatSnapshot, EngineError> {
        let inner = &self.inner;
        let mut table = inner.table.lock().await;
        self.ensure_not_ended(&table)?;
        reconnect::handle_reconnect(inner, &mut table, seat)
    }

    /// Suspend countdowns. Bot cycles keep draining AI seats.
    pub async fn pause(&self) -> Result<(), EngineError> {
        let inner = &self.inner;
        let mut table = inner.table.lock().await;
        self.ensure_running_phase(&table)?;
        table.state.phase = DraftPhase::Paused;
        inner.hub.broadcast(TableEvent::DraftPaused);
        info!("draft paused");
        Ok(())
    }

    pub async fn resume(&self) -> Result<(), EngineError> {
        let inner = &self.inner;
        let mut table = inner.table.lock().await;
        if table.state.phase != DraftPhase::Paused {
            return Err(DomainError::violation(
                ProtocolViolationKind::NotRunning,
                "draft is not paused",
            )
            .into());
        }
        table.state.phase = DraftPhase::Running;
        inner.hub.broadcast(TableEvent::DraftResumed);
        info!("draft resumed");
        Ok(())
    }

    /// Abort immediately, finalizing logs. Idempotent.
    pub async fn stop(&self) {
        let inner = &self.inner;
        let mut table = inner.table.lock().await;
        if table.state.phase == DraftPhase::Ended {
            return;
        }
        rounds::end_draft(inner, &mut table, "stopped by host");
    }

    /// True once the draft reached its natural end or was stopped.
    pub async fn is_ended(&self) -> bool {
        self.inner.table.lock().await.state.phase == DraftPhase::Ended
    }

    fn ensure_running_phase(&self, table: &DraftTable) -> Result<(), EngineError> {
        match table.state.phase {
            DraftPhase::Running => Ok(()),
            DraftPhase::Paused => Err(DomainError::violation(
                ProtocolViolationKind::NotRunning,
                "draft is paused",
            )
            .into()),
            DraftPhase::Ended => Err(DomainError::violation(
                ProtocolViolationKind::NotRunning,
                "draft has ended",
            )
            .into()),
        }
    }

    fn ensure_not_ended(&self, table: &DraftTable) -> Result<(), EngineError> {
        if table.state.phase == DraftPhase::Ended {
            return Err(DomainError::violation(
                ProtocolViolationKind::NotRunning,
                "draft has ended",
            )
            .into());
        }
        Ok(())
    }

    /// Invariant breaches end the current draft defensively; protocol
    /// violations pass through untouched.
    fn handle_action_error<T>(
        &self,
        table: &mut DraftTable,
        err: EngineError,
    ) -> Result<T, EngineError> {
        if let EngineError::Domain(domain) = &err {
            if domain.is_fatal() {
                warn!(error = %domain, "invariant breach, ending draft defensively");
                rounds::end_draft(&self.inner, table, "invariant breach");
            }
        }
        Err(err)
    }
}
