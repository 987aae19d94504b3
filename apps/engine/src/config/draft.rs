//! Draft table configuration.
//!
//! Everything here is fixed at `start()` and never mutated afterwards, so the
//! engine can read it without holding the table lock.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Inputs available when deriving a seat's initial countdown value.
#[derive(Debug, Clone, Copy)]
pub struct TimerContext {
    /// Zero-based pick number within the current round.
    pub pick_number: usize,
    /// Pack size at the start of the current round.
    pub cards_per_pack: usize,
    /// Cards remaining in the pack the seat is about to act on.
    pub cards_remaining: usize,
}

/// Pluggable derivation of the initial countdown value for one action.
pub trait TimerPolicy: Send + Sync {
    fn initial_seconds(&self, ctx: &TimerContext) -> u32;
}

/// Fixed per-remaining-cards schedule used in tournament mode.
///
/// Index 0 is unused (a pack never has zero cards when a timer starts);
/// entries beyond the table fall back to the first entry.
const TOURNAMENT_SECONDS: [u32; 16] = [
    0, 5, 5, 5, 5, 10, 10, 15, 20, 20, 25, 25, 30, 35, 40, 40,
];

/// How per-seat countdowns derive their initial value.
#[derive(Clone)]
pub enum TimerMode {
    /// No timer at all (a `max_timer` of zero in the table settings).
    Disabled,
    /// Later picks get progressively less time:
    /// `max_seconds - pick_number * floor(max_seconds / cards_per_pack)`.
    Scaling { max_seconds: u32 },
    /// Strict fixed table indexed by remaining-cards-in-pack.
    Tournament,
    /// Caller-provided policy.
    Custom(Arc<dyn TimerPolicy>),
}

impl TimerMode {
    pub fn initial_seconds(&self, ctx: &TimerContext) -> u32 {
        match self {
            TimerMode::Disabled => 0,
            TimerMode::Scaling { max_seconds } => {
                let dec = max_seconds / (ctx.cards_per_pack.max(1) as u32);
                max_seconds.saturating_sub(ctx.pick_number as u32 * dec).max(1)
            }
            TimerMode::Tournament => {
                let idx = ctx.cards_remaining.min(TOURNAMENT_SECONDS.len() - 1);
                TOURNAMENT_SECONDS[idx]
            }
            TimerMode::Custom(policy) => policy.initial_seconds(ctx),
        }
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, TimerMode::Disabled)
    }
}

impl fmt::Debug for TimerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerMode::Disabled => write!(f, "Disabled"),
            TimerMode::Scaling { max_seconds } => {
                f.debug_struct("Scaling").field("max_seconds", max_seconds).finish()
            }
            TimerMode::Tournament => write!(f, "Tournament"),
            TimerMode::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Scoring oracle endpoint settings.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub endpoint: String,
    pub timeout: Duration,
}

/// Per-table draft settings.
#[derive(Debug, Clone)]
pub struct DraftConfig {
    /// Cards picked per action before effects adjust the count.
    pub picks_per_action: usize,
    /// Cards burned (removed unpicked) per action.
    pub burns_per_action: usize,
    /// Packs at or below this size are discarded instead of passed.
    pub discard_threshold: usize,
    /// Countdown derivation for human seats.
    pub timer: TimerMode,
    /// After expiry, how long an action is still accepted before the seat's
    /// transport is force-disconnected.
    pub expiry_grace_seconds: u32,
    /// How long a disconnected seat waits before automatic AI promotion.
    pub reconnect_grace: Duration,
    /// Timeout for cross-participant choices before a random fallback.
    pub choice_timeout: Duration,
    /// Seed for the table RNG (redirect tie-breaks, random-pick exceptions,
    /// choice fallbacks). `None` seeds from OS entropy.
    pub rng_seed: Option<u64>,
    /// Scoring oracle endpoint; `None` keeps the whole table on the local
    /// heuristic.
    pub oracle: Option<OracleConfig>,
}

impl Default for DraftConfig {
    fn default() -> Self {
        Self {
            picks_per_action: 1,
            burns_per_action: 0,
            discard_threshold: 0,
            timer: TimerMode::Scaling { max_seconds: 75 },
            expiry_grace_seconds: 10,
            reconnect_grace: Duration::from_secs(60),
            choice_timeout: Duration::from_secs(32),
            rng_seed: None,
            oracle: None,
        }
    }
}
