//! Per-seat event registry - the boundary to the transport layer.
//!
//! The transport registers one sender per live connection; the engine pushes
//! typed events through it, fire and forget. Scoping the registry to an
//! explicit object injected into the engine (instead of a process-wide map)
//! keeps the engine testable in isolation.

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::domain::cards::{Card, Color, Pack, PackId, PickedCard};
use crate::domain::state::{DraftPhase, SeatId};

/// Event pushed to one seat or to the whole table.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TableEvent {
    /// A seat's pending-pack count changed.
    PackQueued { seat: SeatId, pending_packs: usize },
    /// The seat's front pack is ready to act on.
    NewPack {
        seat: SeatId,
        pack: Pack,
        pick_number: usize,
    },
    /// Best-effort display recommendation for a human's current pack.
    Recommendation {
        seat: SeatId,
        pack_id: PackId,
        scores: Vec<f32>,
    },
    Timer {
        seat: SeatId,
        remaining_seconds: u32,
    },
    TimerDisabled {
        seat: SeatId,
    },
    SeatActed {
        seat: SeatId,
        pick_cursor: usize,
    },
    CardsRevealed {
        seat: SeatId,
        cards: Vec<Card>,
    },
    /// Bookkeeping on a face-up card changed (noted color or name).
    CardUpdated {
        seat: SeatId,
        picked_index: usize,
        card: PickedCard,
    },
    /// Another participant must choose a color for a noted card.
    ChoiceRequested {
        request_id: Uuid,
        chooser: SeatId,
        about_seat: SeatId,
        card: Card,
        options: Vec<Color>,
    },
    SeatDisconnected {
        seat: SeatId,
    },
    SeatReconnected {
        seat: SeatId,
    },
    SeatPromoted {
        seat: SeatId,
    },
    /// The transport should drop this seat's connection (timer ran out).
    ForceDisconnect {
        seat: SeatId,
    },
    RoundStarted {
        round_number: u8,
        pack_size: usize,
    },
    DraftPaused,
    DraftResumed,
    DraftEnded {
        phase: DraftPhase,
        reason: String,
    },
}

/// Registry of live per-seat senders. Multiple connections may observe the
/// same seat (reconnect races, spectator mirrors); each gets its own token.
#[derive(Default)]
pub struct TableHub {
    seats: DashMap<SeatId, DashMap<Uuid, UnboundedSender<TableEvent>>>,
}

impl TableHub {
    pub fn new() -> Self {
        Self {
            seats: DashMap::new(),
        }
    }

    pub fn register(&self, seat: SeatId, sender: UnboundedSender<TableEvent>) -> Uuid {
        let token = Uuid::new_v4();
        let entry = self.seats.entry(seat).or_default();
        entry.insert(token, sender);
        token
    }

    pub fn unregister(&self, seat: SeatId, token: Uuid) {
        if let Some(entry) = self.seats.get(&seat) {
            entry.remove(&token);
            if entry.is_empty() {
                drop(entry);
                self.seats.remove_if(&seat, |_, senders| senders.is_empty());
            }
        }
    }

    /// Deliver to a single seat's connections. Dead senders are ignored; the
    /// transport cleans them up through `unregister`.
    pub fn send_to(&self, seat: SeatId, event: TableEvent) {
        if let Some(entry) = self.seats.get(&seat) {
            for sender in entry.iter() {
                let _ = sender.value().send(event.clone());
            }
        }
    }

    pub fn broadcast(&self, event: TableEvent) {
        for entry in self.seats.iter() {
            for sender in entry.value().iter() {
                let _ = sender.value().send(event.clone());
            }
        }
    }
}
