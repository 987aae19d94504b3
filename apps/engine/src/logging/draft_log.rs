//! Append-only draft log.
//!
//! Every transaction is recorded fire-and-forget for later reconstruction
//! and analytics. The sink must never block or fail a transaction; errors
//! stay inside the sink implementation.

use parking_lot::Mutex;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::info;

use crate::domain::cards::{CardId, Color};
use crate::domain::state::SeatId;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DraftLogEvent {
    DraftStarted {
        seats: usize,
        rounds_total: u8,
        cards_per_pack: usize,
    },
    RoundStarted {
        round_number: u8,
        pack_size: usize,
    },
    Picked {
        seat: SeatId,
        round_number: u8,
        pick_number: usize,
        /// Pack contents before the action, for reconstruction.
        pack: Vec<CardId>,
        picked: Vec<usize>,
        burned: Vec<usize>,
    },
    Skipped {
        seat: SeatId,
        round_number: u8,
    },
    BoosterInjected {
        seat: SeatId,
        pack: Vec<CardId>,
    },
    PackDiscarded {
        cards_left: usize,
    },
    PackRedirected {
        to: SeatId,
        card: CardId,
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
    ColorNoted {
        seat: SeatId,
        card: CardId,
        color: Color,
    },
    NameNoted {
        seat: SeatId,
        onto: CardId,
        name: String,
    },
    DraftEnded {
        reason: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct DraftLogRecord {
    pub at: OffsetDateTime,
    #[serde(flatten)]
    pub event: DraftLogEvent,
}

impl DraftLogRecord {
    pub fn now(event: DraftLogEvent) -> Self {
        Self {
            at: OffsetDateTime::now_utc(),
            event,
        }
    }
}

/// Append-only, fire-and-forget log sink.
pub trait DraftLogSink: Send + Sync {
    fn append(&self, record: DraftLogRecord);

    /// Called exactly once, at natural end or `stop()`.
    fn finalize(&self) {}
}

/// Default sink: structured tracing events under the `draft_log` target.
#[derive(Debug, Default)]
pub struct TracingLogSink;

impl DraftLogSink for TracingLogSink {
    fn append(&self, record: DraftLogRecord) {
        match serde_json::to_string(&record) {
            Ok(json) => info!(target: "draft_log", %json),
            Err(err) => info!(target: "draft_log", error = %err, "unserializable log record"),
        }
    }

    fn finalize(&self) {
        info!(target: "draft_log", "draft log finalized");
    }
}

/// In-memory sink for tests and post-draft reconstruction.
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    records: Mutex<Vec<DraftLogRecord>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<DraftLogRecord> {
        self.records.lock().clone()
    }
}

impl DraftLogSink for MemoryLogSink {
    fn append(&self, record: DraftLogRecord) {
        self.records.lock().push(record);
    }
}
