//! Cross-participant choices.
//!
//! Some effects need input from participants other than the one acting
//! (noting colors onto a just-picked card). The pick transaction itself
//! completes; the collection runs afterwards as a task that holds no lock
//! while a chooser thinks, so the rest of the table stays fully responsive.
//! Each chooser gets a bounded window; AI seats, disconnected seats, and
//! timeouts fall back to a uniformly random color not yet noted.

use std::sync::Arc;

use rand::Rng;
use tokio::sync::oneshot;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::cards::{Card, Color};
use crate::domain::state::{seat_offset, DraftPhase, SeatId};
use crate::hub::TableEvent;
use crate::logging::draft_log::DraftLogEvent;

use super::EngineInner;

/// Collect one color from each of: the right neighbor, the picker, the left
/// neighbor, in that order, noting them onto the picked card.
pub(crate) fn spawn_note_colors(
    inner: &Arc<EngineInner>,
    seat: SeatId,
    picked_index: usize,
    card: Card,
) {
    let inner = inner.clone();
    tokio::spawn(async move {
        let seat_count = {
            let table = inner.table.lock().await;
            table.state.seat_count()
        };
        let choosers = [
            seat_offset(seat, -1, seat_count),
            seat,
            seat_offset(seat, 1, seat_count),
        ];
        for chooser in choosers {
            let already: Vec<Color> = {
                let table = inner.table.lock().await;
                if table.state.phase == DraftPhase::Ended {
                    return;
                }
                match locate(&table.state.seats[seat as usize].picked, picked_index, &card) {
                    Some(idx) => table.state.seats[seat as usize].picked[idx]
                        .noted_colors
                        .clone(),
                    None => return,
                }
            };
            let remaining: Vec<Color> = Color::ALL
                .iter()
                .copied()
                .filter(|c| !already.contains(c))
                .collect();
            if remaining.is_empty() {
                return;
            }

            let answer = request_color(&inner, chooser, seat, &card, &remaining).await;

            let mut table = inner.table.lock().await;
            if table.state.phase == DraftPhase::Ended {
                return;
            }
            let color = match answer {
                Some(color) if remaining.contains(&color) => color,
                // Timeout, disconnect, AI seat, or duplicate answer.
                _ => remaining[inner.rng.lock().random_range(0..remaining.len())],
            };
            let Some(idx) = locate(&table.state.seats[seat as usize].picked, picked_index, &card)
            else {
                return;
            };
            let picked = &mut table.state.seats[seat as usize].picked[idx];
            picked.noted_colors.push(color);
            let updated = picked.clone();
            inner.log_event(DraftLogEvent::ColorNoted {
                seat,
                card: card.id.clone(),
                color,
            });
            inner.hub.broadcast(TableEvent::CardUpdated {
                seat,
                picked_index: idx,
                card: updated,
            });
            info!(seat, chooser, ?color, "color noted");
        }
    });
}

/// Find the noted card, tolerating index shifts from exchange spends that
/// removed an earlier picked card.
fn locate(
    picked: &[crate::domain::cards::PickedCard],
    expected_index: usize,
    card: &Card,
) -> Option<usize> {
    match picked.get(expected_index) {
        Some(p) if p.card.id == card.id => Some(expected_index),
        _ => picked.iter().position(|p| p.card.id == card.id),
    }
}

/// Ask one participant for a color. Returns `None` for AI seats,
/// disconnected seats, shutdown, or timeout.
async fn request_color(
    inner: &Arc<EngineInner>,
    chooser: SeatId,
    about_seat: SeatId,
    card: &Card,
    options: &[Color],
) -> Option<Color> {
    {
        let table = inner.table.lock().await;
        let seat_state = table.state.seats.get(chooser as usize)?;
        if seat_state.is_ai || !seat_state.connected {
            return None;
        }
    }

    let request_id = Uuid::new_v4();
    let (tx, rx) = oneshot::channel();
    inner.choices.lock().insert(request_id, tx);
    inner.hub.send_to(
        chooser,
        TableEvent::ChoiceRequested {
            request_id,
            chooser,
            about_seat,
            card: card.clone(),
            options: options.to_vec(),
        },
    );
    debug!(chooser, %request_id, "color choice requested");

    let answer = tokio::select! {
        _ = inner.shutdown.cancelled() => None,
        _ = tokio::time::sleep(inner.config.choice_timeout) => None,
        answer = rx => answer.ok(),
    };
    inner.choices.lock().remove(&request_id);
    answer
}
