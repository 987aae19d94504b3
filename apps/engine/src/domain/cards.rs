//! Card references and packs.
//!
//! Card metadata storage is external; the engine only carries the fields it
//! needs for routing, effects, and the local fallback heuristic.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque card identifier, assigned by the external card database.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardId(pub String);

impl std::fmt::Display for CardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Card color identity, used by the fallback heuristic and color noting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    White,
    Blue,
    Black,
    Red,
    Green,
}

impl Color {
    pub const ALL: [Color; 5] = [
        Color::White,
        Color::Blue,
        Color::Black,
        Color::Red,
        Color::Green,
    ];
}

/// Protocol-altering behavior a card carries into the draft.
///
/// A minority of cards have one of these; picking (or invoking) them locally
/// rewrites the default one-pick-then-pass rule for the owning seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DraftEffectTag {
    /// Spendable later: pick one additional card, returning this card to the
    /// pack in exchange.
    ExtraPickExchange,
    /// Spendable on pick: append a fresh booster to the picking seat's queue.
    InjectBooster,
    /// Revealed to the table once when picked, then held normally.
    Reveal,
    /// The seat takes every remaining card of this pack and skips the rest of
    /// the round.
    TakeWholePack,
    /// This action requires one extra pick; the seat's next action is a
    /// forced skip.
    ExtraPickThenSkip,
    /// The seat's future picks are chosen uniformly at random.
    RandomPicksFromNowOn,
    /// Marker: packs reduced to a single card route to a holder of this card
    /// instead of the parity neighbor.
    LastCardRedirect,
    /// Neighbors and the picker each note a color onto this card, chosen
    /// asynchronously.
    NoteColors,
    /// The name of the seat's next pick is noted onto this card.
    NoteNextPickName,
}

impl DraftEffectTag {
    /// Cards with these tags sit face up in front of their owner; face-up
    /// cards are public in snapshots and are the carriers of spendable
    /// capabilities and the redirect marker.
    pub fn held_face_up(&self) -> bool {
        matches!(
            self,
            DraftEffectTag::ExtraPickExchange
                | DraftEffectTag::TakeWholePack
                | DraftEffectTag::ExtraPickThenSkip
                | DraftEffectTag::RandomPicksFromNowOn
                | DraftEffectTag::LastCardRedirect
                | DraftEffectTag::NoteColors
                | DraftEffectTag::NoteNextPickName
        )
    }

    /// Tags announced to the whole table at pick time.
    pub fn revealed_on_pick(&self) -> bool {
        self.held_face_up() || matches!(self, DraftEffectTag::Reveal)
    }
}

/// One card reference inside a pack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub name: String,
    /// External rating, used by the fallback heuristic. Higher is better.
    pub rating: f32,
    pub colors: Vec<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effect: Option<DraftEffectTag>,
}

impl Card {
    pub fn plain(id: impl Into<String>, name: impl Into<String>, rating: f32) -> Self {
        Self {
            id: CardId(id.into()),
            name: name.into(),
            rating,
            colors: Vec::new(),
            effect: None,
        }
    }

    pub fn with_effect(mut self, effect: DraftEffectTag) -> Self {
        self.effect = Some(effect);
        self
    }

    pub fn with_colors(mut self, colors: Vec<Color>) -> Self {
        self.colors = colors;
        self
    }
}

/// Identity of a pack instance, used to re-validate in-flight decisions
/// against live ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackId(pub Uuid);

impl PackId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PackId {
    fn default() -> Self {
        Self::new()
    }
}

/// Ordered sequence of card references, movable as a unit between seats.
///
/// Owned exclusively by whichever seat currently queues it; ownership
/// transfers atomically during routing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pack {
    pub id: PackId,
    pub cards: Vec<Card>,
}

impl Pack {
    pub fn new(cards: Vec<Card>) -> Self {
        Self {
            id: PackId::new(),
            cards,
        }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Remove the given indices, highest first to avoid shifting, returning
    /// the removed cards in the order the indices were supplied.
    ///
    /// Callers must have validated the indices (in bounds, no duplicates).
    pub fn remove_indices(&mut self, indices: &[usize]) -> Vec<Card> {
        let mut tagged: Vec<(usize, usize)> =
            indices.iter().copied().enumerate().collect();
        // Sort by descending pack index; remember the caller's ordering.
        tagged.sort_by(|a, b| b.1.cmp(&a.1));
        let mut removed: Vec<(usize, Card)> = tagged
            .into_iter()
            .map(|(order, idx)| (order, self.cards.remove(idx)))
            .collect();
        removed.sort_by_key(|(order, _)| *order);
        removed.into_iter().map(|(_, card)| card).collect()
    }
}

/// A card a seat has drafted, with its table-visible bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickedCard {
    pub card: Card,
    /// Face-up cards are public and carry spendable capabilities.
    pub face_up: bool,
    /// A spendable capability that has been used.
    pub spent: bool,
    /// Colors noted onto this card by cross-participant choices.
    pub noted_colors: Vec<Color>,
    /// A card name noted onto this card.
    pub noted_name: Option<String>,
    /// True while this card still waits to note the owner's next pick.
    pub awaiting_pick_name: bool,
}

impl PickedCard {
    pub fn new(card: Card) -> Self {
        let face_up = card
            .effect
            .map(|e| e.held_face_up())
            .unwrap_or(false);
        let awaiting_pick_name = card.effect == Some(DraftEffectTag::NoteNextPickName);
        Self {
            card,
            face_up,
            spent: false,
            noted_colors: Vec::new(),
            noted_name: None,
            awaiting_pick_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack_of(names: &[&str]) -> Pack {
        Pack::new(
            names
                .iter()
                .map(|n| Card::plain(format!("id-{n}"), *n, 1.0))
                .collect(),
        )
    }

    #[test]
    fn remove_indices_preserves_caller_order() {
        let mut pack = pack_of(&["a", "b", "c", "d", "e"]);
        let removed = pack.remove_indices(&[1, 4]);
        assert_eq!(removed[0].name, "b");
        assert_eq!(removed[1].name, "e");
        let left: Vec<&str> = pack.cards.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(left, ["a", "c", "d"]);
    }

    #[test]
    fn remove_indices_handles_adjacent_high_indices() {
        let mut pack = pack_of(&["a", "b", "c"]);
        let removed = pack.remove_indices(&[2, 1]);
        assert_eq!(removed[0].name, "c");
        assert_eq!(removed[1].name, "b");
        assert_eq!(pack.len(), 1);
    }

    #[test]
    fn effect_visibility_flags() {
        assert!(DraftEffectTag::LastCardRedirect.held_face_up());
        assert!(!DraftEffectTag::Reveal.held_face_up());
        assert!(DraftEffectTag::Reveal.revealed_on_pick());
        assert!(!DraftEffectTag::InjectBooster.held_face_up());
    }
}
