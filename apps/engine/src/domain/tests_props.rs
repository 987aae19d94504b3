#![cfg(test)]

//! Property-based tests for turn-order and pack-mutation invariants.

use std::collections::HashSet;

use proptest::prelude::*;

use crate::domain::cards::{Card, Pack};
use crate::domain::state::{next_seat, pass_delta, seat_offset, SeatId};

fn arb_pack(max_len: usize) -> impl Strategy<Value = Pack> {
    (1..=max_len).prop_map(|len| {
        Pack::new(
            (0..len)
                .map(|i| Card::plain(format!("c{i}"), format!("card {i}"), i as f32))
                .collect(),
        )
    })
}

fn arb_pack_and_indices() -> impl Strategy<Value = (Pack, Vec<usize>)> {
    arb_pack(10).prop_flat_map(|pack| {
        let len = pack.len();
        let indices = proptest::sample::subsequence((0..len).collect::<Vec<_>>(), 0..=len)
            .prop_shuffle();
        (Just(pack), indices)
    })
}

proptest! {
    /// Offsetting a seat by +1 then -1 is the identity, for any table size.
    #[test]
    fn prop_seat_offset_inverts(
        seat_count in 2usize..16,
        seat in 0u8..16,
    ) {
        let seat = (seat as usize % seat_count) as SeatId;
        let there = seat_offset(seat, 1, seat_count);
        let back = seat_offset(there, -1, seat_count);
        prop_assert_eq!(back, seat);
    }

    /// Following `next_seat` around the table visits every seat exactly once
    /// before returning to the start, in either direction.
    #[test]
    fn prop_next_seat_cycles_whole_table(
        seat_count in 2usize..16,
        round in 0u8..8,
        start in 0u8..16,
    ) {
        let start = (start as usize % seat_count) as SeatId;
        let mut seen = HashSet::new();
        let mut seat = start;
        for _ in 0..seat_count {
            prop_assert!(seen.insert(seat), "seat {} visited twice", seat);
            seat = next_seat(seat, seat_count, round);
        }
        prop_assert_eq!(seat, start);
        prop_assert_eq!(seen.len(), seat_count);
    }

    /// Direction strictly alternates with round parity.
    #[test]
    fn prop_direction_alternates(round in 0u8..=254) {
        prop_assert_eq!(pass_delta(round), -pass_delta(round + 1));
    }

    /// Removing any index set from a pack conserves cards: the removed cards
    /// plus the remainder are exactly the original contents.
    #[test]
    fn prop_remove_indices_conserves_cards(
        pack in arb_pack(12),
        seed_indices in proptest::collection::vec(0usize..12, 0..12),
    ) {
        let indices: Vec<usize> = {
            let mut unique: Vec<usize> = seed_indices
                .into_iter()
                .filter(|&i| i < pack.len())
                .collect::<HashSet<_>>()
                .into_iter()
                .collect();
            unique.sort_unstable();
            unique
        };
        let mut working = pack.clone();
        let removed = working.remove_indices(&indices);

        prop_assert_eq!(removed.len(), indices.len());
        prop_assert_eq!(removed.len() + working.len(), pack.len());

        let mut reassembled: Vec<String> = removed
            .iter()
            .chain(working.cards.iter())
            .map(|c| c.id.0.clone())
            .collect();
        reassembled.sort();
        let mut original: Vec<String> = pack.cards.iter().map(|c| c.id.0.clone()).collect();
        original.sort();
        prop_assert_eq!(reassembled, original);
    }

    /// Removal returns cards in the caller's index order, whatever that
    /// order is.
    #[test]
    fn prop_remove_indices_preserves_caller_order(
        (pack, set) in arb_pack_and_indices(),
    ) {
        let mut working = pack.clone();
        let removed = working.remove_indices(&set);
        for (card, &idx) in removed.iter().zip(set.iter()) {
            prop_assert_eq!(&card.id, &pack.cards[idx].id);
        }
    }
}
