//! Property-based tests for optimistic reorder list operations
//!
//! These tests verify the position invariant, that a move is undone by its
//! inverse, and that moves never add or lose entries.

use proptest::prelude::*;
use stationq_core::{
    reorder::{entry_ids, is_settled, move_entry, renumber},
    EntryId, QueueEntry,
};

// ----------------------------------------------------------------------------
// Test Utilities
// ----------------------------------------------------------------------------

fn settled_queue(len: usize) -> Vec<QueueEntry> {
    let mut entries: Vec<QueueEntry> = (0..len)
        .map(|i| QueueEntry::new(format!("entry-{i}"), format!("{i} TU {i}")))
        .collect();
    renumber(&mut entries);
    entries
}

/// Generate a non-empty queue length with two valid indices into it
fn arb_move() -> impl Strategy<Value = (usize, usize, usize)> {
    (1usize..40).prop_flat_map(|len| (Just(len), 0..len, 0..len))
}

proptest! {
    /// Property: a settled queue stays settled after move + renumber
    #[test]
    fn positions_match_indices_after_move((len, from, to) in arb_move()) {
        let mut entries = settled_queue(len);
        move_entry(&mut entries, from, to).unwrap();
        renumber(&mut entries);

        prop_assert!(is_settled(&entries));
        prop_assert_eq!(entries.len(), len);
    }

    /// Property: moving back restores the original order
    #[test]
    fn inverse_move_restores_order((len, from, to) in arb_move()) {
        let mut entries = settled_queue(len);
        let original = entry_ids(&entries);

        move_entry(&mut entries, from, to).unwrap();
        move_entry(&mut entries, to, from).unwrap();

        prop_assert_eq!(entry_ids(&entries), original);
    }

    /// Property: the moved entry lands at the target index
    #[test]
    fn moved_entry_lands_at_target((len, from, to) in arb_move()) {
        let mut entries = settled_queue(len);
        let moved = entries[from].id.clone();

        let changed = move_entry(&mut entries, from, to).unwrap();

        prop_assert_eq!(changed, from != to);
        prop_assert_eq!(&entries[to].id, &moved);
    }

    /// Property: moves are permutations
    #[test]
    fn move_is_permutation((len, from, to) in arb_move()) {
        let mut entries = settled_queue(len);
        move_entry(&mut entries, from, to).unwrap();

        let mut ids: Vec<EntryId> = entry_ids(&entries);
        ids.sort();
        let mut expected = entry_ids(&settled_queue(len));
        expected.sort();
        prop_assert_eq!(ids, expected);
    }

    /// Property: out-of-range moves leave the queue untouched
    #[test]
    fn out_of_range_move_is_rejected(len in 0usize..20, extra in 0usize..5) {
        let mut entries = settled_queue(len);
        let before = entry_ids(&entries);

        prop_assert!(move_entry(&mut entries, 0, len + extra + 1).is_err());
        prop_assert_eq!(entry_ids(&entries), before);
    }
}

#[test]
fn test_example_three_entries() {
    let mut entries = settled_queue(3);
    move_entry(&mut entries, 0, 2).unwrap();
    renumber(&mut entries);

    let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
    let positions: Vec<u32> = entries.iter().map(|e| e.queue_position).collect();
    assert_eq!(ids, vec!["entry-1", "entry-2", "entry-0"]);
    assert_eq!(positions, vec![1, 2, 3]);
}
