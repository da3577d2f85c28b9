//! Pure list operations behind optimistic reordering
//!
//! Positions are 1-based and contiguous whenever a queue is settled.

use crate::errors::{Result, StationqError};
use crate::types::{EntryId, QueueEntry};

/// Move the item at `from` to `to` (remove, then insert)
///
/// Returns `Ok(false)` when the move is a no-op.
pub fn move_entry<T>(items: &mut Vec<T>, from: usize, to: usize) -> Result<bool> {
    if from == to {
        return Ok(false);
    }
    let len = items.len();
    if from >= len || to >= len {
        return Err(StationqError::invalid_move(from, to, len));
    }
    let item = items.remove(from);
    items.insert(to, item);
    Ok(true)
}

/// Rewrite every `queue_position` to its 1-based index
pub fn renumber(entries: &mut [QueueEntry]) {
    for (index, entry) in entries.iter_mut().enumerate() {
        entry.queue_position = index as u32 + 1;
    }
}

/// Whether positions equal 1-based indices
pub fn is_settled(entries: &[QueueEntry]) -> bool {
    entries
        .iter()
        .enumerate()
        .all(|(index, entry)| entry.queue_position as usize == index + 1)
}

/// Index of the entry with the given identity
pub fn position_of(entries: &[QueueEntry], id: &EntryId) -> Option<usize> {
    entries.iter().position(|entry| &entry.id == id)
}

/// Identities in visible order, as submitted to the server
pub fn entry_ids(entries: &[QueueEntry]) -> Vec<EntryId> {
    entries.iter().map(|entry| entry.id.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue(ids: &[&str]) -> Vec<QueueEntry> {
        let mut entries: Vec<QueueEntry> = ids.iter().map(|id| QueueEntry::new(*id, "")).collect();
        renumber(&mut entries);
        entries
    }

    fn ids(entries: &[QueueEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_move_forward_and_back() {
        let mut entries = queue(&["A", "B", "C"]);
        assert!(move_entry(&mut entries, 0, 2).unwrap());
        renumber(&mut entries);
        assert_eq!(ids(&entries), vec!["B", "C", "A"]);
        assert!(is_settled(&entries));

        assert!(move_entry(&mut entries, 2, 0).unwrap());
        assert_eq!(ids(&entries), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_same_index_is_noop() {
        let mut entries = queue(&["A", "B"]);
        assert!(!move_entry(&mut entries, 1, 1).unwrap());
        assert_eq!(ids(&entries), vec!["A", "B"]);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut entries = queue(&["A", "B"]);
        let err = move_entry(&mut entries, 0, 2).unwrap_err();
        assert!(matches!(err, StationqError::InvalidMove { from: 0, to: 2, len: 2 }));
        assert_eq!(ids(&entries), vec!["A", "B"]);
    }

    #[test]
    fn test_unsettled_detection() {
        let mut entries = queue(&["A", "B", "C"]);
        entries.swap(0, 1);
        assert!(!is_settled(&entries));
        renumber(&mut entries);
        assert!(is_settled(&entries));
        assert_eq!(position_of(&entries, &EntryId::from("A")), Some(1));
        assert_eq!(entry_ids(&entries)[0], EntryId::from("B"));
    }
}
