//! Detected-number store
//!
//! Holds the numbers found in the current capture and keeps the running
//! total in step with their selection flags. The total is maintained
//! incrementally: inserting or selecting adds a value, deselecting
//! subtracts it. Numbers are kept ordered by rank (the region's position
//! in reading order), whatever order they arrive in.

use crate::error::{PipelineError, Result};
use crate::types::{DetectedNumber, NumberId};
use serde::{Deserialize, Serialize};

/// Result of a successful toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleOutcome {
    pub id: NumberId,
    /// Selection flag after the toggle
    pub is_selected: bool,
    /// Total score after the toggle
    pub total: i64,
}

#[derive(Debug, Clone, Default)]
pub struct DetectedNumberStore {
    numbers: Vec<DetectedNumber>,
    /// Rank of each entry in `numbers`, non-decreasing
    ranks: Vec<usize>,
    total: i64,
}

impl DetectedNumberStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all numbers and zero the total
    pub fn reset(&mut self) {
        self.numbers.clear();
        self.ranks.clear();
        self.total = 0;
    }

    /// Append a number after everything already stored
    pub fn insert(&mut self, number: DetectedNumber) {
        let rank = self.ranks.last().map_or(0, |r| r + 1);
        self.insert_ranked(rank, number);
    }

    /// Insert a number at its rank, adding its value if it is selected
    ///
    /// Equal ranks keep arrival order.
    pub fn insert_ranked(&mut self, rank: usize, number: DetectedNumber) {
        let at = self.ranks.partition_point(|&r| r <= rank);
        self.total += number.contribution();
        self.ranks.insert(at, rank);
        self.numbers.insert(at, number);
    }

    /// Flip the selection flag of `id` and adjust the total
    pub fn toggle_selection(&mut self, id: NumberId) -> Result<ToggleOutcome> {
        let number = self
            .numbers
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(PipelineError::UnknownNumber(id))?;

        number.is_selected = !number.is_selected;
        let value = i64::from(number.value);
        if number.is_selected {
            self.total += value;
        } else {
            self.total -= value;
        }

        Ok(ToggleOutcome {
            id,
            is_selected: number.is_selected,
            total: self.total,
        })
    }

    pub fn get(&self, id: NumberId) -> Option<&DetectedNumber> {
        self.numbers.iter().find(|n| n.id == id)
    }

    /// Numbers ordered by rank
    pub fn numbers(&self) -> &[DetectedNumber] {
        &self.numbers
    }

    pub fn total(&self) -> i64 {
        self.total
    }

    pub fn selected_count(&self) -> usize {
        self.numbers.iter().filter(|n| n.is_selected).count()
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }

    /// Sum over selected numbers, computed from scratch
    pub fn recomputed_total(&self) -> i64 {
        self.numbers.iter().map(DetectedNumber::contribution).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PixelRect;

    fn number(value: i32) -> DetectedNumber {
        DetectedNumber::new(value.to_string(), value, &PixelRect::new(0.0, 0.0, 10.0, 10.0))
    }

    fn store_with(values: &[i32]) -> (DetectedNumberStore, Vec<NumberId>) {
        let mut store = DetectedNumberStore::new();
        let mut ids = Vec::new();
        for &v in values {
            let n = number(v);
            ids.push(n.id);
            store.insert(n);
        }
        (store, ids)
    }

    #[test]
    fn test_scoreboard_example() {
        // Regions "12", "7", "x", "30": "x" never reaches the store
        let (mut store, ids) = store_with(&[12, 7, 30]);
        assert_eq!(store.total(), 49);

        let outcome = store.toggle_selection(ids[1]).unwrap();
        assert!(!outcome.is_selected);
        assert_eq!(outcome.total, 42);

        let outcome = store.toggle_selection(ids[1]).unwrap();
        assert!(outcome.is_selected);
        assert_eq!(outcome.total, 49);
    }

    #[test]
    fn test_double_toggle_restores_state() {
        let (mut store, ids) = store_with(&[5, -3, 18]);
        for id in &ids {
            let before_flag = store.get(*id).unwrap().is_selected;
            let before_total = store.total();

            store.toggle_selection(*id).unwrap();
            store.toggle_selection(*id).unwrap();

            assert_eq!(store.get(*id).unwrap().is_selected, before_flag);
            assert_eq!(store.total(), before_total);
        }
    }

    #[test]
    fn test_total_matches_selected_sum_for_toggle_sequences() {
        let (mut store, ids) = store_with(&[3, 11, 40, 0, 7, -2]);

        // Deterministic pseudo-random walk over the ids
        let mut state: u32 = 17;
        for _ in 0..200 {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let id = ids[(state >> 16) as usize % ids.len()];
            store.toggle_selection(id).unwrap();
            assert_eq!(store.total(), store.recomputed_total());
        }
    }

    #[test]
    fn test_toggle_unknown_id() {
        let (mut store, _) = store_with(&[4]);
        let result = store.toggle_selection(NumberId::new());
        assert!(matches!(result, Err(PipelineError::UnknownNumber(_))));
        assert_eq!(store.total(), 4);
    }

    #[test]
    fn test_insert_deselected_number() {
        let mut store = DetectedNumberStore::new();
        let mut n = number(9);
        n.is_selected = false;
        store.insert(n);
        assert_eq!(store.total(), 0);
        assert_eq!(store.selected_count(), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_reset_clears_everything() {
        let (mut store, ids) = store_with(&[1, 2, 3]);
        store.toggle_selection(ids[0]).unwrap();
        store.reset();
        assert!(store.is_empty());
        assert_eq!(store.total(), 0);
    }

    #[test]
    fn test_numbers_keep_insertion_order() {
        let (store, ids) = store_with(&[30, 12, 7]);
        let order: Vec<NumberId> = store.numbers().iter().map(|n| n.id).collect();
        assert_eq!(order, ids);
    }

    #[test]
    fn test_ranked_insert_restores_reading_order() {
        let mut store = DetectedNumberStore::new();
        for (rank, value) in [(2, 3), (0, 1), (3, 4), (1, 2)] {
            store.insert_ranked(rank, number(value));
        }

        let values: Vec<i32> = store.numbers().iter().map(|n| n.value).collect();
        assert_eq!(values, vec![1, 2, 3, 4]);
        assert_eq!(store.total(), 10);

        // Plain insert lands after the highest rank
        store.insert(number(5));
        assert_eq!(store.numbers().last().unwrap().value, 5);
    }

    #[test]
    fn test_reset_clears_ranks() {
        let mut store = DetectedNumberStore::new();
        store.insert_ranked(7, number(1));
        store.reset();
        store.insert_ranked(0, number(2));
        store.insert(number(3));
        let values: Vec<i32> = store.numbers().iter().map(|n| n.value).collect();
        assert_eq!(values, vec![2, 3]);
    }
}
