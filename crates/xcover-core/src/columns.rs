//! Column bookkeeping for the exact cover search.
//!
//! Tracks, per column, the set of rows that currently intersect it, plus
//! which columns are still active. Covered columns are hidden rather than
//! destroyed: their storage stays in place so uncover can rebuild them.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::rng::SimpleRng;

/// Active/covered state and row membership for every column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Columns {
    /// Indices of columns not yet covered.
    active: HashSet<usize>,
    /// Row membership per column, retained while a column is covered.
    sets: Vec<HashSet<usize>>,
}

impl Columns {
    /// Create `count` columns, all active and empty.
    pub fn new(count: usize) -> Self {
        Self {
            active: (0..count).collect(),
            sets: vec![HashSet::new(); count],
        }
    }

    /// Total number of columns, active or covered.
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Number of columns still active.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Whether the column is active.
    pub fn is_active(&self, index: usize) -> bool {
        self.active.contains(&index)
    }

    /// The column's row set, or `None` if the column is covered.
    ///
    /// An empty set from an active column is a live dead end (a constraint
    /// with no remaining candidates), not a covered column.
    pub fn get(&self, index: usize) -> Option<&HashSet<usize>> {
        if self.active.contains(&index) {
            Some(&self.sets[index])
        } else {
            None
        }
    }

    /// Hide the column from selection and lookup. Its row set is retained.
    pub fn deactivate(&mut self, index: usize) {
        self.active.remove(&index);
    }

    /// Restore a covered column to active with the given row set.
    pub fn reactivate(&mut self, index: usize, rows: HashSet<usize>) {
        self.sets[index] = rows;
        self.active.insert(index);
    }

    /// Add `row` to the column and mark the column active.
    pub fn insert(&mut self, row: usize, index: usize) {
        self.active.insert(index);
        self.sets[index].insert(row);
    }

    /// Remove `row` from the column. Never changes the column's activity;
    /// an emptied column remains selectable.
    pub fn remove(&mut self, row: usize, index: usize) {
        self.sets[index].remove(&row);
    }

    /// Candidate rows of the smallest active column, ascending.
    ///
    /// Ties break toward the lowest column index. `None` only when no
    /// column is active, which is the search's success condition.
    pub fn best(&self) -> Option<Vec<usize>> {
        let (_, index) = self.active.iter().map(|&i| (self.sets[i].len(), i)).min()?;
        Some(self.sorted_rows(index))
    }

    /// Candidate rows of a uniformly random active column, ascending.
    pub fn random(&self, rng: &mut SimpleRng) -> Option<Vec<usize>> {
        if self.active.is_empty() {
            return None;
        }
        let mut indices: Vec<usize> = self.active.iter().copied().collect();
        indices.sort_unstable();
        let index = indices[rng.next_below(indices.len())];
        Some(self.sorted_rows(index))
    }

    fn sorted_rows(&self, index: usize) -> Vec<usize> {
        let mut rows: Vec<usize> = self.sets[index].iter().copied().collect();
        rows.sort_unstable();
        rows
    }
}
