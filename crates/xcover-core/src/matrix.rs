//! The sparse incidence matrix and the searches built on it.
//!
//! `CoverMatrix` owns the immutable row→column incidence table, the set of
//! rows still eligible for selection, and the solution built along the
//! current search path. All searches share one cover/uncover core:
//! choosing a row covers every column it satisfies and excludes every row
//! that competes for one of them, and each cover hands back the exact undo
//! set needed to reverse it when the branch fails.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::columns::Columns;
use crate::rng::SimpleRng;

/// Outcome of an exhaustive uniqueness search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Uniqueness {
    /// No complete cover exists in the explored subtree.
    Undetermined,
    /// Exactly one complete cover exists.
    Unique,
    /// More than one complete cover, or a cover conflicting with the
    /// expected one.
    Invalid,
}

/// Sparse exact cover matrix with incremental cover/uncover and a family
/// of backtracking search strategies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverMatrix {
    /// Columns covered by each row, fixed at construction.
    rows: Vec<HashSet<usize>>,
    /// Rows still eligible for selection.
    active_rows: HashSet<usize>,
    /// Rows chosen along the current search path.
    solution: HashSet<usize>,
    columns: Columns,
    #[serde(skip)]
    rng: SimpleRng,
}

impl CoverMatrix {
    /// Build from a callback mapping each row index to the set of columns
    /// it covers.
    ///
    /// The callback must be deterministic and must only produce column
    /// indices in `0..column_count`; an out-of-range index panics.
    pub fn new<F>(row_count: usize, column_count: usize, mut row_columns: F) -> Self
    where
        F: FnMut(usize) -> HashSet<usize>,
    {
        let rows: Vec<HashSet<usize>> = (0..row_count).map(|i| row_columns(i)).collect();
        Self::from_rows(column_count, rows)
    }

    /// Build from a precomputed incidence table, one column set per row.
    pub fn from_rows(column_count: usize, rows: Vec<HashSet<usize>>) -> Self {
        let mut columns = Columns::new(column_count);
        let mut active_rows = HashSet::with_capacity(rows.len());
        for (i, cols) in rows.iter().enumerate() {
            active_rows.insert(i);
            for &c in cols {
                columns.insert(i, c);
            }
        }
        Self {
            rows,
            active_rows,
            solution: HashSet::new(),
            columns,
            rng: SimpleRng::new(),
        }
    }

    /// Reseed the internal generator, making [`fill`](Self::fill)
    /// reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = SimpleRng::with_seed(seed);
        self
    }

    /// Rows chosen so far. A final answer only after a search succeeds.
    pub fn solution(&self) -> &HashSet<usize> {
        &self.solution
    }

    /// Rows still eligible for selection.
    pub fn active_rows(&self) -> &HashSet<usize> {
        &self.active_rows
    }

    /// Number of rows in the incidence table.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns in the incidence table.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Columns covered by a row, as given at construction.
    pub fn row(&self, index: usize) -> &HashSet<usize> {
        &self.rows[index]
    }

    // ==================== Cover & Uncover ====================

    /// Choose `row`: add it to the solution, cover every column it
    /// satisfies, and exclude every row competing for one of those
    /// columns.
    ///
    /// Returns the undo set of rows excluded by this call. The caller must
    /// keep it and hand it back to [`uncover`](Self::uncover) to reverse
    /// the operation; it cannot be reconstructed after the fact.
    ///
    /// # Panics
    ///
    /// Panics if one of the row's columns is already covered. That only
    /// happens when cover/uncover calls have gone out of sync (a double
    /// cover, or covering a row that conflicts with the current solution),
    /// after which the grid state can no longer be trusted.
    pub fn cover(&mut self, row: usize) -> HashSet<usize> {
        self.solution.insert(row);
        let mut excluded = HashSet::new();
        for &c in &self.rows[row] {
            let Some(column) = self.columns.get(c) else {
                panic!(
                    "cover of row {row}: column {c} is already covered; \
                     cover/uncover calls are out of sync"
                );
            };
            let members: Vec<usize> = column.iter().copied().collect();
            self.columns.deactivate(c);
            for r in members {
                self.active_rows.remove(&r);
                excluded.insert(r);
                for &k in &self.rows[r] {
                    self.columns.remove(r, k);
                }
            }
        }
        excluded
    }

    /// Reverse a [`cover`](Self::cover): remove `row` from the solution
    /// and reinstate every row in `excluded`, reinserting each into every
    /// column it covers. Columns reactivate as their rows return.
    pub fn uncover(&mut self, row: usize, excluded: HashSet<usize>) {
        self.solution.remove(&row);
        for r in excluded {
            self.active_rows.insert(r);
            for &c in &self.rows[r] {
                self.columns.insert(r, c);
            }
        }
    }

    /// Cover several mutually compatible rows, in ascending order.
    ///
    /// The returned log is ordered: later covers can depend on state
    /// changes made by earlier ones, so it must be unwound strictly in
    /// reverse, which [`uncover_all`](Self::uncover_all) does.
    pub fn cover_all(&mut self, rows: &HashSet<usize>) -> Vec<(usize, HashSet<usize>)> {
        let mut order: Vec<usize> = rows.iter().copied().collect();
        order.sort_unstable();
        let mut log = Vec::with_capacity(order.len());
        for row in order {
            let excluded = self.cover(row);
            log.push((row, excluded));
        }
        log
    }

    /// Reverse a batch cover, unwinding the log last-covered-first.
    pub fn uncover_all(&mut self, log: Vec<(usize, HashSet<usize>)>) {
        for (row, excluded) in log.into_iter().rev() {
            self.uncover(row, excluded);
        }
    }

    // ==================== Search strategies ====================

    /// Depth-first search branching on the smallest active column.
    ///
    /// `Some` holds a complete cover: every column is satisfied by exactly
    /// one chosen row. On success the winning covers stay applied, so the
    /// grid state reflects the returned solution; failed branches are
    /// always undone. `None` means no exact cover exists from the current
    /// state.
    pub fn solve(&mut self) -> Option<HashSet<usize>> {
        let Some(candidates) = self.columns.best() else {
            return Some(self.solution.clone());
        };
        for row in candidates {
            let excluded = self.cover(row);
            if let Some(found) = self.solve() {
                return Some(found);
            }
            self.uncover(row, excluded);
        }
        None
    }

    /// Like [`solve`](Self::solve), but the first `levels` branching
    /// columns are chosen at random instead of by size, producing varied
    /// covers for generation work. `fill(0)` is exactly `solve()`.
    pub fn fill(&mut self, levels: usize) -> Option<HashSet<usize>> {
        if levels == 0 {
            return self.solve();
        }
        let Some(candidates) = self.columns.random(&mut self.rng) else {
            return Some(self.solution.clone());
        };
        for row in candidates {
            let excluded = self.cover(row);
            if let Some(found) = self.fill(levels - 1) {
                return Some(found);
            }
            self.uncover(row, excluded);
        }
        None
    }

    /// Search for a partial cover that already forces a unique completion.
    ///
    /// While `budget` lasts (decremented on every recursive call), each
    /// call first checks whether the rows covered so far leave exactly one
    /// completion, returning them early if so. Once the budget runs out
    /// the search keeps branching like [`solve`](Self::solve) but without
    /// the certificate check, and full column exhaustion yields `None`.
    pub fn partial(&mut self, budget: usize) -> Option<HashSet<usize>> {
        let mut attempts = 0;
        self.partial_counted(budget, &mut attempts)
    }

    /// [`partial`](Self::partial) with an externally visible count of the
    /// uniqueness checks attempted.
    pub fn partial_counted(
        &mut self,
        budget: usize,
        attempts: &mut usize,
    ) -> Option<HashSet<usize>> {
        if budget > 0 {
            *attempts += 1;
            if self.has_unique_solution() {
                return Some(self.solution.clone());
            }
        }
        let candidates = self.columns.best()?;
        for row in candidates {
            let excluded = self.cover(row);
            let found = self.partial_counted(budget.saturating_sub(1), attempts);
            if let Some(found) = found {
                return Some(found);
            }
            self.uncover(row, excluded);
        }
        None
    }

    /// Whether a complete cover exists that never uses `banned`.
    ///
    /// `false` means `banned` is essential: every exact cover of the
    /// current state contains it. State is fully restored before return.
    pub fn is_solvable_without(&mut self, banned: usize) -> bool {
        let Some(candidates) = self.columns.best() else {
            return true;
        };
        for row in candidates {
            if row == banned {
                continue;
            }
            let excluded = self.cover(row);
            let solvable = self.is_solvable_without(banned);
            self.uncover(row, excluded);
            if solvable {
                return true;
            }
        }
        false
    }

    /// Exhaustive uniqueness search with no reference solution.
    ///
    /// Explores every row of every branching column. A subtree reports
    /// [`Uniqueness::Unique`] when exactly one of its branches completes,
    /// [`Uniqueness::Invalid`] as soon as two sibling completions (or an
    /// invalid subtree) appear, and [`Uniqueness::Undetermined`] when
    /// nothing below it completes. State is fully restored before return.
    pub fn uniqueness(&mut self) -> Uniqueness {
        self.unique_search(None)
    }

    /// Whether the current state has exactly one complete cover.
    pub fn has_unique_solution(&mut self) -> bool {
        self.uniqueness() == Uniqueness::Unique
    }

    /// Whether exhaustive branching reaches exactly one complete cover
    /// and it equals `master`.
    ///
    /// `master` must include any rows already covered on this grid. Fails
    /// on the first completion that differs from `master`, and when no
    /// completion exists at all. State is fully restored before return.
    pub fn verify_solution(&mut self, master: &HashSet<usize>) -> bool {
        self.unique_search(Some(master)) == Uniqueness::Unique
    }

    /// Shared exhaustive search: a tri-state fold over every branch, with
    /// an optional reference the lone completion must equal.
    fn unique_search(&mut self, master: Option<&HashSet<usize>>) -> Uniqueness {
        let Some(candidates) = self.columns.best() else {
            return match master {
                Some(expected) if self.solution != *expected => Uniqueness::Invalid,
                _ => Uniqueness::Unique,
            };
        };
        let mut seen = Uniqueness::Undetermined;
        for row in candidates {
            let excluded = self.cover(row);
            let verdict = self.unique_search(master);
            self.uncover(row, excluded);
            match verdict {
                Uniqueness::Invalid => return Uniqueness::Invalid,
                Uniqueness::Unique if seen == Uniqueness::Unique => return Uniqueness::Invalid,
                Uniqueness::Unique => seen = Uniqueness::Unique,
                Uniqueness::Undetermined => {}
            }
        }
        seen
    }

    // ==================== Snapshots ====================

    /// Deep snapshot with `rows` covered on the copy.
    ///
    /// The original grid is untouched; the copy shares no mutable state
    /// with it. Useful for reusing one constructed grid across searches.
    pub fn copy_with_cover(&self, rows: &HashSet<usize>) -> CoverMatrix {
        let mut snapshot = self.clone();
        snapshot.cover_all(rows);
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(rows: &[usize]) -> HashSet<usize> {
        rows.iter().copied().collect()
    }

    /// Columns {0,1,2,3}; two disjoint covers {R0,R1} and {R2,R3}.
    fn two_cover_grid() -> CoverMatrix {
        CoverMatrix::from_rows(
            4,
            vec![set(&[0, 1]), set(&[2, 3]), set(&[0, 2]), set(&[1, 3])],
        )
    }

    /// Columns {0,1,2}; unique cover {R0,R1}.
    fn unique_grid() -> CoverMatrix {
        CoverMatrix::from_rows(3, vec![set(&[0]), set(&[1, 2])])
    }

    fn assert_exact_cover(matrix: &CoverMatrix, solution: &HashSet<usize>) {
        for c in 0..matrix.column_count() {
            let covering = solution
                .iter()
                .filter(|&&r| matrix.row(r).contains(&c))
                .count();
            assert_eq!(covering, 1, "column {c} covered {covering} times");
        }
    }

    #[test]
    fn test_solve_unique() {
        let mut m = unique_grid();
        assert_eq!(m.solve(), Some(set(&[0, 1])));
        // Winning covers stay applied: the grid reflects the solution.
        assert_eq!(m.solution(), &set(&[0, 1]));
        assert_eq!(m.columns.active_count(), 0);
    }

    #[test]
    fn test_solve_two_covers_is_sound() {
        let mut m = two_cover_grid();
        let solution = m.solve().expect("covers exist");
        assert!(solution == set(&[0, 1]) || solution == set(&[2, 3]));
        assert_exact_cover(&m, &solution);
    }

    #[test]
    fn test_solve_infeasible() {
        // No row covers column 1 at all.
        let mut m = CoverMatrix::from_rows(2, vec![set(&[0]), set(&[0])]);
        assert_eq!(m.solve(), None);
        // Failure unwinds everything.
        assert!(m.solution().is_empty());
        assert_eq!(m.active_rows(), &set(&[0, 1]));
    }

    #[test]
    fn test_cover_reports_conflicts_and_uncover_restores() {
        let mut m = two_cover_grid();
        let before = m.clone();

        let excluded = m.cover(0);
        // R0 knocks out itself and every row sharing column 0 or 1.
        assert_eq!(excluded, set(&[0, 2, 3]));
        assert_eq!(m.active_rows(), &set(&[1]));
        assert_eq!(m.solution(), &set(&[0]));
        assert!(m.columns.get(0).is_none());
        assert!(m.columns.get(1).is_none());
        assert_eq!(m.columns.get(2), Some(&set(&[1])));
        assert_eq!(m.columns.get(3), Some(&set(&[1])));

        m.uncover(0, excluded);
        assert_eq!(m.active_rows(), before.active_rows());
        assert_eq!(m.solution(), before.solution());
        for c in 0..4 {
            assert_eq!(m.columns.get(c), before.columns.get(c));
        }
    }

    #[test]
    fn test_batch_cover_unwinds_lifo() {
        let mut m = two_cover_grid();
        let before = m.clone();

        let log = m.cover_all(&set(&[0, 1]));
        assert_eq!(log.len(), 2);
        // Applied in ascending row order.
        assert_eq!(log[0].0, 0);
        assert_eq!(log[1].0, 1);
        assert_eq!(m.solution(), &set(&[0, 1]));
        assert_eq!(m.columns.active_count(), 0);

        m.uncover_all(log);
        assert_eq!(m.active_rows(), before.active_rows());
        assert!(m.solution().is_empty());
        for c in 0..4 {
            assert_eq!(m.columns.get(c), before.columns.get(c));
        }
    }

    #[test]
    #[should_panic(expected = "already covered")]
    fn test_double_cover_panics() {
        let mut m = two_cover_grid();
        m.cover(0);
        // R2 competes for column 0, which the first cover claimed.
        m.cover(2);
    }

    #[test]
    fn test_essential_rows() {
        let mut m = two_cover_grid();
        // {R2,R3} still covers everything without R0.
        assert!(m.is_solvable_without(0));
        // State restored afterwards.
        assert!(m.solution().is_empty());
        assert_eq!(m.active_rows(), &set(&[0, 1, 2, 3]));

        // Every row of the unique grid is essential.
        let mut u = unique_grid();
        assert!(!u.is_solvable_without(0));
        assert!(!u.is_solvable_without(1));

        // Drop R2: column 0 is then only coverable by R0.
        let mut reduced =
            CoverMatrix::from_rows(4, vec![set(&[0, 1]), set(&[2, 3]), set(&[1, 3])]);
        assert!(!reduced.is_solvable_without(0));
    }

    #[test]
    fn test_uniqueness_tristate() {
        assert_eq!(unique_grid().uniqueness(), Uniqueness::Unique);
        assert_eq!(two_cover_grid().uniqueness(), Uniqueness::Invalid);

        let mut infeasible = CoverMatrix::from_rows(2, vec![set(&[0]), set(&[0])]);
        assert_eq!(infeasible.uniqueness(), Uniqueness::Undetermined);
        assert!(!infeasible.has_unique_solution());

        // The exhaustive search restores state completely.
        let mut m = two_cover_grid();
        assert!(!m.has_unique_solution());
        assert_eq!(m.active_rows(), &set(&[0, 1, 2, 3]));
        assert!(m.solution().is_empty());
    }

    #[test]
    fn test_verify_solution() {
        let mut m = unique_grid();
        assert!(m.verify_solution(&set(&[0, 1])));
        assert!(!m.verify_solution(&set(&[0])));

        // With two covers, no reference can be the only reachable one.
        let mut t = two_cover_grid();
        assert!(!t.verify_solution(&set(&[0, 1])));
        assert!(!t.verify_solution(&set(&[2, 3])));

        // The reference includes rows covered beforehand.
        let mut covered = two_cover_grid();
        let log = covered.cover_all(&set(&[0]));
        assert!(covered.verify_solution(&set(&[0, 1])));
        assert!(!covered.verify_solution(&set(&[1])));
        covered.uncover_all(log);
        assert!(covered.solution().is_empty());
    }

    #[test]
    fn test_fill_zero_matches_solve() {
        let mut a = unique_grid();
        let mut b = unique_grid();
        assert_eq!(a.fill(0), b.solve());
    }

    #[test]
    fn test_fill_is_sound_and_reproducible() {
        let mut a = two_cover_grid().with_seed(7);
        let first = a.fill(2).expect("covers exist");
        assert_exact_cover(&a, &first);

        let mut b = two_cover_grid().with_seed(7);
        assert_eq!(b.fill(2), Some(first));
    }

    #[test]
    fn test_partial_finds_forcing_clue() {
        let mut m = two_cover_grid();
        let mut attempts = 0;
        let clues = m
            .partial_counted(2, &mut attempts)
            .expect("a forcing clue exists");
        assert_eq!(clues.len(), 1);
        assert_eq!(attempts, 2);
        // One covered row leaves exactly one completion.
        let mut check = two_cover_grid().copy_with_cover(&clues);
        assert!(check.has_unique_solution());

        // With no budget there is never an early certificate, and full
        // exhaustion is not a partial result.
        assert_eq!(unique_grid().partial(0), None);
    }

    #[test]
    fn test_copy_isolation() {
        let g = two_cover_grid();
        let mut snapshot = g.copy_with_cover(&set(&[0]));
        assert_eq!(snapshot.solve(), Some(set(&[0, 1])));

        // The original is untouched and still has both covers.
        assert_eq!(g.active_rows(), &set(&[0, 1, 2, 3]));
        assert!(g.solution().is_empty());
        let mut g = g;
        assert_eq!(g.uniqueness(), Uniqueness::Invalid);
    }

    #[test]
    fn test_latin_square_via_callback() {
        // 4x4 Latin square as exact cover: 64 candidate rows (cell, value)
        // against 48 columns for the cell, row-value, and column-value
        // constraints.
        let n = 4;
        let build = || {
            CoverMatrix::new(n * n * n, 3 * n * n, |index| {
                let value = index % n;
                let col = (index / n) % n;
                let row = index / (n * n);
                [
                    row * n + col,
                    n * n + row * n + value,
                    2 * n * n + col * n + value,
                ]
                .into_iter()
                .collect()
            })
        };

        let mut m = build();
        let solution = m.solve().expect("latin squares exist");
        assert_eq!(solution.len(), n * n);
        assert_exact_cover(&m, &solution);

        // Many squares complete an empty grid.
        assert_eq!(build().uniqueness(), Uniqueness::Invalid);

        // Randomized fill still lands on a sound square.
        let mut filled = build().with_seed(42);
        let via_fill = filled.fill(5).expect("fill completes a square");
        assert_exact_cover(&filled, &via_fill);
    }

    #[test]
    fn test_serde_round_trip() {
        let m = unique_grid();
        let json = serde_json::to_string(&m).expect("serializes");
        let mut restored: CoverMatrix = serde_json::from_str(&json).expect("deserializes");
        assert_eq!(restored.solve(), Some(set(&[0, 1])));

        // Mid-search snapshots survive the trip too.
        let mut covered = two_cover_grid();
        covered.cover_all(&set(&[0]));
        let json = serde_json::to_string(&covered).expect("serializes");
        let mut restored: CoverMatrix = serde_json::from_str(&json).expect("deserializes");
        assert_eq!(restored.solve(), Some(set(&[0, 1])));
    }
}
