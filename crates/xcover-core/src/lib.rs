//! Exact cover engine.
//!
//! Solves the exact cover problem: given a universe of constraint columns
//! and a collection of candidate rows, each covering a subset of the
//! columns, find a set of rows that covers every column exactly once.
//! This is the generic core behind constraint puzzles such as Sudoku or
//! pentomino tilings, once a caller has encoded them as rows and columns.
//!
//! A [`CoverMatrix`] tracks the sparse incidence structure and supports
//! incremental cover/uncover with exact restoration. On top of that one
//! core sit several search strategies: [`CoverMatrix::solve`] for plain
//! solving, [`CoverMatrix::fill`] for randomized generation,
//! [`CoverMatrix::partial`] for discovering minimal forcing clue sets, and
//! the uniqueness and essential-row tests used to validate puzzles.
//!
//! ```
//! use std::collections::HashSet;
//! use xcover_core::CoverMatrix;
//!
//! // Knuth's Algorithm X reference instance: 7 columns, 6 rows, and a
//! // single exact cover {1, 3, 5}.
//! let rows: Vec<HashSet<usize>> = vec![
//!     [0, 3, 6].into_iter().collect(),
//!     [0, 3].into_iter().collect(),
//!     [3, 4, 6].into_iter().collect(),
//!     [2, 4, 5].into_iter().collect(),
//!     [1, 2, 5, 6].into_iter().collect(),
//!     [1, 6].into_iter().collect(),
//! ];
//! let mut matrix = CoverMatrix::from_rows(7, rows);
//! assert!(matrix.has_unique_solution());
//!
//! let solution = matrix.solve().expect("this instance has a cover");
//! let expected: HashSet<usize> = [1, 3, 5].into_iter().collect();
//! assert_eq!(solution, expected);
//! ```

mod columns;
mod matrix;
mod rng;

pub use columns::Columns;
pub use matrix::{CoverMatrix, Uniqueness};
pub use rng::SimpleRng;
