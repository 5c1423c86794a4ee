//! Basic example of using the exact cover engine

use std::collections::HashSet;

use xcover_core::CoverMatrix;

fn main() {
    // Knuth's Algorithm X reference instance: 7 constraint columns and 6
    // candidate rows with a single exact cover.
    let rows: Vec<HashSet<usize>> = vec![
        [0, 3, 6].into_iter().collect(),
        [0, 3].into_iter().collect(),
        [3, 4, 6].into_iter().collect(),
        [2, 4, 5].into_iter().collect(),
        [1, 2, 5, 6].into_iter().collect(),
        [1, 6].into_iter().collect(),
    ];
    let matrix = CoverMatrix::from_rows(7, rows);

    println!("Rows: {}", matrix.row_count());
    println!("Columns: {}", matrix.column_count());
    println!("Uniqueness: {:?}\n", matrix.clone().uniqueness());

    // Solve it
    let mut solver = matrix.clone();
    match solver.solve() {
        Some(solution) => {
            let mut sorted: Vec<usize> = solution.iter().copied().collect();
            sorted.sort_unstable();
            println!("Exact cover: {:?}", sorted);
        }
        None => println!("No exact cover exists"),
    }

    // Which rows appear in every cover?
    for row in 0..matrix.row_count() {
        if !matrix.clone().is_solvable_without(row) {
            println!("Row {} is essential", row);
        }
    }

    // Snapshot with row 1 pre-covered, then complete it; the original
    // matrix is untouched and can be reused.
    let mut partial = matrix.copy_with_cover(&[1].into_iter().collect());
    if let Some(solution) = partial.solve() {
        println!("\nCompleting {{1}} uses {} rows", solution.len());
    }

    // Randomized fill with a fixed seed is reproducible.
    let mut filler = matrix.clone().with_seed(42);
    if let Some(solution) = filler.fill(3) {
        println!("Randomized fill found {} rows", solution.len());
    }

    // Search state serializes, so a grid can be snapshotted to storage.
    if let Ok(json) = serde_json::to_string(&matrix) {
        println!("\nSnapshot: {} bytes of JSON", json.len());
    }
}
