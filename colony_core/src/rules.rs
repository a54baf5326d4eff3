//! Conway next-state kernel.
//!
//! The grid is a torus: neighbours wrap around both edges, so a band's
//! boundary rows read cells outside the band. That is why step requests
//! carry the full current generation rather than just the partition.

use crate::grid::{Cell, Generation, PartitionRange, ALIVE, DEAD};

/// Counts the live neighbours of `(x, y)` with toroidal wrapping.
pub fn live_neighbours(generation: &Generation, x: usize, y: usize) -> u8 {
    let width = generation.width();
    let height = generation.height();
    let mut count = 0;
    for dy in [height - 1, 0, 1] {
        for dx in [width - 1, 0, 1] {
            if dx == 0 && dy == 0 {
                continue;
            }
            if generation.get((x + dx) % width, (y + dy) % height) == ALIVE {
                count += 1;
            }
        }
    }
    count
}

fn next_state(alive: bool, neighbours: u8) -> u8 {
    match (alive, neighbours) {
        (true, 2) | (true, 3) | (false, 3) => ALIVE,
        _ => DEAD,
    }
}

/// Computes the next state for one partition of the grid.
///
/// Returns the partition's next-state bytes in row-major order together
/// with the cells inside it that flipped, in absolute coordinates.
pub fn step_band(generation: &Generation, range: &PartitionRange) -> (Vec<u8>, Vec<Cell>) {
    let mut rows = Vec::with_capacity(range.rows() * range.cols());
    let mut flipped = Vec::new();
    for y in range.start_row..range.end_row {
        for x in range.start_col..range.end_col {
            let current = generation.get(x, y);
            let next = next_state(current == ALIVE, live_neighbours(generation, x, y));
            if next != current {
                flipped.push(Cell::new(x, y));
            }
            rows.push(next);
        }
    }
    (rows, flipped)
}

/// Single-process reference step over the whole grid.
pub fn step_whole(generation: &Generation) -> (Generation, Vec<Cell>) {
    let range = PartitionRange::whole(generation.width(), generation.height());
    let (rows, flipped) = step_band(generation, &range);
    (
        Generation::from_kernel(generation.width(), generation.height(), rows),
        flipped,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_pattern(rows: &[&str]) -> Generation {
        let height = rows.len();
        let width = rows[0].len();
        let cells = rows
            .iter()
            .flat_map(|row| row.bytes())
            .map(|b| if b == b'#' { ALIVE } else { DEAD })
            .collect();
        Generation::from_bytes(width, height, cells).unwrap()
    }

    #[test]
    fn block_is_a_still_life() {
        let block = from_pattern(&["....", ".##.", ".##.", "...."]);
        let (next, flipped) = step_whole(&block);
        assert_eq!(next, block);
        assert!(flipped.is_empty());
    }

    #[test]
    fn blinker_oscillates_with_period_two() {
        let vertical = from_pattern(&[".....", "..#..", "..#..", "..#..", "....."]);
        let horizontal = from_pattern(&[".....", ".....", ".###.", ".....", "....."]);

        let (next, flipped) = step_whole(&vertical);
        assert_eq!(next, horizontal);

        let mut flipped = flipped;
        flipped.sort();
        assert_eq!(
            flipped,
            vec![
                Cell::new(1, 2),
                Cell::new(2, 1),
                Cell::new(2, 3),
                Cell::new(3, 2),
            ]
        );

        let (back, _) = step_whole(&next);
        assert_eq!(back, vertical);
    }

    #[test]
    fn glider_translates_by_one_diagonal_every_four_steps() {
        let glider = from_pattern(&[
            ".#......",
            "..#.....",
            "###.....",
            "........",
            "........",
            "........",
            "........",
            "........",
        ]);
        let shifted = from_pattern(&[
            "........",
            "..#.....",
            "...#....",
            ".###....",
            "........",
            "........",
            "........",
            "........",
        ]);

        let mut current = glider;
        for _ in 0..4 {
            current = step_whole(&current).0;
        }
        assert_eq!(current, shifted);
    }

    #[test]
    fn neighbours_wrap_around_both_edges() {
        // Vertical blinker hugging the left edge: its horizontal phase
        // wraps to the rightmost column.
        let vertical = from_pattern(&["#....", "#....", "#....", ".....", "....."]);
        let (next, _) = step_whole(&vertical);
        let expected = from_pattern(&[".....", "##..#", ".....", ".....", "....."]);
        assert_eq!(next, expected);
    }

    #[test]
    fn band_step_matches_reference_slice() {
        let mut generation = Generation::blank(7, 9);
        for y in 0..9 {
            for x in 0..7 {
                if (x * 7 + y * 3) % 5 == 0 {
                    generation.set(x, y, ALIVE);
                }
            }
        }

        let (reference, _) = step_whole(&generation);
        let range = PartitionRange {
            start_row: 3,
            end_row: 6,
            start_col: 0,
            end_col: 7,
        };
        let (rows, flipped) = step_band(&generation, &range);

        assert_eq!(rows, reference.row_bytes(3, 6));
        assert!(flipped
            .iter()
            .all(|cell| cell.y >= 3 && cell.y < 6 && cell.x < 7));
    }
}
