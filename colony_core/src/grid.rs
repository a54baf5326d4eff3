//! Grid data model shared by the broker, workers, and client.

use serde::{Deserialize, Serialize};

use crate::error::GridError;

/// Byte value of a live cell, on the wire and in memory.
pub const ALIVE: u8 = 255;

/// Byte value of a dead cell.
pub const DEAD: u8 = 0;

/// A grid position whose alive/dead state changed during a turn.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Cell {
    pub x: usize,
    pub y: usize,
}

impl Cell {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Fixed parameters of a simulation run. Immutable once the run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimParams {
    pub width: usize,
    pub height: usize,
    pub turns: usize,
}

/// One generation of the world: a height × width byte matrix, row-major.
///
/// Dimensions are fixed for the lifetime of a run once established by the
/// first transfer; a transfer may reset them wholesale. There is no partial
/// mutation across the wire - a turn either replaces the whole generation
/// or leaves it untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    width: usize,
    height: usize,
    cells: Vec<u8>,
}

impl Generation {
    /// Creates an all-dead generation.
    pub fn blank(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![DEAD; width * height],
        }
    }

    /// Builds a generation from raw bytes, rejecting undefined cell values
    /// and dimension mismatches.
    pub fn from_bytes(width: usize, height: usize, cells: Vec<u8>) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::ZeroDimension);
        }
        if cells.len() != width * height {
            return Err(GridError::DimensionMismatch {
                expected: width * height,
                actual: cells.len(),
            });
        }
        let generation = Self {
            width,
            height,
            cells,
        };
        generation.validate()?;
        Ok(generation)
    }

    /// Builds a generation from kernel output without re-scanning the
    /// bytes. Callers must only pass bytes produced by this crate's rules.
    pub(crate) fn from_kernel(width: usize, height: usize, cells: Vec<u8>) -> Self {
        debug_assert_eq!(cells.len(), width * height);
        Self {
            width,
            height,
            cells,
        }
    }

    /// Scans for undefined cell bytes. Deserialization does not validate,
    /// so data arriving over the wire must pass through this before use.
    pub fn validate(&self) -> Result<(), GridError> {
        if self.width == 0 || self.height == 0 {
            return Err(GridError::ZeroDimension);
        }
        if self.cells.len() != self.width * self.height {
            return Err(GridError::DimensionMismatch {
                expected: self.width * self.height,
                actual: self.cells.len(),
            });
        }
        for (i, &value) in self.cells.iter().enumerate() {
            if value != ALIVE && value != DEAD {
                return Err(GridError::BadCellByte {
                    x: i % self.width,
                    y: i / self.width,
                    value,
                });
            }
        }
        Ok(())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.cells[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        self.cells[y * self.width + x] = value;
    }

    /// The full raster, row-major.
    pub fn as_bytes(&self) -> &[u8] {
        &self.cells
    }

    /// The raster slice covering rows `[start_row, end_row)`.
    pub fn row_bytes(&self, start_row: usize, end_row: usize) -> &[u8] {
        &self.cells[start_row * self.width..end_row * self.width]
    }

    /// All currently live cells in row-major order.
    pub fn alive_cells(&self) -> Vec<Cell> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, &value)| value == ALIVE)
            .map(|(i, _)| Cell::new(i % self.width, i / self.width))
            .collect()
    }

    pub fn alive_count(&self) -> usize {
        self.cells.iter().filter(|&&value| value == ALIVE).count()
    }
}

/// The rectangular sub-grid assigned to one worker for a turn.
///
/// Rows span `[start_row, end_row)`, columns `[start_col, end_col)`. The
/// set of ranges for a turn is disjoint and exactly covers the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionRange {
    pub start_row: usize,
    pub end_row: usize,
    pub start_col: usize,
    pub end_col: usize,
}

impl PartitionRange {
    /// Number of rows in the range.
    pub fn rows(&self) -> usize {
        self.end_row - self.start_row
    }

    /// Number of columns in the range.
    pub fn cols(&self) -> usize {
        self.end_col - self.start_col
    }

    /// The range covering a whole grid.
    pub fn whole(width: usize, height: usize) -> Self {
        Self {
            start_row: 0,
            end_row: height,
            start_col: 0,
            end_col: width,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_bytes_rejects_undefined_value() {
        let mut cells = vec![DEAD; 9];
        cells[5] = 7;
        let err = Generation::from_bytes(3, 3, cells).unwrap_err();
        assert_eq!(
            err,
            GridError::BadCellByte {
                x: 2,
                y: 1,
                value: 7
            }
        );
    }

    #[test]
    fn from_bytes_rejects_wrong_length() {
        let err = Generation::from_bytes(3, 3, vec![DEAD; 8]).unwrap_err();
        assert_eq!(
            err,
            GridError::DimensionMismatch {
                expected: 9,
                actual: 8
            }
        );
    }

    #[test]
    fn from_bytes_rejects_zero_dimensions() {
        assert_eq!(
            Generation::from_bytes(0, 3, vec![]).unwrap_err(),
            GridError::ZeroDimension
        );
    }

    #[test]
    fn deserialized_grid_can_smuggle_bad_bytes_until_validated() {
        let json = r#"{"width":2,"height":1,"cells":[255,7]}"#;
        let generation: Generation = serde_json::from_str(json).unwrap();
        assert!(generation.validate().is_err());
    }

    #[test]
    fn alive_cells_scan() {
        let mut generation = Generation::blank(3, 2);
        generation.set(2, 0, ALIVE);
        generation.set(0, 1, ALIVE);
        assert_eq!(
            generation.alive_cells(),
            vec![Cell::new(2, 0), Cell::new(0, 1)]
        );
        assert_eq!(generation.alive_count(), 2);
    }

    #[test]
    fn row_bytes_slices_by_row() {
        let mut generation = Generation::blank(2, 3);
        generation.set(0, 1, ALIVE);
        assert_eq!(generation.row_bytes(1, 2), &[ALIVE, DEAD]);
    }
}
