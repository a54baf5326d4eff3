//! Row-band partitioning of the grid across the worker fleet.

use colony_core::PartitionRange;

use crate::error::TurnError;

/// Splits `height` rows into `k` contiguous full-width bands in row order.
///
/// Band `i` covers `[i*height/k, (i+1)*height/k)`, so the bands are
/// pairwise disjoint and together cover `[0, height)` exactly, whatever
/// the remainder. The merge step relies on this to reassemble the grid by
/// band index.
pub fn partition_rows(
    height: usize,
    width: usize,
    k: usize,
) -> Result<Vec<PartitionRange>, TurnError> {
    if k == 0 {
        return Err(TurnError::NoWorkers);
    }
    Ok((0..k)
        .map(|i| PartitionRange {
            start_row: i * height / k,
            end_row: (i + 1) * height / k,
            start_col: 0,
            end_col: width,
        })
        .collect())
}
