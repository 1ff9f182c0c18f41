//! Matrix layout: axis symbols, major/minor detection and the re-layout
//! transform that keeps inner loops running along contiguous memory.

pub mod policy;

pub use policy::{
    check_efficiency, inefficient_action_policy, set_inefficient_action_policy,
    with_inefficient_action_policy, InefficientActionPolicy,
};

use crate::map_vector;
use crate::types::matrix::{reorder_major, DenseMatrix, MatrixData, SparseMatrix};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two sides of a matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisSide {
    Rows,
    Columns,
}

impl AxisSide {
    pub fn name(self) -> &'static str {
        match self {
            AxisSide::Rows => "Rows",
            AxisSide::Columns => "Columns",
        }
    }

    pub fn other(self) -> AxisSide {
        match self {
            AxisSide::Rows => AxisSide::Columns,
            AxisSide::Columns => AxisSide::Rows,
        }
    }
}

impl fmt::Display for AxisSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The axis along which contiguous accesses are cheapest.
pub fn major_axis(matrix: &MatrixData) -> AxisSide {
    matrix.major_axis()
}

/// The axis along which accesses stride.
pub fn minor_axis(matrix: &MatrixData) -> AxisSide {
    matrix.minor_axis()
}

/// The opposite side.
pub fn other_axis(side: AxisSide) -> AxisSide {
    side.other()
}

/// Returns an equivalent matrix whose major axis is `target`.
///
/// Pure: the source is never mutated. Dense matrices stay dense with a
/// reordered buffer; compressed matrices stay compressed, converting between
/// the by-column and by-row forms by counting sort.
pub fn relayout(matrix: &MatrixData, target: AxisSide) -> MatrixData {
    if matrix.major_axis() == target {
        return matrix.clone();
    }
    match matrix {
        MatrixData::Dense(m) => {
            let data = map_vector!(m.data(), data => reorder_major(data, m.major_len(), m.minor_len()));
            MatrixData::Dense(
                DenseMatrix::new(data, m.rows(), m.cols(), target)
                    .unwrap_or_else(|_| unreachable!("re-layout preserves the buffer length")),
            )
        }
        MatrixData::Sparse(m) => {
            let (offsets, indices, permutation) =
                convert_compressed(m.offsets(), m.indices(), m.major_len(), m.minor_len());
            let values = m.values().take(&permutation);
            MatrixData::Sparse(
                SparseMatrix::new(m.rows(), m.cols(), target, offsets, indices, values)
                    .unwrap_or_else(|_| unreachable!("re-layout preserves the compressed shape")),
            )
        }
    }
}

/// Counting-sort conversion of a compressed matrix to the opposite major.
///
/// Returns the new offsets, the new minor indices (old major slots) and the
/// permutation mapping new entry positions to old ones.
fn convert_compressed(
    offsets: &[usize],
    indices: &[usize],
    major_len: usize,
    minor_len: usize,
) -> (Vec<usize>, Vec<usize>, Vec<usize>) {
    let nnz = indices.len();
    let mut counts = vec![0usize; minor_len];
    for minor in indices {
        counts[*minor] += 1;
    }
    let mut new_offsets = vec![0usize; minor_len + 1];
    for index in 0..minor_len {
        new_offsets[index + 1] = new_offsets[index] + counts[index];
    }
    let mut cursor = new_offsets[..minor_len].to_vec();
    let mut new_indices = vec![0usize; nnz];
    let mut permutation = vec![0usize; nnz];
    for slot in 0..major_len {
        for position in offsets[slot]..offsets[slot + 1] {
            let minor = indices[position];
            let destination = cursor[minor];
            cursor[minor] += 1;
            new_indices[destination] = slot;
            permutation[destination] = position;
        }
    }
    (new_offsets, new_indices, permutation)
}
