use super::scalar::ScalarValue;
use super::value_type::ValueType;
use super::vector::VectorData;
use crate::errors::{AxialError, AxialResult};
use crate::layout::AxisSide;
use crate::{map_vector, zip_vectors};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The memory-order tag of a matrix.
///
/// `SparseRows` (compressed-by-row) only arises from re-layout of a
/// compressed-by-column matrix; it is not a storable form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatrixLayout {
    DenseRows,
    DenseColumns,
    SparseRows,
    SparseColumns,
}

impl MatrixLayout {
    pub fn name(self) -> &'static str {
        match self {
            MatrixLayout::DenseRows => "row-major",
            MatrixLayout::DenseColumns => "column-major",
            MatrixLayout::SparseRows => "compressed-by-row",
            MatrixLayout::SparseColumns => "compressed-by-column",
        }
    }

    pub fn is_sparse(self) -> bool {
        matches!(self, MatrixLayout::SparseRows | MatrixLayout::SparseColumns)
    }

    /// The axis along which contiguous access is cheapest.
    pub fn major_axis(self) -> AxisSide {
        match self {
            MatrixLayout::DenseRows | MatrixLayout::SparseRows => AxisSide::Rows,
            MatrixLayout::DenseColumns | MatrixLayout::SparseColumns => AxisSide::Columns,
        }
    }
}

impl fmt::Display for MatrixLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A dense matrix: one contiguous buffer in either row- or column-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix {
    data: VectorData,
    rows: usize,
    cols: usize,
    major: AxisSide,
}

impl DenseMatrix {
    pub fn new(data: VectorData, rows: usize, cols: usize, major: AxisSide) -> AxialResult<Self> {
        if data.len() != rows * cols {
            return Err(AxialError::shape_mismatch(format!(
                "dense matrix of shape {} x {} with {} values",
                rows,
                cols,
                data.len()
            )));
        }
        Ok(DenseMatrix {
            data,
            rows,
            cols,
            major,
        })
    }

    pub fn row_major(data: VectorData, rows: usize, cols: usize) -> AxialResult<Self> {
        Self::new(data, rows, cols, AxisSide::Rows)
    }

    pub fn column_major(data: VectorData, rows: usize, cols: usize) -> AxialResult<Self> {
        Self::new(data, rows, cols, AxisSide::Columns)
    }

    /// Zeroed storage of the given shape, to be populated by the caller.
    pub fn with_capacity(kind: ValueType, rows: usize, cols: usize, major: AxisSide) -> Self {
        DenseMatrix {
            data: VectorData::filled_default(kind, rows * cols),
            rows,
            cols,
            major,
        }
    }

    pub fn kind(&self) -> ValueType {
        self.data.kind()
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn major(&self) -> AxisSide {
        self.major
    }

    pub fn data(&self) -> &VectorData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut VectorData {
        &mut self.data
    }

    pub fn major_len(&self) -> usize {
        match self.major {
            AxisSide::Rows => self.rows,
            AxisSide::Columns => self.cols,
        }
    }

    pub fn minor_len(&self) -> usize {
        match self.major {
            AxisSide::Rows => self.cols,
            AxisSide::Columns => self.rows,
        }
    }

    fn offset(&self, row: usize, col: usize) -> usize {
        match self.major {
            AxisSide::Rows => row * self.cols + col,
            AxisSide::Columns => col * self.rows + row,
        }
    }

    pub fn get(&self, row: usize, col: usize) -> ScalarValue {
        self.data.value_at(self.offset(row, col))
    }
}

/// A sparse matrix compressed along its major axis.
///
/// `major == Columns` is the compressed-by-column (CSC) form: `offsets` has
/// one slot per column, `indices` holds row indices. `major == Rows` is the
/// compressed-by-row form produced by re-layout.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    rows: usize,
    cols: usize,
    major: AxisSide,
    offsets: Vec<usize>,
    indices: Vec<usize>,
    values: VectorData,
}

impl SparseMatrix {
    pub fn new(
        rows: usize,
        cols: usize,
        major: AxisSide,
        offsets: Vec<usize>,
        indices: Vec<usize>,
        values: VectorData,
    ) -> AxialResult<Self> {
        let major_len = match major {
            AxisSide::Rows => rows,
            AxisSide::Columns => cols,
        };
        let minor_len = match major {
            AxisSide::Rows => cols,
            AxisSide::Columns => rows,
        };
        if offsets.len() != major_len + 1 || offsets.first() != Some(&0) {
            return Err(AxialError::shape_mismatch(format!(
                "compressed matrix with {} offsets for a major length of {}",
                offsets.len(),
                major_len
            )));
        }
        if offsets.windows(2).any(|pair| pair[0] > pair[1]) {
            return Err(AxialError::shape_mismatch(
                "compressed matrix offsets are not monotonic",
            ));
        }
        if *offsets.last().unwrap_or(&0) != indices.len() || indices.len() != values.len() {
            return Err(AxialError::shape_mismatch(format!(
                "compressed matrix with {} indices, {} values and a final offset of {}",
                indices.len(),
                values.len(),
                offsets.last().copied().unwrap_or(0)
            )));
        }
        if let Some(out_of_range) = indices.iter().find(|index| **index >= minor_len) {
            return Err(AxialError::shape_mismatch(format!(
                "compressed matrix index {} is out of range for a minor length of {}",
                out_of_range, minor_len
            )));
        }
        Ok(SparseMatrix {
            rows,
            cols,
            major,
            offsets,
            indices,
            values,
        })
    }

    /// The compressed-by-column form: `row_indices` per column.
    pub fn by_columns(
        rows: usize,
        cols: usize,
        offsets: Vec<usize>,
        row_indices: Vec<usize>,
        values: VectorData,
    ) -> AxialResult<Self> {
        Self::new(rows, cols, AxisSide::Columns, offsets, row_indices, values)
    }

    /// Zeroed storage for `nnz` entries, to be populated by the caller.
    pub fn with_capacity(kind: ValueType, rows: usize, cols: usize, nnz: usize) -> Self {
        SparseMatrix {
            rows,
            cols,
            major: AxisSide::Columns,
            offsets: vec![0; cols + 1],
            indices: vec![0; nnz],
            values: VectorData::filled_default(kind, nnz),
        }
    }

    pub fn kind(&self) -> ValueType {
        self.values.kind()
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn major(&self) -> AxisSide {
        self.major
    }

    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn values(&self) -> &VectorData {
        &self.values
    }

    pub fn offsets_mut(&mut self) -> &mut [usize] {
        &mut self.offsets
    }

    pub fn indices_mut(&mut self) -> &mut [usize] {
        &mut self.indices
    }

    pub fn values_mut(&mut self) -> &mut VectorData {
        &mut self.values
    }

    pub fn major_len(&self) -> usize {
        match self.major {
            AxisSide::Rows => self.rows,
            AxisSide::Columns => self.cols,
        }
    }

    pub fn minor_len(&self) -> usize {
        match self.major {
            AxisSide::Rows => self.cols,
            AxisSide::Columns => self.rows,
        }
    }

    pub fn get(&self, row: usize, col: usize) -> ScalarValue {
        let (slot, within) = match self.major {
            AxisSide::Rows => (row, col),
            AxisSide::Columns => (col, row),
        };
        for position in self.offsets[slot]..self.offsets[slot + 1] {
            if self.indices[position] == within {
                return self.values.value_at(position);
            }
        }
        ScalarValue::default_of(self.kind())
    }
}

/// A storable or derived 2-D array.
#[derive(Debug, Clone, PartialEq)]
pub enum MatrixData {
    Dense(DenseMatrix),
    Sparse(SparseMatrix),
}

/// True for the three storable forms: dense row-major, dense column-major,
/// and compressed-by-column.
pub fn is_storage_matrix(matrix: &MatrixData) -> bool {
    matrix.layout() != MatrixLayout::SparseRows
}

impl MatrixData {
    pub fn shape(&self) -> (usize, usize) {
        (self.rows(), self.cols())
    }

    pub fn rows(&self) -> usize {
        match self {
            MatrixData::Dense(m) => m.rows(),
            MatrixData::Sparse(m) => m.rows(),
        }
    }

    pub fn cols(&self) -> usize {
        match self {
            MatrixData::Dense(m) => m.cols(),
            MatrixData::Sparse(m) => m.cols(),
        }
    }

    pub fn kind(&self) -> ValueType {
        self.values_data().kind()
    }

    pub fn layout(&self) -> MatrixLayout {
        match self {
            MatrixData::Dense(m) => match m.major() {
                AxisSide::Rows => MatrixLayout::DenseRows,
                AxisSide::Columns => MatrixLayout::DenseColumns,
            },
            MatrixData::Sparse(m) => match m.major() {
                AxisSide::Rows => MatrixLayout::SparseRows,
                AxisSide::Columns => MatrixLayout::SparseColumns,
            },
        }
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, MatrixData::Sparse(_))
    }

    pub fn major_axis(&self) -> AxisSide {
        self.layout().major_axis()
    }

    pub fn minor_axis(&self) -> AxisSide {
        self.major_axis().other()
    }

    pub fn major_len(&self) -> usize {
        match self {
            MatrixData::Dense(m) => m.major_len(),
            MatrixData::Sparse(m) => m.major_len(),
        }
    }

    pub fn minor_len(&self) -> usize {
        match self {
            MatrixData::Dense(m) => m.minor_len(),
            MatrixData::Sparse(m) => m.minor_len(),
        }
    }

    pub fn get(&self, row: usize, col: usize) -> ScalarValue {
        match self {
            MatrixData::Dense(m) => m.get(row, col),
            MatrixData::Sparse(m) => m.get(row, col),
        }
    }

    /// The raw value buffer (all entries for dense, stored entries for sparse).
    pub fn values_data(&self) -> &VectorData {
        match self {
            MatrixData::Dense(m) => m.data(),
            MatrixData::Sparse(m) => m.values(),
        }
    }

    /// Rebuilds the matrix with a replacement value buffer of the same length.
    pub fn with_values(&self, values: VectorData) -> AxialResult<MatrixData> {
        if values.len() != self.values_data().len() {
            return Err(AxialError::shape_mismatch(format!(
                "replacement buffer of {} values for a matrix holding {}",
                values.len(),
                self.values_data().len()
            )));
        }
        Ok(match self {
            MatrixData::Dense(m) => MatrixData::Dense(DenseMatrix {
                data: values,
                rows: m.rows,
                cols: m.cols,
                major: m.major,
            }),
            MatrixData::Sparse(m) => MatrixData::Sparse(SparseMatrix {
                rows: m.rows,
                cols: m.cols,
                major: m.major,
                offsets: m.offsets.clone(),
                indices: m.indices.clone(),
                values,
            }),
        })
    }

    /// The logical transpose as a view over the same buffers.
    ///
    /// Dimensions swap and the major tag flips; no values move. The transpose
    /// of a compressed-by-column matrix is therefore compressed-by-row.
    pub fn transposed(&self) -> MatrixData {
        match self {
            MatrixData::Dense(m) => MatrixData::Dense(DenseMatrix {
                data: m.data.clone(),
                rows: m.cols,
                cols: m.rows,
                major: m.major.other(),
            }),
            MatrixData::Sparse(m) => MatrixData::Sparse(SparseMatrix {
                rows: m.cols,
                cols: m.rows,
                major: m.major.other(),
                offsets: m.offsets.clone(),
                indices: m.indices.clone(),
                values: m.values.clone(),
            }),
        }
    }

    /// One major-axis slot as a dense vector of minor length.
    pub fn slice_major(&self, slot: usize) -> VectorData {
        match self {
            MatrixData::Dense(m) => {
                let minor_len = m.minor_len();
                map_vector!(&m.data, data => data[slot * minor_len..(slot + 1) * minor_len].to_vec())
            }
            MatrixData::Sparse(m) => {
                let mut dense = VectorData::filled_default(m.kind(), m.minor_len());
                zip_vectors!(&m.values, &mut dense, values, dense_values => {
                    for position in m.offsets[slot]..m.offsets[slot + 1] {
                        dense_values[m.indices[position]] = values[position].clone();
                    }
                }, else => unreachable!("a matrix buffer and its dense slice share a kind"));
                dense
            }
        }
    }

    /// One minor-axis line as a dense vector of major length.
    ///
    /// This traverses against the matrix's layout; callers are expected to
    /// consult the inefficient-action policy first.
    pub fn slice_minor(&self, index: usize) -> VectorData {
        match self {
            MatrixData::Dense(m) => {
                let minor_len = m.minor_len();
                let major_len = m.major_len();
                map_vector!(&m.data, data => (0..major_len)
                    .map(|slot| data[slot * minor_len + index].clone())
                    .collect())
            }
            MatrixData::Sparse(m) => {
                let mut dense = VectorData::filled_default(m.kind(), m.major_len());
                zip_vectors!(&m.values, &mut dense, values, dense_values => {
                    for slot in 0..m.major_len() {
                        for position in m.offsets[slot]..m.offsets[slot + 1] {
                            if m.indices[position] == index {
                                dense_values[slot] = values[position].clone();
                            }
                        }
                    }
                }, else => unreachable!("a matrix buffer and its dense slice share a kind"));
                dense
            }
        }
    }

    /// The row as a dense vector of length `cols`.
    pub fn row_slice(&self, row: usize) -> VectorData {
        match self.major_axis() {
            AxisSide::Rows => self.slice_major(row),
            AxisSide::Columns => self.slice_minor(row),
        }
    }

    /// The column as a dense vector of length `rows`.
    pub fn col_slice(&self, col: usize) -> VectorData {
        match self.major_axis() {
            AxisSide::Columns => self.slice_major(col),
            AxisSide::Rows => self.slice_minor(col),
        }
    }

    /// Keeps the rows and columns where the masks are true.
    ///
    /// A `None` mask keeps the whole dimension. The layout is preserved.
    pub fn subset(&self, row_keep: Option<&[bool]>, col_keep: Option<&[bool]>) -> MatrixData {
        let row_indices = kept_indices(row_keep, self.rows());
        let col_indices = kept_indices(col_keep, self.cols());
        match self {
            MatrixData::Dense(m) => {
                let minor_len = m.minor_len();
                let (major_indices, minor_indices) = match m.major() {
                    AxisSide::Rows => (&row_indices, &col_indices),
                    AxisSide::Columns => (&col_indices, &row_indices),
                };
                let data = map_vector!(&m.data, data => {
                    let mut out = Vec::with_capacity(major_indices.len() * minor_indices.len());
                    for major in major_indices {
                        for minor in minor_indices {
                            out.push(data[major * minor_len + minor].clone());
                        }
                    }
                    out
                });
                MatrixData::Dense(DenseMatrix {
                    data,
                    rows: row_indices.len(),
                    cols: col_indices.len(),
                    major: m.major(),
                })
            }
            MatrixData::Sparse(m) => {
                let (major_keep, minor_keep) = match m.major() {
                    AxisSide::Rows => (row_keep, col_keep),
                    AxisSide::Columns => (col_keep, row_keep),
                };
                let mut minor_map = vec![None; m.minor_len()];
                let mut next_minor = 0usize;
                for (index, slot) in minor_map.iter_mut().enumerate() {
                    if minor_keep.map_or(true, |keep| keep[index]) {
                        *slot = Some(next_minor);
                        next_minor += 1;
                    }
                }
                let mut offsets = Vec::with_capacity(m.major_len() + 1);
                offsets.push(0);
                let mut indices = Vec::new();
                let mut positions = Vec::new();
                for slot in 0..m.major_len() {
                    if major_keep.map_or(true, |keep| keep[slot]) {
                        for position in m.offsets[slot]..m.offsets[slot + 1] {
                            if let Some(new_minor) = minor_map[m.indices[position]] {
                                indices.push(new_minor);
                                positions.push(position);
                            }
                        }
                        offsets.push(indices.len());
                    }
                }
                let values = m.values.take(&positions);
                MatrixData::Sparse(SparseMatrix {
                    rows: row_indices.len(),
                    cols: col_indices.len(),
                    major: m.major(),
                    offsets,
                    indices,
                    values,
                })
            }
        }
    }

    /// The full matrix as a dense row-major buffer, regardless of layout.
    pub fn to_dense_row_major(&self) -> DenseMatrix {
        let rows = self.rows();
        let cols = self.cols();
        match self {
            MatrixData::Dense(m) if m.major() == AxisSide::Rows => m.clone(),
            MatrixData::Dense(m) => {
                let data =
                    map_vector!(&m.data, data => reorder_major(data, m.major_len(), m.minor_len()));
                DenseMatrix {
                    data,
                    rows,
                    cols,
                    major: AxisSide::Rows,
                }
            }
            MatrixData::Sparse(m) => {
                let mut data = VectorData::filled_default(m.kind(), rows * cols);
                zip_vectors!(&m.values, &mut data, values, dense_values => {
                    for slot in 0..m.major_len() {
                        for position in m.offsets[slot]..m.offsets[slot + 1] {
                            let (row, col) = match m.major() {
                                AxisSide::Rows => (slot, m.indices[position]),
                                AxisSide::Columns => (m.indices[position], slot),
                            };
                            dense_values[row * cols + col] = values[position].clone();
                        }
                    }
                }, else => unreachable!("a matrix buffer and its dense image share a kind"));
                DenseMatrix {
                    data,
                    rows,
                    cols,
                    major: AxisSide::Rows,
                }
            }
        }
    }

    /// True when both matrices hold the same logical entries, whatever their
    /// layouts.
    pub fn elementwise_equals(&self, other: &MatrixData) -> bool {
        self.shape() == other.shape()
            && self.kind() == other.kind()
            && self
                .to_dense_row_major()
                .data()
                .elementwise_equals(other.to_dense_row_major().data())
    }
}

fn kept_indices(keep: Option<&[bool]>, len: usize) -> Vec<usize> {
    match keep {
        None => (0..len).collect(),
        Some(keep) => keep
            .iter()
            .enumerate()
            .filter(|(_, kept)| **kept)
            .map(|(index, _)| index)
            .collect(),
    }
}

/// Reorders a dense buffer so the old minor axis becomes the major one.
pub(crate) fn reorder_major<T: Clone>(data: &[T], major_len: usize, minor_len: usize) -> Vec<T> {
    let mut out = Vec::with_capacity(data.len());
    for minor in 0..minor_len {
        for major in 0..major_len {
            out.push(data[major * minor_len + minor].clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn umis() -> MatrixData {
        // 2 x 3, row-major:
        //   1 2 3
        //   4 5 6
        MatrixData::Dense(
            DenseMatrix::row_major(VectorData::from(vec![1i64, 2, 3, 4, 5, 6]), 2, 3).unwrap(),
        )
    }

    fn sparse() -> MatrixData {
        // 3 x 2, compressed by column:
        //   1 0
        //   0 2
        //   3 0
        MatrixData::Sparse(
            SparseMatrix::by_columns(
                3,
                2,
                vec![0, 2, 3],
                vec![0, 2, 1],
                VectorData::from(vec![1i32, 3, 2]),
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_dense_get() {
        let m = umis();
        assert_eq!(m.get(0, 2), ScalarValue::I64(3));
        assert_eq!(m.get(1, 0), ScalarValue::I64(4));
        assert_eq!(m.layout(), MatrixLayout::DenseRows);
    }

    #[test]
    fn test_sparse_get_and_slices() {
        let m = sparse();
        assert_eq!(m.get(2, 0), ScalarValue::I32(3));
        assert_eq!(m.get(1, 1), ScalarValue::I32(2));
        assert_eq!(m.get(0, 1), ScalarValue::I32(0));
        assert_eq!(m.col_slice(0), VectorData::from(vec![1i32, 0, 3]));
        assert_eq!(m.row_slice(1), VectorData::from(vec![0i32, 2]));
    }

    #[test]
    fn test_transpose_flips_layout() {
        let t = sparse().transposed();
        assert_eq!(t.shape(), (2, 3));
        assert_eq!(t.layout(), MatrixLayout::SparseRows);
        assert!(!is_storage_matrix(&t));
        assert_eq!(t.get(0, 2), ScalarValue::I32(3));
        assert_eq!(t.get(1, 1), ScalarValue::I32(2));
    }

    #[test]
    fn test_subset_dense() {
        let m = umis();
        let kept = m.subset(Some(&[false, true]), Some(&[true, false, true]));
        assert_eq!(kept.shape(), (1, 2));
        assert_eq!(kept.get(0, 0), ScalarValue::I64(4));
        assert_eq!(kept.get(0, 1), ScalarValue::I64(6));
    }

    #[test]
    fn test_subset_sparse_remaps_indices() {
        let m = sparse();
        let kept = m.subset(Some(&[true, false, true]), None);
        assert_eq!(kept.shape(), (2, 2));
        assert_eq!(kept.get(0, 0), ScalarValue::I32(1));
        assert_eq!(kept.get(1, 0), ScalarValue::I32(3));
        assert_eq!(kept.get(1, 1), ScalarValue::I32(0));
        assert_eq!(kept.layout(), MatrixLayout::SparseColumns);
    }

    #[test]
    fn test_elementwise_equality_across_layouts() {
        let m = umis();
        let column_major = MatrixData::Dense(
            DenseMatrix::column_major(VectorData::from(vec![1i64, 4, 2, 5, 3, 6]), 2, 3).unwrap(),
        );
        assert!(m.elementwise_equals(&column_major));
    }

    #[test]
    fn test_empty_shapes() {
        let m = MatrixData::Dense(
            DenseMatrix::row_major(VectorData::from(Vec::<i64>::new()), 0, 3).unwrap(),
        );
        assert_eq!(m.shape(), (0, 3));
        let kept = m.subset(None, Some(&[true, false, true]));
        assert_eq!(kept.shape(), (0, 2));
    }
}
