//! The primitive backend contract.
//!
//! A backend implements these operations over raw, already-validated inputs;
//! the repository facade performs every existence, shape and kind check
//! before delegating. Implementations are free to panic when handed inputs
//! that violate the contract (a missing axis, a property that is not there).

use crate::layout::AxisSide;
use crate::types::{DenseMatrix, MatrixData, ScalarValue, SparseMatrix, SparseVector, ValueType, VectorData};
use std::sync::Arc;

/// A stored vector: dense, or sparse with implicit neutral entries.
#[derive(Debug, Clone, PartialEq)]
pub enum VectorForm {
    Dense(VectorData),
    Sparse(SparseVector),
}

impl VectorForm {
    pub fn kind(&self) -> ValueType {
        match self {
            VectorForm::Dense(values) => values.kind(),
            VectorForm::Sparse(values) => values.kind(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            VectorForm::Dense(values) => values.len(),
            VectorForm::Sparse(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The dense materialization (a copy for sparse storage).
    pub fn to_dense(&self) -> VectorData {
        match self {
            VectorForm::Dense(values) => values.clone(),
            VectorForm::Sparse(values) => values.to_dense(),
        }
    }
}

/// The minimal operations a storage backend must provide.
///
/// The `empty_*` operations allocate backend-owned storage and hand back a
/// mutable view; the caller must fully populate it before any reader can
/// observe the property. This lets persistent backends map the output file
/// directly instead of staging a copy in memory. The `index_kind` of the
/// sparse allocations sizes the backend's index representation; it is always
/// an unsigned integer kind.
pub trait Format: Send + Sync {
    /// The repository's own name.
    fn name(&self) -> &str;

    fn has_scalar(&self, name: &str) -> bool;
    fn set_scalar(&mut self, name: &str, value: ScalarValue);
    fn delete_scalar(&mut self, name: &str);
    fn get_scalar(&self, name: &str) -> ScalarValue;
    fn scalar_names(&self) -> Vec<String>;

    fn has_axis(&self, axis: &str) -> bool;
    fn add_axis(&mut self, axis: &str, entries: Vec<String>);
    fn delete_axis(&mut self, axis: &str);
    fn axis_names(&self) -> Vec<String>;
    fn axis_entries(&self, axis: &str) -> Arc<Vec<String>>;
    fn axis_entry_index(&self, axis: &str, entry: &str) -> Option<usize>;
    fn axis_length(&self, axis: &str) -> usize;

    fn has_vector(&self, axis: &str, name: &str) -> bool;
    fn set_vector(&mut self, axis: &str, name: &str, vector: VectorForm);
    fn empty_dense_vector(&mut self, axis: &str, name: &str, kind: ValueType) -> &mut VectorData;
    fn empty_sparse_vector(
        &mut self,
        axis: &str,
        name: &str,
        kind: ValueType,
        nnz: usize,
        index_kind: ValueType,
    ) -> &mut SparseVector;
    fn delete_vector(&mut self, axis: &str, name: &str);
    fn vector_names(&self, axis: &str) -> Vec<String>;
    fn get_vector(&self, axis: &str, name: &str) -> Arc<VectorForm>;

    fn has_matrix(&self, rows: &str, cols: &str, name: &str) -> bool;
    fn set_matrix(&mut self, rows: &str, cols: &str, name: &str, matrix: MatrixData);
    fn empty_dense_matrix(
        &mut self,
        rows: &str,
        cols: &str,
        name: &str,
        kind: ValueType,
        major: AxisSide,
    ) -> &mut DenseMatrix;
    fn empty_sparse_matrix(
        &mut self,
        rows: &str,
        cols: &str,
        name: &str,
        kind: ValueType,
        nnz: usize,
        index_kind: ValueType,
    ) -> &mut SparseMatrix;
    fn delete_matrix(&mut self, rows: &str, cols: &str, name: &str);
    fn matrix_names(&self, rows: &str, cols: &str) -> Vec<String>;
    fn get_matrix(&self, rows: &str, cols: &str, name: &str) -> Arc<MatrixData>;
}
