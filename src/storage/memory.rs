//! The in-process reference backend.

use super::format::{Format, VectorForm};
use crate::layout::AxisSide;
use crate::types::{DenseMatrix, MatrixData, ScalarValue, SparseMatrix, SparseVector, ValueType, VectorData};
use std::collections::HashMap;
use std::sync::Arc;

struct MemoryAxis {
    entries: Arc<Vec<String>>,
    index_of: HashMap<String, usize>,
}

/// Hash-map backed implementation of the format contract.
///
/// Vectors nest as axis -> property -> entry; matrices nest as rows axis ->
/// columns axis -> property -> entry. Adding an axis pre-creates the empty
/// property maps for every axis pair it participates in, and deleting an
/// axis removes every mapping keyed by it on either side.
pub struct MemoryFormat {
    name: String,
    scalars: HashMap<String, ScalarValue>,
    axes: HashMap<String, MemoryAxis>,
    vectors: HashMap<String, HashMap<String, Arc<VectorForm>>>,
    matrices: HashMap<String, HashMap<String, HashMap<String, Arc<MatrixData>>>>,
}

impl MemoryFormat {
    pub fn new(name: impl Into<String>) -> MemoryFormat {
        MemoryFormat {
            name: name.into(),
            scalars: HashMap::new(),
            axes: HashMap::new(),
            vectors: HashMap::new(),
            matrices: HashMap::new(),
        }
    }

    fn vector_slot(&mut self, axis: &str, name: &str) -> &mut Arc<VectorForm> {
        self.vectors
            .get_mut(axis)
            .expect("axis validated by the repository facade")
            .get_mut(name)
            .expect("vector inserted just before")
    }

    fn matrix_slot(&mut self, rows: &str, cols: &str, name: &str) -> &mut Arc<MatrixData> {
        self.matrices
            .get_mut(rows)
            .and_then(|columns| columns.get_mut(cols))
            .expect("axes validated by the repository facade")
            .get_mut(name)
            .expect("matrix inserted just before")
    }
}

impl Format for MemoryFormat {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_scalar(&self, name: &str) -> bool {
        self.scalars.contains_key(name)
    }

    fn set_scalar(&mut self, name: &str, value: ScalarValue) {
        self.scalars.insert(name.to_string(), value);
    }

    fn delete_scalar(&mut self, name: &str) {
        self.scalars.remove(name);
    }

    fn get_scalar(&self, name: &str) -> ScalarValue {
        self.scalars[name].clone()
    }

    fn scalar_names(&self) -> Vec<String> {
        self.scalars.keys().cloned().collect()
    }

    fn has_axis(&self, axis: &str) -> bool {
        self.axes.contains_key(axis)
    }

    fn add_axis(&mut self, axis: &str, entries: Vec<String>) {
        let index_of = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (entry.clone(), index))
            .collect();
        self.axes.insert(
            axis.to_string(),
            MemoryAxis {
                entries: Arc::new(entries),
                index_of,
            },
        );
        self.vectors.insert(axis.to_string(), HashMap::new());
        let axis_names: Vec<String> = self.axes.keys().cloned().collect();
        let rows_of_new = self.matrices.entry(axis.to_string()).or_default();
        for other in &axis_names {
            rows_of_new.insert(other.clone(), HashMap::new());
        }
        for other in &axis_names {
            if other != axis {
                if let Some(columns) = self.matrices.get_mut(other) {
                    columns.insert(axis.to_string(), HashMap::new());
                }
            }
        }
    }

    fn delete_axis(&mut self, axis: &str) {
        self.axes.remove(axis);
        self.vectors.remove(axis);
        self.matrices.remove(axis);
        for columns in self.matrices.values_mut() {
            columns.remove(axis);
        }
    }

    fn axis_names(&self) -> Vec<String> {
        self.axes.keys().cloned().collect()
    }

    fn axis_entries(&self, axis: &str) -> Arc<Vec<String>> {
        Arc::clone(&self.axes[axis].entries)
    }

    fn axis_entry_index(&self, axis: &str, entry: &str) -> Option<usize> {
        self.axes[axis].index_of.get(entry).copied()
    }

    fn axis_length(&self, axis: &str) -> usize {
        self.axes[axis].entries.len()
    }

    fn has_vector(&self, axis: &str, name: &str) -> bool {
        self.vectors
            .get(axis)
            .is_some_and(|properties| properties.contains_key(name))
    }

    fn set_vector(&mut self, axis: &str, name: &str, vector: VectorForm) {
        self.vectors
            .get_mut(axis)
            .expect("axis validated by the repository facade")
            .insert(name.to_string(), Arc::new(vector));
    }

    fn empty_dense_vector(&mut self, axis: &str, name: &str, kind: ValueType) -> &mut VectorData {
        let length = self.axes[axis].entries.len();
        self.set_vector(
            axis,
            name,
            VectorForm::Dense(VectorData::filled_default(kind, length)),
        );
        let slot = self.vector_slot(axis, name);
        match Arc::get_mut(slot).expect("freshly allocated storage is unshared") {
            VectorForm::Dense(values) => values,
            VectorForm::Sparse(_) => unreachable!("allocated dense just before"),
        }
    }

    fn empty_sparse_vector(
        &mut self,
        axis: &str,
        name: &str,
        kind: ValueType,
        nnz: usize,
        _index_kind: ValueType,
    ) -> &mut SparseVector {
        let length = self.axes[axis].entries.len();
        self.set_vector(
            axis,
            name,
            VectorForm::Sparse(SparseVector::with_capacity(kind, length, nnz)),
        );
        let slot = self.vector_slot(axis, name);
        match Arc::get_mut(slot).expect("freshly allocated storage is unshared") {
            VectorForm::Sparse(values) => values,
            VectorForm::Dense(_) => unreachable!("allocated sparse just before"),
        }
    }

    fn delete_vector(&mut self, axis: &str, name: &str) {
        if let Some(properties) = self.vectors.get_mut(axis) {
            properties.remove(name);
        }
    }

    fn vector_names(&self, axis: &str) -> Vec<String> {
        self.vectors[axis].keys().cloned().collect()
    }

    fn get_vector(&self, axis: &str, name: &str) -> Arc<VectorForm> {
        Arc::clone(&self.vectors[axis][name])
    }

    fn has_matrix(&self, rows: &str, cols: &str, name: &str) -> bool {
        self.matrices
            .get(rows)
            .and_then(|columns| columns.get(cols))
            .is_some_and(|properties| properties.contains_key(name))
    }

    fn set_matrix(&mut self, rows: &str, cols: &str, name: &str, matrix: MatrixData) {
        self.matrices
            .get_mut(rows)
            .and_then(|columns| columns.get_mut(cols))
            .expect("axes validated by the repository facade")
            .insert(name.to_string(), Arc::new(matrix));
    }

    fn empty_dense_matrix(
        &mut self,
        rows: &str,
        cols: &str,
        name: &str,
        kind: ValueType,
        major: AxisSide,
    ) -> &mut DenseMatrix {
        let shape = (self.axes[rows].entries.len(), self.axes[cols].entries.len());
        self.set_matrix(
            rows,
            cols,
            name,
            MatrixData::Dense(DenseMatrix::with_capacity(kind, shape.0, shape.1, major)),
        );
        let slot = self.matrix_slot(rows, cols, name);
        match Arc::get_mut(slot).expect("freshly allocated storage is unshared") {
            MatrixData::Dense(matrix) => matrix,
            MatrixData::Sparse(_) => unreachable!("allocated dense just before"),
        }
    }

    fn empty_sparse_matrix(
        &mut self,
        rows: &str,
        cols: &str,
        name: &str,
        kind: ValueType,
        nnz: usize,
        _index_kind: ValueType,
    ) -> &mut SparseMatrix {
        let shape = (self.axes[rows].entries.len(), self.axes[cols].entries.len());
        self.set_matrix(
            rows,
            cols,
            name,
            MatrixData::Sparse(SparseMatrix::with_capacity(kind, shape.0, shape.1, nnz)),
        );
        let slot = self.matrix_slot(rows, cols, name);
        match Arc::get_mut(slot).expect("freshly allocated storage is unshared") {
            MatrixData::Sparse(matrix) => matrix,
            MatrixData::Dense(_) => unreachable!("allocated sparse just before"),
        }
    }

    fn delete_matrix(&mut self, rows: &str, cols: &str, name: &str) {
        if let Some(properties) = self
            .matrices
            .get_mut(rows)
            .and_then(|columns| columns.get_mut(cols))
        {
            properties.remove(name);
        }
    }

    fn matrix_names(&self, rows: &str, cols: &str) -> Vec<String> {
        self.matrices[rows][cols].keys().cloned().collect()
    }

    fn get_matrix(&self, rows: &str, cols: &str, name: &str) -> Arc<MatrixData> {
        Arc::clone(&self.matrices[rows][cols][name])
    }
}
