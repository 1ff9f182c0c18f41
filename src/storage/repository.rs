//! The validated public API over a storage backend.
//!
//! The repository owns one [`Format`] instance by composition and never
//! exposes it. Every entry point validates existence, shape and kind before
//! delegating to the backend's primitives, guards the reserved `name`
//! property and the frozen flag, and maintains the derived-data caches.
//!
//! A `parking_lot` reader/writer lock makes each repository safe for
//! many-reader, single-writer access; returned arrays are `Arc`-shared
//! snapshots, so long-lived views stay valid across later mutations.
//! Freezing the repository is the supported way to hold views immutable
//! across calls.

use super::format::{Format, VectorForm};
use super::memory::MemoryFormat;
use crate::errors::{AxialError, AxialResult};
use crate::layout::{relayout, AxisSide};
use crate::messages::present;
use crate::query::ast::Query;
use crate::query::eval::{evaluate, QueryResult};
use crate::types::{
    is_storage_matrix, DenseMatrix, MatrixData, ScalarValue, SparseMatrix, SparseVector,
    ValueType, VectorData,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// The reserved property name: it aliases the repository's own name when
/// read as a scalar, and the axis entry names when read as a vector.
pub const RESERVED_NAME: &str = "name";

/// A vector write: a full dense or sparse array, or a scalar broadcast to
/// the axis length.
pub enum VectorWrite {
    Dense(VectorData),
    Sparse(SparseVector),
    Broadcast(ScalarValue),
}

impl From<VectorData> for VectorWrite {
    fn from(values: VectorData) -> Self {
        VectorWrite::Dense(values)
    }
}

impl From<SparseVector> for VectorWrite {
    fn from(values: SparseVector) -> Self {
        VectorWrite::Sparse(values)
    }
}

impl From<ScalarValue> for VectorWrite {
    fn from(value: ScalarValue) -> Self {
        VectorWrite::Broadcast(value)
    }
}

impl<T> From<Vec<T>> for VectorWrite
where
    VectorData: From<Vec<T>>,
{
    fn from(values: Vec<T>) -> Self {
        VectorWrite::Dense(VectorData::from(values))
    }
}

/// A matrix write: a full storage matrix, or a scalar broadcast to the
/// axes' shape.
pub enum MatrixWrite {
    Full(MatrixData),
    Broadcast(ScalarValue),
}

impl From<MatrixData> for MatrixWrite {
    fn from(matrix: MatrixData) -> Self {
        MatrixWrite::Full(matrix)
    }
}

impl From<DenseMatrix> for MatrixWrite {
    fn from(matrix: DenseMatrix) -> Self {
        MatrixWrite::Full(MatrixData::Dense(matrix))
    }
}

impl From<SparseMatrix> for MatrixWrite {
    fn from(matrix: SparseMatrix) -> Self {
        MatrixWrite::Full(MatrixData::Sparse(matrix))
    }
}

impl From<ScalarValue> for MatrixWrite {
    fn from(value: ScalarValue) -> Self {
        MatrixWrite::Broadcast(value)
    }
}

#[derive(Default)]
struct RepositoryCaches {
    /// (rows axis, columns axis, property, target major) -> re-layout.
    relayouts: HashMap<(String, String, String, AxisSide), Arc<MatrixData>>,
    /// (rows axis, columns axis, property) -> transposed view of the
    /// opposite stored orientation.
    transposes: HashMap<(String, String, String), Arc<MatrixData>>,
    /// (axis, property) -> dense materialization of a stored vector.
    dense_vectors: HashMap<(String, String), Arc<VectorData>>,
    /// canonical query string -> result.
    queries: HashMap<String, Arc<QueryResult>>,
}

impl RepositoryCaches {
    fn clear(&mut self) {
        self.relayouts.clear();
        self.transposes.clear();
        self.dense_vectors.clear();
        self.queries.clear();
    }

    fn invalidate_vector(&mut self, axis: &str, name: &str) {
        self.dense_vectors
            .remove(&(axis.to_string(), name.to_string()));
        self.queries.clear();
    }

    fn invalidate_matrix(&mut self, rows: &str, cols: &str, name: &str) {
        for major in [AxisSide::Rows, AxisSide::Columns] {
            self.relayouts
                .remove(&(rows.to_string(), cols.to_string(), name.to_string(), major));
            self.relayouts
                .remove(&(cols.to_string(), rows.to_string(), name.to_string(), major));
        }
        self.transposes
            .remove(&(rows.to_string(), cols.to_string(), name.to_string()));
        self.transposes
            .remove(&(cols.to_string(), rows.to_string(), name.to_string()));
        self.queries.clear();
    }
}

struct RepositoryState {
    format: Box<dyn Format>,
    frozen: bool,
    caches: RepositoryCaches,
}

impl RepositoryState {
    fn contextualize(&self, error: AxialError) -> AxialError {
        error.for_context("repository", self.format.name())
    }

    fn require_unfrozen(&self, action: &str) -> AxialResult<()> {
        if self.frozen {
            Err(self.contextualize(AxialError::frozen(format!(
                "forbidden {} in the frozen repository",
                action
            ))))
        } else {
            Ok(())
        }
    }

    fn require_unreserved(&self, what: &str, name: &str) -> AxialResult<()> {
        if name == RESERVED_NAME {
            Err(self.contextualize(AxialError::reserved_name(format!(
                "reserved {} property: {}",
                what, RESERVED_NAME
            ))))
        } else {
            Ok(())
        }
    }

    fn require_axis(&self, axis: &str) -> AxialResult<()> {
        if self.format.has_axis(axis) {
            Ok(())
        } else {
            Err(self.contextualize(AxialError::not_found(format!("missing axis: {}", axis))))
        }
    }

    fn require_vector(&self, axis: &str, name: &str) -> AxialResult<()> {
        self.require_axis(axis)?;
        if self.format.has_vector(axis, name) {
            Ok(())
        } else {
            Err(self.contextualize(
                AxialError::not_found(format!("missing vector property: {}", name))
                    .for_context("axis", axis),
            ))
        }
    }

    fn require_fresh_vector(&self, axis: &str, name: &str) -> AxialResult<()> {
        self.require_axis(axis)?;
        self.require_unreserved("vector", name)?;
        if self.format.has_vector(axis, name) {
            Err(self.contextualize(
                AxialError::already_exists(format!("existing vector property: {}", name))
                    .for_context("axis", axis),
            ))
        } else {
            Ok(())
        }
    }

    fn require_fresh_matrix(&self, rows: &str, cols: &str, name: &str) -> AxialResult<()> {
        self.require_axis(rows)?;
        self.require_axis(cols)?;
        self.require_unreserved("matrix", name)?;
        if self.format.has_matrix(rows, cols, name) {
            Err(self.contextualize(
                AxialError::already_exists(format!("existing matrix property: {}", name))
                    .for_context("axes", format!("{} and {}", rows, cols)),
            ))
        } else {
            Ok(())
        }
    }

    /// A matrix stored under the opposite orientation must be the transpose
    /// of what is being written.
    fn require_transpose_consistency(
        &self,
        rows: &str,
        cols: &str,
        name: &str,
        matrix: &MatrixData,
    ) -> AxialResult<()> {
        if !self.format.has_matrix(cols, rows, name) {
            return Ok(());
        }
        let other = self.format.get_matrix(cols, rows, name);
        if other.transposed().elementwise_equals(matrix) {
            Ok(())
        } else {
            Err(self.contextualize(
                AxialError::shape_mismatch(format!(
                    "the {} matrix stored for the axes: {} and {} is not the transpose of the new one",
                    name, cols, rows
                )),
            ))
        }
    }
}

/// An axis-indexed data repository over some storage backend.
pub struct Repository {
    state: RwLock<RepositoryState>,
}

impl Repository {
    pub fn new(format: Box<dyn Format>) -> Repository {
        Repository {
            state: RwLock::new(RepositoryState {
                format,
                frozen: false,
                caches: RepositoryCaches::default(),
            }),
        }
    }

    /// A fresh repository over the in-process memory backend.
    pub fn memory(name: impl Into<String>) -> Repository {
        Repository::new(Box::new(MemoryFormat::new(name)))
    }

    pub fn name(&self) -> String {
        self.state.read().format.name().to_string()
    }

    /// A wrapper exposing only the read API.
    pub fn read_only(&self) -> ReadOnlyRepository<'_> {
        ReadOnlyRepository { repository: self }
    }

    pub fn is_frozen(&self) -> bool {
        self.state.read().frozen
    }

    /// Rejects every subsequent mutation until [`Repository::unfreeze`].
    pub fn freeze(&self) {
        self.state.write().frozen = true;
    }

    pub fn unfreeze(&self) {
        self.state.write().frozen = false;
    }

    // ----- scalars ------------------------------------------------------

    pub fn has_scalar(&self, name: &str) -> bool {
        name == RESERVED_NAME || self.state.read().format.has_scalar(name)
    }

    pub fn set_scalar(&self, name: &str, value: impl Into<ScalarValue>) -> AxialResult<()> {
        let mut state = self.state.write();
        state.require_unfrozen("scalar write")?;
        state.require_unreserved("scalar", name)?;
        if state.format.has_scalar(name) {
            return Err(
                state.contextualize(AxialError::already_exists(format!("existing scalar: {}", name)))
            );
        }
        state.format.set_scalar(name, value.into());
        state.caches.queries.clear();
        Ok(())
    }

    pub fn get_scalar(&self, name: &str) -> AxialResult<ScalarValue> {
        let state = self.state.read();
        if name == RESERVED_NAME {
            return Ok(ScalarValue::Str(state.format.name().to_string()));
        }
        if !state.format.has_scalar(name) {
            return Err(
                state.contextualize(AxialError::not_found(format!("missing scalar: {}", name)))
            );
        }
        Ok(state.format.get_scalar(name))
    }

    pub fn delete_scalar(&self, name: &str) -> AxialResult<()> {
        let mut state = self.state.write();
        state.require_unfrozen("scalar deletion")?;
        state.require_unreserved("scalar", name)?;
        if !state.format.has_scalar(name) {
            return Err(
                state.contextualize(AxialError::not_found(format!("missing scalar: {}", name)))
            );
        }
        state.format.delete_scalar(name);
        state.caches.queries.clear();
        Ok(())
    }

    pub fn scalar_names(&self) -> Vec<String> {
        let mut names = self.state.read().format.scalar_names();
        names.sort();
        names
    }

    // ----- axes ---------------------------------------------------------

    pub fn has_axis(&self, axis: &str) -> bool {
        self.state.read().format.has_axis(axis)
    }

    pub fn add_axis<I, S>(&self, axis: &str, entries: I) -> AxialResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries: Vec<String> = entries.into_iter().map(Into::into).collect();
        let mut state = self.state.write();
        state.require_unfrozen("axis creation")?;
        if state.format.has_axis(axis) {
            return Err(
                state.contextualize(AxialError::already_exists(format!("existing axis: {}", axis)))
            );
        }
        let mut seen = std::collections::HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.as_str()) {
                return Err(state.contextualize(
                    AxialError::already_exists(format!("duplicate entry: {}", entry))
                        .for_context("axis", axis),
                ));
            }
        }
        state.format.add_axis(axis, entries);
        state.caches.queries.clear();
        Ok(())
    }

    pub fn get_axis(&self, axis: &str) -> AxialResult<Arc<Vec<String>>> {
        let state = self.state.read();
        state.require_axis(axis)?;
        Ok(state.format.axis_entries(axis))
    }

    pub fn axis_length(&self, axis: &str) -> AxialResult<usize> {
        let state = self.state.read();
        state.require_axis(axis)?;
        Ok(state.format.axis_length(axis))
    }

    /// The position of an entry in an axis.
    pub fn entry_index(&self, axis: &str, entry: &str) -> AxialResult<usize> {
        let state = self.state.read();
        state.require_axis(axis)?;
        state.format.axis_entry_index(axis, entry).ok_or_else(|| {
            state.contextualize(
                AxialError::not_found(format!("missing entry: {}", entry))
                    .for_context("axis", axis),
            )
        })
    }

    /// Deletes an axis and cascades to every vector and matrix indexed by
    /// it.
    pub fn delete_axis(&self, axis: &str) -> AxialResult<()> {
        let mut state = self.state.write();
        state.require_unfrozen("axis deletion")?;
        state.require_axis(axis)?;
        state.format.delete_axis(axis);
        state.caches.clear();
        Ok(())
    }

    pub fn axis_names(&self) -> Vec<String> {
        let mut names = self.state.read().format.axis_names();
        names.sort();
        names
    }

    // ----- vectors ------------------------------------------------------

    pub fn has_vector(&self, axis: &str, name: &str) -> bool {
        let state = self.state.read();
        if !state.format.has_axis(axis) {
            return false;
        }
        name == RESERVED_NAME || state.format.has_vector(axis, name)
    }

    pub fn set_vector(
        &self,
        axis: &str,
        name: &str,
        data: impl Into<VectorWrite>,
    ) -> AxialResult<()> {
        let data = data.into();
        let mut state = self.state.write();
        state.require_unfrozen("vector write")?;
        state.require_fresh_vector(axis, name)?;
        let length = state.format.axis_length(axis);
        let form = match data {
            VectorWrite::Dense(values) => {
                if values.len() != length {
                    return Err(state.contextualize(
                        AxialError::shape_mismatch(format!(
                            "vector of {} entries for an axis of {}",
                            values.len(),
                            length
                        ))
                        .for_context("axis", axis),
                    ));
                }
                VectorForm::Dense(values)
            }
            VectorWrite::Sparse(values) => {
                if values.len() != length {
                    return Err(state.contextualize(
                        AxialError::shape_mismatch(format!(
                            "vector of {} entries for an axis of {}",
                            values.len(),
                            length
                        ))
                        .for_context("axis", axis),
                    ));
                }
                VectorForm::Sparse(values)
            }
            VectorWrite::Broadcast(value) => {
                VectorForm::Dense(VectorData::broadcast(&value, length))
            }
        };
        state.format.set_vector(axis, name, form);
        state.caches.invalidate_vector(axis, name);
        Ok(())
    }

    /// The dense view of a vector property. The reserved `name` property
    /// reads as the axis entry names.
    pub fn get_vector(&self, axis: &str, name: &str) -> AxialResult<Arc<VectorData>> {
        let key = (axis.to_string(), name.to_string());
        {
            let state = self.state.read();
            state.require_axis(axis)?;
            if let Some(hit) = state.caches.dense_vectors.get(&key) {
                return Ok(Arc::clone(hit));
            }
            if name != RESERVED_NAME && !state.format.has_vector(axis, name) {
                return Err(state.contextualize(
                    AxialError::not_found(format!("missing vector property: {}", name))
                        .for_context("axis", axis),
                ));
            }
        }
        let mut state = self.state.write();
        if let Some(hit) = state.caches.dense_vectors.get(&key) {
            return Ok(Arc::clone(hit));
        }
        let dense = if name == RESERVED_NAME {
            VectorData::Str(state.format.axis_entries(axis).as_ref().clone())
        } else {
            state.format.get_vector(axis, name).to_dense()
        };
        let dense = Arc::new(dense);
        state.caches.dense_vectors.insert(key, Arc::clone(&dense));
        Ok(dense)
    }

    pub fn delete_vector(&self, axis: &str, name: &str) -> AxialResult<()> {
        let mut state = self.state.write();
        state.require_unfrozen("vector deletion")?;
        state.require_unreserved("vector", name)?;
        state.require_vector(axis, name)?;
        state.format.delete_vector(axis, name);
        state.caches.invalidate_vector(axis, name);
        Ok(())
    }

    pub fn vector_names(&self, axis: &str) -> AxialResult<Vec<String>> {
        let state = self.state.read();
        state.require_axis(axis)?;
        let mut names = state.format.vector_names(axis);
        names.sort();
        Ok(names)
    }

    /// Allocates a zero-initialized dense vector and hands it to `fill` for
    /// population. The closure must not touch the repository.
    pub fn empty_dense_vector(
        &self,
        axis: &str,
        name: &str,
        kind: ValueType,
        fill: impl FnOnce(&mut VectorData) -> AxialResult<()>,
    ) -> AxialResult<()> {
        let mut state = self.state.write();
        state.require_unfrozen("vector write")?;
        state.require_fresh_vector(axis, name)?;
        let values = state.format.empty_dense_vector(axis, name, kind);
        if let Err(error) = fill(values) {
            state.format.delete_vector(axis, name);
            return Err(state.contextualize(error.for_context("axis", axis)));
        }
        state.caches.invalidate_vector(axis, name);
        Ok(())
    }

    /// Allocates zeroed sparse storage for `nnz` entries and hands it to
    /// `fill` for population. The closure must not touch the repository.
    pub fn empty_sparse_vector(
        &self,
        axis: &str,
        name: &str,
        kind: ValueType,
        nnz: usize,
        index_kind: ValueType,
        fill: impl FnOnce(&mut SparseVector) -> AxialResult<()>,
    ) -> AxialResult<()> {
        let mut state = self.state.write();
        state.require_unfrozen("vector write")?;
        state.require_fresh_vector(axis, name)?;
        require_index_kind(&state, index_kind)?;
        let values = state
            .format
            .empty_sparse_vector(axis, name, kind, nnz, index_kind);
        let filled = fill(&mut *values).and_then(|()| {
            let length = values.len();
            match values.indices().iter().find(|index| **index >= length) {
                Some(index) => Err(AxialError::shape_mismatch(format!(
                    "sparse index {} is out of range for an axis of {}",
                    index, length
                ))),
                None => Ok(()),
            }
        });
        if let Err(error) = filled {
            state.format.delete_vector(axis, name);
            return Err(state.contextualize(error.for_context("axis", axis)));
        }
        state.caches.invalidate_vector(axis, name);
        Ok(())
    }

    // ----- matrices -----------------------------------------------------

    pub fn has_matrix(&self, rows: &str, cols: &str, name: &str) -> bool {
        let state = self.state.read();
        if !state.format.has_axis(rows) || !state.format.has_axis(cols) {
            return false;
        }
        state.format.has_matrix(rows, cols, name) || state.format.has_matrix(cols, rows, name)
    }

    pub fn set_matrix(
        &self,
        rows: &str,
        cols: &str,
        name: &str,
        data: impl Into<MatrixWrite>,
    ) -> AxialResult<()> {
        let data = data.into();
        let mut state = self.state.write();
        state.require_unfrozen("matrix write")?;
        state.require_fresh_matrix(rows, cols, name)?;
        let shape = (
            state.format.axis_length(rows),
            state.format.axis_length(cols),
        );
        let matrix = match data {
            MatrixWrite::Full(matrix) => {
                if matrix.shape() != shape {
                    return Err(state.contextualize(
                        AxialError::shape_mismatch(format!(
                            "matrix of shape {} x {} for axes of {} and {}",
                            matrix.rows(),
                            matrix.cols(),
                            shape.0,
                            shape.1
                        ))
                        .for_context("axes", format!("{} and {}", rows, cols)),
                    ));
                }
                if !is_storage_matrix(&matrix) {
                    return Err(state.contextualize(AxialError::type_mismatch(format!(
                        "not a storage matrix layout: {}",
                        matrix.layout()
                    ))));
                }
                matrix
            }
            MatrixWrite::Broadcast(value) => MatrixData::Dense(
                DenseMatrix::new(
                    VectorData::broadcast(&value, shape.0 * shape.1),
                    shape.0,
                    shape.1,
                    AxisSide::Rows,
                )
                .map_err(|error| state.contextualize(error))?,
            ),
        };
        state.require_transpose_consistency(rows, cols, name, &matrix)?;
        state.format.set_matrix(rows, cols, name, matrix);
        state.caches.invalidate_matrix(rows, cols, name);
        Ok(())
    }

    /// A matrix property in the requested orientation.
    ///
    /// When only the opposite orientation is stored, a transposed view is
    /// derived on demand (and cached); its layout is the flip of the stored
    /// one, so a compressed-by-column matrix reads back compressed-by-row.
    pub fn get_matrix(&self, rows: &str, cols: &str, name: &str) -> AxialResult<Arc<MatrixData>> {
        let key = (rows.to_string(), cols.to_string(), name.to_string());
        {
            let state = self.state.read();
            state.require_axis(rows)?;
            state.require_axis(cols)?;
            if state.format.has_matrix(rows, cols, name) {
                return Ok(state.format.get_matrix(rows, cols, name));
            }
            if let Some(hit) = state.caches.transposes.get(&key) {
                return Ok(Arc::clone(hit));
            }
            if !state.format.has_matrix(cols, rows, name) {
                return Err(state.contextualize(
                    AxialError::not_found(format!("missing matrix property: {}", name))
                        .for_context("axes", format!("{} and {}", rows, cols)),
                ));
            }
        }
        let mut state = self.state.write();
        if let Some(hit) = state.caches.transposes.get(&key) {
            return Ok(Arc::clone(hit));
        }
        let derived = Arc::new(state.format.get_matrix(cols, rows, name).transposed());
        state.caches.transposes.insert(key, Arc::clone(&derived));
        Ok(derived)
    }

    /// The matrix re-laid so its major axis is `major`, from the derived
    /// cache when possible.
    pub fn relayout_matrix(
        &self,
        rows: &str,
        cols: &str,
        name: &str,
        major: AxisSide,
    ) -> AxialResult<Arc<MatrixData>> {
        let base = self.get_matrix(rows, cols, name)?;
        if base.major_axis() == major {
            return Ok(base);
        }
        let key = (rows.to_string(), cols.to_string(), name.to_string(), major);
        {
            let state = self.state.read();
            if let Some(hit) = state.caches.relayouts.get(&key) {
                return Ok(Arc::clone(hit));
            }
        }
        let relaid = Arc::new(relayout(&base, major));
        let mut state = self.state.write();
        state.caches.relayouts.insert(key, Arc::clone(&relaid));
        Ok(relaid)
    }

    /// Deletes every stored orientation of a matrix property.
    pub fn delete_matrix(&self, rows: &str, cols: &str, name: &str) -> AxialResult<()> {
        let mut state = self.state.write();
        state.require_unfrozen("matrix deletion")?;
        state.require_axis(rows)?;
        state.require_axis(cols)?;
        let stored = state.format.has_matrix(rows, cols, name);
        let flipped = state.format.has_matrix(cols, rows, name);
        if !stored && !flipped {
            return Err(state.contextualize(
                AxialError::not_found(format!("missing matrix property: {}", name))
                    .for_context("axes", format!("{} and {}", rows, cols)),
            ));
        }
        if stored {
            state.format.delete_matrix(rows, cols, name);
        }
        if flipped {
            state.format.delete_matrix(cols, rows, name);
        }
        state.caches.invalidate_matrix(rows, cols, name);
        Ok(())
    }

    /// Matrix property names for an axis pair, in either orientation.
    pub fn matrix_names(&self, rows: &str, cols: &str) -> AxialResult<Vec<String>> {
        let state = self.state.read();
        state.require_axis(rows)?;
        state.require_axis(cols)?;
        let mut names = state.format.matrix_names(rows, cols);
        names.extend(state.format.matrix_names(cols, rows));
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Allocates a zero-initialized dense matrix and hands it to `fill` for
    /// population. The closure must not touch the repository.
    pub fn empty_dense_matrix(
        &self,
        rows: &str,
        cols: &str,
        name: &str,
        kind: ValueType,
        major: AxisSide,
        fill: impl FnOnce(&mut DenseMatrix) -> AxialResult<()>,
    ) -> AxialResult<()> {
        let mut state = self.state.write();
        state.require_unfrozen("matrix write")?;
        state.require_fresh_matrix(rows, cols, name)?;
        let matrix = state.format.empty_dense_matrix(rows, cols, name, kind, major);
        if let Err(error) = fill(matrix) {
            state.format.delete_matrix(rows, cols, name);
            return Err(state.contextualize(error));
        }
        state.caches.invalidate_matrix(rows, cols, name);
        Ok(())
    }

    /// Allocates zeroed compressed-by-column storage for `nnz` entries and
    /// hands it to `fill` for population. The closure must not touch the
    /// repository.
    pub fn empty_sparse_matrix(
        &self,
        rows: &str,
        cols: &str,
        name: &str,
        kind: ValueType,
        nnz: usize,
        index_kind: ValueType,
        fill: impl FnOnce(&mut SparseMatrix) -> AxialResult<()>,
    ) -> AxialResult<()> {
        let mut state = self.state.write();
        state.require_unfrozen("matrix write")?;
        state.require_fresh_matrix(rows, cols, name)?;
        require_index_kind(&state, index_kind)?;
        let matrix = state
            .format
            .empty_sparse_matrix(rows, cols, name, kind, nnz, index_kind);
        let filled = fill(&mut *matrix).and_then(|()| validate_compressed(matrix));
        if let Err(error) = filled {
            state.format.delete_matrix(rows, cols, name);
            return Err(state.contextualize(error));
        }
        state.caches.invalidate_matrix(rows, cols, name);
        Ok(())
    }

    // ----- queries ------------------------------------------------------

    /// Parses and evaluates query text, caching by canonical form.
    pub fn query(&self, text: &str) -> AxialResult<Arc<QueryResult>> {
        let node = Query::parse(text)?;
        self.query_node(&node)
    }

    /// Evaluates an already-parsed query, caching by canonical form.
    pub fn query_node(&self, node: &Query) -> AxialResult<Arc<QueryResult>> {
        let key = node.canonical();
        {
            let state = self.state.read();
            if let Some(hit) = state.caches.queries.get(&key) {
                return Ok(Arc::clone(hit));
            }
        }
        let result = evaluate(self, node)
            .map_err(|error| error.for_context("query", &key).for_context("repository", self.name()))?;
        let result = Arc::new(result);
        self.state.write().caches.queries.insert(key, Arc::clone(&result));
        Ok(result)
    }

    // ----- description --------------------------------------------------

    /// A deterministic dump of the repository's shape, for logs and tests.
    pub fn description(&self) -> String {
        let state = self.state.read();
        let mut out = format!("repository: {}\n", state.format.name());
        let mut axes = state.format.axis_names();
        axes.sort();
        if !axes.is_empty() {
            out.push_str("axes:\n");
            for axis in &axes {
                out.push_str(&format!(
                    "  {}: {} entries\n",
                    axis,
                    state.format.axis_length(axis)
                ));
            }
        }
        let mut scalars = state.format.scalar_names();
        scalars.sort();
        if !scalars.is_empty() {
            out.push_str("scalars:\n");
            for name in &scalars {
                out.push_str(&format!(
                    "  {}: {}\n",
                    name,
                    present(&state.format.get_scalar(name))
                ));
            }
        }
        let mut vector_lines = Vec::new();
        for axis in &axes {
            let mut names = state.format.vector_names(axis);
            names.sort();
            if names.is_empty() {
                continue;
            }
            vector_lines.push(format!("  {}:\n", axis));
            for name in &names {
                let form = state.format.get_vector(axis, name);
                let sparse = match form.as_ref() {
                    VectorForm::Sparse(_) => " (sparse)",
                    VectorForm::Dense(_) => "",
                };
                vector_lines.push(format!(
                    "    {}: {} x {}{}\n",
                    name,
                    form.len(),
                    form.kind(),
                    sparse
                ));
            }
        }
        if !vector_lines.is_empty() {
            out.push_str("vectors:\n");
            for line in vector_lines {
                out.push_str(&line);
            }
        }
        let mut matrix_lines = Vec::new();
        for rows in &axes {
            for cols in &axes {
                let mut names = state.format.matrix_names(rows, cols);
                names.sort();
                if names.is_empty() {
                    continue;
                }
                matrix_lines.push(format!("  {} , {}:\n", rows, cols));
                for name in &names {
                    let matrix = state.format.get_matrix(rows, cols, name);
                    matrix_lines.push(format!(
                        "    {}: {}\n",
                        name,
                        crate::messages::present_matrix(&matrix)
                    ));
                }
            }
        }
        if !matrix_lines.is_empty() {
            out.push_str("matrices:\n");
            for line in matrix_lines {
                out.push_str(&line);
            }
        }
        out
    }
}

fn require_index_kind(state: &RepositoryState, index_kind: ValueType) -> AxialResult<()> {
    if index_kind.is_unsigned() {
        Ok(())
    } else {
        Err(state.contextualize(AxialError::invalid_parameter(format!(
            "sparse index kind must be an unsigned integer, got: {}",
            index_kind
        ))))
    }
}

fn validate_compressed(matrix: &SparseMatrix) -> AxialResult<()> {
    let offsets = matrix.offsets();
    if offsets.windows(2).any(|pair| pair[0] > pair[1]) {
        return Err(AxialError::shape_mismatch(
            "compressed matrix offsets are not monotonic",
        ));
    }
    if offsets.last().copied().unwrap_or(0) != matrix.nnz() {
        return Err(AxialError::shape_mismatch(format!(
            "compressed matrix final offset {} does not cover {} stored entries",
            offsets.last().copied().unwrap_or(0),
            matrix.nnz()
        )));
    }
    let minor_len = matrix.minor_len();
    if let Some(index) = matrix.indices().iter().find(|index| **index >= minor_len) {
        return Err(AxialError::shape_mismatch(format!(
            "compressed matrix index {} is out of range for a minor length of {}",
            index, minor_len
        )));
    }
    Ok(())
}

/// A read-only view of a repository: the mutating API is absent at the type
/// level.
pub struct ReadOnlyRepository<'a> {
    repository: &'a Repository,
}

impl ReadOnlyRepository<'_> {
    pub fn name(&self) -> String {
        self.repository.name()
    }

    pub fn description(&self) -> String {
        self.repository.description()
    }

    pub fn is_frozen(&self) -> bool {
        self.repository.is_frozen()
    }

    pub fn has_scalar(&self, name: &str) -> bool {
        self.repository.has_scalar(name)
    }

    pub fn get_scalar(&self, name: &str) -> AxialResult<ScalarValue> {
        self.repository.get_scalar(name)
    }

    pub fn scalar_names(&self) -> Vec<String> {
        self.repository.scalar_names()
    }

    pub fn has_axis(&self, axis: &str) -> bool {
        self.repository.has_axis(axis)
    }

    pub fn get_axis(&self, axis: &str) -> AxialResult<Arc<Vec<String>>> {
        self.repository.get_axis(axis)
    }

    pub fn axis_length(&self, axis: &str) -> AxialResult<usize> {
        self.repository.axis_length(axis)
    }

    pub fn axis_names(&self) -> Vec<String> {
        self.repository.axis_names()
    }

    pub fn has_vector(&self, axis: &str, name: &str) -> bool {
        self.repository.has_vector(axis, name)
    }

    pub fn get_vector(&self, axis: &str, name: &str) -> AxialResult<Arc<VectorData>> {
        self.repository.get_vector(axis, name)
    }

    pub fn vector_names(&self, axis: &str) -> AxialResult<Vec<String>> {
        self.repository.vector_names(axis)
    }

    pub fn has_matrix(&self, rows: &str, cols: &str, name: &str) -> bool {
        self.repository.has_matrix(rows, cols, name)
    }

    pub fn get_matrix(&self, rows: &str, cols: &str, name: &str) -> AxialResult<Arc<MatrixData>> {
        self.repository.get_matrix(rows, cols, name)
    }

    pub fn matrix_names(&self, rows: &str, cols: &str) -> AxialResult<Vec<String>> {
        self.repository.matrix_names(rows, cols)
    }

    pub fn query(&self, text: &str) -> AxialResult<Arc<QueryResult>> {
        self.repository.query(text)
    }

    pub fn query_node(&self, node: &Query) -> AxialResult<Arc<QueryResult>> {
        self.repository.query_node(node)
    }
}
