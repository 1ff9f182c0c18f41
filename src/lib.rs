//! axial - a generic, multi-backend axis-indexed data repository.
//!
//! Scalars, 1-D vectors and 2-D matrices are organized along user-defined
//! named axes, with explicit control over matrix layout and sparsity, and a
//! textual query language that slices, filters, chains and reduces the
//! stored data.

pub mod errors;
pub mod layout;
pub mod messages;
pub mod ops;
pub mod query;
pub mod storage;
pub mod types;

pub use errors::{AxialError, AxialResult, ErrorKind};
pub use layout::{
    inefficient_action_policy, major_axis, minor_axis, other_axis, relayout,
    set_inefficient_action_policy, AxisSide, InefficientActionPolicy,
};
pub use messages::{present, present_matrix, present_vector, unique_name};
pub use query::{Answer, Query, QueryResult};
pub use storage::{Format, MemoryFormat, ReadOnlyRepository, Repository};
pub use types::{
    is_storage_matrix, DenseMatrix, MatrixData, MatrixLayout, ScalarValue, SparseMatrix,
    SparseVector, ValueType, VectorData,
};
