//! The typed key-space of storable values: element kinds, scalars, dense and
//! sparse vectors, and matrices with explicit layouts.

#[macro_use]
pub mod macros;

pub mod matrix;
pub mod scalar;
pub mod value_type;
pub mod vector;

pub use matrix::{is_storage_matrix, DenseMatrix, MatrixData, MatrixLayout, SparseMatrix};
pub use scalar::ScalarValue;
pub use value_type::ValueType;
pub use vector::{SparseVector, VectorData};
