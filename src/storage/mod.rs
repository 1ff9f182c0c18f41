//! The format contract, the reference memory backend and the repository
//! facade.

pub mod format;
pub mod memory;
pub mod repository;

pub use format::{Format, VectorForm};
pub use memory::MemoryFormat;
pub use repository::{
    MatrixWrite, ReadOnlyRepository, Repository, VectorWrite, RESERVED_NAME,
};
