//! The query language: lexing, the operator-precedence expression tree, the
//! typed query ASTs and the evaluator.

pub mod ast;
pub mod eval;
pub mod tokens;

pub use ast::{
    AxisEntry, AxisFilter, AxisLookup, CompareOp, FilterOp, FilteredAxis, MatrixQuery,
    OperationCall, PropertyComparison, PropertyLookup, Query, ScalarQuery, ScalarSource,
    VectorQuery, VectorSource,
};
pub use eval::{evaluate, Answer, MatrixAnswer, QueryResult, VectorAnswer};
pub use tokens::{escape_query, unescape_query, Expression, OperatorInfo, Token, TokenKind};
