//! Error taxonomy.
//!
//! `CompileError` is always a binder or programmer defect. `QueryError`
//! adds the data-shape failures seen while enumerating results, and carries
//! execution-layer errors through untouched so an outer layer can classify
//! them.

use crate::ir::{NodeKind, SqlFunction};

#[derive(thiserror::Error, Debug)]
pub enum CompileError {
    #[error("unsupported node: {kind}")]
    UnsupportedNode { kind: NodeKind },
    #[error("function {function} is not supported by the {dialect} dialect")]
    UnsupportedFunction {
        function: SqlFunction,
        dialect: &'static str,
    },
    #[error("invalid node: {0}")]
    InvalidNode(String),
    #[error("projection references unknown column: {0}")]
    UnresolvedColumn(String),
    #[error("no value bound for placeholder {0}")]
    MissingPlaceholder(usize),
    #[error("no value bound for parameter {0}")]
    MissingParameter(String),
}

#[derive(thiserror::Error, Debug)]
pub enum QueryError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error("sequence contains no elements")]
    NoRows,
    #[error("sequence contains more than one element")]
    MultipleResults,
    #[error("projection failed: {0}")]
    Projection(String),
    /// An error raised by the execution context, passed through unmodified.
    #[error(transparent)]
    Execution(#[from] anyhow::Error),
}

pub type QueryResult<T> = Result<T, QueryError>;
