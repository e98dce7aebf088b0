pub mod cache;
pub mod config;
pub mod dialect;
pub mod error;
pub mod execution;
pub mod ir;
pub mod optimizer;
pub mod plugin;
pub mod projection;
pub mod sql;

pub use config::CompilerConfig;
pub use error::{CompileError, QueryError, QueryResult};
pub use execution::{BoundQuery, QueryProvider};
