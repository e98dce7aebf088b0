//! Query execution.
//!
//! [`QueryProvider`] takes a bound query from the binder to projected
//! objects. The database itself stays outside: commands are handed to an
//! [`ExecutionContext`] supplied by the caller.
//!
//! Execution is synchronous. There is no cancellation token; timeouts are
//! the execution context's business.

mod cardinality;
mod context;
mod enumerator;
mod persistence;
mod provider;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ir::{DataType, Node, Value};
use crate::projection::ProjectionExpr;

pub use cardinality::{default_if_empty, Cardinality};
pub use context::{ExecutionContext, Row, RowReader};
pub use enumerator::RowEnumerator;
pub use persistence::{InsertOutcome, PersistenceCommands, PersistenceOperation};
pub use provider::{PlanCache, PreparedQuery, QueryProvider};

/// A query as the binder hands it over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundQuery {
    pub root: Node,
    /// How to build a result from a row; rows come back as-is without one.
    #[serde(default)]
    pub projection: Option<ProjectionExpr>,
    #[serde(default)]
    pub element_type: DataType,
    /// Values of the `Parameter` nodes in `root`.
    #[serde(default)]
    pub parameters: HashMap<String, Value>,
    /// Values read by projection placeholders.
    #[serde(default)]
    pub arguments: Vec<Value>,
}

impl BoundQuery {
    pub fn new(root: Node) -> Self {
        Self {
            root,
            projection: None,
            element_type: DataType::Void,
            parameters: HashMap::new(),
            arguments: Vec::new(),
        }
    }

    pub fn with_projection(mut self, projection: ProjectionExpr, element_type: DataType) -> Self {
        self.projection = Some(projection);
        self.element_type = element_type;
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }
}
