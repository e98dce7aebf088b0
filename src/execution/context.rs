use std::sync::Arc;

use anyhow::Result;

use crate::ir::Value;
use crate::sql::SqlCommand;

/// One result row: values by ordinal, with the column names the database
/// reported.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, ordinal: usize) -> Option<&Value> {
        self.values.get(ordinal)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        let ordinal = self.columns.iter().position(|c| c == name)?;
        self.values.get(ordinal)
    }
}

/// A forward-only cursor over the rows of one command.
pub trait RowReader: Send {
    fn next_row(&mut self) -> Result<Option<Row>>;

    /// Release the underlying cursor. Called exactly once.
    fn close(&mut self);
}

/// The database side, supplied by the caller.
///
/// Connections, transactions and command timeouts live behind this trait.
/// Errors are passed through to callers unchanged.
pub trait ExecutionContext: Send + Sync {
    fn execute_reader(&self, command: &SqlCommand) -> Result<Box<dyn RowReader>>;

    fn execute_scalar(&self, command: &SqlCommand) -> Result<Value>;

    /// Returns the number of affected rows.
    fn execute_non_query(&self, command: &SqlCommand) -> Result<u64>;
}
