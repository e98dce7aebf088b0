use std::sync::Arc;

use tracing::trace;

use crate::error::{QueryError, QueryResult};
use crate::ir::Value;
use crate::projection::{
    CompiledPlan, Materialized, NestedExecutor, ObjectFactory, ProjectionEnv, ProjectionValues,
};

use super::context::RowReader;

/// Lazily projects the rows of an open reader.
///
/// The reader is closed when the rows run out, when reading or projecting
/// a row fails, or when the enumerator is dropped early, whichever comes
/// first.
pub struct RowEnumerator<'a> {
    reader: Option<Box<dyn RowReader>>,
    plan: Arc<CompiledPlan>,
    values: ProjectionValues,
    arguments: Vec<Value>,
    factory: &'a dyn ObjectFactory,
    nested: &'a dyn NestedExecutor,
}

impl<'a> RowEnumerator<'a> {
    pub(crate) fn new(
        reader: Box<dyn RowReader>,
        plan: Arc<CompiledPlan>,
        values: ProjectionValues,
        arguments: Vec<Value>,
        factory: &'a dyn ObjectFactory,
        nested: &'a dyn NestedExecutor,
    ) -> Self {
        Self {
            reader: Some(reader),
            plan,
            values,
            arguments,
            factory,
            nested,
        }
    }

    pub fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    pub fn close(&mut self) {
        if let Some(mut reader) = self.reader.take() {
            reader.close();
            trace!("reader closed");
        }
    }
}

impl Iterator for RowEnumerator<'_> {
    type Item = QueryResult<Materialized>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = match self.reader.as_mut()?.next_row() {
            Ok(Some(row)) => row,
            Ok(None) => {
                self.close();
                return None;
            }
            Err(err) => {
                self.close();
                return Some(Err(QueryError::Execution(err)));
            }
        };
        let env = ProjectionEnv {
            arguments: &self.arguments,
            values: &self.values,
            factory: self.factory,
            nested: self.nested,
        };
        let projected = self.plan.projector.project(&row, &env);
        if projected.is_err() {
            self.close();
        }
        Some(projected)
    }
}

impl Drop for RowEnumerator<'_> {
    fn drop(&mut self) {
        self.close();
    }
}
