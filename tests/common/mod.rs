#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use sqlweave::execution::{ExecutionContext, Row, RowReader};
use sqlweave::ir::*;
use sqlweave::sql::SqlCommand;

/// An execution context that serves canned rows and counts reader lifetimes.
#[derive(Default)]
pub struct ScriptedContext {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    /// Fail the read after this many rows.
    pub fail_after: Option<usize>,
    pub opened: AtomicUsize,
    pub closed: Arc<AtomicUsize>,
    pub commands: Mutex<Vec<SqlCommand>>,
}

impl ScriptedContext {
    pub fn new(columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
            ..Default::default()
        }
    }

    pub fn failing_after(mut self, rows: usize) -> Self {
        self.fail_after = Some(rows);
        self
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn last_command(&self) -> Option<SqlCommand> {
        self.commands.lock().last().cloned()
    }
}

struct ScriptedReader {
    columns: Arc<[String]>,
    rows: std::vec::IntoIter<Vec<Value>>,
    read: usize,
    fail_after: Option<usize>,
    closed: Arc<AtomicUsize>,
}

impl RowReader for ScriptedReader {
    fn next_row(&mut self) -> anyhow::Result<Option<Row>> {
        if self.fail_after == Some(self.read) {
            anyhow::bail!("connection reset");
        }
        self.read += 1;
        Ok(self
            .rows
            .next()
            .map(|values| Row::new(Arc::clone(&self.columns), values)))
    }

    fn close(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

impl ExecutionContext for ScriptedContext {
    fn execute_reader(&self, command: &SqlCommand) -> anyhow::Result<Box<dyn RowReader>> {
        self.commands.lock().push(command.clone());
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedReader {
            columns: Arc::from(self.columns.clone()),
            rows: self.rows.clone().into_iter(),
            read: 0,
            fail_after: self.fail_after,
            closed: Arc::clone(&self.closed),
        }))
    }

    fn execute_scalar(&self, command: &SqlCommand) -> anyhow::Result<Value> {
        self.commands.lock().push(command.clone());
        Ok(self
            .rows
            .first()
            .and_then(|row| row.first())
            .cloned()
            .unwrap_or(Value::Null))
    }

    fn execute_non_query(&self, command: &SqlCommand) -> anyhow::Result<u64> {
        self.commands.lock().push(command.clone());
        Ok(1)
    }
}

pub fn users() -> Node {
    Node::table("users", "t0")
}

pub fn column(name: &str, data_type: DataType) -> ColumnDeclaration {
    ColumnDeclaration::new(name, Node::column("t0", name, data_type))
}

/// `SELECT t0.id, t0.name FROM users t0 WHERE t0.age > {age}`
pub fn users_older_than(age: i32) -> Node {
    SelectNode::new(
        "s0",
        vec![column("id", DataType::Int64), column("name", DataType::Text)],
        Some(users()),
    )
    .with_where(Node::binary(
        BinaryOp::Gt,
        Node::column("t0", "age", DataType::Int32),
        Node::constant(age),
    ))
    .into()
}

/// `SELECT t0.id FROM users t0 WHERE t0.name = {name}`
pub fn user_ids_named(name: &str) -> Node {
    SelectNode::new("s0", vec![column("id", DataType::Int64)], Some(users()))
        .with_where(Node::equal(
            Node::column("t0", "name", DataType::Text),
            Node::constant(name),
        ))
        .into()
}
