//! Database dialects.
//!
//! A [`SqlDialect`] answers every spelling question the formatter has:
//! identifier quoting, parameter markers, pagination, booleans, function
//! names, DDL types. Structural differences that can't be expressed as
//! spelling are handled by the dialect's [`Amender`]s, which rewrite the
//! IR before it is formatted.

pub mod amenders;
mod functions;
mod postgres;
mod sqlite;
mod sqlserver;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::CompileError;
use crate::ir::{AggregateKind, DataType, JoinKind, Node, SqlFunction, Value};

pub use amenders::Amender;
pub use functions::{default_function, FunctionInfo};
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;
pub use sqlserver::SqlServerDialect;

/// How `skip`/`take` are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitStyle {
    /// `LIMIT n OFFSET m`
    LimitOffset,
    /// `OFFSET m ROWS FETCH NEXT n ROWS ONLY`, `TOP (n)` without skip
    OffsetFetch,
    /// Skip rewritten to a `ROW_NUMBER()` filter by an amender, `TOP (n)` without skip
    RowNumber,
}

/// How boolean values live in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanStyle {
    /// Booleans are first-class: a boolean column can stand as a predicate.
    Native,
    /// Booleans are stored as bits and never usable as bare predicates.
    Bit,
}

/// Where the values of `InsertInto::returning` columns are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturningStyle {
    /// `... RETURNING "a", "b"`
    Returning,
    /// `... OUTPUT INSERTED."a" VALUES ...`
    Output,
}

pub trait SqlDialect: Send + Sync {
    fn name(&self) -> &'static str;

    /// Quote an identifier (table/column/alias name)
    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    /// Quote a string literal
    fn quote_string(&self, s: &str) -> String {
        format!("'{}'", s.replace('\'', "''"))
    }

    /// Marker for the parameter in slot `index` (zero-based).
    fn parameter_marker(&self, index: usize) -> String;

    fn limit_style(&self) -> LimitStyle {
        LimitStyle::LimitOffset
    }

    /// Row limit meaning "no limit", for dialects that can't write OFFSET alone.
    fn unbounded_limit(&self) -> Option<&'static str> {
        None
    }

    fn boolean_style(&self) -> BooleanStyle {
        BooleanStyle::Native
    }

    fn returning_style(&self) -> ReturningStyle {
        ReturningStyle::Returning
    }

    /// Spelling of a scalar function; `None` if the dialect can't express it.
    fn function(&self, function: &SqlFunction) -> Option<FunctionInfo> {
        default_function(function)
    }

    fn aggregate_name(&self, kind: AggregateKind) -> &'static str {
        match kind {
            AggregateKind::Count | AggregateKind::LongCount => "COUNT",
            AggregateKind::Sum => "SUM",
            AggregateKind::Min => "MIN",
            AggregateKind::Max => "MAX",
            AggregateKind::Average => "AVG",
        }
    }

    fn join_keyword(&self, kind: JoinKind) -> Option<&'static str> {
        match kind {
            JoinKind::Inner => Some("INNER JOIN"),
            JoinKind::Left => Some("LEFT JOIN"),
            JoinKind::Right => Some("RIGHT JOIN"),
            JoinKind::Full => Some("FULL JOIN"),
            JoinKind::Cross => Some("CROSS JOIN"),
            JoinKind::CrossApply => Some("CROSS JOIN LATERAL"),
            JoinKind::OuterApply => Some("LEFT JOIN LATERAL"),
        }
    }

    /// Trailing row-lock clause for `SELECT ... FOR UPDATE`.
    fn for_update_clause(&self) -> Option<&'static str> {
        Some("FOR UPDATE")
    }

    /// Column type in DDL.
    fn type_name(&self, data_type: &DataType) -> Result<String, CompileError>;

    /// Column constraint marking an identity column.
    fn auto_increment(&self) -> &'static str;

    fn supports_native_enums(&self) -> bool {
        false
    }

    fn supports_clustered_indexes(&self) -> bool {
        false
    }

    /// Statement prefix guarding a `CREATE TABLE` for dialects without
    /// `IF NOT EXISTS`; `None` means the clause is native.
    fn create_table_guard(&self, _table: &str) -> Option<String> {
        None
    }

    fn create_index_guard(&self, _table: &str, _index: &str) -> Option<String> {
        None
    }

    fn delete_prefix(&self, table: &str, alias: Option<&str>) -> String {
        match alias {
            Some(alias) => format!(
                "DELETE FROM {} AS {}",
                self.quote_ident(table),
                self.quote_ident(alias)
            ),
            None => format!("DELETE FROM {}", self.quote_ident(table)),
        }
    }

    fn emit_boolean(&self, value: bool) -> String {
        if value { "TRUE" } else { "FALSE" }.to_string()
    }

    fn emit_binary(&self, bytes: &[u8]) -> String {
        format!("X'{}'", hex(bytes))
    }

    /// A literal written straight into the command text (DDL defaults,
    /// index filters).
    fn literal(&self, value: &Value) -> Result<String, CompileError> {
        Ok(match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => self.emit_boolean(*b),
            Value::Int32(i) => i.to_string(),
            Value::Int64(i) => i.to_string(),
            Value::Double(d) => d.to_string(),
            Value::Decimal(d) => d.clone(),
            Value::Text(s) | Value::Guid(s) => self.quote_string(s),
            Value::DateTime(dt) => self.quote_string(&dt.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
            Value::Binary(bytes) => self.emit_binary(bytes),
            Value::List(_) => {
                return Err(CompileError::InvalidNode(
                    "a list literal can't be written inline".into(),
                ))
            }
        })
    }

    /// Late rewrites applied to every tree before formatting.
    fn amenders(&self) -> Vec<Arc<dyn Amender>>;
}

/// Run every amender of `dialect` over `node`, in order.
pub fn amend(dialect: &dyn SqlDialect, node: &Node) -> Node {
    dialect
        .amenders()
        .iter()
        .fold(node.clone(), |node, amender| amender.amend(&node))
}

pub(crate) fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}

/// The dialects shipped with the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    #[default]
    Postgres,
    Sqlite,
    SqlServer,
}

impl DialectKind {
    pub fn build(self, sql_server_offset_fetch: bool) -> Arc<dyn SqlDialect> {
        match self {
            DialectKind::Postgres => Arc::new(PostgresDialect),
            DialectKind::Sqlite => Arc::new(SqliteDialect),
            DialectKind::SqlServer => Arc::new(SqlServerDialect::new(sql_server_offset_fetch)),
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DialectKind::Postgres => "postgres",
            DialectKind::Sqlite => "sqlite",
            DialectKind::SqlServer => "sqlserver",
        };
        f.write_str(name)
    }
}

impl FromStr for DialectKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(DialectKind::Postgres),
            "sqlite" => Ok(DialectKind::Sqlite),
            "sqlserver" | "mssql" => Ok(DialectKind::SqlServer),
            other => anyhow::bail!("unknown dialect: {}", other),
        }
    }
}
