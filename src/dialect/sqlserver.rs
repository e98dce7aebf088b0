use std::sync::Arc;

use crate::error::CompileError;
use crate::ir::{AggregateKind, DataType, JoinKind, SqlFunction};

use super::amenders::{
    AnsiNullUniqueIndex, BitBooleanNormalizer, ClusteredIndexNormalizer, EnumDefinitionRemoval,
    IdentityInsertBracketing, RowNumberPagination,
};
use super::{
    default_function, hex, Amender, BooleanStyle, FunctionInfo, LimitStyle, ReturningStyle,
    SqlDialect,
};

/// MS SQL Server dialect
///
/// Pagination with a skip is written as a `ROW_NUMBER()` filter unless
/// `offset_fetch` is set (SQL Server 2012 and later).
pub struct SqlServerDialect {
    offset_fetch: bool,
}

impl SqlServerDialect {
    pub fn new(offset_fetch: bool) -> Self {
        Self { offset_fetch }
    }
}

fn datepart(part: &'static str) -> FunctionInfo {
    FunctionInfo::call("DATEPART").with_affixes(format!("{}, ", part), "")
}

impl SqlDialect for SqlServerDialect {
    fn name(&self) -> &'static str {
        "sqlserver"
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("[{}]", ident.replace(']', "]]"))
    }

    fn quote_string(&self, s: &str) -> String {
        format!("N'{}'", s.replace('\'', "''"))
    }

    fn parameter_marker(&self, index: usize) -> String {
        format!("@p{}", index)
    }

    fn limit_style(&self) -> LimitStyle {
        if self.offset_fetch {
            LimitStyle::OffsetFetch
        } else {
            LimitStyle::RowNumber
        }
    }

    fn boolean_style(&self) -> BooleanStyle {
        BooleanStyle::Bit
    }

    fn returning_style(&self) -> ReturningStyle {
        ReturningStyle::Output
    }

    fn function(&self, function: &SqlFunction) -> Option<FunctionInfo> {
        match function {
            SqlFunction::Concat => Some(FunctionInfo::operator("+")),
            SqlFunction::Length => Some(FunctionInfo::call("LEN")),
            SqlFunction::Now => Some(FunctionInfo::call("GETDATE")),
            SqlFunction::Year => Some(datepart("year")),
            SqlFunction::Month => Some(datepart("month")),
            SqlFunction::Day => Some(datepart("day")),
            SqlFunction::StartsWith => {
                Some(FunctionInfo::operator("LIKE").with_affixes("(", " + '%')"))
            }
            SqlFunction::EndsWith => {
                Some(FunctionInfo::operator("LIKE").with_affixes("('%' + ", ")"))
            }
            SqlFunction::ContainsString => {
                Some(FunctionInfo::operator("LIKE").with_affixes("('%' + ", " + '%')"))
            }
            other => default_function(other),
        }
    }

    fn aggregate_name(&self, kind: AggregateKind) -> &'static str {
        match kind {
            AggregateKind::Count => "COUNT",
            AggregateKind::LongCount => "COUNT_BIG",
            AggregateKind::Sum => "SUM",
            AggregateKind::Min => "MIN",
            AggregateKind::Max => "MAX",
            AggregateKind::Average => "AVG",
        }
    }

    fn join_keyword(&self, kind: JoinKind) -> Option<&'static str> {
        Some(match kind {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL JOIN",
            JoinKind::Cross => "CROSS JOIN",
            JoinKind::CrossApply => "CROSS APPLY",
            JoinKind::OuterApply => "OUTER APPLY",
        })
    }

    fn for_update_clause(&self) -> Option<&'static str> {
        // row locks are table hints here, not a trailing clause
        None
    }

    fn type_name(&self, data_type: &DataType) -> Result<String, CompileError> {
        Ok(match data_type.underlying() {
            DataType::Boolean => "BIT",
            DataType::Int32 => "INT",
            DataType::Int64 => "BIGINT",
            DataType::Double => "FLOAT",
            DataType::Decimal => "DECIMAL(18, 2)",
            DataType::Text => "NVARCHAR(MAX)",
            DataType::DateTime => "DATETIME2",
            DataType::Guid => "UNIQUEIDENTIFIER",
            DataType::Binary => "VARBINARY(MAX)",
            DataType::Enum(_) => "NVARCHAR(100)",
            other => {
                return Err(CompileError::InvalidNode(format!(
                    "no column type for {}",
                    other
                )))
            }
        }
        .to_string())
    }

    fn auto_increment(&self) -> &'static str {
        "IDENTITY(1, 1)"
    }

    fn supports_clustered_indexes(&self) -> bool {
        true
    }

    fn create_table_guard(&self, table: &str) -> Option<String> {
        Some(format!(
            "IF OBJECT_ID({}, 'U') IS NULL",
            self.quote_string(table)
        ))
    }

    fn create_index_guard(&self, table: &str, index: &str) -> Option<String> {
        Some(format!(
            "IF NOT EXISTS (SELECT * FROM sys.indexes WHERE name = {} AND object_id = OBJECT_ID({}))",
            self.quote_string(index),
            self.quote_string(table)
        ))
    }

    fn delete_prefix(&self, table: &str, alias: Option<&str>) -> String {
        match alias {
            Some(alias) => format!(
                "DELETE {} FROM {} AS {}",
                self.quote_ident(alias),
                self.quote_ident(table),
                self.quote_ident(alias)
            ),
            None => format!("DELETE FROM {}", self.quote_ident(table)),
        }
    }

    fn emit_boolean(&self, value: bool) -> String {
        if value { "1" } else { "0" }.to_string()
    }

    fn emit_binary(&self, bytes: &[u8]) -> String {
        format!("0x{}", hex(bytes))
    }

    fn amenders(&self) -> Vec<Arc<dyn Amender>> {
        let mut amenders: Vec<Arc<dyn Amender>> = Vec::new();
        if !self.offset_fetch {
            amenders.push(Arc::new(RowNumberPagination));
        }
        amenders.push(Arc::new(BitBooleanNormalizer));
        amenders.push(Arc::new(IdentityInsertBracketing));
        amenders.push(Arc::new(AnsiNullUniqueIndex));
        amenders.push(Arc::new(ClusteredIndexNormalizer));
        amenders.push(Arc::new(EnumDefinitionRemoval));
        amenders
    }
}
