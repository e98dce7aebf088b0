use std::sync::Arc;

use crate::error::CompileError;
use crate::ir::{DataType, JoinKind, SqlFunction};

use super::amenders::EnumDefinitionRemoval;
use super::{default_function, Amender, FunctionInfo, SqlDialect};

/// SQLite dialect
pub struct SqliteDialect;

fn strftime(format: &'static str) -> FunctionInfo {
    FunctionInfo::call("CAST").with_affixes(
        format!("strftime('{}', ", format),
        ") AS INTEGER",
    )
}

impl SqlDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn parameter_marker(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn unbounded_limit(&self) -> Option<&'static str> {
        Some("-1")
    }

    fn function(&self, function: &SqlFunction) -> Option<FunctionInfo> {
        match function {
            SqlFunction::Concat => Some(FunctionInfo::operator("||")),
            SqlFunction::Substring => Some(FunctionInfo::call("SUBSTR")),
            SqlFunction::Now => Some(FunctionInfo::call("datetime").with_affixes("'now'", "")),
            SqlFunction::Year => Some(strftime("%Y")),
            SqlFunction::Month => Some(strftime("%m")),
            SqlFunction::Day => Some(strftime("%d")),
            other => default_function(other),
        }
    }

    fn join_keyword(&self, kind: JoinKind) -> Option<&'static str> {
        match kind {
            JoinKind::Inner => Some("INNER JOIN"),
            JoinKind::Left => Some("LEFT JOIN"),
            JoinKind::Right => Some("RIGHT JOIN"),
            JoinKind::Full => Some("FULL JOIN"),
            JoinKind::Cross => Some("CROSS JOIN"),
            JoinKind::CrossApply | JoinKind::OuterApply => None,
        }
    }

    fn for_update_clause(&self) -> Option<&'static str> {
        // single writer; nothing to lock
        None
    }

    fn type_name(&self, data_type: &DataType) -> Result<String, CompileError> {
        Ok(match data_type.underlying() {
            DataType::Boolean | DataType::Int32 | DataType::Int64 => "INTEGER",
            DataType::Double => "REAL",
            DataType::Decimal => "NUMERIC",
            DataType::Text | DataType::DateTime | DataType::Guid | DataType::Enum(_) => "TEXT",
            DataType::Binary => "BLOB",
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
        "AUTOINCREMENT"
    }

    fn emit_boolean(&self, value: bool) -> String {
        if value { "1" } else { "0" }.to_string()
    }

    fn amenders(&self) -> Vec<Arc<dyn Amender>> {
        vec![Arc::new(EnumDefinitionRemoval)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_overrides() {
        let concat = SqliteDialect.function(&SqlFunction::Concat).unwrap();
        assert!(concat.is_operator);
        assert_eq!(concat.name, "||");
        let year = SqliteDialect.function(&SqlFunction::Year).unwrap();
        assert_eq!(year.arg_prefix, "strftime('%Y', ");
        assert_eq!(
            SqliteDialect.function(&SqlFunction::Upper),
            default_function(&SqlFunction::Upper)
        );
    }

    #[test]
    fn test_enum_columns_are_text() {
        assert_eq!(
            SqliteDialect.type_name(&DataType::Enum("mood".into())).unwrap(),
            "TEXT"
        );
        assert!(SqliteDialect.join_keyword(JoinKind::CrossApply).is_none());
    }
}
