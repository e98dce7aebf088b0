use std::sync::Arc;

use crate::error::CompileError;
use crate::ir::DataType;

use super::{hex, Amender, SqlDialect};

/// PostgreSQL dialect
pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn parameter_marker(&self, index: usize) -> String {
        format!("${}", index + 1)
    }

    fn type_name(&self, data_type: &DataType) -> Result<String, CompileError> {
        Ok(match data_type.underlying() {
            DataType::Boolean => "BOOLEAN".into(),
            DataType::Int32 => "INTEGER".into(),
            DataType::Int64 => "BIGINT".into(),
            DataType::Double => "DOUBLE PRECISION".into(),
            DataType::Decimal => "NUMERIC".into(),
            DataType::Text => "TEXT".into(),
            DataType::DateTime => "TIMESTAMP".into(),
            DataType::Guid => "UUID".into(),
            DataType::Binary => "BYTEA".into(),
            DataType::Enum(name) => self.quote_ident(name),
            other => {
                return Err(CompileError::InvalidNode(format!(
                    "no column type for {}",
                    other
                )))
            }
        })
    }

    fn auto_increment(&self) -> &'static str {
        "GENERATED BY DEFAULT AS IDENTITY"
    }

    fn supports_native_enums(&self) -> bool {
        true
    }

    fn emit_binary(&self, bytes: &[u8]) -> String {
        format!("'\\x{}'::bytea", hex(bytes))
    }

    fn amenders(&self) -> Vec<Arc<dyn Amender>> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        let pg = PostgresDialect;
        assert_eq!(pg.type_name(&DataType::Int64).unwrap(), "BIGINT");
        assert_eq!(
            pg.type_name(&DataType::Nullable(Box::new(DataType::Guid))).unwrap(),
            "UUID"
        );
        assert_eq!(pg.type_name(&DataType::Enum("mood".into())).unwrap(), "\"mood\"");
        assert!(pg.type_name(&DataType::Entity("User".into())).is_err());
    }

    #[test]
    fn test_binary_literal() {
        assert_eq!(PostgresDialect.emit_binary(&[0xde, 0xad]), "'\\xDEAD'::bytea");
    }
}
