use std::collections::HashMap;

use serde::Serialize;

use crate::error::CompileError;
use crate::ir::{DataType, Value};

/// Where the value of a parameter slot comes from at bind time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ParameterSource {
    /// A literal formatted from a tree that was never substituted.
    Literal(Value),
    /// Index into the side array produced by constant substitution.
    Placeholder(usize),
    /// A named value supplied by the caller (nested projections, commands).
    Named(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandParameter {
    pub source: ParameterSource,
    pub data_type: DataType,
}

/// Formatted command text plus its parameter slots, in marker order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatResult {
    pub command_text: String,
    pub parameters: Vec<CommandParameter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypedValue {
    pub value: Value,
    pub data_type: DataType,
}

/// A command ready for the execution context. `parameters[i]` binds the
/// marker the dialect wrote for slot `i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SqlCommand {
    pub text: String,
    pub parameters: Vec<TypedValue>,
}

impl FormatResult {
    /// Resolve every slot against the substituted literal values and the
    /// named parameters.
    pub fn bind(
        &self,
        values: &[Value],
        named: &HashMap<String, Value>,
    ) -> Result<SqlCommand, CompileError> {
        let parameters = self
            .parameters
            .iter()
            .map(|p| {
                let value = match &p.source {
                    ParameterSource::Literal(v) => v.clone(),
                    ParameterSource::Placeholder(index) => values
                        .get(*index)
                        .cloned()
                        .ok_or(CompileError::MissingPlaceholder(*index))?,
                    ParameterSource::Named(name) => named
                        .get(name)
                        .cloned()
                        .ok_or_else(|| CompileError::MissingParameter(name.clone()))?,
                };
                Ok(TypedValue {
                    value,
                    data_type: p.data_type.clone(),
                })
            })
            .collect::<Result<Vec<_>, CompileError>>()?;
        Ok(SqlCommand {
            text: self.command_text.clone(),
            parameters,
        })
    }

    /// Names of the `Named` slots, first occurrence order.
    pub fn parameter_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for p in &self.parameters {
            if let ParameterSource::Named(name) = &p.source {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }
}
