//! Scalar SQL functions known to the IR.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::value::Value;

/// A function referenced by a `FunctionCall` node.
///
/// How a function is spelled is decided by the dialect's function table,
/// not here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlFunction {
    Concat,
    Coalesce,
    Upper,
    Lower,
    Trim,
    Length,
    Substring,
    StartsWith,
    EndsWith,
    ContainsString,
    Like,
    /// `operand IN (args...)`; the first argument is the operand.
    In,
    Abs,
    Round,
    Now,
    Year,
    Month,
    Day,
    RowNumber,
    /// Conversion to the call's result type.
    Cast,
    Custom(String),
}

impl SqlFunction {
    /// Functions for which `f(f(x)) == f(x)`.
    pub fn is_idempotent(&self) -> bool {
        matches!(
            self,
            SqlFunction::Upper | SqlFunction::Lower | SqlFunction::Trim | SqlFunction::Abs
        )
    }

    /// Associative variadic functions whose nested calls can be flattened.
    pub fn is_associative(&self) -> bool {
        matches!(self, SqlFunction::Concat | SqlFunction::Coalesce)
    }

    /// Functions that yield a predicate rather than a value.
    pub fn is_predicate(&self) -> bool {
        matches!(
            self,
            SqlFunction::StartsWith
                | SqlFunction::EndsWith
                | SqlFunction::ContainsString
                | SqlFunction::Like
                | SqlFunction::In
        )
    }

    /// Evaluate the function over literal arguments.
    ///
    /// Returns `None` when the function is not deterministic or the
    /// arguments are not of a supported shape; callers keep the call as is.
    pub fn evaluate(&self, args: &[Value]) -> Option<Value> {
        match (self, args) {
            (SqlFunction::Concat, args) => {
                let mut out = String::new();
                for arg in args {
                    // `||` and `+` yield NULL on a NULL operand; leave that to the database
                    match arg {
                        Value::Text(s) => out.push_str(s),
                        Value::Int32(_) | Value::Int64(_) => out.push_str(&arg.to_string()),
                        _ => return None,
                    }
                }
                Some(Value::Text(out))
            }
            (SqlFunction::Coalesce, args) => {
                Some(args.iter().find(|a| !a.is_null()).cloned().unwrap_or(Value::Null))
            }
            (SqlFunction::Upper, [Value::Text(s)]) => Some(Value::Text(s.to_uppercase())),
            (SqlFunction::Lower, [Value::Text(s)]) => Some(Value::Text(s.to_lowercase())),
            (SqlFunction::Trim, [Value::Text(s)]) => {
                Some(Value::Text(s.trim_matches(' ').to_string()))
            }
            (SqlFunction::Length, [Value::Text(s)]) => {
                Some(Value::Int32(s.chars().count() as i32))
            }
            (SqlFunction::StartsWith, [Value::Text(s), Value::Text(p)]) => {
                Some(Value::Bool(s.starts_with(p.as_str())))
            }
            (SqlFunction::EndsWith, [Value::Text(s), Value::Text(p)]) => {
                Some(Value::Bool(s.ends_with(p.as_str())))
            }
            (SqlFunction::ContainsString, [Value::Text(s), Value::Text(p)]) => {
                Some(Value::Bool(s.contains(p.as_str())))
            }
            (SqlFunction::Abs, [Value::Int32(i)]) => i.checked_abs().map(Value::Int32),
            (SqlFunction::Abs, [Value::Int64(i)]) => i.checked_abs().map(Value::Int64),
            (SqlFunction::Abs, [Value::Double(d)]) => Some(Value::Double(d.abs())),
            _ => None,
        }
    }
}

impl fmt::Display for SqlFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlFunction::Custom(name) => write!(f, "{}", name),
            other => write!(f, "{:?}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluate_concat() {
        let v = SqlFunction::Concat.evaluate(&["ab".into(), 3i32.into()]);
        assert_eq!(v, Some(Value::Text("ab3".into())));
    }

    #[test]
    fn test_concat_with_null_is_not_folded() {
        assert_eq!(SqlFunction::Concat.evaluate(&["ab".into(), Value::Null]), None);
        assert_eq!(SqlFunction::Concat.evaluate(&[Value::Null]), None);
    }

    #[test]
    fn test_trim_removes_spaces_only() {
        let v = SqlFunction::Trim.evaluate(&[" \tab\n  ".into()]);
        assert_eq!(v, Some(Value::Text("\tab\n".into())));
        let v = SqlFunction::Trim.evaluate(&["  ab  ".into()]);
        assert_eq!(v, Some(Value::Text("ab".into())));
    }

    #[test]
    fn test_evaluate_refuses_nondeterministic() {
        assert_eq!(SqlFunction::Now.evaluate(&[]), None);
        assert_eq!(SqlFunction::Upper.evaluate(&[Value::Int32(1)]), None);
    }

    #[test]
    fn test_abs_overflow_is_not_folded() {
        assert_eq!(SqlFunction::Abs.evaluate(&[Value::Int32(i32::MIN)]), None);
    }
}
