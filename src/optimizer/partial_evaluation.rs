use std::cmp::Ordering;

use crate::ir::visitor::transform_up;
use crate::ir::{BinaryOp, Node, UnaryOp, Value};

use super::OptimizationPass;

/// Folds subtrees whose leaves are all literals into a single literal.
///
/// Columns, placeholders, parameters, aggregates and subqueries are never
/// literal, so anything depending on them is left alone, as is anything the
/// in-process evaluator can't reproduce exactly (overflow, division by zero,
/// NULL propagation, collation-dependent text comparison).
pub struct PartialEvaluation;

impl OptimizationPass for PartialEvaluation {
    fn name(&self) -> &str {
        "partial_evaluation"
    }

    fn description(&self) -> &str {
        "Evaluates literal-only expressions at compile time"
    }

    fn transform(&self, node: &Node) -> Node {
        transform_up(node, |n| {
            let value = evaluate(n)?;
            let data_type = if value.is_null() {
                n.data_type()
            } else {
                value.data_type()
            };
            Some(Node::typed_constant(value, data_type))
        })
    }
}

fn evaluate(node: &Node) -> Option<Value> {
    match node {
        Node::Binary(b) => {
            let (left, right) = (b.left.as_constant()?, b.right.as_constant()?);
            evaluate_binary(b.op, left, right)
        }
        Node::Unary(u) => {
            let operand = u.operand.as_constant()?;
            match (u.op, operand) {
                (UnaryOp::IsNull, v) => Some(Value::Bool(v.is_null())),
                (UnaryOp::IsNotNull, v) => Some(Value::Bool(!v.is_null())),
                (UnaryOp::Not, Value::Bool(b)) => Some(Value::Bool(!b)),
                (UnaryOp::Negate, Value::Int32(i)) => i.checked_neg().map(Value::Int32),
                (UnaryOp::Negate, Value::Int64(i)) => i.checked_neg().map(Value::Int64),
                (UnaryOp::Negate, Value::Double(d)) => Some(Value::Double(-d)),
                _ => None,
            }
        }
        Node::FunctionCall(call) => {
            let args: Option<Vec<Value>> = call
                .arguments
                .iter()
                .map(|a| a.as_constant().cloned())
                .collect();
            call.function.evaluate(&args?)
        }
        _ => None,
    }
}

fn evaluate_binary(op: BinaryOp, left: &Value, right: &Value) -> Option<Value> {
    if left.is_null() || right.is_null() {
        return None;
    }
    if op.is_logical() {
        let (l, r) = (left.as_bool()?, right.as_bool()?);
        return Some(Value::Bool(match op {
            BinaryOp::And => l && r,
            _ => l || r,
        }));
    }
    if op.is_comparison() {
        let ordering = compare(left, right)?;
        return Some(Value::Bool(match op {
            BinaryOp::Eq => ordering == Ordering::Equal,
            BinaryOp::NotEq => ordering != Ordering::Equal,
            BinaryOp::Lt => ordering == Ordering::Less,
            BinaryOp::LtEq => ordering != Ordering::Greater,
            BinaryOp::Gt => ordering == Ordering::Greater,
            _ => ordering != Ordering::Less,
        }));
    }
    arithmetic(op, left, right)
}

/// Ordering of two literals where every database agrees on it.
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Int32(_) | Value::Int64(_), Value::Int32(_) | Value::Int64(_)) => {
            Some(left.as_i64()?.cmp(&right.as_i64()?))
        }
        (Value::Double(_), _) | (_, Value::Double(_)) => left.as_f64()?.partial_cmp(&right.as_f64()?),
        (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Option<Value> {
    match (left, right) {
        (Value::Int32(a), Value::Int32(b)) => {
            let v = match op {
                BinaryOp::Add => a.checked_add(*b),
                BinaryOp::Subtract => a.checked_sub(*b),
                BinaryOp::Multiply => a.checked_mul(*b),
                BinaryOp::Divide => a.checked_div(*b),
                BinaryOp::Modulo => a.checked_rem(*b),
                _ => None,
            };
            v.map(Value::Int32)
        }
        (Value::Int64(a), Value::Int64(b)) => {
            let v = match op {
                BinaryOp::Add => a.checked_add(*b),
                BinaryOp::Subtract => a.checked_sub(*b),
                BinaryOp::Multiply => a.checked_mul(*b),
                BinaryOp::Divide => a.checked_div(*b),
                BinaryOp::Modulo => a.checked_rem(*b),
                _ => None,
            };
            v.map(Value::Int64)
        }
        (Value::Double(a), Value::Double(b)) => {
            let v = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Subtract => a - b,
                BinaryOp::Multiply => a * b,
                BinaryOp::Divide if *b != 0.0 => a / b,
                _ => return None,
            };
            v.is_finite().then_some(Value::Double(v))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{DataType, SqlFunction};

    #[test]
    fn test_folds_arithmetic_and_comparison() {
        let node = Node::binary(
            BinaryOp::Gt,
            Node::binary(BinaryOp::Add, Node::constant(10i32), Node::constant(8i32)),
            Node::constant(17i64),
        );
        let out = PartialEvaluation.transform(&node);
        assert_eq!(out.as_bool_constant(), Some(true));
    }

    #[test]
    fn test_leaves_non_literal_subtrees() {
        let age = Node::column("t0", "age", DataType::Int32);
        let node = Node::binary(
            BinaryOp::Gt,
            age.clone(),
            Node::binary(BinaryOp::Multiply, Node::constant(2i32), Node::constant(9i32)),
        );
        let out = PartialEvaluation.transform(&node);
        assert_eq!(out, Node::binary(BinaryOp::Gt, age, Node::constant(18i32)));
    }

    #[test]
    fn test_placeholders_are_not_literals() {
        let node = Node::binary(
            BinaryOp::Add,
            Node::placeholder(0, DataType::Int32),
            Node::constant(1i32),
        );
        assert!(Node::same(&PartialEvaluation.transform(&node), &node));
    }

    #[test]
    fn test_failures_leave_subtree() {
        let overflow = Node::binary(BinaryOp::Add, Node::constant(i32::MAX), Node::constant(1i32));
        assert!(Node::same(&PartialEvaluation.transform(&overflow), &overflow));
        let div_zero = Node::binary(BinaryOp::Divide, Node::constant(1i64), Node::constant(0i64));
        assert!(Node::same(&PartialEvaluation.transform(&div_zero), &div_zero));
        let text = Node::binary(BinaryOp::Lt, Node::constant("a"), Node::constant("B"));
        assert!(Node::same(&PartialEvaluation.transform(&text), &text));
    }

    #[test]
    fn test_folds_function_calls() {
        let node = Node::function(
            SqlFunction::Upper,
            vec![Node::constant("abc")],
            DataType::Text,
        );
        let out = PartialEvaluation.transform(&node);
        assert_eq!(out.as_constant(), Some(&Value::Text("ABC".into())));
        let now = Node::function(SqlFunction::Now, vec![], DataType::DateTime);
        assert!(Node::same(&PartialEvaluation.transform(&now), &now));
    }
}
