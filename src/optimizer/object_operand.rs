use crate::ir::visitor::transform_up;
use crate::ir::{BinaryOp, KeyBinding, Node, UnaryOp};

use super::OptimizationPass;

/// Expands comparisons between entity operands into key comparisons.
///
/// `a = b` over two object references becomes the conjunction of per-key
/// equalities (`<>` the disjunction of per-key inequalities). Comparing an
/// object reference with a null literal tests its keys for null.
pub struct ObjectOperandComparison;

impl OptimizationPass for ObjectOperandComparison {
    fn name(&self) -> &str {
        "object_operand_comparison"
    }

    fn description(&self) -> &str {
        "Expands entity comparisons into per-key comparisons"
    }

    fn transform(&self, node: &Node) -> Node {
        transform_up(node, |n| {
            let Node::Binary(b) = n else {
                return None;
            };
            if !matches!(b.op, BinaryOp::Eq | BinaryOp::NotEq) {
                return None;
            }
            match (&b.left, &b.right) {
                (Node::ObjectReference(l), Node::ObjectReference(r)) => {
                    let pairs = pair_keys(&l.keys, &r.keys)?;
                    let terms = pairs
                        .into_iter()
                        .map(|(l, r)| Node::binary(b.op, l.clone(), r.clone()));
                    match b.op {
                        BinaryOp::Eq => Node::and_all(terms),
                        _ => Node::or_all(terms),
                    }
                }
                (Node::ObjectReference(o), other) | (other, Node::ObjectReference(o))
                    if other.as_constant().is_some_and(|v| v.is_null()) =>
                {
                    let keys = o.keys.iter().map(|k| k.expression.clone());
                    match b.op {
                        BinaryOp::Eq => Node::and_all(keys.map(|k| Node::unary(UnaryOp::IsNull, k))),
                        _ => Node::or_all(keys.map(|k| Node::unary(UnaryOp::IsNotNull, k))),
                    }
                }
                _ => None,
            }
        })
    }
}

/// Match keys by property name; `None` if the key sets differ.
fn pair_keys<'a>(left: &'a [KeyBinding], right: &'a [KeyBinding]) -> Option<Vec<(&'a Node, &'a Node)>> {
    if left.len() != right.len() || left.is_empty() {
        return None;
    }
    left.iter()
        .map(|l| {
            right
                .iter()
                .find(|r| r.property == l.property)
                .map(|r| (&l.expression, &r.expression))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::DataType;

    fn customer(alias: &str, keys: &[&str]) -> Node {
        Node::object_reference(
            "Customer",
            keys.iter()
                .map(|k| KeyBinding::new(*k, Node::column(alias, *k, DataType::Int64)))
                .collect(),
        )
    }

    #[test]
    fn test_single_key_equality() {
        let node = Node::equal(customer("a", &["Id"]), customer("b", &["Id"]));
        let out = ObjectOperandComparison.transform(&node);
        assert_eq!(
            out,
            Node::equal(
                Node::column("a", "Id", DataType::Int64),
                Node::column("b", "Id", DataType::Int64)
            )
        );
    }

    #[test]
    fn test_composite_key_equality() {
        let node = Node::equal(customer("a", &["Region", "Id"]), customer("b", &["Id", "Region"]));
        let out = ObjectOperandComparison.transform(&node);
        let Node::Binary(and) = &out else {
            panic!("expected conjunction");
        };
        assert_eq!(and.op, BinaryOp::And);
        assert_eq!(
            and.left,
            Node::equal(
                Node::column("a", "Region", DataType::Int64),
                Node::column("b", "Region", DataType::Int64)
            )
        );
    }

    #[test]
    fn test_not_equal_becomes_disjunction() {
        let node = Node::binary(BinaryOp::NotEq, customer("a", &["K1", "K2"]), customer("b", &["K1", "K2"]));
        let Node::Binary(or) = ObjectOperandComparison.transform(&node) else {
            panic!("expected disjunction");
        };
        assert_eq!(or.op, BinaryOp::Or);
    }

    #[test]
    fn test_null_comparison() {
        let node = Node::equal(customer("a", &["Id"]), Node::null(DataType::Entity("Customer".into())));
        let out = ObjectOperandComparison.transform(&node);
        assert_eq!(
            out,
            Node::unary(UnaryOp::IsNull, Node::column("a", "Id", DataType::Int64))
        );
    }

    #[test]
    fn test_mismatched_keys_left_alone() {
        let node = Node::equal(customer("a", &["Id"]), customer("b", &["Code"]));
        assert!(Node::same(&ObjectOperandComparison.transform(&node), &node));
    }
}
