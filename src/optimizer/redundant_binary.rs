use crate::ir::visitor::transform_up;
use crate::ir::{BinaryOp, Node, UnaryOp};

use super::OptimizationPass;

/// Boolean identities over literal operands.
///
/// `x AND true -> x`, `x AND false -> false`, `x OR false -> x`,
/// `x OR true -> true`, `NOT NOT x -> x`, `NOT true -> false`.
pub struct RedundantBinaryRemoval;

impl OptimizationPass for RedundantBinaryRemoval {
    fn name(&self) -> &str {
        "redundant_binary_removal"
    }

    fn description(&self) -> &str {
        "Removes boolean operators made redundant by literal operands"
    }

    fn transform(&self, node: &Node) -> Node {
        transform_up(node, simplify)
    }
}

fn simplify(node: &Node) -> Option<Node> {
    match node {
        Node::Binary(b) if b.op.is_logical() => {
            let (absorbing, identity) = match b.op {
                BinaryOp::And => (false, true),
                _ => (true, false),
            };
            for (this, other) in [(&b.left, &b.right), (&b.right, &b.left)] {
                match this.as_bool_constant() {
                    Some(v) if v == absorbing => return Some(Node::constant(absorbing)),
                    Some(v) if v == identity => return Some(other.clone()),
                    _ => {}
                }
            }
            None
        }
        Node::Unary(u) if u.op == UnaryOp::Not => match &u.operand {
            Node::Unary(inner) if inner.op == UnaryOp::Not => Some(inner.operand.clone()),
            operand => operand.as_bool_constant().map(|v| Node::constant(!v)),
        },
        _ => None,
    }
}
