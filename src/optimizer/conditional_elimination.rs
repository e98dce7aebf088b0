use std::sync::Arc;

use crate::ir::visitor::transform_up;
use crate::ir::{ConditionalNode, Node, Value, WhenClause};

use super::OptimizationPass;

/// Prunes CASE branches with literal conditions.
///
/// False (and NULL) branches are dropped, a true branch ends the CASE and
/// becomes its ELSE, and a CASE left with no branches is replaced by its
/// default.
pub struct ConditionalElimination;

impl OptimizationPass for ConditionalElimination {
    fn name(&self) -> &str {
        "conditional_elimination"
    }

    fn description(&self) -> &str {
        "Removes CASE branches whose condition is a literal"
    }

    fn transform(&self, node: &Node) -> Node {
        transform_up(node, |n| {
            let Node::Conditional(c) = n else {
                return None;
            };
            let literal = |b: &WhenClause| {
                matches!(b.condition.as_constant(), Some(Value::Bool(_) | Value::Null))
            };
            if !c.branches.iter().any(literal) {
                return None;
            }

            let mut branches: Vec<WhenClause> = Vec::new();
            let mut default = c.default.clone();
            for branch in &c.branches {
                match branch.condition.as_constant() {
                    Some(Value::Bool(true)) => {
                        default = Some(branch.result.clone());
                        break;
                    }
                    Some(Value::Bool(false)) | Some(Value::Null) => {}
                    _ => branches.push(branch.clone()),
                }
            }
            if branches.is_empty() {
                return Some(default.unwrap_or_else(|| Node::null(c.data_type.clone())));
            }
            Some(Node::Conditional(Arc::new(ConditionalNode {
                branches,
                default,
                data_type: c.data_type.clone(),
            })))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BinaryOp, DataType};

    fn when(condition: Node, result: &str) -> WhenClause {
        WhenClause::new(condition, Node::constant(result))
    }

    fn cond() -> Node {
        Node::binary(BinaryOp::Gt, Node::column("t0", "age", DataType::Int32), Node::constant(60i32))
    }

    #[test]
    fn test_false_branches_dropped() {
        let node = Node::conditional(
            vec![when(Node::constant(false), "never"), when(cond(), "senior")],
            Some(Node::constant("other")),
            DataType::Text,
        );
        let Node::Conditional(out) = ConditionalElimination.transform(&node) else {
            panic!("expected case");
        };
        assert_eq!(out.branches.len(), 1);
        assert_eq!(out.branches[0].condition, cond());
    }

    #[test]
    fn test_leading_true_becomes_result() {
        let node = Node::conditional(
            vec![when(Node::constant(true), "always"), when(cond(), "senior")],
            None,
            DataType::Text,
        );
        let out = ConditionalElimination.transform(&node);
        assert_eq!(out, Node::constant("always"));
    }

    #[test]
    fn test_no_branches_left_uses_default() {
        let node = Node::conditional(
            vec![when(Node::constant(false), "never")],
            None,
            DataType::Text,
        );
        let out = ConditionalElimination.transform(&node);
        assert_eq!(out, Node::null(DataType::Text));
    }

    #[test]
    fn test_non_literal_conditions_untouched() {
        let node = Node::conditional(vec![when(cond(), "senior")], None, DataType::Text);
        assert!(Node::same(&ConditionalElimination.transform(&node), &node));
    }
}
