use crate::ir::visitor::transform_up;
use crate::ir::{Node, SqlFunction};

use super::OptimizationPass;

/// Drops function calls that do nothing: single-argument `CONCAT` and
/// `COALESCE`, and an idempotent function applied to its own result
/// (`UPPER(UPPER(x))`).
pub struct RedundantFunctionRemoval;

impl OptimizationPass for RedundantFunctionRemoval {
    fn name(&self) -> &str {
        "redundant_function_removal"
    }

    fn description(&self) -> &str {
        "Removes single-argument CONCAT/COALESCE and doubled idempotent calls"
    }

    fn transform(&self, node: &Node) -> Node {
        transform_up(node, |n| {
            let Node::FunctionCall(call) = n else {
                return None;
            };
            match (&call.function, call.arguments.as_slice()) {
                (SqlFunction::Concat | SqlFunction::Coalesce, [only]) => Some(only.clone()),
                (function, [Node::FunctionCall(inner)])
                    if function.is_idempotent()
                        && inner.function == *function
                        && inner.arguments.len() == 1 =>
                {
                    Some(Node::FunctionCall(inner.clone()))
                }
                _ => None,
            }
        })
    }
}
