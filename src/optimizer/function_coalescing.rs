use crate::ir::visitor::transform_up;
use crate::ir::Node;

use super::OptimizationPass;

/// Flattens nested calls of associative functions:
/// `CONCAT(a, CONCAT(b, c))` becomes `CONCAT(a, b, c)`, likewise `COALESCE`.
pub struct FunctionCoalescing;

impl OptimizationPass for FunctionCoalescing {
    fn name(&self) -> &str {
        "function_coalescing"
    }

    fn description(&self) -> &str {
        "Flattens nested CONCAT and COALESCE chains into one call"
    }

    fn transform(&self, node: &Node) -> Node {
        transform_up(node, |n| {
            let Node::FunctionCall(call) = n else {
                return None;
            };
            if !call.function.is_associative() {
                return None;
            }
            let nested = |arg: &Node| matches!(arg, Node::FunctionCall(inner) if inner.function == call.function);
            if !call.arguments.iter().any(nested) {
                return None;
            }
            let mut arguments = Vec::new();
            for arg in &call.arguments {
                match arg {
                    // children are already flat
                    Node::FunctionCall(inner) if inner.function == call.function => {
                        arguments.extend(inner.arguments.iter().cloned())
                    }
                    other => arguments.push(other.clone()),
                }
            }
            Some(Node::FunctionCall(call.change_arguments(arguments)))
        })
    }
}
