use crate::ir::visitor::transform_up;
use crate::ir::{DataType, Node, SqlFunction, Value};

use super::OptimizationPass;

/// Expands `IN` over a literal list.
///
/// `x IN [a, b]` becomes `IN(x, a, b)`; an empty list is `false`. For a
/// tuple or entity operand each list element is itself a list of component
/// values and the test becomes an OR of per-component AND equalities.
pub struct CollectionExpansion;

impl OptimizationPass for CollectionExpansion {
    fn name(&self) -> &str {
        "collection_expansion"
    }

    fn description(&self) -> &str {
        "Expands IN over literal collections into argument lists or OR-chains"
    }

    fn transform(&self, node: &Node) -> Node {
        transform_up(node, |n| {
            let Node::FunctionCall(call) = n else {
                return None;
            };
            if call.function != SqlFunction::In {
                return None;
            }
            let [operand, list] = call.arguments.as_slice() else {
                return None;
            };
            let Some(Value::List(items)) = list.as_constant() else {
                return None;
            };
            if items.is_empty() {
                return Some(Node::constant(false));
            }

            match components(operand) {
                Some(parts) => {
                    let alternatives: Option<Vec<Node>> = items
                        .iter()
                        .map(|item| match item {
                            Value::List(values) if values.len() == parts.len() => Node::and_all(
                                parts
                                    .iter()
                                    .zip(values)
                                    .map(|(part, v)| Node::equal(part.clone(), literal(v, part))),
                            ),
                            _ => None,
                        })
                        .collect();
                    Node::or_all(alternatives?)
                }
                None => {
                    let mut arguments = Vec::with_capacity(items.len() + 1);
                    arguments.push(operand.clone());
                    arguments.extend(items.iter().map(|v| literal(v, operand)));
                    Some(Node::function(SqlFunction::In, arguments, DataType::Boolean))
                }
            }
        })
    }
}

fn components(operand: &Node) -> Option<Vec<Node>> {
    match operand {
        Node::Tuple(t) => Some(t.elements.clone()),
        Node::ObjectReference(o) => Some(o.keys.iter().map(|k| k.expression.clone()).collect()),
        _ => None,
    }
}

/// A literal typed like the expression it is compared with.
fn literal(value: &Value, against: &Node) -> Node {
    let data_type = against.data_type();
    if data_type == DataType::Unknown {
        Node::constant(value.clone())
    } else {
        Node::typed_constant(value.clone(), data_type)
    }
}
