use crate::ir::visitor::transform_up;
use crate::ir::Node;

use super::OptimizationPass;

/// Flattens composite group-by keys (`Tuple`, `ObjectReference`) into
/// independent grouping expressions.
pub struct GroupByCollation;

impl OptimizationPass for GroupByCollation {
    fn name(&self) -> &str {
        "group_by_collation"
    }

    fn description(&self) -> &str {
        "Flattens tuple and entity group-by keys into their component expressions"
    }

    fn transform(&self, node: &Node) -> Node {
        transform_up(node, |n| {
            let select = n.as_select()?;
            if !select.group_by.iter().any(is_composite) {
                return None;
            }
            let mut keys = Vec::with_capacity(select.group_by.len());
            for key in &select.group_by {
                flatten_into(key, &mut keys);
            }
            Some(Node::Select(select.change_group_by(keys)))
        })
    }
}

fn is_composite(node: &Node) -> bool {
    matches!(node, Node::Tuple(_) | Node::ObjectReference(_))
}

fn flatten_into(key: &Node, out: &mut Vec<Node>) {
    match key {
        Node::Tuple(t) => t.elements.iter().for_each(|e| flatten_into(e, out)),
        Node::ObjectReference(o) => o.keys.iter().for_each(|k| flatten_into(&k.expression, out)),
        other => out.push(other.clone()),
    }
}
