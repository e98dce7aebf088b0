use crate::ir::visitor::transform_up;
use crate::ir::Node;

use super::Amender;

/// Drops `EnumDefinition` statements for dialects without native enum
/// types; enum columns are then written as text.
pub struct EnumDefinitionRemoval;

impl Amender for EnumDefinitionRemoval {
    fn name(&self) -> &str {
        "enum_definition_removal"
    }

    fn amend(&self, node: &Node) -> Node {
        if let Node::EnumDefinition(_) = node {
            return Node::statement_list(Vec::new());
        }
        transform_up(node, |n| {
            let Node::StatementList(list) = n else {
                return None;
            };
            if !list.statements.iter().any(|s| matches!(s, Node::EnumDefinition(_))) {
                return None;
            }
            let kept = list
                .statements
                .iter()
                .filter(|s| !matches!(s, Node::EnumDefinition(_)))
                .cloned()
                .collect();
            Some(Node::statement_list(kept))
        })
    }
}
