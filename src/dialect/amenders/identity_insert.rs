use std::sync::Arc;

use crate::ir::visitor::transform_up;
use crate::ir::{InsertIntoNode, Node, SetCommandNode, UpdateNode};

use super::Amender;

/// Brackets writes of explicit identity values with
/// `SET IDENTITY_INSERT t ON` / `OFF`.
pub struct IdentityInsertBracketing;

impl Amender for IdentityInsertBracketing {
    fn name(&self) -> &str {
        "identity_insert_bracketing"
    }

    fn amend(&self, node: &Node) -> Node {
        transform_up(node, |n| match n {
            Node::InsertInto(i) if i.requires_identity_insert => {
                let statement = Node::InsertInto(Arc::new(InsertIntoNode {
                    requires_identity_insert: false,
                    ..(**i).clone()
                }));
                Some(bracket(&i.table, statement))
            }
            Node::Update(u) if u.requires_identity_insert => {
                let statement = Node::Update(Arc::new(UpdateNode {
                    requires_identity_insert: false,
                    ..(**u).clone()
                }));
                Some(bracket(&u.table, statement))
            }
            _ => None,
        })
    }
}

fn bracket(table: &str, statement: Node) -> Node {
    Node::statement_list(vec![identity_insert(table, true), statement, identity_insert(table, false)])
}

fn identity_insert(table: &str, on: bool) -> Node {
    Node::SetCommand(Arc::new(SetCommandNode {
        name: "IDENTITY_INSERT".into(),
        arguments: vec![Node::constant(table), Node::constant(on)],
    }))
}
