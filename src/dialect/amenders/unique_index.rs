use std::sync::Arc;

use crate::ir::visitor::transform_up;
use crate::ir::{CreateIndexNode, DataType, Node, UnaryOp};

use super::Amender;

/// Gives unique indexes ANSI NULL semantics on databases that treat NULL
/// as an ordinary key value: an unfiltered unique index gains a
/// `col IS NOT NULL AND ...` filter over its columns.
///
/// Clustered indexes can't be filtered and are left alone.
pub struct AnsiNullUniqueIndex;

impl Amender for AnsiNullUniqueIndex {
    fn name(&self) -> &str {
        "ansi_null_unique_index"
    }

    fn amend(&self, node: &Node) -> Node {
        transform_up(node, |n| {
            let Node::CreateIndex(index) = n else {
                return None;
            };
            if !index.unique || index.clustered || index.where_.is_some() {
                return None;
            }
            let filter = Node::and_all(index.columns.iter().map(|c| {
                Node::unary(
                    UnaryOp::IsNotNull,
                    Node::column("", c.name.clone(), DataType::Unknown),
                )
            }))?;
            Some(Node::CreateIndex(Arc::new(CreateIndexNode {
                where_: Some(filter),
                ..(**index).clone()
            })))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::IndexedColumn;

    fn index(unique: bool) -> Node {
        Node::CreateIndex(Arc::new(CreateIndexNode {
            name: "ix_users_email".into(),
            table: "users".into(),
            columns: vec![IndexedColumn::new("email"), IndexedColumn::new("tenant")],
            unique,
            clustered: false,
            if_not_exists: false,
            where_: None,
        }))
    }

    #[test]
    fn test_unique_index_gains_not_null_filter() {
        let Node::CreateIndex(out) = AnsiNullUniqueIndex.amend(&index(true)) else {
            panic!("expected index");
        };
        let expected = Node::and(
            Node::unary(UnaryOp::IsNotNull, Node::column("", "email", DataType::Unknown)),
            Node::unary(UnaryOp::IsNotNull, Node::column("", "tenant", DataType::Unknown)),
        );
        assert_eq!(out.where_.clone().unwrap(), expected);
    }

    #[test]
    fn test_non_unique_untouched() {
        let node = index(false);
        assert!(Node::same(&AnsiNullUniqueIndex.amend(&node), &node));
    }
}
