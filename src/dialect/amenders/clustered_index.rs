use std::collections::HashSet;
use std::sync::Arc;

use crate::ir::visitor::transform_up;
use crate::ir::{ConstraintKind, ConstraintNode, Node};

use super::Amender;

/// A table has one clustered index. When a batch creates a clustered index
/// on a table, the primary key of that table is declared non-clustered.
pub struct ClusteredIndexNormalizer;

impl Amender for ClusteredIndexNormalizer {
    fn name(&self) -> &str {
        "clustered_index_normalizer"
    }

    fn amend(&self, node: &Node) -> Node {
        transform_up(node, |n| {
            let Node::StatementList(list) = n else {
                return None;
            };
            let tables: HashSet<&str> = list
                .statements
                .iter()
                .filter_map(|s| match s {
                    Node::CreateIndex(i) if i.clustered => Some(i.table.as_str()),
                    _ => None,
                })
                .collect();
            if tables.is_empty() {
                return None;
            }

            let statements: Vec<Node> = list
                .statements
                .iter()
                .map(|s| match s {
                    Node::CreateTable(t) if tables.contains(t.table.as_str()) => nonclustered_key(s),
                    Node::AlterTable(a) if tables.contains(a.table.as_str()) => nonclustered_key(s),
                    other => other.clone(),
                })
                .collect();
            if statements.iter().zip(&list.statements).all(|(a, b)| Node::same(a, b)) {
                return None;
            }
            Some(Node::statement_list(statements))
        })
    }
}

fn nonclustered_key(statement: &Node) -> Node {
    transform_up(statement, |n| {
        let Node::Constraint(c) = n else {
            return None;
        };
        match &c.kind {
            ConstraintKind::PrimaryKey { columns, clustered } if *clustered != Some(false) => {
                Some(Node::Constraint(Arc::new(ConstraintNode {
                    name: c.name.clone(),
                    kind: ConstraintKind::PrimaryKey {
                        columns: columns.clone(),
                        clustered: Some(false),
                    },
                })))
            }
            _ => None,
        }
    })
}
