//! Constant substitution: literals out, placeholders in.
//!
//! Run over an optimized tree right before it is keyed and formatted, so
//! two queries that differ only in literal values produce the same text.
//! Literals that must stay inline (`SET` arguments, DDL defaults, index
//! filters) are left alone.

use super::node::{Node, PlaceholderNode};
use super::value::Value;
use super::visitor::{walk_rewrite, Rewriter};
use std::sync::Arc;

struct Substituter {
    values: Vec<Value>,
}

impl Rewriter for Substituter {
    fn rewrite(&mut self, node: &Node) -> Node {
        match node {
            // NULL is part of the shape and written inline
            Node::Constant(c) if c.value.is_null() => node.clone(),
            Node::Constant(c) => {
                let index = self.values.len();
                self.values.push(c.value.clone());
                Node::ConstantPlaceholder(Arc::new(PlaceholderNode {
                    index,
                    data_type: c.data_type.clone(),
                }))
            }
            Node::SetCommand(_)
            | Node::CreateTable(_)
            | Node::AlterTable(_)
            | Node::ColumnDefinition(_)
            | Node::Constraint(_)
            | Node::ConstraintAction(_)
            | Node::CreateIndex(_) => node.clone(),
            _ => walk_rewrite(self, node),
        }
    }
}

/// Replace every substitutable `Constant` by a `ConstantPlaceholder`,
/// returning the rewritten tree and the side array of values in
/// placeholder-index order.
pub fn substitute_constants(node: &Node) -> (Node, Vec<Value>) {
    let mut substituter = Substituter { values: Vec::new() };
    let node = substituter.rewrite(node);
    (node, substituter.values)
}
