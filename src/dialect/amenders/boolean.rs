use std::sync::Arc;

use crate::ir::visitor::{walk_rewrite, walk_select_with, Rewriter, SelectClause};
use crate::ir::{
    Assignment, ConditionalNode, CreateIndexNode, DataType, DeleteNode, Node, UnaryOp, UpdateNode,
    WhenClause,
};

use super::Amender;

/// Keeps predicates and bit values apart for dialects without a boolean
/// type.
///
/// A boolean-typed value standing where a predicate is required (`WHERE`,
/// `ON`, `WHEN`, operands of `AND`/`OR`/`NOT`) becomes `value = true`; a
/// predicate standing where a value is required (projections, `THEN`,
/// comparison operands) becomes `CASE WHEN p THEN true ELSE false END`.
pub struct BitBooleanNormalizer;

impl Amender for BitBooleanNormalizer {
    fn name(&self) -> &str {
        "bit_boolean_normalizer"
    }

    fn amend(&self, node: &Node) -> Node {
        Normalizer {
            position: Position::Value,
        }
        .rewrite(node)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Value,
    Predicate,
}

struct Normalizer {
    position: Position,
}

impl Normalizer {
    fn at(&mut self, position: Position, node: &Node) -> Node {
        let saved = self.position;
        self.position = position;
        let out = self.rewrite(node);
        self.position = saved;
        out
    }

    fn predicate(&mut self, node: &Option<Node>) -> Option<Node> {
        node.as_ref().map(|n| self.at(Position::Predicate, n))
    }

    fn children(&mut self, node: &Node) -> Node {
        match node {
            Node::Binary(b) if b.op.is_logical() => {
                let left = self.at(Position::Predicate, &b.left);
                let right = self.at(Position::Predicate, &b.right);
                Node::Binary(b.change(left, right))
            }
            Node::Unary(u) if u.op == UnaryOp::Not => {
                let operand = self.at(Position::Predicate, &u.operand);
                if Node::same(&operand, &u.operand) {
                    return node.clone();
                }
                Node::logical_not(operand)
            }
            Node::Select(s) => Node::Select(walk_select_with(s, |clause, n| match clause {
                SelectClause::Where => self.at(Position::Predicate, n),
                _ => self.at(Position::Value, n),
            })),
            Node::Join(j) => {
                let left = self.at(Position::Value, &j.left);
                let right = self.at(Position::Value, &j.right);
                let condition = self.predicate(&j.condition);
                Node::Join(j.change(left, right, condition))
            }
            Node::Conditional(c) => {
                let branches: Vec<WhenClause> = c
                    .branches
                    .iter()
                    .map(|b| {
                        WhenClause::new(
                            self.at(Position::Predicate, &b.condition),
                            self.at(Position::Value, &b.result),
                        )
                    })
                    .collect();
                let default = c.default.as_ref().map(|d| self.at(Position::Value, d));
                let unchanged = branches.iter().zip(&c.branches).all(|(a, b)| {
                    Node::same(&a.condition, &b.condition) && Node::same(&a.result, &b.result)
                }) && same_opt(&c.default, &default);
                if unchanged {
                    return node.clone();
                }
                Node::Conditional(Arc::new(ConditionalNode {
                    branches,
                    default,
                    data_type: c.data_type.clone(),
                }))
            }
            Node::Update(u) => {
                let assignments: Vec<Assignment> = u
                    .assignments
                    .iter()
                    .map(|a| Assignment::new(a.column.clone(), self.at(Position::Value, &a.value)))
                    .collect();
                let where_ = self.predicate(&u.where_);
                let unchanged = assignments
                    .iter()
                    .zip(&u.assignments)
                    .all(|(a, b)| Node::same(&a.value, &b.value))
                    && same_opt(&u.where_, &where_);
                if unchanged {
                    return node.clone();
                }
                Node::Update(Arc::new(UpdateNode {
                    table: u.table.clone(),
                    assignments,
                    where_,
                    requires_identity_insert: u.requires_identity_insert,
                }))
            }
            Node::Delete(d) => {
                let where_ = self.predicate(&d.where_);
                if same_opt(&d.where_, &where_) {
                    return node.clone();
                }
                Node::Delete(Arc::new(DeleteNode {
                    where_,
                    ..(**d).clone()
                }))
            }
            Node::CreateIndex(i) => {
                let where_ = self.predicate(&i.where_);
                if same_opt(&i.where_, &where_) {
                    return node.clone();
                }
                Node::CreateIndex(Arc::new(CreateIndexNode {
                    where_,
                    ..(**i).clone()
                }))
            }
            _ => self.at_value(node),
        }
    }

    fn at_value(&mut self, node: &Node) -> Node {
        let saved = self.position;
        self.position = Position::Value;
        let out = walk_rewrite(self, node);
        self.position = saved;
        out
    }
}

fn same_opt(a: &Option<Node>, b: &Option<Node>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Node::same(a, b),
        (None, None) => true,
        _ => false,
    }
}

fn is_bit_value(node: &Node) -> bool {
    node.data_type().is_boolean() && !node.is_predicate()
}

impl Rewriter for Normalizer {
    fn rewrite(&mut self, node: &Node) -> Node {
        let position = self.position;
        let node = self.children(node);
        match position {
            Position::Predicate if is_bit_value(&node) => Node::equal(node, Node::constant(true)),
            Position::Value if node.is_predicate() => Node::conditional(
                vec![WhenClause::new(node, Node::constant(true))],
                Some(Node::constant(false)),
                DataType::Boolean,
            ),
            _ => node,
        }
    }
}
