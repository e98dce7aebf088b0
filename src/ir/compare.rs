//! Structural equality and hashing over IR trees.
//!
//! Both walks inspect exactly the same fields per kind, which is what keeps
//! `equals(a, b, f) => hash(a, f) == hash(b, f)` true. With
//! [`CompareFlags::IGNORE_CONSTANTS`] only the *type* of a literal (and
//! whether it is NULL) matters, so trees that differ only in literal values
//! share one shape; this is the plan-cache key. Literals that the
//! formatter renders inline (`SET` arguments, column `DEFAULT`s, index
//! filters) are always compared by value, since they are part of the
//! command text.

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

use super::node::*;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CompareFlags: u8 {
        /// Compare constant literal types, not values.
        const IGNORE_CONSTANTS = 1;
        /// Do not compare placeholder indices.
        const IGNORE_PLACEHOLDERS = 1 << 1;
    }
}

/// Structural equality under `flags`.
pub fn equals(a: &Node, b: &Node, flags: CompareFlags) -> bool {
    Comparer { flags }.node(a, b)
}

/// Structural hash under `flags`.
pub fn hash(node: &Node, flags: CompareFlags) -> u64 {
    let mut state = FxHasher::default();
    ShapeHasher {
        flags,
        state: &mut state,
    }
    .node(node);
    state.finish()
}

struct Comparer {
    flags: CompareFlags,
}

impl Comparer {
    fn node(&self, a: &Node, b: &Node) -> bool {
        if Node::same(a, b) {
            return true;
        }
        if a.kind() != b.kind() || a.data_type() != b.data_type() {
            return false;
        }
        match (a, b) {
            (Node::Table(a), Node::Table(b)) => a.name == b.name && a.alias == b.alias,
            (Node::Select(a), Node::Select(b)) => {
                a.alias == b.alias
                    && a.distinct == b.distinct
                    && a.for_update == b.for_update
                    && a.columns.len() == b.columns.len()
                    && a.columns
                        .iter()
                        .zip(&b.columns)
                        .all(|(x, y)| x.name == y.name && self.node(&x.expression, &y.expression))
                    && self.opt(&a.from, &b.from)
                    && self.opt(&a.where_, &b.where_)
                    && self.order_by(&a.order_by, &b.order_by)
                    && self.list(&a.group_by, &b.group_by)
                    && self.opt(&a.skip, &b.skip)
                    && self.opt(&a.take, &b.take)
            }
            (Node::Join(a), Node::Join(b)) => {
                a.kind == b.kind
                    && self.node(&a.left, &b.left)
                    && self.node(&a.right, &b.right)
                    && self.opt(&a.condition, &b.condition)
            }
            (Node::Column(a), Node::Column(b)) => a == b,
            (Node::Aggregate(a), Node::Aggregate(b)) => {
                a.kind == b.kind && a.distinct == b.distinct && self.opt(&a.argument, &b.argument)
            }
            (Node::AggregateSubquery(a), Node::AggregateSubquery(b)) => {
                a.group_by_alias == b.group_by_alias
                    && self.node(&a.aggregate_in_group_select, &b.aggregate_in_group_select)
                    && self.node(&a.aggregate_as_subquery, &b.aggregate_as_subquery)
            }
            (Node::Subquery(a), Node::Subquery(b)) => {
                a.kind == b.kind && self.opt(&a.operand, &b.operand) && self.node(&a.select, &b.select)
            }
            (Node::FunctionCall(a), Node::FunctionCall(b)) => {
                a.function == b.function && self.list(&a.arguments, &b.arguments)
            }
            (Node::Constant(a), Node::Constant(b)) => {
                if self.flags.contains(CompareFlags::IGNORE_CONSTANTS) {
                    a.value.is_null() == b.value.is_null()
                } else {
                    a.value == b.value
                }
            }
            (Node::ConstantPlaceholder(a), Node::ConstantPlaceholder(b)) => {
                self.flags.contains(CompareFlags::IGNORE_PLACEHOLDERS) || a.index == b.index
            }
            (Node::Parameter(a), Node::Parameter(b)) => a.name == b.name,
            (Node::Over(a), Node::Over(b)) => {
                self.node(&a.source, &b.source) && self.order_by(&a.order_by, &b.order_by)
            }
            (Node::Binary(a), Node::Binary(b)) => {
                a.op == b.op && self.node(&a.left, &b.left) && self.node(&a.right, &b.right)
            }
            (Node::Unary(a), Node::Unary(b)) => a.op == b.op && self.node(&a.operand, &b.operand),
            (Node::Conditional(a), Node::Conditional(b)) => {
                a.branches.len() == b.branches.len()
                    && a.branches.iter().zip(&b.branches).all(|(x, y)| {
                        self.node(&x.condition, &y.condition) && self.node(&x.result, &y.result)
                    })
                    && self.opt(&a.default, &b.default)
            }
            (Node::Tuple(a), Node::Tuple(b)) => self.list(&a.elements, &b.elements),
            (Node::ObjectReference(a), Node::ObjectReference(b)) => {
                a.entity == b.entity
                    && a.keys.len() == b.keys.len()
                    && a.keys
                        .iter()
                        .zip(&b.keys)
                        .all(|(x, y)| x.property == y.property && self.node(&x.expression, &y.expression))
            }
            (Node::InsertInto(a), Node::InsertInto(b)) => {
                a.table == b.table
                    && a.columns == b.columns
                    && a.returning == b.returning
                    && a.requires_identity_insert == b.requires_identity_insert
                    && self.list(&a.values, &b.values)
            }
            (Node::Update(a), Node::Update(b)) => {
                a.table == b.table
                    && a.requires_identity_insert == b.requires_identity_insert
                    && a.assignments.len() == b.assignments.len()
                    && a.assignments
                        .iter()
                        .zip(&b.assignments)
                        .all(|(x, y)| x.column == y.column && self.node(&x.value, &y.value))
                    && self.opt(&a.where_, &b.where_)
            }
            (Node::Delete(a), Node::Delete(b)) => {
                a.table == b.table && a.alias == b.alias && self.opt(&a.where_, &b.where_)
            }
            (Node::CreateTable(a), Node::CreateTable(b)) => {
                a.table == b.table
                    && a.if_not_exists == b.if_not_exists
                    && self.list(&a.columns, &b.columns)
                    && self.list(&a.constraints, &b.constraints)
            }
            (Node::AlterTable(a), Node::AlterTable(b)) => {
                a.table == b.table && self.list(&a.actions, &b.actions)
            }
            (Node::ColumnDefinition(a), Node::ColumnDefinition(b)) => {
                a.name == b.name
                    && a.data_type == b.data_type
                    && self.list(&a.constraints, &b.constraints)
            }
            (Node::Constraint(a), Node::Constraint(b)) => {
                a.name == b.name && self.inline().constraint_kind(&a.kind, &b.kind)
            }
            (Node::ConstraintAction(a), Node::ConstraintAction(b)) => {
                a.action == b.action && self.node(&a.constraint, &b.constraint)
            }
            (Node::CreateIndex(a), Node::CreateIndex(b)) => {
                a.name == b.name
                    && a.table == b.table
                    && a.columns == b.columns
                    && a.unique == b.unique
                    && a.clustered == b.clustered
                    && a.if_not_exists == b.if_not_exists
                    && self.inline().opt(&a.where_, &b.where_)
            }
            (Node::EnumDefinition(a), Node::EnumDefinition(b)) => {
                a.name == b.name && a.labels == b.labels
            }
            (Node::SetCommand(a), Node::SetCommand(b)) => {
                a.name == b.name && self.inline().list(&a.arguments, &b.arguments)
            }
            (Node::StatementList(a), Node::StatementList(b)) => {
                self.list(&a.statements, &b.statements)
            }
            _ => false,
        }
    }

    /// Literals rendered inline into the command text always take part.
    fn inline(&self) -> Comparer {
        Comparer {
            flags: self.flags - CompareFlags::IGNORE_CONSTANTS,
        }
    }

    fn opt(&self, a: &Option<Node>, b: &Option<Node>) -> bool {
        match (a, b) {
            (Some(a), Some(b)) => self.node(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    fn list(&self, a: &[Node], b: &[Node]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(a, b)| self.node(a, b))
    }

    fn order_by(&self, a: &[OrderBy], b: &[OrderBy]) -> bool {
        a.len() == b.len()
            && a.iter()
                .zip(b)
                .all(|(x, y)| x.direction == y.direction && self.node(&x.expression, &y.expression))
    }

    fn constraint_kind(&self, a: &ConstraintKind, b: &ConstraintKind) -> bool {
        match (a, b) {
            (
                ConstraintKind::PrimaryKey { columns: ca, clustered: xa },
                ConstraintKind::PrimaryKey { columns: cb, clustered: xb },
            ) => ca == cb && xa == xb,
            (ConstraintKind::Unique { columns: a }, ConstraintKind::Unique { columns: b }) => a == b,
            (
                ConstraintKind::ForeignKey {
                    columns: ca,
                    referenced_table: ta,
                    referenced_columns: ra,
                    on_delete: da,
                    on_update: ua,
                },
                ConstraintKind::ForeignKey {
                    columns: cb,
                    referenced_table: tb,
                    referenced_columns: rb,
                    on_delete: db,
                    on_update: ub,
                },
            ) => ca == cb && ta == tb && ra == rb && da == db && ua == ub,
            (ConstraintKind::NotNull, ConstraintKind::NotNull) => true,
            (ConstraintKind::AutoIncrement, ConstraintKind::AutoIncrement) => true,
            (ConstraintKind::Default(a), ConstraintKind::Default(b)) => self.node(a, b),
            _ => false,
        }
    }
}

struct ShapeHasher<'a> {
    flags: CompareFlags,
    state: &'a mut FxHasher,
}

impl ShapeHasher<'_> {
    fn write<T: Hash + ?Sized>(&mut self, value: &T) {
        value.hash(self.state);
    }

    fn node(&mut self, node: &Node) {
        self.write(&node.kind());
        self.write(&node.data_type());
        match node {
            Node::Table(n) => {
                self.write(&n.name);
                self.write(&n.alias);
            }
            Node::Select(n) => {
                self.write(&n.alias);
                self.write(&n.distinct);
                self.write(&n.for_update);
                self.write(&n.columns.len());
                for column in &n.columns {
                    self.write(&column.name);
                    self.node(&column.expression);
                }
                self.opt(&n.from);
                self.opt(&n.where_);
                self.order_by(&n.order_by);
                self.list(&n.group_by);
                self.opt(&n.skip);
                self.opt(&n.take);
            }
            Node::Join(n) => {
                self.write(&n.kind);
                self.node(&n.left);
                self.node(&n.right);
                self.opt(&n.condition);
            }
            Node::Column(n) => self.write(&**n),
            Node::Aggregate(n) => {
                self.write(&n.kind);
                self.write(&n.distinct);
                self.opt(&n.argument);
            }
            Node::AggregateSubquery(n) => {
                self.write(&n.group_by_alias);
                self.node(&n.aggregate_in_group_select);
                self.node(&n.aggregate_as_subquery);
            }
            Node::Subquery(n) => {
                self.write(&n.kind);
                self.opt(&n.operand);
                self.node(&n.select);
            }
            Node::FunctionCall(n) => {
                self.write(&n.function);
                self.list(&n.arguments);
            }
            Node::Constant(n) => {
                if self.flags.contains(CompareFlags::IGNORE_CONSTANTS) {
                    self.write(&n.value.is_null());
                } else {
                    self.write(&n.value);
                }
            }
            Node::ConstantPlaceholder(n) => {
                if !self.flags.contains(CompareFlags::IGNORE_PLACEHOLDERS) {
                    self.write(&n.index);
                }
            }
            Node::Parameter(n) => self.write(&n.name),
            Node::Over(n) => {
                self.node(&n.source);
                self.order_by(&n.order_by);
            }
            Node::Binary(n) => {
                self.write(&n.op);
                self.node(&n.left);
                self.node(&n.right);
            }
            Node::Unary(n) => {
                self.write(&n.op);
                self.node(&n.operand);
            }
            Node::Conditional(n) => {
                self.write(&n.branches.len());
                for branch in &n.branches {
                    self.node(&branch.condition);
                    self.node(&branch.result);
                }
                self.opt(&n.default);
            }
            Node::Tuple(n) => self.list(&n.elements),
            Node::ObjectReference(n) => {
                self.write(&n.entity);
                self.write(&n.keys.len());
                for key in &n.keys {
                    self.write(&key.property);
                    self.node(&key.expression);
                }
            }
            Node::InsertInto(n) => {
                self.write(&n.table);
                self.write(&n.columns);
                self.write(&n.returning);
                self.write(&n.requires_identity_insert);
                self.list(&n.values);
            }
            Node::Update(n) => {
                self.write(&n.table);
                self.write(&n.requires_identity_insert);
                self.write(&n.assignments.len());
                for assignment in &n.assignments {
                    self.write(&assignment.column);
                    self.node(&assignment.value);
                }
                self.opt(&n.where_);
            }
            Node::Delete(n) => {
                self.write(&n.table);
                self.write(&n.alias);
                self.opt(&n.where_);
            }
            Node::CreateTable(n) => {
                self.write(&n.table);
                self.write(&n.if_not_exists);
                self.list(&n.columns);
                self.list(&n.constraints);
            }
            Node::AlterTable(n) => {
                self.write(&n.table);
                self.list(&n.actions);
            }
            Node::ColumnDefinition(n) => {
                self.write(&n.name);
                self.write(&n.data_type);
                self.list(&n.constraints);
            }
            Node::Constraint(n) => {
                self.write(&n.name);
                self.inline(|h| h.constraint_kind(&n.kind));
            }
            Node::ConstraintAction(n) => {
                self.write(&n.action);
                self.node(&n.constraint);
            }
            Node::CreateIndex(n) => {
                self.write(&n.name);
                self.write(&n.table);
                self.write(&n.columns);
                self.write(&n.unique);
                self.write(&n.clustered);
                self.write(&n.if_not_exists);
                self.inline(|h| h.opt(&n.where_));
            }
            Node::EnumDefinition(n) => {
                self.write(&n.name);
                self.write(&n.labels);
            }
            Node::SetCommand(n) => {
                self.write(&n.name);
                self.inline(|h| h.list(&n.arguments));
            }
            Node::StatementList(n) => self.list(&n.statements),
        }
    }

    fn inline(&mut self, f: impl FnOnce(&mut Self)) {
        let flags = self.flags;
        self.flags -= CompareFlags::IGNORE_CONSTANTS;
        f(self);
        self.flags = flags;
    }

    fn opt(&mut self, node: &Option<Node>) {
        match node {
            Some(node) => {
                self.write(&1u8);
                self.node(node);
            }
            None => self.write(&0u8),
        }
    }

    fn list(&mut self, nodes: &[Node]) {
        self.write(&nodes.len());
        for node in nodes {
            self.node(node);
        }
    }

    fn order_by(&mut self, items: &[OrderBy]) {
        self.write(&items.len());
        for item in items {
            self.write(&item.direction);
            self.node(&item.expression);
        }
    }

    fn constraint_kind(&mut self, kind: &ConstraintKind) {
        match kind {
            ConstraintKind::PrimaryKey { columns, clustered } => {
                self.write(&0u8);
                self.write(columns);
                self.write(clustered);
            }
            ConstraintKind::Unique { columns } => {
                self.write(&1u8);
                self.write(columns);
            }
            ConstraintKind::ForeignKey {
                columns,
                referenced_table,
                referenced_columns,
                on_delete,
                on_update,
            } => {
                self.write(&2u8);
                self.write(columns);
                self.write(referenced_table);
                self.write(referenced_columns);
                self.write(on_delete);
                self.write(on_update);
            }
            ConstraintKind::NotNull => self.write(&3u8),
            ConstraintKind::AutoIncrement => self.write(&4u8),
            ConstraintKind::Default(node) => {
                self.write(&5u8);
                self.node(node);
            }
        }
    }
}

/// A node usable as a hash-map key by *shape*: literal values are ignored,
/// literal types and everything else are not.
#[derive(Debug, Clone)]
pub struct ShapeKey {
    node: Node,
    hash: u64,
}

impl ShapeKey {
    pub const FLAGS: CompareFlags = CompareFlags::IGNORE_CONSTANTS;

    pub fn new(node: Node) -> Self {
        let hash = hash(&node, Self::FLAGS);
        Self { node, hash }
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn hash_value(&self) -> u64 {
        self.hash
    }
}

impl PartialEq for ShapeKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && equals(&self.node, &other.node, Self::FLAGS)
    }
}

impl Eq for ShapeKey {}

impl Hash for ShapeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{DataType, Value};

    fn query(age: i32, name: &str) -> Node {
        let predicate = Node::and(
            Node::binary(
                BinaryOp::Gt,
                Node::column("t0", "age", DataType::Int32),
                Node::constant(age),
            ),
            Node::equal(
                Node::column("t0", "name", DataType::Text),
                Node::constant(name),
            ),
        );
        SelectNode::new(
            "s0",
            vec![ColumnDeclaration::new(
                "name",
                Node::column("t0", "name", DataType::Text),
            )],
            Some(Node::table("people", "t0")),
        )
        .with_where(predicate)
        .into()
    }

    #[test]
    fn test_equal_trees_hash_equal() {
        let a = query(18, "x");
        let b = query(18, "x");
        assert!(equals(&a, &b, CompareFlags::empty()));
        assert_eq!(hash(&a, CompareFlags::empty()), hash(&b, CompareFlags::empty()));
    }

    #[test]
    fn test_literal_values_ignored_in_shape_mode() {
        let a = query(18, "x");
        let b = query(65, "y");
        assert!(!equals(&a, &b, CompareFlags::empty()));
        assert!(equals(&a, &b, CompareFlags::IGNORE_CONSTANTS));
        assert_eq!(
            hash(&a, CompareFlags::IGNORE_CONSTANTS),
            hash(&b, CompareFlags::IGNORE_CONSTANTS)
        );
        assert_eq!(ShapeKey::new(a), ShapeKey::new(b));
    }

    #[test]
    fn test_literal_types_still_matter() {
        let a = Node::constant(1i32);
        let b = Node::constant(1i64);
        assert!(!equals(&a, &b, CompareFlags::IGNORE_CONSTANTS));
    }

    #[test]
    fn test_placeholder_indices() {
        let a = Node::placeholder(0, DataType::Int32);
        let b = Node::placeholder(1, DataType::Int32);
        assert!(!equals(&a, &b, CompareFlags::IGNORE_CONSTANTS));
        assert!(equals(&a, &b, CompareFlags::IGNORE_PLACEHOLDERS));
        assert_eq!(
            hash(&a, CompareFlags::IGNORE_PLACEHOLDERS),
            hash(&b, CompareFlags::IGNORE_PLACEHOLDERS)
        );
    }

    #[test]
    fn test_shape_differs() {
        let a = query(18, "x");
        let b: Node = SelectNode::new("s0", vec![], Some(Node::table("people", "t0"))).into();
        assert_ne!(ShapeKey::new(a), ShapeKey::new(b));
    }

    #[test]
    fn test_inline_literals_always_compared() {
        let set = |on: bool| {
            Node::SetCommand(std::sync::Arc::new(SetCommandNode {
                name: "IDENTITY_INSERT".into(),
                arguments: vec![Node::constant("users"), Node::constant(on)],
            }))
        };
        assert!(!equals(&set(true), &set(false), CompareFlags::IGNORE_CONSTANTS));
        assert_ne!(
            hash(&set(true), CompareFlags::IGNORE_CONSTANTS),
            hash(&set(false), CompareFlags::IGNORE_CONSTANTS)
        );
    }

    #[test]
    fn test_null_literal_is_its_own_shape() {
        let a = Node::typed_constant(Value::Null, DataType::Text);
        let b = Node::typed_constant(Value::Text("a".into()), DataType::Text);
        let c = Node::typed_constant(Value::Text("b".into()), DataType::Text);
        assert!(!equals(&a, &b, CompareFlags::IGNORE_CONSTANTS));
        assert!(equals(&b, &c, CompareFlags::IGNORE_CONSTANTS));
        assert_eq!(
            hash(&b, CompareFlags::IGNORE_CONSTANTS),
            hash(&c, CompareFlags::IGNORE_CONSTANTS)
        );
    }
}
