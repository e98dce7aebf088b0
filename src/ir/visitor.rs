//! Traversal over IR trees.
//!
//! [`Rewriter`] maps a tree to a tree. Its default implementation,
//! [`walk_rewrite`], rewrites every child and rebuilds the parent only when
//! at least one child came back as a different node; otherwise the input is
//! handed back untouched (same `Arc`). Implementors match the kinds they care
//! about and delegate everything else to `walk_rewrite`.
//!
//! [`Visitor`] is the read-only counterpart used by collectors.

use std::collections::HashSet;
use std::sync::Arc;

use super::node::*;

pub trait Rewriter {
    fn rewrite(&mut self, node: &Node) -> Node {
        walk_rewrite(self, node)
    }
}

pub trait Visitor {
    fn visit(&mut self, node: &Node) {
        walk_visit(self, node)
    }
}

/// Visit the direct children of `node`, in formatting order.
pub fn walk_visit<V: Visitor + ?Sized>(visitor: &mut V, node: &Node) {
    for_each_child(node, |child| visitor.visit(child));
}

/// Call `f` on every direct child of `node`, in formatting order.
pub fn for_each_child(node: &Node, mut f: impl FnMut(&Node)) {
    match node {
        Node::Table(_)
        | Node::Column(_)
        | Node::Constant(_)
        | Node::ConstantPlaceholder(_)
        | Node::Parameter(_)
        | Node::EnumDefinition(_) => {}
        Node::Select(s) => {
            for column in &s.columns {
                f(&column.expression);
            }
            s.from.iter().for_each(&mut f);
            s.where_.iter().for_each(&mut f);
            s.group_by.iter().for_each(&mut f);
            for item in &s.order_by {
                f(&item.expression);
            }
            s.skip.iter().for_each(&mut f);
            s.take.iter().for_each(&mut f);
        }
        Node::Join(j) => {
            f(&j.left);
            f(&j.right);
            j.condition.iter().for_each(&mut f);
        }
        Node::Aggregate(a) => a.argument.iter().for_each(&mut f),
        Node::AggregateSubquery(a) => {
            f(&a.aggregate_in_group_select);
            f(&a.aggregate_as_subquery);
        }
        Node::Subquery(s) => {
            s.operand.iter().for_each(&mut f);
            f(&s.select);
        }
        Node::FunctionCall(c) => c.arguments.iter().for_each(&mut f),
        Node::Over(o) => {
            f(&o.source);
            for item in &o.order_by {
                f(&item.expression);
            }
        }
        Node::Binary(b) => {
            f(&b.left);
            f(&b.right);
        }
        Node::Unary(u) => f(&u.operand),
        Node::Conditional(c) => {
            for branch in &c.branches {
                f(&branch.condition);
                f(&branch.result);
            }
            c.default.iter().for_each(&mut f);
        }
        Node::Tuple(t) => t.elements.iter().for_each(&mut f),
        Node::ObjectReference(o) => {
            for key in &o.keys {
                f(&key.expression);
            }
        }
        Node::InsertInto(i) => i.values.iter().for_each(&mut f),
        Node::Update(u) => {
            for assignment in &u.assignments {
                f(&assignment.value);
            }
            u.where_.iter().for_each(&mut f);
        }
        Node::Delete(d) => d.where_.iter().for_each(&mut f),
        Node::CreateTable(c) => {
            c.columns.iter().for_each(&mut f);
            c.constraints.iter().for_each(&mut f);
        }
        Node::AlterTable(a) => a.actions.iter().for_each(&mut f),
        Node::ColumnDefinition(c) => c.constraints.iter().for_each(&mut f),
        Node::Constraint(c) => {
            if let ConstraintKind::Default(value) = &c.kind {
                f(value);
            }
        }
        Node::ConstraintAction(a) => f(&a.constraint),
        Node::CreateIndex(i) => i.where_.iter().for_each(&mut f),
        Node::SetCommand(s) => s.arguments.iter().for_each(&mut f),
        Node::StatementList(l) => l.statements.iter().for_each(&mut f),
    }
}

pub fn rewrite_opt<R: Rewriter + ?Sized>(rewriter: &mut R, node: &Option<Node>) -> Option<Node> {
    node.as_ref().map(|n| rewriter.rewrite(n))
}

pub fn rewrite_list<R: Rewriter + ?Sized>(rewriter: &mut R, nodes: &[Node]) -> Vec<Node> {
    nodes.iter().map(|n| rewriter.rewrite(n)).collect()
}

fn rewrite_order_by<R: Rewriter + ?Sized>(rewriter: &mut R, items: &[OrderBy]) -> Vec<OrderBy> {
    items
        .iter()
        .map(|item| OrderBy {
            expression: rewriter.rewrite(&item.expression),
            direction: item.direction,
        })
        .collect()
}

fn same_order_by(a: &[OrderBy], b: &[OrderBy]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(a, b)| a.direction == b.direction && Node::same(&a.expression, &b.expression))
}

/// The clause of a select a child expression sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectClause {
    Column,
    From,
    Where,
    GroupBy,
    OrderBy,
    Skip,
    Take,
}

/// Rewrite every child of a select, rebuilding it only if one changed.
pub fn walk_select<R: Rewriter + ?Sized>(rewriter: &mut R, select: &Arc<SelectNode>) -> Arc<SelectNode> {
    walk_select_with(select, |_, node| rewriter.rewrite(node))
}

/// [`walk_select`] with the rewrite chosen per clause.
pub fn walk_select_with(
    select: &Arc<SelectNode>,
    mut f: impl FnMut(SelectClause, &Node) -> Node,
) -> Arc<SelectNode> {
    let columns: Vec<ColumnDeclaration> = select
        .columns
        .iter()
        .map(|c| ColumnDeclaration::new(c.name.clone(), f(SelectClause::Column, &c.expression)))
        .collect();
    let from = select.from.as_ref().map(|n| f(SelectClause::From, n));
    let where_ = select.where_.as_ref().map(|n| f(SelectClause::Where, n));
    let group_by: Vec<Node> = select.group_by.iter().map(|n| f(SelectClause::GroupBy, n)).collect();
    let order_by: Vec<OrderBy> = select
        .order_by
        .iter()
        .map(|item| OrderBy {
            expression: f(SelectClause::OrderBy, &item.expression),
            direction: item.direction,
        })
        .collect();
    let skip = select.skip.as_ref().map(|n| f(SelectClause::Skip, n));
    let take = select.take.as_ref().map(|n| f(SelectClause::Take, n));

    let unchanged = columns
        .iter()
        .zip(&select.columns)
        .all(|(a, b)| Node::same(&a.expression, &b.expression))
        && same_opt(&select.from, &from)
        && same_opt(&select.where_, &where_)
        && same_all(&select.group_by, &group_by)
        && same_order_by(&select.order_by, &order_by)
        && same_opt(&select.skip, &skip)
        && same_opt(&select.take, &take);
    if unchanged {
        return Arc::clone(select);
    }
    Arc::new(SelectNode {
        alias: select.alias.clone(),
        columns,
        from,
        where_,
        order_by,
        group_by,
        distinct: select.distinct,
        skip,
        take,
        for_update: select.for_update,
        data_type: select.data_type.clone(),
    })
}

/// Rewrite the children of `node` through `rewriter`.
pub fn walk_rewrite<R: Rewriter + ?Sized>(rewriter: &mut R, node: &Node) -> Node {
    match node {
        Node::Table(_)
        | Node::Column(_)
        | Node::Constant(_)
        | Node::ConstantPlaceholder(_)
        | Node::Parameter(_)
        | Node::EnumDefinition(_) => node.clone(),
        Node::Select(s) => Node::Select(walk_select(rewriter, s)),
        Node::Join(j) => {
            let left = rewriter.rewrite(&j.left);
            let right = rewriter.rewrite(&j.right);
            let condition = rewrite_opt(rewriter, &j.condition);
            Node::Join(j.change(left, right, condition))
        }
        Node::Aggregate(a) => {
            let argument = rewrite_opt(rewriter, &a.argument);
            if same_opt(&a.argument, &argument) {
                return node.clone();
            }
            Node::Aggregate(Arc::new(AggregateNode {
                kind: a.kind,
                argument,
                distinct: a.distinct,
                data_type: a.data_type.clone(),
            }))
        }
        Node::AggregateSubquery(a) => {
            let in_group = rewriter.rewrite(&a.aggregate_in_group_select);
            let as_subquery = rewriter.rewrite(&a.aggregate_as_subquery);
            if Node::same(&in_group, &a.aggregate_in_group_select)
                && Node::same(&as_subquery, &a.aggregate_as_subquery)
            {
                return node.clone();
            }
            Node::AggregateSubquery(Arc::new(AggregateSubqueryNode {
                group_by_alias: a.group_by_alias.clone(),
                aggregate_in_group_select: in_group,
                aggregate_as_subquery: as_subquery,
                data_type: a.data_type.clone(),
            }))
        }
        Node::Subquery(s) => {
            let operand = rewrite_opt(rewriter, &s.operand);
            let select = rewriter.rewrite(&s.select);
            if same_opt(&s.operand, &operand) && Node::same(&s.select, &select) {
                return node.clone();
            }
            Node::Subquery(Arc::new(SubqueryNode {
                kind: s.kind,
                operand,
                select,
                data_type: s.data_type.clone(),
            }))
        }
        Node::FunctionCall(c) => {
            let arguments = rewrite_list(rewriter, &c.arguments);
            Node::FunctionCall(c.change_arguments(arguments))
        }
        Node::Over(o) => {
            let source = rewriter.rewrite(&o.source);
            let order_by = rewrite_order_by(rewriter, &o.order_by);
            if Node::same(&source, &o.source) && same_order_by(&o.order_by, &order_by) {
                return node.clone();
            }
            Node::Over(Arc::new(OverNode { source, order_by }))
        }
        Node::Binary(b) => {
            let left = rewriter.rewrite(&b.left);
            let right = rewriter.rewrite(&b.right);
            Node::Binary(b.change(left, right))
        }
        Node::Unary(u) => {
            let operand = rewriter.rewrite(&u.operand);
            if Node::same(&operand, &u.operand) {
                return node.clone();
            }
            Node::Unary(Arc::new(UnaryNode {
                op: u.op,
                operand,
                data_type: u.data_type.clone(),
            }))
        }
        Node::Conditional(c) => {
            let branches: Vec<WhenClause> = c
                .branches
                .iter()
                .map(|b| WhenClause::new(rewriter.rewrite(&b.condition), rewriter.rewrite(&b.result)))
                .collect();
            let default = rewrite_opt(rewriter, &c.default);
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
        Node::Tuple(t) => {
            let elements = rewrite_list(rewriter, &t.elements);
            if same_all(&t.elements, &elements) {
                return node.clone();
            }
            Node::tuple(elements)
        }
        Node::ObjectReference(o) => {
            let keys: Vec<KeyBinding> = o
                .keys
                .iter()
                .map(|k| KeyBinding::new(k.property.clone(), rewriter.rewrite(&k.expression)))
                .collect();
            if keys
                .iter()
                .zip(&o.keys)
                .all(|(a, b)| Node::same(&a.expression, &b.expression))
            {
                return node.clone();
            }
            Node::object_reference(o.entity.clone(), keys)
        }
        Node::InsertInto(i) => {
            let values = rewrite_list(rewriter, &i.values);
            if same_all(&i.values, &values) {
                return node.clone();
            }
            Node::InsertInto(Arc::new(InsertIntoNode {
                values,
                ..(**i).clone()
            }))
        }
        Node::Update(u) => {
            let assignments: Vec<Assignment> = u
                .assignments
                .iter()
                .map(|a| Assignment::new(a.column.clone(), rewriter.rewrite(&a.value)))
                .collect();
            let where_ = rewrite_opt(rewriter, &u.where_);
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
            let where_ = rewrite_opt(rewriter, &d.where_);
            if same_opt(&d.where_, &where_) {
                return node.clone();
            }
            Node::Delete(Arc::new(DeleteNode {
                table: d.table.clone(),
                alias: d.alias.clone(),
                where_,
            }))
        }
        Node::CreateTable(c) => {
            let columns = rewrite_list(rewriter, &c.columns);
            let constraints = rewrite_list(rewriter, &c.constraints);
            if same_all(&c.columns, &columns) && same_all(&c.constraints, &constraints) {
                return node.clone();
            }
            Node::CreateTable(Arc::new(CreateTableNode {
                table: c.table.clone(),
                if_not_exists: c.if_not_exists,
                columns,
                constraints,
            }))
        }
        Node::AlterTable(a) => {
            let actions = rewrite_list(rewriter, &a.actions);
            if same_all(&a.actions, &actions) {
                return node.clone();
            }
            Node::AlterTable(Arc::new(AlterTableNode {
                table: a.table.clone(),
                actions,
            }))
        }
        Node::ColumnDefinition(c) => {
            let constraints = rewrite_list(rewriter, &c.constraints);
            if same_all(&c.constraints, &constraints) {
                return node.clone();
            }
            Node::ColumnDefinition(Arc::new(ColumnDefinitionNode {
                name: c.name.clone(),
                data_type: c.data_type.clone(),
                constraints,
            }))
        }
        Node::Constraint(c) => match &c.kind {
            ConstraintKind::Default(value) => {
                let rewritten = rewriter.rewrite(value);
                if Node::same(&rewritten, value) {
                    return node.clone();
                }
                Node::Constraint(Arc::new(ConstraintNode {
                    name: c.name.clone(),
                    kind: ConstraintKind::Default(rewritten),
                }))
            }
            _ => node.clone(),
        },
        Node::ConstraintAction(a) => {
            let constraint = rewriter.rewrite(&a.constraint);
            if Node::same(&constraint, &a.constraint) {
                return node.clone();
            }
            Node::ConstraintAction(Arc::new(ConstraintActionNode {
                action: a.action,
                constraint,
            }))
        }
        Node::CreateIndex(i) => {
            let where_ = rewrite_opt(rewriter, &i.where_);
            if same_opt(&i.where_, &where_) {
                return node.clone();
            }
            Node::CreateIndex(Arc::new(CreateIndexNode {
                where_,
                ..(**i).clone()
            }))
        }
        Node::SetCommand(s) => {
            let arguments = rewrite_list(rewriter, &s.arguments);
            if same_all(&s.arguments, &arguments) {
                return node.clone();
            }
            Node::SetCommand(Arc::new(SetCommandNode {
                name: s.name.clone(),
                arguments,
            }))
        }
        Node::StatementList(l) => {
            let statements = rewrite_list(rewriter, &l.statements);
            if same_all(&l.statements, &statements) {
                return node.clone();
            }
            Node::statement_list(statements)
        }
    }
}

struct TransformUp<F> {
    f: F,
}

impl<F: FnMut(&Node) -> Option<Node>> Rewriter for TransformUp<F> {
    fn rewrite(&mut self, node: &Node) -> Node {
        let node = walk_rewrite(self, node);
        (self.f)(&node).unwrap_or(node)
    }
}

/// Bottom-up rewrite: children first, then `f` on the (possibly rebuilt)
/// parent. `f` returns `None` to keep a node.
pub fn transform_up(node: &Node, f: impl FnMut(&Node) -> Option<Node>) -> Node {
    TransformUp { f }.rewrite(node)
}

struct ColumnCollector {
    columns: Vec<Arc<ColumnNode>>,
    seen: HashSet<Arc<ColumnNode>>,
}

impl Visitor for ColumnCollector {
    fn visit(&mut self, node: &Node) {
        if let Node::Column(c) = node {
            if self.seen.insert(Arc::clone(c)) {
                self.columns.push(Arc::clone(c));
            }
        }
        walk_visit(self, node);
    }
}

/// Every distinct column referenced anywhere under `node`, nested selects
/// included, in first-seen order.
pub fn collect_columns(node: &Node) -> Vec<Arc<ColumnNode>> {
    let mut collector = ColumnCollector {
        columns: Vec::new(),
        seen: HashSet::new(),
    };
    collector.visit(node);
    collector.columns
}

struct AliasFinder<'a> {
    alias: &'a str,
    found: bool,
}

impl Visitor for AliasFinder<'_> {
    fn visit(&mut self, node: &Node) {
        if self.found {
            return;
        }
        match node {
            Node::Column(c) if c.select_alias == self.alias => self.found = true,
            Node::AggregateSubquery(a) if a.group_by_alias == self.alias => self.found = true,
            _ => walk_visit(self, node),
        }
    }
}

/// True if anything under `node` refers to the select or table named `alias`.
pub fn references_alias(node: &Node, alias: &str) -> bool {
    let mut finder = AliasFinder {
        alias,
        found: false,
    };
    finder.visit(node);
    finder.found
}

struct AggregateFinder {
    found: bool,
}

impl Visitor for AggregateFinder {
    fn visit(&mut self, node: &Node) {
        match node {
            _ if self.found => {}
            Node::Aggregate(_) | Node::AggregateSubquery(_) => self.found = true,
            // aggregates inside a nested query belong to that query
            Node::Select(_) | Node::Subquery(_) => {}
            _ => walk_visit(self, node),
        }
    }
}

/// True if `node` aggregates at its own level (nested queries excluded).
pub fn contains_aggregate(node: &Node) -> bool {
    let mut finder = AggregateFinder { found: false };
    finder.visit(node);
    finder.found
}
