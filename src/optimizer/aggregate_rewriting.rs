use std::collections::HashMap;
use std::sync::Arc;

use crate::ir::compare::{self, CompareFlags};
use crate::ir::visitor::{walk_rewrite, walk_select, Rewriter};
use crate::ir::{ColumnDeclaration, Node, OrderBy, SelectNode};

use super::mapping::{map_sources, source_selects};
use super::OptimizationPass;

/// Resolves `AggregateSubquery` nodes.
///
/// When the grouped select an aggregate belongs to is a source of the select
/// the aggregate appears in, the in-group form is added to the grouped select
/// as a column and the aggregate becomes a plain column reference. Anything
/// else stays a correlated subquery and is formatted from its subquery form.
pub struct AggregateRewriting;

impl OptimizationPass for AggregateRewriting {
    fn name(&self) -> &str {
        "aggregate_rewriting"
    }

    fn description(&self) -> &str {
        "Lifts group aggregates into their grouped select when it is a direct source"
    }

    fn transform(&self, node: &Node) -> Node {
        Lifter.rewrite(node)
    }
}

struct Lifter;

impl Rewriter for Lifter {
    fn rewrite(&mut self, node: &Node) -> Node {
        match node {
            Node::Select(s) => {
                let s = walk_select(self, s);
                Node::Select(lift(&s))
            }
            _ => walk_rewrite(self, node),
        }
    }
}

fn lift(select: &Arc<SelectNode>) -> Arc<SelectNode> {
    let Some(from) = &select.from else {
        return Arc::clone(select);
    };
    let groups: HashMap<&str, &Arc<SelectNode>> = source_selects(from)
        .into_iter()
        .map(|g| (g.alias.as_str(), g))
        .collect();
    if groups.is_empty() {
        return Arc::clone(select);
    }

    let mut replacer = Replacer {
        groups: &groups,
        added: HashMap::new(),
    };
    let columns: Vec<ColumnDeclaration> = select
        .columns
        .iter()
        .map(|c| ColumnDeclaration::new(c.name.clone(), replacer.rewrite(&c.expression)))
        .collect();
    let where_ = select.where_.as_ref().map(|w| replacer.rewrite(w));
    let group_by: Vec<Node> = select.group_by.iter().map(|g| replacer.rewrite(g)).collect();
    let order_by: Vec<OrderBy> = select
        .order_by
        .iter()
        .map(|o| OrderBy {
            expression: replacer.rewrite(&o.expression),
            direction: o.direction,
        })
        .collect();
    if replacer.added.is_empty() {
        return Arc::clone(select);
    }

    let added = replacer.added;
    let from = map_sources(from, &mut |g| match added.get(&g.alias) {
        Some(extra) => {
            let mut columns = g.columns.clone();
            columns.extend(extra.iter().cloned());
            Node::Select(g.change_columns(columns))
        }
        None => Node::Select(Arc::clone(g)),
    });
    Arc::new(SelectNode {
        columns,
        from: Some(from),
        where_,
        order_by,
        group_by,
        ..(**select).clone()
    })
}

struct Replacer<'a> {
    groups: &'a HashMap<&'a str, &'a Arc<SelectNode>>,
    added: HashMap<String, Vec<ColumnDeclaration>>,
}

impl Replacer<'_> {
    fn column_for(&mut self, group: &SelectNode, expression: &Node) -> String {
        let same_expr = |c: &ColumnDeclaration| {
            compare::equals(&c.expression, expression, CompareFlags::empty())
        };
        if let Some(existing) = group.columns.iter().find(|&c| same_expr(c)) {
            return existing.name.clone();
        }
        let added = self.added.entry(group.alias.clone()).or_default();
        if let Some(existing) = added.iter().find(|&c| same_expr(c)) {
            return existing.name.clone();
        }
        let mut n = group.columns.len() + added.len();
        let name = loop {
            let candidate = format!("__agg{}", n);
            if group.column(&candidate).is_none() && !added.iter().any(|c| c.name == candidate) {
                break candidate;
            }
            n += 1;
        };
        added.push(ColumnDeclaration::new(name.clone(), expression.clone()));
        name
    }
}

impl Rewriter for Replacer<'_> {
    fn rewrite(&mut self, node: &Node) -> Node {
        match node {
            Node::AggregateSubquery(a) => {
                let groups = self.groups;
                match groups.get(a.group_by_alias.as_str()) {
                    Some(group) => {
                        let name = self.column_for(group, &a.aggregate_in_group_select);
                        Node::column(a.group_by_alias.clone(), name, a.data_type.clone())
                    }
                    None => walk_rewrite(self, node),
                }
            }
            // nested queries are resolved against their own sources
            Node::Select(_) | Node::Subquery(_) => node.clone(),
            _ => walk_rewrite(self, node),
        }
    }
}
