use std::sync::Arc;

use crate::ir::visitor::{contains_aggregate, walk_rewrite, walk_select, walk_visit, Rewriter, Visitor};
use crate::ir::{ColumnDeclaration, Node, SelectNode};

use super::mapping::{map_sources, remap_columns, source_alias, ColumnMapping};
use super::OptimizationPass;

/// Removes select levels that add nothing.
///
/// * A pass-through select (plain columns, no clauses) used as a join
///   source is replaced by its own source.
/// * A select over a select that only filters and projects is merged into
///   one level: predicates are AND-ed, the outer ordering wins and the inner
///   one is inherited when the outer has none.
///
/// References to a removed select are redirected to the expressions it
/// declared.
pub struct RedundantSubqueryRemoval;

impl OptimizationPass for RedundantSubqueryRemoval {
    fn name(&self) -> &str {
        "redundant_subquery_removal"
    }

    fn description(&self) -> &str {
        "Inlines pass-through and filter-only subqueries into their parent"
    }

    fn transform(&self, node: &Node) -> Node {
        let mut flattener = Flattener {
            mappings: Vec::new(),
        };
        let out = flattener.rewrite(node);
        remap_columns(&out, &flattener.mappings)
    }
}

struct Flattener {
    mappings: Vec<ColumnMapping>,
}

impl Rewriter for Flattener {
    fn rewrite(&mut self, node: &Node) -> Node {
        match node {
            Node::Select(s) => {
                let s = walk_select(self, s);
                Node::Select(self.flatten(&s))
            }
            _ => walk_rewrite(self, node),
        }
    }
}

impl Flattener {
    fn flatten(&mut self, select: &Arc<SelectNode>) -> Arc<SelectNode> {
        match &select.from {
            Some(Node::Select(inner)) if can_merge(select, inner) => {
                match ColumnMapping::of_select(inner) {
                    Some(mapping) => {
                        self.mappings.push(mapping);
                        Arc::new(merge(select, inner))
                    }
                    None => Arc::clone(select),
                }
            }
            Some(from @ Node::Join(_)) => {
                let outer_is_star = select.projects_star();
                let from = map_sources(from, &mut |source| {
                    if is_pass_through(source, outer_is_star) {
                        if let (Some(mapping), Some(inner)) =
                            (ColumnMapping::of_select(source), source.from.clone())
                        {
                            self.mappings.push(mapping);
                            return inner;
                        }
                    }
                    Node::Select(Arc::clone(source))
                });
                select.change_from(Some(from))
            }
            _ => Arc::clone(select),
        }
    }
}

/// `inner` only filters, projects and orders.
fn can_merge(outer: &SelectNode, inner: &SelectNode) -> bool {
    inner.from.is_some()
        && inner.group_by.is_empty()
        && !inner.distinct
        && inner.skip.is_none()
        && inner.take.is_none()
        && !inner.for_update
        && !inner
            .columns
            .iter()
            .any(|c| contains_aggregate(&c.expression) || contains_window(&c.expression))
        // `SELECT *` over explicit columns would widen the result
        && (!outer.projects_star() || inner.projects_star())
}

fn is_pass_through(source: &SelectNode, outer_is_star: bool) -> bool {
    let Some(from) = &source.from else {
        return false;
    };
    if !source.is_plain() {
        return false;
    }
    if source.columns.iter().all(ColumnDeclaration::is_wildcard) {
        return source_alias(from).is_some();
    }
    !outer_is_star && source.columns.iter().all(|c| matches!(c.expression, Node::Column(_)))
}

fn merge(outer: &SelectNode, inner: &SelectNode) -> SelectNode {
    let where_ = match (&inner.where_, &outer.where_) {
        (Some(a), Some(b)) => Some(Node::and(a.clone(), b.clone())),
        (a, b) => a.clone().or_else(|| b.clone()),
    };
    let may_inherit_order = outer.group_by.is_empty()
        && !outer.distinct
        && !outer.columns.iter().any(|c| contains_aggregate(&c.expression));
    let order_by = if !outer.order_by.is_empty() {
        outer.order_by.clone()
    } else if may_inherit_order {
        inner.order_by.clone()
    } else {
        Vec::new()
    };
    SelectNode {
        from: inner.from.clone(),
        where_,
        order_by,
        ..outer.clone()
    }
}

struct WindowFinder {
    found: bool,
}

impl Visitor for WindowFinder {
    fn visit(&mut self, node: &Node) {
        match node {
            Node::Over(_) => self.found = true,
            Node::Select(_) | Node::Subquery(_) => {}
            _ => walk_visit(self, node),
        }
    }
}

fn contains_window(node: &Node) -> bool {
    let mut finder = WindowFinder { found: false };
    finder.visit(node);
    finder.found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::*;
    use crate::optimizer::test_support::*;

    #[test]
    fn test_star_over_star_collapses() {
        let inner = SelectNode::new("inner", vec![], Some(Node::table("T", "t0")));
        let node: Node = SelectNode::new("s0", vec![], Some(inner.into())).into();
        let out = RedundantSubqueryRemoval.transform(&node);
        let outer = out.as_select().unwrap();
        assert_eq!(outer.alias, "s0");
        assert!(outer.columns.is_empty());
        assert_eq!(outer.from, Some(Node::table("T", "t0")));
    }

    #[test]
    fn test_merges_filters_and_remaps() {
        let inner = select(
            "s1",
            vec![decl("n", text_col("t0", "name")), decl("a", col("t0", "age"))],
            Node::table("users", "t0"),
        )
        .with_where(Node::unary(UnaryOp::IsNotNull, text_col("t0", "name")))
        .with_order_by(vec![OrderBy::asc(text_col("t0", "name"))]);
        let node: Node = select("s0", vec![decl("name", text_col("s1", "n"))], inner.into())
            .with_where(Node::binary(BinaryOp::Gt, col("s1", "a"), Node::constant(21i32)))
            .into();
        let out = RedundantSubqueryRemoval.transform(&node);
        let outer = out.as_select().unwrap();
        assert_eq!(outer.columns[0].expression, text_col("t0", "name"));
        assert_eq!(
            outer.where_,
            Some(Node::and(
                Node::unary(UnaryOp::IsNotNull, text_col("t0", "name")),
                Node::binary(BinaryOp::Gt, col("t0", "age"), Node::constant(21i32)),
            ))
        );
        assert_eq!(outer.order_by.len(), 1);
    }

    #[test]
    fn test_grouped_inner_is_kept() {
        let inner = select("s1", vec![decl("k", col("t0", "k"))], Node::table("x", "t0"))
            .with_group_by(vec![col("t0", "k")]);
        let node: Node = select("s0", vec![decl("k", col("s1", "k"))], inner.into()).into();
        assert!(Node::same(&RedundantSubqueryRemoval.transform(&node), &node));
    }

    #[test]
    fn test_star_outer_keeps_projecting_inner() {
        let inner = select("s1", vec![decl("k", col("t0", "k"))], Node::table("x", "t0"));
        let node: Node = SelectNode::new("s0", vec![], Some(inner.into())).into();
        assert!(Node::same(&RedundantSubqueryRemoval.transform(&node), &node));
    }

    #[test]
    fn test_wildcard_outer_keeps_projecting_inner() {
        let inner = select("s1", vec![decl("k", col("t0", "k"))], Node::table("x", "t0"));
        let node: Node =
            SelectNode::new("s0", vec![ColumnDeclaration::wildcard()], Some(inner.into())).into();
        assert!(Node::same(&RedundantSubqueryRemoval.transform(&node), &node));
    }

    #[test]
    fn test_pass_through_join_source_is_replaced() {
        let users = select("s1", vec![decl("id", col("t0", "id"))], Node::table("users", "t0"));
        let join: Node = JoinNode::new(
            JoinKind::Inner,
            users.into(),
            Node::table("orders", "t1"),
            Some(Node::equal(col("s1", "id"), col("t1", "user_id"))),
        )
        .unwrap()
        .into();
        let node: Node = select("s0", vec![decl("id", col("s1", "id"))], join).into();
        let out = RedundantSubqueryRemoval.transform(&node);
        let outer = out.as_select().unwrap();
        let Some(Node::Join(join)) = &outer.from else {
            panic!("expected join");
        };
        assert_eq!(join.left, Node::table("users", "t0"));
        assert_eq!(
            join.condition,
            Some(Node::equal(col("t0", "id"), col("t1", "user_id")))
        );
        assert_eq!(outer.columns[0].expression, col("t0", "id"));
    }
}
