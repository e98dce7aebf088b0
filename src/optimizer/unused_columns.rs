use std::collections::HashSet;
use std::sync::Arc;

use crate::ir::visitor::{collect_columns, walk_rewrite, walk_select, Rewriter};
use crate::ir::{ColumnDeclaration, Node, SelectNode};

use super::mapping::map_sources;
use super::OptimizationPass;

/// Prunes the columns of source selects that nothing references.
///
/// Column references are global (select aliases are unique in a query), so
/// a column is used iff a `Column` node naming it exists anywhere in the
/// tree. The root select, DISTINCT selects and selects under a subquery are
/// never pruned, and no select is pruned to zero columns. Sources of a star
/// select are kept whole since every one of their columns is in its result.
pub struct UnusedColumnRemoval;

impl OptimizationPass for UnusedColumnRemoval {
    fn name(&self) -> &str {
        "unused_column_removal"
    }

    fn description(&self) -> &str {
        "Removes columns of source selects that no enclosing scope references"
    }

    fn transform(&self, node: &Node) -> Node {
        // pruning one select can orphan columns of the select beneath it
        let mut current = node.clone();
        loop {
            let used: HashSet<(String, String)> = collect_columns(&current)
                .iter()
                .map(|c| (c.select_alias.clone(), c.name.clone()))
                .collect();
            let next = Pruner { used: &used }.rewrite(&current);
            if Node::same(&next, &current) {
                return current;
            }
            current = next;
        }
    }
}

struct Pruner<'a> {
    used: &'a HashSet<(String, String)>,
}

impl Pruner<'_> {
    fn prune(&self, source: &Arc<SelectNode>) -> Node {
        if source.distinct || source.columns.len() <= 1 {
            return Node::Select(Arc::clone(source));
        }
        let kept: Vec<ColumnDeclaration> = source
            .columns
            .iter()
            .filter(|c| self.used.contains(&(source.alias.clone(), c.name.clone())))
            .cloned()
            .collect();
        let kept = if kept.is_empty() {
            source.columns[..1].to_vec()
        } else {
            kept
        };
        Node::Select(source.change_columns(kept))
    }
}

impl Rewriter for Pruner<'_> {
    fn rewrite(&mut self, node: &Node) -> Node {
        match node {
            Node::Select(s) => {
                let s = walk_select(self, s);
                if s.projects_star() {
                    return Node::Select(s);
                }
                match &s.from {
                    Some(from) => {
                        let pruned = map_sources(from, &mut |source| self.prune(source));
                        Node::Select(s.change_from(Some(pruned)))
                    }
                    None => Node::Select(s),
                }
            }
            _ => walk_rewrite(self, node),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::*;
    use crate::optimizer::test_support::*;

    fn inner() -> SelectNode {
        select(
            "s1",
            vec![
                decl("id", col("t0", "id")),
                decl("name", text_col("t0", "name")),
                decl("age", col("t0", "age")),
            ],
            Node::table("users", "t0"),
        )
    }

    #[test]
    fn test_prunes_unreferenced_source_columns() {
        let node: Node = select("s0", vec![decl("name", text_col("s1", "name"))], inner().into())
            .with_where(Node::binary(BinaryOp::Gt, col("s1", "age"), Node::constant(3i32)))
            .into();
        let out = UnusedColumnRemoval.transform(&node);
        let source = out.as_select().unwrap().from.as_ref().unwrap().as_select().unwrap();
        let names: Vec<&str> = source.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["name", "age"]);
    }

    #[test]
    fn test_root_and_distinct_are_kept() {
        let node: Node = select(
            "s0",
            vec![decl("x", Node::constant(1i32))],
            inner().with_distinct(true).into(),
        )
        .into();
        let out = UnusedColumnRemoval.transform(&node);
        assert!(Node::same(&out, &node));
    }

    #[test]
    fn test_never_prunes_to_zero_columns() {
        let node: Node = select("s0", vec![decl("x", Node::constant(1i32))], inner().into()).into();
        let out = UnusedColumnRemoval.transform(&node);
        let source = out.as_select().unwrap().from.as_ref().unwrap().as_select().unwrap();
        assert_eq!(source.columns.len(), 1);
        assert_eq!(source.columns[0].name, "id");
    }

    #[test]
    fn test_join_condition_counts_as_use() {
        let orders = select(
            "s2",
            vec![decl("user_id", col("t1", "user_id")), decl("total", col("t1", "total"))],
            Node::table("orders", "t1"),
        );
        let join: Node = JoinNode::new(
            JoinKind::Inner,
            inner().into(),
            orders.into(),
            Some(Node::equal(col("s1", "id"), col("s2", "user_id"))),
        )
        .unwrap()
        .into();
        let node: Node = select("s0", vec![decl("total", col("s2", "total"))], join).into();
        let out = UnusedColumnRemoval.transform(&node);
        let Node::Join(join) = out.as_select().unwrap().from.clone().unwrap() else {
            panic!("expected join");
        };
        assert_eq!(join.left.as_select().unwrap().columns.len(), 1);
        assert_eq!(join.right.as_select().unwrap().columns.len(), 2);
    }

    fn names(select: &SelectNode) -> Vec<&str> {
        select.columns.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_star_parent_keeps_source_columns() {
        for columns in [vec![], vec![ColumnDeclaration::wildcard()]] {
            let node: Node = select("s0", columns, inner().into()).into();
            let out = UnusedColumnRemoval.transform(&node);
            assert!(Node::same(&out, &node));
            let source = out.as_select().unwrap().from.as_ref().unwrap().as_select().unwrap();
            assert_eq!(names(source), vec!["id", "name", "age"]);
        }
    }

    #[test]
    fn test_join_under_star_parent_keeps_both_sides() {
        let orders = select(
            "s2",
            vec![decl("user_id", col("t1", "user_id")), decl("total", col("t1", "total"))],
            Node::table("orders", "t1"),
        );
        let join: Node = JoinNode::new(
            JoinKind::Inner,
            inner().into(),
            orders.into(),
            Some(Node::equal(col("s1", "id"), col("s2", "user_id"))),
        )
        .unwrap()
        .into();
        let node: Node = select("s0", vec![], join).into();
        let out = UnusedColumnRemoval.transform(&node);
        let Node::Join(join) = out.as_select().unwrap().from.clone().unwrap() else {
            panic!("expected join");
        };
        assert_eq!(names(join.left.as_select().unwrap()), vec!["id", "name", "age"]);
        assert_eq!(names(join.right.as_select().unwrap()), vec!["user_id", "total"]);
    }

    #[test]
    fn test_star_source_keeps_its_own_source_whole() {
        // s0 names s1.name only; s1 is star so s2 stays whole
        let middle = select("s1", vec![], inner().into());
        let node: Node = select("s0", vec![decl("name", text_col("s1", "name"))], middle.into()).into();
        let out = UnusedColumnRemoval.transform(&node);
        let middle = out.as_select().unwrap().from.as_ref().unwrap().as_select().unwrap();
        assert!(middle.columns.is_empty());
        let source = middle.from.as_ref().unwrap().as_select().unwrap();
        assert_eq!(names(source), vec!["id", "name", "age"]);
    }
}
