//! Helpers shared by the passes that restructure selects: walking the
//! sources of a `FROM` clause and redirecting column references when a
//! select disappears.

use std::collections::HashMap;
use std::sync::Arc;

use crate::ir::visitor::{walk_rewrite, Rewriter};
use crate::ir::{ColumnNode, Node, SelectNode};

/// The selects that feed `from` directly, looking through joins.
pub(crate) fn source_selects(from: &Node) -> Vec<&Arc<SelectNode>> {
    let mut out = Vec::new();
    collect_sources(from, &mut out);
    out
}

fn collect_sources<'a>(from: &'a Node, out: &mut Vec<&'a Arc<SelectNode>>) {
    match from {
        Node::Select(s) => out.push(s),
        Node::Join(j) => {
            collect_sources(&j.left, out);
            collect_sources(&j.right, out);
        }
        _ => {}
    }
}

/// Rebuild a `FROM` tree, replacing each source select with `f(select)`.
/// Joins are rebuilt only where a side changed.
pub(crate) fn map_sources(from: &Node, f: &mut dyn FnMut(&Arc<SelectNode>) -> Node) -> Node {
    match from {
        Node::Select(s) => f(s),
        Node::Join(j) => {
            let left = map_sources(&j.left, f);
            let right = map_sources(&j.right, f);
            Node::Join(j.change(left, right, j.condition.clone()))
        }
        other => other.clone(),
    }
}

/// The alias a single (non-join) source exposes.
pub(crate) fn source_alias(source: &Node) -> Option<&str> {
    match source {
        Node::Table(t) => Some(&t.alias),
        Node::Select(s) => Some(&s.alias),
        _ => None,
    }
}

/// How references to a removed select resolve.
#[derive(Debug, Clone)]
pub(crate) struct ColumnMapping {
    alias: String,
    columns: HashMap<String, Node>,
    /// For a `*` select: the alias of its single source.
    passthrough: Option<String>,
}

impl ColumnMapping {
    /// Mapping for references to `select`'s columns once it is inlined into
    /// its parent. `None` when a `*` select sits over a join, where a bare
    /// column name can't be attributed to one source.
    pub(crate) fn of_select(select: &SelectNode) -> Option<Self> {
        let passthrough = if select.projects_star() {
            Some(source_alias(select.from.as_ref()?)?.to_string())
        } else {
            None
        };
        Some(Self {
            alias: select.alias.clone(),
            columns: select
                .columns
                .iter()
                .filter(|c| !c.is_wildcard())
                .map(|c| (c.name.clone(), c.expression.clone()))
                .collect(),
            passthrough,
        })
    }

    /// Mapping that renames individual columns of one select.
    pub(crate) fn renames(alias: &str, renames: HashMap<String, Node>) -> Self {
        Self {
            alias: alias.to_string(),
            columns: renames,
            passthrough: None,
        }
    }

    fn resolve(&self, column: &ColumnNode) -> Option<Node> {
        if column.select_alias != self.alias {
            return None;
        }
        if let Some(expression) = self.columns.get(&column.name) {
            return Some(expression.clone());
        }
        self.passthrough
            .as_ref()
            .map(|alias| Node::column(alias.clone(), column.name.clone(), column.data_type.clone()))
    }
}

struct Remapper<'a> {
    mappings: &'a [ColumnMapping],
}

impl Rewriter for Remapper<'_> {
    fn rewrite(&mut self, node: &Node) -> Node {
        if let Node::Column(c) = node {
            for mapping in self.mappings {
                if let Some(resolved) = mapping.resolve(c) {
                    // the target may itself point at another removed select
                    return self.rewrite(&resolved);
                }
            }
            return node.clone();
        }
        walk_rewrite(self, node)
    }
}

/// Redirect every column reference covered by `mappings`, anywhere in the tree.
pub(crate) fn remap_columns(node: &Node, mappings: &[ColumnMapping]) -> Node {
    if mappings.is_empty() {
        return node.clone();
    }
    Remapper { mappings }.rewrite(node)
}
