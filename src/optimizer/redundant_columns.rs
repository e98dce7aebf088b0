use std::collections::HashMap;

use crate::ir::compare::{self, CompareFlags};
use crate::ir::visitor::{walk_rewrite, walk_select, walk_visit, Rewriter, Visitor};
use crate::ir::{ColumnDeclaration, Node, SelectNode};

use super::mapping::{remap_columns, source_selects, ColumnMapping};
use super::OptimizationPass;

/// Merges structurally identical column declarations of a source select
/// and redirects references to the dropped names onto the survivor.
///
/// The root select is left alone: its column names are the result shape.
pub struct RedundantColumnRemoval;

impl OptimizationPass for RedundantColumnRemoval {
    fn name(&self) -> &str {
        "redundant_column_removal"
    }

    fn description(&self) -> &str {
        "Merges duplicate column declarations and redirects their references"
    }

    fn transform(&self, node: &Node) -> Node {
        let mut finder = DuplicateFinder {
            duplicates: HashMap::new(),
        };
        finder.visit(node);
        if finder.duplicates.is_empty() {
            return node.clone();
        }

        let pruned = Deduplicator {
            duplicates: &finder.duplicates,
        }
        .rewrite(node);
        let mappings: Vec<ColumnMapping> = finder
            .duplicates
            .into_iter()
            .map(|(alias, renames)| {
                let targets = renames
                    .into_iter()
                    .map(|(dropped, (survivor, expr))| {
                        (dropped, Node::column(alias.clone(), survivor, expr.data_type()))
                    })
                    .collect();
                ColumnMapping::renames(&alias, targets)
            })
            .collect();
        remap_columns(&pruned, &mappings)
    }
}

/// select alias -> dropped column name -> (surviving name, expression)
type Duplicates = HashMap<String, HashMap<String, (String, Node)>>;

struct DuplicateFinder {
    duplicates: Duplicates,
}

impl Visitor for DuplicateFinder {
    fn visit(&mut self, node: &Node) {
        if let Node::Select(s) = node {
            if let Some(from) = &s.from {
                for source in source_selects(from) {
                    let found = duplicates_of(source);
                    if !found.is_empty() {
                        self.duplicates.insert(source.alias.clone(), found);
                    }
                }
            }
        }
        walk_visit(self, node);
    }
}

fn duplicates_of(select: &SelectNode) -> HashMap<String, (String, Node)> {
    let mut found = HashMap::new();
    for (i, column) in select.columns.iter().enumerate() {
        if found.contains_key(&column.name) {
            continue;
        }
        for later in &select.columns[i + 1..] {
            if !found.contains_key(&later.name)
                && compare::equals(&column.expression, &later.expression, CompareFlags::empty())
            {
                found.insert(
                    later.name.clone(),
                    (column.name.clone(), column.expression.clone()),
                );
            }
        }
    }
    found
}

struct Deduplicator<'a> {
    duplicates: &'a Duplicates,
}

impl Rewriter for Deduplicator<'_> {
    fn rewrite(&mut self, node: &Node) -> Node {
        match node {
            Node::Select(s) => {
                let s = walk_select(self, s);
                match self.duplicates.get(&s.alias) {
                    Some(dropped) => {
                        let kept: Vec<ColumnDeclaration> = s
                            .columns
                            .iter()
                            .filter(|c| !dropped.contains_key(&c.name))
                            .cloned()
                            .collect();
                        Node::Select(s.change_columns(kept))
                    }
                    None => Node::Select(s),
                }
            }
            _ => walk_rewrite(self, node),
        }
    }
}
