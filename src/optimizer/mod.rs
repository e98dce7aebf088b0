/// IR optimization and transformation infrastructure.
///
/// Provides a pass-based system for rewriting query IR before it reaches a
/// dialect. Each pass takes a tree and returns a tree with the same
/// semantics; a pass that finds nothing to do hands back the very same
/// node, which is how the optimizer detects a fixpoint.
use tracing::{debug, warn};

use crate::ir::Node;

mod aggregate_rewriting;
mod collection_expansion;
mod conditional_elimination;
mod function_coalescing;
mod group_by_collation;
pub(crate) mod mapping;
mod object_operand;
mod partial_evaluation;
mod redundant_binary;
mod redundant_columns;
mod redundant_function;
mod redundant_subquery;
mod unused_columns;

pub use aggregate_rewriting::AggregateRewriting;
pub use collection_expansion::CollectionExpansion;
pub use conditional_elimination::ConditionalElimination;
pub use function_coalescing::FunctionCoalescing;
pub use group_by_collation::GroupByCollation;
pub use object_operand::ObjectOperandComparison;
pub use partial_evaluation::PartialEvaluation;
pub use redundant_binary::RedundantBinaryRemoval;
pub use redundant_columns::RedundantColumnRemoval;
pub use redundant_function::RedundantFunctionRemoval;
pub use redundant_subquery::RedundantSubqueryRemoval;
pub use unused_columns::UnusedColumnRemoval;

pub const DEFAULT_MAX_ITERATIONS: usize = 8;

/// A single optimization or transformation pass over query IR.
///
/// Passes are pure and infallible: given the same input they produce the
/// same output, and shapes they do not recognize pass through untouched.
///
/// # Example
///
/// ```ignore
/// struct DropTautologies;
///
/// impl OptimizationPass for DropTautologies {
///     fn name(&self) -> &str { "drop_tautologies" }
///     fn transform(&self, node: &Node) -> Node {
///         transform_up(node, |n| /* WHERE 1 = 1 -> (removed) */ None)
///     }
/// }
/// ```
pub trait OptimizationPass: Send + Sync {
    /// Unique name identifying this pass.
    fn name(&self) -> &str;

    /// Optional description of what this pass does.
    fn description(&self) -> &str {
        ""
    }

    /// Transform a tree, returning the input itself when nothing applies.
    fn transform(&self, node: &Node) -> Node;
}

/// Manages and executes a pipeline of optimization passes.
///
/// The whole pipeline is re-run until a round changes nothing, bounded by
/// `max_iterations`.
pub struct Optimizer {
    passes: Vec<Box<dyn OptimizationPass>>,
    max_iterations: usize,
}

impl Default for Optimizer {
    fn default() -> Self {
        Self {
            passes: Vec::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl Optimizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an optimizer with the default set of passes, in pipeline order.
    pub fn with_defaults() -> Self {
        let mut opt = Self::new();
        opt.add_pass(Box::new(GroupByCollation));
        opt.add_pass(Box::new(AggregateRewriting));
        opt.add_pass(Box::new(UnusedColumnRemoval));
        opt.add_pass(Box::new(RedundantColumnRemoval));
        opt.add_pass(Box::new(RedundantSubqueryRemoval));
        opt.add_pass(Box::new(FunctionCoalescing));
        opt.add_pass(Box::new(RedundantBinaryRemoval));
        opt.add_pass(Box::new(ObjectOperandComparison));
        opt.add_pass(Box::new(PartialEvaluation));
        opt.add_pass(Box::new(RedundantFunctionRemoval));
        opt.add_pass(Box::new(ConditionalElimination));
        opt.add_pass(Box::new(CollectionExpansion));
        opt
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Add an optimization pass to the end of the pipeline.
    pub fn add_pass(&mut self, pass: Box<dyn OptimizationPass>) {
        self.passes.push(pass);
    }

    /// Remove a pass by name. Returns false if no pass had that name.
    pub fn remove_pass(&mut self, name: &str) -> bool {
        let before = self.passes.len();
        self.passes.retain(|p| p.name() != name);
        self.passes.len() != before
    }

    /// Run the pipeline to a fixpoint.
    pub fn optimize(&self, node: &Node) -> Node {
        let mut current = node.clone();
        for iteration in 0..self.max_iterations {
            let mut changed = false;
            for pass in &self.passes {
                let next = pass.transform(&current);
                if !Node::same(&next, &current) {
                    debug!(pass = pass.name(), iteration, "optimization pass applied");
                    changed = true;
                    current = next;
                }
            }
            if !changed {
                return current;
            }
        }
        warn!(
            max_iterations = self.max_iterations,
            "optimizer stopped before reaching a fixpoint"
        );
        current
    }

    /// List registered pass names.
    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Names and descriptions, in pipeline order.
    pub fn describe(&self) -> Vec<(&str, &str)> {
        self.passes
            .iter()
            .map(|p| (p.name(), p.description()))
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::ir::*;

    pub fn col(alias: &str, name: &str) -> Node {
        Node::column(alias, name, DataType::Int32)
    }

    pub fn text_col(alias: &str, name: &str) -> Node {
        Node::column(alias, name, DataType::Text)
    }

    pub fn decl(name: &str, expression: Node) -> ColumnDeclaration {
        ColumnDeclaration::new(name, expression)
    }

    pub fn select(alias: &str, columns: Vec<ColumnDeclaration>, from: Node) -> SelectNode {
        SelectNode::new(alias, columns, Some(from))
    }
}
