use crate::ir::{DataType, ShapeKey};
use crate::sql::FormatResult;

use super::{ProjectionExpr, ProjectionShape, Projector};

/// Plan cache key: the shape of the optimized, amended IR plus the shape of
/// the projection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlanKey {
    pub shape: ShapeKey,
    pub projection: Option<ProjectionShape>,
}

impl PlanKey {
    pub fn new(shape: ShapeKey, projection: Option<&ProjectionExpr>) -> Self {
        Self {
            shape,
            projection: projection.cloned().map(ProjectionShape),
        }
    }
}

/// Everything compiled once per shape.
#[derive(Debug)]
pub struct CompiledPlan {
    /// Command text and slots, formatted from the substituted tree.
    pub command: FormatResult,
    pub projector: Projector,
    pub element_type: DataType,
}
