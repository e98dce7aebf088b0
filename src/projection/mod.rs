//! Row → object projection.
//!
//! The binder attaches a [`ProjectionExpr`] to a query describing how to
//! build one result object from one row. [`Projector::compile`] resolves it
//! against the root select once per plan; the compiled projector is cached
//! with the command text and reused for every execution of the shape.
//!
//! Literal values and nested queries are not baked into a projector. They
//! are pulled out of the expression on every execution, in the same order
//! the compiler assigned their slots, so projections that differ only in
//! values share one compiled projector.

mod compiler;
mod object;
mod plan;

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::execution::BoundQuery;
use crate::ir::compare::{self, CompareFlags};
use crate::ir::{DataType, Value};

pub(crate) use compiler::read_typed;
pub use compiler::{NestedExecutor, ProjectionEnv, Projector};
pub use object::{DynamicObjectFactory, Materialized, Object, ObjectFactory};
pub use plan::{CompiledPlan, PlanKey};

/// How to build one result value from one row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProjectionExpr {
    /// A column of the root select, by declared name.
    Column { name: String, data_type: DataType },
    Constant(Value),
    /// Index into the caller-supplied argument list of the query.
    Placeholder(usize),
    Entity {
        entity: String,
        fields: Vec<FieldProjection>,
    },
    Tuple(Vec<ProjectionExpr>),
    /// A correlated query run once per outer row; its rows become a list.
    Nested {
        query: Arc<BoundQuery>,
        correlations: Vec<Correlation>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldProjection {
    pub name: String,
    pub value: ProjectionExpr,
}

impl FieldProjection {
    pub fn new(name: impl Into<String>, value: ProjectionExpr) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Binds a named parameter of a nested query to a value of the outer row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Correlation {
    pub parameter: String,
    pub value: ProjectionExpr,
}

impl Correlation {
    pub fn new(parameter: impl Into<String>, value: ProjectionExpr) -> Self {
        Self {
            parameter: parameter.into(),
            value,
        }
    }
}

/// Per-execution values of a projection's constant and nested slots.
#[derive(Debug, Clone, Default)]
pub struct ProjectionValues {
    pub constants: Vec<Value>,
    pub nested: Vec<Arc<BoundQuery>>,
}

impl ProjectionExpr {
    pub fn column(name: impl Into<String>, data_type: DataType) -> Self {
        ProjectionExpr::Column {
            name: name.into(),
            data_type,
        }
    }

    pub fn entity(entity: impl Into<String>, fields: Vec<FieldProjection>) -> Self {
        ProjectionExpr::Entity {
            entity: entity.into(),
            fields,
        }
    }

    /// Collect constant values and nested queries in slot order.
    pub fn values(&self) -> ProjectionValues {
        let mut out = ProjectionValues::default();
        self.collect_values(&mut out);
        out
    }

    fn collect_values(&self, out: &mut ProjectionValues) {
        match self {
            ProjectionExpr::Column { .. } | ProjectionExpr::Placeholder(_) => {}
            ProjectionExpr::Constant(value) => out.constants.push(value.clone()),
            ProjectionExpr::Entity { fields, .. } => {
                fields.iter().for_each(|f| f.value.collect_values(out))
            }
            ProjectionExpr::Tuple(items) => items.iter().for_each(|i| i.collect_values(out)),
            ProjectionExpr::Nested {
                query,
                correlations,
            } => {
                out.nested.push(Arc::clone(query));
                correlations.iter().for_each(|c| c.value.collect_values(out));
            }
        }
    }
}

/// A projection compared and hashed by shape: constant values are ignored
/// (their type and null-ness are not) and nested queries compare by the
/// shape of their IR.
#[derive(Debug, Clone)]
pub struct ProjectionShape(pub ProjectionExpr);

const SHAPE_FLAGS: CompareFlags = CompareFlags::IGNORE_CONSTANTS;

fn same_shape(a: &ProjectionExpr, b: &ProjectionExpr) -> bool {
    use ProjectionExpr as P;
    match (a, b) {
        (
            P::Column {
                name: n1,
                data_type: t1,
            },
            P::Column {
                name: n2,
                data_type: t2,
            },
        ) => n1 == n2 && t1 == t2,
        (P::Constant(v1), P::Constant(v2)) => {
            v1.is_null() == v2.is_null() && v1.data_type() == v2.data_type()
        }
        (P::Placeholder(i1), P::Placeholder(i2)) => i1 == i2,
        (
            P::Entity {
                entity: e1,
                fields: f1,
            },
            P::Entity {
                entity: e2,
                fields: f2,
            },
        ) => {
            e1 == e2
                && f1.len() == f2.len()
                && f1
                    .iter()
                    .zip(f2)
                    .all(|(x, y)| x.name == y.name && same_shape(&x.value, &y.value))
        }
        (P::Tuple(i1), P::Tuple(i2)) => {
            i1.len() == i2.len() && i1.iter().zip(i2).all(|(x, y)| same_shape(x, y))
        }
        (
            P::Nested {
                query: q1,
                correlations: c1,
            },
            P::Nested {
                query: q2,
                correlations: c2,
            },
        ) => {
            q1.element_type == q2.element_type
                && compare::equals(&q1.root, &q2.root, SHAPE_FLAGS)
                && match (&q1.projection, &q2.projection) {
                    (Some(p1), Some(p2)) => same_shape(p1, p2),
                    (None, None) => true,
                    _ => false,
                }
                && c1.len() == c2.len()
                && c1
                    .iter()
                    .zip(c2)
                    .all(|(x, y)| x.parameter == y.parameter && same_shape(&x.value, &y.value))
        }
        _ => false,
    }
}

fn hash_shape<H: Hasher>(expr: &ProjectionExpr, state: &mut H) {
    std::mem::discriminant(expr).hash(state);
    match expr {
        ProjectionExpr::Column { name, data_type } => {
            name.hash(state);
            data_type.hash(state);
        }
        ProjectionExpr::Constant(value) => {
            value.is_null().hash(state);
            value.data_type().hash(state);
        }
        ProjectionExpr::Placeholder(index) => index.hash(state),
        ProjectionExpr::Entity { entity, fields } => {
            entity.hash(state);
            for field in fields {
                field.name.hash(state);
                hash_shape(&field.value, state);
            }
        }
        ProjectionExpr::Tuple(items) => {
            items.len().hash(state);
            items.iter().for_each(|i| hash_shape(i, state));
        }
        ProjectionExpr::Nested {
            query,
            correlations,
        } => {
            state.write_u64(compare::hash(&query.root, SHAPE_FLAGS));
            if let Some(projection) = &query.projection {
                hash_shape(projection, state);
            }
            for correlation in correlations {
                correlation.parameter.hash(state);
                hash_shape(&correlation.value, state);
            }
        }
    }
}

impl PartialEq for ProjectionShape {
    fn eq(&self, other: &Self) -> bool {
        same_shape(&self.0, &other.0)
    }
}

impl Eq for ProjectionShape {}

impl Hash for ProjectionShape {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_shape(&self.0, state);
    }
}
