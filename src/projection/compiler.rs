use std::collections::HashMap;

use crate::error::{CompileError, QueryError, QueryResult};
use crate::execution::{BoundQuery, Row};
use crate::ir::{DataType, Node, SelectNode, Value};

use super::{Materialized, ObjectFactory, ProjectionExpr, ProjectionValues};

/// Runs the correlated query of a nested projection.
pub trait NestedExecutor {
    fn execute_nested(
        &self,
        query: &BoundQuery,
        parameters: &HashMap<String, Value>,
    ) -> QueryResult<Vec<Materialized>>;
}

/// Everything a projector reads besides the row.
pub struct ProjectionEnv<'a> {
    pub arguments: &'a [Value],
    pub values: &'a ProjectionValues,
    pub factory: &'a dyn ObjectFactory,
    pub nested: &'a dyn NestedExecutor,
}

#[derive(Debug, Clone)]
enum Step {
    /// The whole row: its single value, or a tuple of all of them.
    Row,
    Ordinal { ordinal: usize, data_type: DataType },
    /// Star selects: the column is found by name in each row.
    Named { name: String, data_type: DataType },
    Constant(usize),
    Argument(usize),
    Entity {
        entity: String,
        fields: Vec<(String, Step)>,
    },
    Tuple(Vec<Step>),
    Nested {
        slot: usize,
        correlations: Vec<(String, Step)>,
    },
}

/// A compiled row → object function.
#[derive(Debug, Clone)]
pub struct Projector {
    root: Step,
    constant_slots: usize,
    nested_slots: usize,
}

struct Compiler<'n> {
    select: Option<&'n SelectNode>,
    constant_slots: usize,
    nested_slots: usize,
}

impl Compiler<'_> {
    fn column(&self, name: &str, data_type: &DataType) -> Result<Step, CompileError> {
        let select = self.select.ok_or_else(|| {
            CompileError::InvalidNode(format!("column {} projected from a non-query statement", name))
        })?;
        if select.projects_star() {
            return Ok(Step::Named {
                name: name.to_string(),
                data_type: data_type.clone(),
            });
        }
        let ordinal = select
            .column_index(name)
            .ok_or_else(|| CompileError::UnresolvedColumn(name.to_string()))?;
        Ok(Step::Ordinal {
            ordinal,
            data_type: data_type.clone(),
        })
    }

    // slots are assigned in the order ProjectionExpr::values collects them
    fn step(&mut self, expr: &ProjectionExpr) -> Result<Step, CompileError> {
        Ok(match expr {
            ProjectionExpr::Column { name, data_type } => self.column(name, data_type)?,
            ProjectionExpr::Constant(_) => {
                self.constant_slots += 1;
                Step::Constant(self.constant_slots - 1)
            }
            ProjectionExpr::Placeholder(index) => Step::Argument(*index),
            ProjectionExpr::Entity { entity, fields } => Step::Entity {
                entity: entity.clone(),
                fields: fields
                    .iter()
                    .map(|f| Ok((f.name.clone(), self.step(&f.value)?)))
                    .collect::<Result<_, CompileError>>()?,
            },
            ProjectionExpr::Tuple(items) => Step::Tuple(
                items
                    .iter()
                    .map(|i| self.step(i))
                    .collect::<Result<_, _>>()?,
            ),
            ProjectionExpr::Nested { correlations, .. } => {
                let slot = self.nested_slots;
                self.nested_slots += 1;
                Step::Nested {
                    slot,
                    correlations: correlations
                        .iter()
                        .map(|c| Ok((c.parameter.clone(), self.step(&c.value)?)))
                        .collect::<Result<_, CompileError>>()?,
                }
            }
        })
    }
}

impl Projector {
    /// Compile `projection` against the columns of the (optimized, amended)
    /// root node. Without a projection, rows are returned as they are.
    pub fn compile(projection: Option<&ProjectionExpr>, root: &Node) -> Result<Self, CompileError> {
        let mut compiler = Compiler {
            select: root.as_select().map(|s| s.as_ref()),
            constant_slots: 0,
            nested_slots: 0,
        };
        let root = match projection {
            Some(expr) => compiler.step(expr)?,
            None => Step::Row,
        };
        Ok(Self {
            root,
            constant_slots: compiler.constant_slots,
            nested_slots: compiler.nested_slots,
        })
    }

    pub fn project(&self, row: &Row, env: &ProjectionEnv<'_>) -> QueryResult<Materialized> {
        if env.values.constants.len() != self.constant_slots
            || env.values.nested.len() != self.nested_slots
        {
            return Err(QueryError::Projection(
                "projection values do not match the compiled projector".into(),
            ));
        }
        self.eval(&self.root, row, env)
    }

    fn eval(&self, step: &Step, row: &Row, env: &ProjectionEnv<'_>) -> QueryResult<Materialized> {
        Ok(match step {
            Step::Row => match row.values() {
                [single] => Materialized::Value(single.clone()),
                values => Materialized::Tuple(values.iter().cloned().map(Materialized::Value).collect()),
            },
            Step::Ordinal { ordinal, data_type } => {
                let value = row.get(*ordinal).ok_or_else(|| {
                    QueryError::Projection(format!(
                        "row has {} columns, projector reads column {}",
                        row.len(),
                        ordinal
                    ))
                })?;
                Materialized::Value(read_typed(value, data_type)?)
            }
            Step::Named { name, data_type } => {
                let value = row.get_by_name(name).ok_or_else(|| {
                    QueryError::Projection(format!("row has no column named {}", name))
                })?;
                Materialized::Value(read_typed(value, data_type)?)
            }
            Step::Constant(slot) => Materialized::Value(env.values.constants[*slot].clone()),
            Step::Argument(index) => {
                let value = env.arguments.get(*index).ok_or_else(|| {
                    QueryError::Projection(format!("no argument {} for projection", index))
                })?;
                Materialized::Value(value.clone())
            }
            Step::Entity { entity, fields } => {
                let fields = fields
                    .iter()
                    .map(|(name, step)| Ok((name.clone(), self.eval(step, row, env)?)))
                    .collect::<QueryResult<Vec<_>>>()?;
                env.factory.construct(entity, fields)
            }
            Step::Tuple(items) => Materialized::Tuple(
                items
                    .iter()
                    .map(|i| self.eval(i, row, env))
                    .collect::<QueryResult<_>>()?,
            ),
            Step::Nested { slot, correlations } => {
                let query = &env.values.nested[*slot];
                let mut parameters = query.parameters.clone();
                for (parameter, step) in correlations {
                    let value = match self.eval(step, row, env)? {
                        Materialized::Value(v) => v,
                        other => {
                            return Err(QueryError::Projection(format!(
                                "correlation {} is not a scalar: {:?}",
                                parameter, other
                            )))
                        }
                    };
                    parameters.insert(parameter.clone(), value);
                }
                Materialized::List(env.nested.execute_nested(query, &parameters)?)
            }
        })
    }
}

fn value_type(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Boolean
            | DataType::Int32
            | DataType::Int64
            | DataType::Double
            | DataType::Decimal
            | DataType::DateTime
            | DataType::Guid
    )
}

/// Read a column value as `data_type`, widening where the database's
/// representation differs (bits for booleans, 64-bit integers for counts).
pub(crate) fn read_typed(value: &Value, data_type: &DataType) -> QueryResult<Value> {
    let mismatch = || QueryError::Projection(format!("cannot read {} as {}", value, data_type));
    if value.is_null() {
        if value_type(data_type) {
            return Err(QueryError::Projection(format!("null read as non-nullable {}", data_type)));
        }
        return Ok(Value::Null);
    }
    Ok(match (data_type.underlying(), value) {
        (DataType::Boolean, Value::Bool(b)) => Value::Bool(*b),
        (DataType::Boolean, Value::Int32(_) | Value::Int64(_)) => {
            Value::Bool(value.as_i64().is_some_and(|n| n != 0))
        }
        (DataType::Int32, Value::Int32(n)) => Value::Int32(*n),
        (DataType::Int32, Value::Int64(n)) => Value::Int32(i32::try_from(*n).map_err(|_| mismatch())?),
        (DataType::Int64, Value::Int32(_) | Value::Int64(_)) => {
            Value::Int64(value.as_i64().ok_or_else(mismatch)?)
        }
        (DataType::Double, Value::Double(_) | Value::Int32(_) | Value::Int64(_) | Value::Decimal(_)) => {
            Value::Double(value.as_f64().ok_or_else(mismatch)?)
        }
        (DataType::Decimal, Value::Decimal(d)) => Value::Decimal(d.clone()),
        (DataType::Decimal, Value::Int32(_) | Value::Int64(_) | Value::Double(_)) => {
            Value::Decimal(value.to_string())
        }
        (DataType::Guid, Value::Guid(g) | Value::Text(g)) => Value::Guid(g.clone()),
        (DataType::Text | DataType::Enum(_), Value::Text(s)) => Value::Text(s.clone()),
        (DataType::DateTime, Value::DateTime(_)) | (DataType::Binary, Value::Binary(_)) => value.clone(),
        (DataType::Unknown | DataType::Entity(_) | DataType::Tuple(_) | DataType::Sequence(_), _) => {
            value.clone()
        }
        _ => return Err(mismatch()),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ir::ColumnDeclaration;
    use crate::projection::{Correlation, DynamicObjectFactory, FieldProjection};

    struct NoNested;

    impl NestedExecutor for NoNested {
        fn execute_nested(
            &self,
            _query: &BoundQuery,
            parameters: &HashMap<String, Value>,
        ) -> QueryResult<Vec<Materialized>> {
            // echo the correlated value so tests can see it
            Ok(vec![Materialized::Value(
                parameters.get("user_id").cloned().unwrap_or(Value::Null),
            )])
        }
    }

    fn root() -> Node {
        SelectNode::new(
            "s0",
            vec![
                ColumnDeclaration::new("id", Node::column("t0", "id", DataType::Int64)),
                ColumnDeclaration::new("active", Node::column("t0", "active", DataType::Boolean)),
            ],
            Some(Node::table("users", "t0")),
        )
        .into()
    }

    fn row() -> Row {
        Row::new(
            Arc::from(vec!["id".to_string(), "active".to_string()]),
            vec![Value::Int32(7), Value::Int32(1)],
        )
    }

    fn run(projector: &Projector, expr: Option<&ProjectionExpr>) -> QueryResult<Materialized> {
        let values = expr.map(ProjectionExpr::values).unwrap_or_default();
        let env = ProjectionEnv {
            arguments: &[],
            values: &values,
            factory: &DynamicObjectFactory,
            nested: &NoNested,
        };
        projector.project(&row(), &env)
    }

    #[test]
    fn test_entity_reads_typed_columns() {
        let expr = ProjectionExpr::entity(
            "User",
            vec![
                FieldProjection::new("Id", ProjectionExpr::column("id", DataType::Int64)),
                FieldProjection::new("Active", ProjectionExpr::column("active", DataType::Boolean)),
                FieldProjection::new("Source", ProjectionExpr::Constant(Value::from("db"))),
            ],
        );
        let projector = Projector::compile(Some(&expr), &root()).unwrap();
        let out = run(&projector, Some(&expr)).unwrap();
        let user = out.as_object().unwrap();
        assert_eq!(user.field("Id"), Some(&Materialized::Value(Value::Int64(7))));
        assert_eq!(user.field("Active"), Some(&Materialized::Value(Value::Bool(true))));
        assert_eq!(user.field("Source"), Some(&Materialized::Value(Value::from("db"))));
    }

    #[test]
    fn test_unknown_column_fails_compile() {
        let expr = ProjectionExpr::column("missing", DataType::Text);
        assert!(matches!(
            Projector::compile(Some(&expr), &root()),
            Err(CompileError::UnresolvedColumn(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_star_root_resolves_by_name() {
        let star: Node = SelectNode::new("s0", vec![], Some(Node::table("users", "t0"))).into();
        let expr = ProjectionExpr::column("active", DataType::Boolean);
        let projector = Projector::compile(Some(&expr), &star).unwrap();
        assert_eq!(
            run(&projector, Some(&expr)).unwrap(),
            Materialized::Value(Value::Bool(true))
        );
    }

    #[test]
    fn test_no_projection_returns_row() {
        let projector = Projector::compile(None, &root()).unwrap();
        assert_eq!(
            run(&projector, None).unwrap(),
            Materialized::Tuple(vec![
                Materialized::Value(Value::Int32(7)),
                Materialized::Value(Value::Int32(1))
            ])
        );
    }

    #[test]
    fn test_nested_receives_correlated_values() {
        let nested = BoundQuery::new(SelectNode::new("n0", vec![], Some(Node::table("orders", "o0"))).into());
        let expr = ProjectionExpr::Nested {
            query: Arc::new(nested),
            correlations: vec![Correlation::new(
                "user_id",
                ProjectionExpr::column("id", DataType::Int64),
            )],
        };
        let projector = Projector::compile(Some(&expr), &root()).unwrap();
        let out = run(&projector, Some(&expr)).unwrap();
        assert_eq!(out.as_list(), Some(&[Materialized::Value(Value::Int64(7))][..]));
    }

    #[test]
    fn test_read_typed_conversions() {
        assert_eq!(read_typed(&Value::Int64(1), &DataType::Boolean).unwrap(), Value::Bool(true));
        assert_eq!(read_typed(&Value::Int64(5), &DataType::Int32).unwrap(), Value::Int32(5));
        assert!(read_typed(&Value::Int64(i64::MAX), &DataType::Int32).is_err());
        assert!(read_typed(&Value::Null, &DataType::Int32).is_err());
        assert_eq!(
            read_typed(&Value::Null, &DataType::Int32.nullable()).unwrap(),
            Value::Null
        );
        assert!(read_typed(&Value::from("x"), &DataType::Int64).is_err());
    }
}
