use serde::Serialize;

use crate::ir::Value;

/// A projected result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Materialized {
    Value(Value),
    Object(Object),
    Tuple(Vec<Materialized>),
    /// Rows of a nested query.
    List(Vec<Materialized>),
}

impl Materialized {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Materialized::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Materialized::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Materialized]> {
        match self {
            Materialized::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<Value> for Materialized {
    fn from(value: Value) -> Self {
        Materialized::Value(value)
    }
}

/// A dynamically typed entity instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Object {
    pub entity: String,
    pub fields: Vec<(String, Materialized)>,
}

impl Object {
    pub fn field(&self, name: &str) -> Option<&Materialized> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

/// Builds entity instances for the projector.
///
/// Runtimes with generated entity types plug in here; the default builds
/// [`Object`]s.
pub trait ObjectFactory: Send + Sync {
    fn construct(&self, entity: &str, fields: Vec<(String, Materialized)>) -> Materialized;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DynamicObjectFactory;

impl ObjectFactory for DynamicObjectFactory {
    fn construct(&self, entity: &str, fields: Vec<(String, Materialized)>) -> Materialized {
        Materialized::Object(Object {
            entity: entity.to_string(),
            fields,
        })
    }
}
