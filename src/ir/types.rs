//! Semantic types carried by IR nodes, plus the entity metadata that
//! object-shaped operands and projections refer to.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The type a consumer of a node would materialize.
///
/// Statement and DDL nodes are always [`DataType::Void`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DataType {
    #[default]
    Void,
    Boolean,
    Int32,
    Int64,
    Double,
    Decimal,
    Text,
    DateTime,
    Guid,
    Binary,
    /// A named enumeration (native type on dialects that have them, text elsewhere).
    Enum(String),
    /// A mapped entity type, by name.
    Entity(String),
    Tuple(Vec<DataType>),
    Sequence(Box<DataType>),
    Nullable(Box<DataType>),
    Unknown,
}

impl DataType {
    /// Strip a `Nullable` wrapper.
    pub fn underlying(&self) -> &DataType {
        match self {
            DataType::Nullable(inner) => inner.underlying(),
            other => other,
        }
    }

    pub fn nullable(self) -> DataType {
        match self {
            DataType::Nullable(_) => self,
            other => DataType::Nullable(Box::new(other)),
        }
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self.underlying(), DataType::Boolean)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self.underlying(),
            DataType::Int32 | DataType::Int64 | DataType::Double | DataType::Decimal
        )
    }

    pub fn is_text(&self) -> bool {
        matches!(self.underlying(), DataType::Text)
    }

    /// Element type of a sequence; the type itself otherwise.
    pub fn element(&self) -> &DataType {
        match self {
            DataType::Sequence(inner) => inner,
            other => other,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Void => write!(f, "void"),
            DataType::Boolean => write!(f, "bool"),
            DataType::Int32 => write!(f, "int32"),
            DataType::Int64 => write!(f, "int64"),
            DataType::Double => write!(f, "double"),
            DataType::Decimal => write!(f, "decimal"),
            DataType::Text => write!(f, "text"),
            DataType::DateTime => write!(f, "datetime"),
            DataType::Guid => write!(f, "guid"),
            DataType::Binary => write!(f, "binary"),
            DataType::Enum(name) => write!(f, "enum {}", name),
            DataType::Entity(name) => write!(f, "{}", name),
            DataType::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            DataType::Sequence(inner) => write!(f, "seq<{}>", inner),
            DataType::Nullable(inner) => write!(f, "{}?", inner),
            DataType::Unknown => write!(f, "unknown"),
        }
    }
}

/// A mapped property of an entity type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyDef {
    pub name: String,
    pub column: String,
    pub data_type: DataType,
    #[serde(default)]
    pub primary_key: bool,
    /// Auto-increment column, value assigned by the database.
    #[serde(default)]
    pub identity: bool,
    #[serde(default)]
    pub nullable: bool,
}

impl PropertyDef {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        let name = name.into();
        Self {
            column: name.clone(),
            name,
            data_type,
            primary_key: false,
            identity: false,
            nullable: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn identity(mut self) -> Self {
        self.identity = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }
}

/// Metadata for a mapped entity type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityType {
    pub name: String,
    pub table: String,
    pub properties: Vec<PropertyDef>,
}

impl EntityType {
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            properties: Vec::new(),
        }
    }

    pub fn with_property(mut self, property: PropertyDef) -> Self {
        self.properties.push(property);
        self
    }

    pub fn primary_key(&self) -> impl Iterator<Item = &PropertyDef> {
        self.properties.iter().filter(|p| p.primary_key)
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn identity_property(&self) -> Option<&PropertyDef> {
        self.properties.iter().find(|p| p.identity)
    }

    pub fn data_type(&self) -> DataType {
        DataType::Entity(self.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_underlying_strips_nullable() {
        let ty = DataType::Int64.nullable();
        assert_eq!(ty.underlying(), &DataType::Int64);
        assert!(ty.is_numeric());
        // nullable of nullable collapses
        assert_eq!(ty.clone().nullable(), ty);
    }

    #[test]
    fn test_display_tuple() {
        let ty = DataType::Tuple(vec![DataType::Int32, DataType::Text]);
        assert_eq!(ty.to_string(), "(int32, text)");
        assert_eq!(
            DataType::Sequence(Box::new(DataType::Entity("User".into()))).to_string(),
            "seq<User>"
        );
    }

    #[test]
    fn test_entity_primary_key() {
        let entity = EntityType::new("Order", "orders")
            .with_property(PropertyDef::new("Region", DataType::Text).primary_key())
            .with_property(PropertyDef::new("Number", DataType::Int64).primary_key())
            .with_property(PropertyDef::new("Total", DataType::Double));
        let keys: Vec<&str> = entity.primary_key().map(|p| p.name.as_str()).collect();
        assert_eq!(keys, vec!["Region", "Number"]);
        assert!(entity.identity_property().is_none());
    }
}
