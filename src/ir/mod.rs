//! Intermediate representation of relational queries.

pub mod compare;
mod function;
mod node;
pub mod substitute;
mod types;
mod value;
pub mod visitor;

pub use compare::{CompareFlags, ShapeKey};
pub use function::SqlFunction;
pub use node::*;
pub use substitute::substitute_constants;
pub use types::{DataType, EntityType, PropertyDef};
pub use value::Value;
pub use visitor::{Rewriter, Visitor};
