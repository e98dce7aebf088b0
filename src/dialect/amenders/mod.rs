//! Dialect-specific IR rewrites.
//!
//! Amenders run once, after the optimizer and before the plan cache key is
//! taken, so the key reflects what will actually be formatted. Like
//! optimization passes they never fail: shapes they don't handle pass
//! through unchanged.

mod boolean;
mod clustered_index;
mod enum_removal;
mod identity_insert;
mod pagination;
mod unique_index;

pub use boolean::BitBooleanNormalizer;
pub use clustered_index::ClusteredIndexNormalizer;
pub use enum_removal::EnumDefinitionRemoval;
pub use identity_insert::IdentityInsertBracketing;
pub use pagination::RowNumberPagination;
pub use unique_index::AnsiNullUniqueIndex;

use crate::ir::Node;

/// Trait for late, dialect-specific rewrites
pub trait Amender: Send + Sync {
    /// Name of the amender
    fn name(&self) -> &str;

    /// Rewrite a tree; returns the input itself when nothing applies
    fn amend(&self, node: &Node) -> Node;
}
