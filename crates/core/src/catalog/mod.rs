//! Balanced tree of top-level categories.

pub mod dump;
pub mod tree;

pub use tree::CatalogTree;
