//! Documents, EDUs and dataset loading

mod document;
mod loader;

pub use document::{BoundaryFlags, Document, Edu, Level};
pub use loader::{load_documents, load_gold_trees};
#[cfg(test)]
pub(crate) use document::test_support;
