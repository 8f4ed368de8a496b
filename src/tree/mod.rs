//! Spans, binary bracketings and the distance between them

mod span;
mod binary;
mod sexp;
mod distance;

pub use span::Span;
pub use binary::{BinaryTree, NodeId, Order};
pub use sexp::{parse_sexp, tokenize_sexp};
pub use distance::{compute_tree_distance, multiset_intersection_size};
