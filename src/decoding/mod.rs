//! Scorer-driven decoding of bracketings

mod incremental;
mod parse;

pub use incremental::IncrementalDecoder;
pub use parse::parse_documents;
