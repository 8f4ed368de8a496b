//! Structural tree samplers
//!
//! Both samplers and the decoder share the tiered bottom-up builder in
//! [`build_tiered`], which is what guarantees that every produced tree is
//! binary and covers the whole document.

mod bracketing;
mod tree_sampler;
mod negative;

pub use bracketing::{build_tiered, MergeStrategy};
pub use tree_sampler::{SamplerConfig, SamplingPolicy, TreeSampler};
pub use negative::NegativeTreeSampler;
