//! Unconstrained random trees used as generic negatives

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use super::{build_tiered, MergeStrategy, SamplingPolicy};
use crate::data::{BoundaryFlags, Document, Level};
use crate::tree::{BinaryTree, NodeId};
use crate::Result;

/// Samples random bracketings that ignore sentence and paragraph boundaries
///
/// Each call picks random bottom-up or random top-down construction with
/// equal probability.
pub struct NegativeTreeSampler {
    rng: StdRng,
}

impl NegativeTreeSampler {
    /// Create a sampler with an entropy-seeded RNG
    pub fn new() -> Self {
        NegativeTreeSampler {
            rng: StdRng::from_entropy(),
        }
    }

    /// Create a reproducible sampler
    pub fn with_seed(seed: u64) -> Self {
        NegativeTreeSampler {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Sample a complete tree over `doc`
    pub fn sample(&mut self, doc: &Document) -> Result<BinaryTree> {
        build_tiered(doc, BoundaryFlags::none(), self)
    }
}

impl Default for NegativeTreeSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl MergeStrategy for NegativeTreeSampler {
    fn merge_units(&mut self, tree: &mut BinaryTree, units: &[NodeId], _level: Level) -> Result<NodeId> {
        let policy = if self.rng.gen_bool(0.5) {
            SamplingPolicy::RandomBottomUp
        } else {
            SamplingPolicy::RandomTopDown
        };
        policy.merge(tree, units, &mut self.rng)
    }
}
