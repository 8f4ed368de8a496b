//! Boundary-respecting tree sampler used to bootstrap self-training

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Serialize, Deserialize};
use super::{build_tiered, MergeStrategy};
use crate::data::{BoundaryFlags, Document, Level};
use crate::tree::{BinaryTree, NodeId};
use crate::Result;

/// How a run of subtrees is bracketed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingPolicy {
    /// `( a ( b ( c d ) ) )`
    RightBranching,
    /// `( ( ( a b ) c ) d )`
    LeftBranching,
    /// Repeatedly merge a uniformly chosen adjacent pair
    RandomBottomUp,
    /// Recursively split at a uniformly chosen point
    RandomTopDown,
}

impl SamplingPolicy {
    /// Bracket `units` into one subtree
    pub fn merge<R: Rng + ?Sized>(self, tree: &mut BinaryTree, units: &[NodeId], rng: &mut R) -> Result<NodeId> {
        match units {
            [] => Err(crate::RankerError::InvalidTree("Nothing to merge".to_string())),
            [single] => Ok(*single),
            _ => match self {
                SamplingPolicy::RightBranching => {
                    let last = units[units.len() - 1];
                    units[..units.len() - 1]
                        .iter()
                        .rev()
                        .try_fold(last, |acc, &unit| tree.merge(unit, acc))
                }
                SamplingPolicy::LeftBranching => {
                    units[1..].iter().try_fold(units[0], |acc, &unit| tree.merge(acc, unit))
                }
                SamplingPolicy::RandomBottomUp => {
                    let mut units = units.to_vec();
                    while units.len() > 1 {
                        let i = rng.gen_range(0..units.len() - 1);
                        let merged = tree.merge(units[i], units[i + 1])?;
                        units[i] = merged;
                        units.remove(i + 1);
                    }
                    Ok(units[0])
                }
                SamplingPolicy::RandomTopDown => split_recursive(tree, units, rng),
            },
        }
    }
}

fn split_recursive<R: Rng + ?Sized>(tree: &mut BinaryTree, units: &[NodeId], rng: &mut R) -> Result<NodeId> {
    if units.len() == 1 {
        return Ok(units[0]);
    }
    let k = rng.gen_range(1..units.len());
    let left = split_recursive(tree, &units[..k], rng)?;
    let right = split_recursive(tree, &units[k..], rng)?;
    tree.merge(left, right)
}

/// Policy for each level of the document hierarchy
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Inside sentences
    pub sentence: SamplingPolicy,
    /// Across sentences inside a paragraph
    pub paragraph: SamplingPolicy,
    /// Across the document
    pub document: SamplingPolicy,
}

impl SamplerConfig {
    /// Policy applied at a level
    pub fn policy(&self, level: Level) -> SamplingPolicy {
        match level {
            Level::Sentence => self.sentence,
            Level::Paragraph => self.paragraph,
            Level::Document => self.document,
        }
    }
}

impl Default for SamplerConfig {
    fn default() -> Self {
        SamplerConfig {
            sentence: SamplingPolicy::RightBranching,
            paragraph: SamplingPolicy::RightBranching,
            document: SamplingPolicy::RightBranching,
        }
    }
}

/// Scorer-free sampler producing positive trees during the first epochs
pub struct TreeSampler {
    config: SamplerConfig,
    rng: StdRng,
}

impl TreeSampler {
    /// Create a sampler with an entropy-seeded RNG
    pub fn new(config: SamplerConfig) -> Self {
        TreeSampler {
            config,
            rng: StdRng::from_entropy(),
        }
    }

    /// Create a reproducible sampler
    pub fn with_seed(config: SamplerConfig, seed: u64) -> Self {
        TreeSampler {
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Policies in use
    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Sample a complete tree over `doc` that respects the boundaries
    /// enabled in `flags`
    pub fn sample(&mut self, doc: &Document, flags: BoundaryFlags) -> Result<BinaryTree> {
        build_tiered(doc, flags, self)
    }
}

impl MergeStrategy for TreeSampler {
    fn merge_units(&mut self, tree: &mut BinaryTree, units: &[NodeId], level: Level) -> Result<NodeId> {
        self.config.policy(level).merge(tree, units, &mut self.rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_support::document;
    use crate::tree::{Order, Span};

    #[test]
    fn test_right_branching_respects_sentences() {
        let doc = document(4, &[(0, 1), (2, 3)], &[(0, 3)]);
        let mut sampler = TreeSampler::with_seed(SamplerConfig::default(), 7);
        let tree = sampler.sample(&doc, BoundaryFlags::default()).unwrap();
        assert_eq!(tree.to_sexp(), "( ( 0 1 ) ( 2 3 ) )");
    }

    #[test]
    fn test_right_branching_without_boundaries() {
        let doc = document(4, &[(0, 1), (2, 3)], &[(0, 3)]);
        let mut sampler = TreeSampler::with_seed(SamplerConfig::default(), 7);
        let tree = sampler.sample(&doc, BoundaryFlags::none()).unwrap();
        assert_eq!(tree.to_sexp(), "( 0 ( 1 ( 2 3 ) ) )");
    }

    #[test]
    fn test_left_branching() {
        let config = SamplerConfig {
            sentence: SamplingPolicy::LeftBranching,
            paragraph: SamplingPolicy::LeftBranching,
            document: SamplingPolicy::LeftBranching,
        };
        let doc = document(3, &[], &[]);
        let mut sampler = TreeSampler::with_seed(config.clone(), 1);
        assert_eq!(sampler.config(), &config);
        assert_eq!(sampler.config().policy(Level::Paragraph), SamplingPolicy::LeftBranching);
        let tree = sampler.sample(&doc, BoundaryFlags::all()).unwrap();
        assert_eq!(tree.to_sexp(), "( ( 0 1 ) 2 )");
    }

    #[test]
    fn test_empty_document() {
        let doc = Document { id: None, edus: Vec::new(), sbnds: Vec::new(), pbnds: Vec::new() };
        let mut sampler = TreeSampler::with_seed(SamplerConfig::default(), 2);
        assert!(sampler.sample(&doc, BoundaryFlags::all()).is_ok());
        assert!(sampler.sample(&doc, BoundaryFlags::none()).is_ok());
    }

    #[test]
    fn test_random_policies_keep_sentences_intact() {
        let config = SamplerConfig {
            sentence: SamplingPolicy::RandomBottomUp,
            paragraph: SamplingPolicy::RandomTopDown,
            document: SamplingPolicy::RandomBottomUp,
        };
        let doc = document(8, &[(0, 2), (3, 4), (5, 7)], &[(0, 4), (5, 7)]);
        let mut sampler = TreeSampler::with_seed(config, 11);
        for _ in 0..20 {
            let tree = sampler.sample(&doc, BoundaryFlags::all()).unwrap();
            assert!(tree.is_complete());
            let spans = tree.internal_spans(Order::PostOrder);
            assert_eq!(spans.len(), 7);
            for span in [Span::new(0, 2), Span::new(3, 4), Span::new(0, 4), Span::new(5, 7)] {
                assert!(spans.contains(&span), "missing {:?}", span);
            }
        }
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&SamplingPolicy::RandomTopDown).unwrap();
        assert_eq!(json, "\"random_top_down\"");
    }
}
