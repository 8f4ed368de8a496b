//! Greedy bottom-up (incremental CKY) decoder

use std::collections::{HashMap, HashSet};
use crate::data::{BoundaryFlags, Document, Level};
use crate::nn::{EncodedDocument, SpanScorer};
use crate::sampling::{build_tiered, MergeStrategy};
use crate::tree::{BinaryTree, NodeId, Span};
use crate::{RankerError, Result};

/// Approximate CKY decoder that repeatedly merges the best-scoring adjacent
/// pair of subtrees
///
/// With gold spans supplied, every candidate span missing from the gold
/// bracketing gets `cost` added to its score, so the search favours trees
/// that violate the margin (loss-augmented decoding).
#[derive(Clone, Debug)]
pub struct IncrementalDecoder {
    cost: f32,
}

impl IncrementalDecoder {
    /// Decoder with a unit cost per span absent from the gold tree
    pub fn new() -> Self {
        IncrementalDecoder { cost: 1.0 }
    }

    /// Decoder with a custom augmentation cost
    pub fn with_cost(cost: f32) -> Self {
        IncrementalDecoder { cost }
    }

    /// Augmentation cost per non-gold span
    pub fn cost(&self) -> f32 {
        self.cost
    }

    /// Decode a complete binary tree over `doc`
    ///
    /// `gold_spans = None` gives plain inference; `Some(spans)` gives
    /// loss-augmented decoding against those spans.
    pub fn decode<S: SpanScorer + ?Sized>(
        &self,
        scorer: &S,
        doc: &Document,
        encoded: &EncodedDocument,
        flags: BoundaryFlags,
        gold_spans: Option<&[Span]>,
    ) -> Result<BinaryTree> {
        let mut strategy = GreedyMerge {
            scorer,
            doc,
            encoded,
            gold: gold_spans.map(|spans| spans.iter().copied().collect()),
            cost: self.cost,
            cache: HashMap::new(),
        };
        build_tiered(doc, flags, &mut strategy)
    }
}

impl Default for IncrementalDecoder {
    fn default() -> Self {
        Self::new()
    }
}

struct GreedyMerge<'a, S: ?Sized> {
    scorer: &'a S,
    doc: &'a Document,
    encoded: &'a EncodedDocument,
    gold: Option<HashSet<Span>>,
    cost: f32,
    /// Model scores of spans already seen during this decode
    cache: HashMap<Span, f32>,
}

impl<S: SpanScorer + ?Sized> GreedyMerge<'_, S> {
    fn score_missing(&mut self, candidates: &[Span]) -> Result<()> {
        let missing: Vec<Span> = candidates
            .iter()
            .filter(|span| !self.cache.contains_key(span))
            .copied()
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        let scores = self.scorer.score_spans(self.doc, self.encoded, std::slice::from_ref(&missing), false)?;
        if scores.len() != missing.len() {
            return Err(RankerError::Scorer(format!(
                "Expected {} span scores, got {}", missing.len(), scores.len()
            )));
        }
        for (span, &score) in missing.into_iter().zip(scores.iter()) {
            if !score.is_finite() {
                return Err(RankerError::Scorer(format!("Non-finite score for span {:?}", span)));
            }
            self.cache.insert(span, score);
        }
        Ok(())
    }

    fn augmented_score(&self, span: &Span) -> f32 {
        let score = self.cache.get(span).copied().unwrap_or(f32::NEG_INFINITY);
        match &self.gold {
            Some(gold) if !gold.contains(span) => score + self.cost,
            _ => score,
        }
    }
}

impl<S: SpanScorer + ?Sized> MergeStrategy for GreedyMerge<'_, S> {
    fn merge_units(&mut self, tree: &mut BinaryTree, units: &[NodeId], _level: Level) -> Result<NodeId> {
        if units.is_empty() {
            return Err(RankerError::InvalidTree("Nothing to merge".to_string()));
        }

        let mut units = units.to_vec();
        while units.len() > 1 {
            let candidates: Vec<Span> = units
                .windows(2)
                .map(|pair| tree.span(pair[0]).join(&tree.span(pair[1])))
                .collect();
            self.score_missing(&candidates)?;

            let mut best = 0;
            let mut best_score = f32::NEG_INFINITY;
            for (i, span) in candidates.iter().enumerate() {
                let score = self.augmented_score(span);
                if score > best_score {
                    best_score = score;
                    best = i;
                }
            }

            let merged = tree.merge(units[best], units[best + 1])?;
            units[best] = merged;
            units.remove(best + 1);
        }

        Ok(units[0])
    }
}
