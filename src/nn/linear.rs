//! Reference span scorer: hashed EDU features with directional sums and a
//! linear span classifier

use std::path::Path;
use ndarray::{s, Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Serialize, Deserialize};
use super::{EncodedDocument, SpanScorer, TrainableScorer};
use crate::data::Document;
use crate::tree::Span;
use crate::{RankerError, Result};

/// Number of span features appended after the span vector:
/// log length, sentence crossing, paragraph crossing, bias
const N_EXTRA_FEATURES: usize = 4;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a, stable across toolchains so saved weights keep their
/// feature slots
fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |h, &b| (h ^ b as u64).wrapping_mul(FNV_PRIME))
}

/// Configuration of [`LinearSpanModel`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScorerConfig {
    /// EDU vector dimension; the first half holds forward (lexical) states,
    /// the second half backward (syntactic) states
    pub dim: usize,
    /// Seed for weight initialisation
    #[serde(default)]
    pub seed: Option<u64>,
}

impl ScorerConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.dim == 0 || self.dim % 2 != 0 {
            return Err(RankerError::InvalidConfig(
                format!("Scorer dimension must be positive and even, got {}", self.dim)
            ));
        }
        Ok(())
    }
}

impl Default for ScorerConfig {
    fn default() -> Self {
        ScorerConfig { dim: 64, seed: None }
    }
}

/// Linear scorer over span-difference features
///
/// EDUs are encoded as hashed bags of features; the forward half is turned
/// into prefix sums and the backward half into suffix sums, so a span vector
/// is the difference of two boundary states in each direction, the same
/// layout a BiLSTM span encoder uses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LinearSpanModel {
    config: ScorerConfig,
    weights: Array1<f32>,
    #[serde(skip)]
    grads: Array1<f32>,
}

impl LinearSpanModel {
    /// Create a model with small random weights
    pub fn new(config: ScorerConfig) -> Result<Self> {
        config.validate()?;
        let n_params = config.dim + N_EXTRA_FEATURES;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let scale = 1.0 / (n_params as f32).sqrt();
        let weights = Array1::from_shape_fn(n_params, |_| rng.gen_range(-0.1..0.1) * scale);

        Ok(LinearSpanModel {
            config,
            grads: Array1::zeros(n_params),
            weights,
        })
    }

    /// Restore a model written by a JSON checkpoint store
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut model: LinearSpanModel = crate::utils::load_json(path)?;
        model.config.validate()?;
        if model.weights.len() != model.config.dim + N_EXTRA_FEATURES {
            return Err(RankerError::InvalidConfig(format!(
                "Checkpoint has {} weights, expected {}",
                model.weights.len(),
                model.config.dim + N_EXTRA_FEATURES
            )));
        }
        model.zero_grads();
        Ok(model)
    }

    /// Scorer configuration
    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    /// Current weights
    pub fn weights(&self) -> &Array1<f32> {
        &self.weights
    }

    /// Feature vector of one span
    fn span_features(&self, doc: &Document, encoded: &EncodedDocument, span: Span) -> Result<Array1<f32>> {
        let n_rows = encoded.padded.nrows();
        if span.end + 2 >= n_rows {
            return Err(RankerError::Scorer(format!(
                "Span {:?} outside a document of {} EDUs", span, n_rows.saturating_sub(2)
            )));
        }

        let padded = &encoded.padded;
        let (b, e) = (span.start, span.end);
        let fwd = &padded.row(e + 1) - &padded.row(b);
        let bwd = &padded.row(b + 1) - &padded.row(e + 2);
        let repr = &encoded.mask_fwd * &fwd + &encoded.mask_bwd * &bwd;

        let mut features = Array1::zeros(self.weights.len());
        features.slice_mut(s![..self.config.dim]).assign(&repr);
        let extra = [
            (1.0 + span.len() as f32).ln(),
            if span.crosses(&doc.sbnds) { 1.0 } else { 0.0 },
            if span.crosses(&doc.pbnds) { 1.0 } else { 0.0 },
            1.0,
        ];
        features.slice_mut(s![self.config.dim..]).assign(&ArrayView1::from(&extra[..]));
        Ok(features)
    }

    fn check_encoding(&self, encoded: &EncodedDocument) -> Result<()> {
        if encoded.padded.ncols() != self.config.dim
            || encoded.mask_fwd.len() != self.config.dim
            || encoded.mask_bwd.len() != self.config.dim
        {
            return Err(RankerError::Scorer(format!(
                "Encoding has width {}, scorer expects {}",
                encoded.padded.ncols(),
                self.config.dim
            )));
        }
        Ok(())
    }

    fn hash_feature(feature: &str, half: usize) -> (usize, f32) {
        let h = fnv1a(feature.as_bytes());
        let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
        ((h % half as u64) as usize, sign)
    }
}

impl SpanScorer for LinearSpanModel {
    fn forward_edus(&self, doc: &Document) -> Result<Array2<f32>> {
        let dim = self.config.dim;
        let half = dim / 2;
        let mut bags = Array2::<f32>::zeros((doc.len(), dim));

        for (i, edu) in doc.edus.iter().enumerate() {
            let mut row = bags.row_mut(i);
            let mut lexical: Vec<String> = edu.tokens.iter().map(|t| format!("w={}", t.to_lowercase())).collect();
            if let (Some(first), Some(last)) = (edu.tokens.first(), edu.tokens.last()) {
                lexical.push(format!("first={}", first.to_lowercase()));
                lexical.push(format!("last={}", last.to_lowercase()));
            }
            let mut syntactic: Vec<String> = edu.postags.iter().map(|p| format!("p={}", p)).collect();
            if let Some((word, postag)) = edu.head_word() {
                syntactic.push(format!("h={}", word.to_lowercase()));
                syntactic.push(format!("hp={}", postag));
            }

            for feature in &lexical {
                let (idx, sign) = Self::hash_feature(feature, half);
                row[idx] += sign;
            }
            for feature in &syntactic {
                let (idx, sign) = Self::hash_feature(feature, half);
                row[half + idx] += sign;
            }
            for range in [0..half, half..dim] {
                let mut part = row.slice_mut(s![range]);
                let norm = part.dot(&part).sqrt();
                if norm > 0.0 {
                    part /= norm;
                }
            }
        }

        // Forward states accumulate left to right, backward states right to left
        for i in 1..doc.len() {
            let prev = bags.slice(s![i - 1, ..half]).to_owned();
            let mut cur = bags.slice_mut(s![i, ..half]);
            cur += &prev;
        }
        for i in (0..doc.len().saturating_sub(1)).rev() {
            let next = bags.slice(s![i + 1, half..]).to_owned();
            let mut cur = bags.slice_mut(s![i, half..]);
            cur += &next;
        }

        Ok(bags)
    }

    fn pad(&self, vectors: Array2<f32>) -> Array2<f32> {
        let (n, dim) = vectors.dim();
        let mut padded = Array2::zeros((n + 2, dim));
        padded.slice_mut(s![1..n + 1, ..]).assign(&vectors);
        padded
    }

    fn masks(&self) -> (Array1<f32>, Array1<f32>) {
        let half = self.config.dim / 2;
        let mask_bwd = Array1::from_shape_fn(self.config.dim, |i| if i >= half { 1.0 } else { 0.0 });
        let mask_fwd = Array1::from_shape_fn(self.config.dim, |i| if i < half { 1.0 } else { 0.0 });
        (mask_bwd, mask_fwd)
    }

    fn score_spans(
        &self,
        doc: &Document,
        encoded: &EncodedDocument,
        span_sets: &[Vec<Span>],
        aggregate: bool,
    ) -> Result<Array1<f32>> {
        self.check_encoding(encoded)?;
        let per_set: Vec<Vec<f32>> = span_sets
            .par_iter()
            .map(|spans| {
                spans.iter()
                    .map(|&span| Ok(self.span_features(doc, encoded, span)?.dot(&self.weights)))
                    .collect::<Result<Vec<f32>>>()
            })
            .collect::<Result<_>>()?;

        let scores: Vec<f32> = if aggregate {
            per_set.iter().map(|scores| scores.iter().sum::<f32>()).collect()
        } else {
            per_set.into_iter().flatten().collect()
        };
        Ok(Array1::from_vec(scores))
    }
}

impl TrainableScorer for LinearSpanModel {
    fn zero_grads(&mut self) {
        self.grads = Array1::zeros(self.weights.len());
    }

    fn backward(
        &mut self,
        doc: &Document,
        encoded: &EncodedDocument,
        span_sets: &[Vec<Span>],
        upstream: &[f32],
    ) -> Result<()> {
        self.check_encoding(encoded)?;
        if span_sets.len() != upstream.len() {
            return Err(RankerError::Scorer(format!(
                "{} span sets but {} upstream gradients", span_sets.len(), upstream.len()
            )));
        }
        if self.grads.len() != self.weights.len() {
            self.zero_grads();
        }

        let mut total = Array1::<f32>::zeros(self.weights.len());
        for (spans, &coef) in span_sets.iter().zip(upstream) {
            if coef == 0.0 {
                continue;
            }
            for &span in spans {
                total.scaled_add(coef, &self.span_features(doc, encoded, span)?);
            }
        }
        self.grads += &total;
        Ok(())
    }

    fn parameters_mut(&mut self) -> (&mut Array1<f32>, &Array1<f32>) {
        (&mut self.weights, &self.grads)
    }
}
