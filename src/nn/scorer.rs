//! Contract between the training core and a span scorer

use ndarray::{Array1, Array2};
use crate::data::Document;
use crate::tree::Span;
use crate::Result;

/// Per-document encoder output shared by every scoring call on that document
#[derive(Clone, Debug)]
pub struct EncodedDocument {
    /// EDU vectors with one padding row on each side, shape `(n_edus + 2, dim)`
    pub padded: Array2<f32>,
    /// Selects the backward-direction half of a vector, shape `(dim,)`
    pub mask_bwd: Array1<f32>,
    /// Selects the forward-direction half of a vector, shape `(dim,)`
    pub mask_fwd: Array1<f32>,
}

/// Scores spans of a document
///
/// The training core never looks inside the vectors; it only relies on the
/// shapes documented on [`EncodedDocument`] and on `score_spans` returning
/// one score per span set (`aggregate = true`) or one score per span, in
/// order (`aggregate = false`).
pub trait SpanScorer {
    /// Encode each EDU, shape `(n_edus, dim)`
    fn forward_edus(&self, doc: &Document) -> Result<Array2<f32>>;

    /// Add boundary padding, shape `(n_edus + 2, dim)`
    fn pad(&self, vectors: Array2<f32>) -> Array2<f32>;

    /// `(mask_bwd, mask_fwd)`
    fn masks(&self) -> (Array1<f32>, Array1<f32>);

    /// Run the encoder once for a document
    fn encode(&self, doc: &Document) -> Result<EncodedDocument> {
        let padded = self.pad(self.forward_edus(doc)?);
        let (mask_bwd, mask_fwd) = self.masks();
        Ok(EncodedDocument { padded, mask_bwd, mask_fwd })
    }

    /// Score every span set in one batched call
    fn score_spans(
        &self,
        doc: &Document,
        encoded: &EncodedDocument,
        span_sets: &[Vec<Span>],
        aggregate: bool,
    ) -> Result<Array1<f32>>;
}

/// A scorer whose parameters can be fitted by gradient descent
pub trait TrainableScorer: SpanScorer {
    /// Reset accumulated gradients to zero
    fn zero_grads(&mut self);

    /// Accumulate the gradient of `Σ_k upstream[k] · score(span_sets[k])`
    fn backward(
        &mut self,
        doc: &Document,
        encoded: &EncodedDocument,
        span_sets: &[Vec<Span>],
        upstream: &[f32],
    ) -> Result<()>;

    /// Flat parameter vector and its accumulated gradient
    fn parameters_mut(&mut self) -> (&mut Array1<f32>, &Array1<f32>);
}
