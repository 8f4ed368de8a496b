//! Span scoring: the scorer contract, a reference linear scorer and optimizers

mod scorer;
mod linear;
mod optimizer;

pub use scorer::{EncodedDocument, SpanScorer, TrainableScorer};
pub use linear::{LinearSpanModel, ScorerConfig};
pub use optimizer::{Optimizer, OptimizerKind};
