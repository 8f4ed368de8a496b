//! # rst-ranker: margin-ranking training for discourse tree parsers
//!
//! This library trains an unsupervised RST-style bracketing parser over
//! elementary discourse units (EDUs). A learned span scorer ranks binary
//! constituency trees, and training pushes positive trees (sampled or
//! decoded) above loss-augmented and randomly sampled negatives.
//!
//! ## Features
//!
//! - **Trees**: inclusive EDU spans, append-only binary tree arena, tree distance
//! - **Sampling**: boundary-aware bootstrap sampler and unconstrained negative sampler
//! - **Decoding**: greedy bottom-up (incremental CKY) decoding, optionally loss-augmented
//! - **Training**: mini-batch hinge loss, optimizer hooks, validation and early stopping
//! - **Evaluation**: unlabeled Parseval in the Morey (2018) and Marcu (2000) flavours

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Spans, binary trees and tree distance
pub mod tree;

/// Documents, EDUs and dataset loading
pub mod data;

/// Structural tree samplers
pub mod sampling;

/// Scorer-driven tree decoding
pub mod decoding;

/// Span scorer contract, reference scorer and optimizers
pub mod nn;

/// Parseval evaluation
pub mod eval;

/// Training configuration, loss and the training loop
pub mod core;

/// Utility functions and helpers
pub mod utils;

// Re-export commonly used types
pub use tree::{BinaryTree, NodeId, Order, Span};
pub use data::{BoundaryFlags, Document, Edu};
pub use self::core::{BestScoreTracker, OutputPaths, TrainConfig, Trainer, TrainingReport, TrainingState};

/// Error types for the library
#[derive(Debug, thiserror::Error)]
pub enum RankerError {
    /// Invalid configuration value
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Invalid tree structure
    #[error("Invalid tree: {0}")]
    InvalidTree(String),

    /// Document violates its structural invariants
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Malformed s-expression
    #[error("S-expression error: {0}")]
    Sexp(String),

    /// Span scorer failure
    #[error("Scorer error: {0}")]
    Scorer(String),

    /// Evaluation failure
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for the library
pub type Result<T> = std::result::Result<T, RankerError>;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        core::{BestScoreTracker, OutputPaths, TrainConfig, Trainer, TrainingReport},
        data::{BoundaryFlags, Document, Edu},
        decoding::IncrementalDecoder,
        eval::{LegacyParseval, ParsevalMetric, StandardParseval},
        utils::{CheckpointStore, JsonCheckpointStore},
        nn::{LinearSpanModel, OptimizerKind, ScorerConfig, SpanScorer, TrainableScorer},
        sampling::{NegativeTreeSampler, SamplerConfig, SamplingPolicy, TreeSampler},
        tree::{compute_tree_distance, BinaryTree, Order, Span},
        RankerError, Result,
    };
}
