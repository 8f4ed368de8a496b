//! Unlabeled bracketing evaluation

mod parseval;

pub use parseval::{
    evaluate_trees, CategoryScore, LegacyParseval, ParsevalMetric, ParsevalScores, StandardParseval,
    SPAN_CATEGORY,
};
