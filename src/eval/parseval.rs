//! Unlabeled Parseval over prediction and gold bracketing files
//!
//! Two span conventions are provided. [`StandardParseval`] compares the spans
//! of internal nodes only (Morey et al., 2018). [`LegacyParseval`] keeps the
//! original RST-Parseval convention of Marcu (2000) and also counts terminal
//! spans. Both leave out the root, which every complete tree shares.

use std::collections::BTreeMap;
use std::path::Path;
use serde::{Serialize, Deserialize};
use crate::data::load_gold_trees;
use crate::tree::{multiset_intersection_size, BinaryTree, Order, Span};
use crate::{RankerError, Result};

/// Unlabeled span category
pub const SPAN_CATEGORY: &str = "S";

/// Micro-averaged scores of one category
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    /// Matched / predicted
    pub precision: f64,
    /// `"matched/predicted"`
    pub precision_info: String,
    /// Matched / gold
    pub recall: f64,
    /// `"matched/gold"`
    pub recall_info: String,
    /// Harmonic mean of precision and recall
    pub micro_f1: f64,
}

impl CategoryScore {
    fn from_counts(matched: usize, n_pred: usize, n_gold: usize) -> Self {
        let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
        let precision = ratio(matched, n_pred);
        let recall = ratio(matched, n_gold);
        let micro_f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        CategoryScore {
            precision,
            precision_info: format!("{}/{}", matched, n_pred),
            recall,
            recall_info: format!("{}/{}", matched, n_gold),
            micro_f1,
        }
    }
}

/// Scores keyed by category
pub type ParsevalScores = BTreeMap<String, CategoryScore>;

/// A bracketing metric computed from a prediction file and a gold file
pub trait ParsevalMetric {
    /// Compare the trees in `pred_path` with those in `gold_path`, line by line
    fn evaluate(&self, pred_path: &Path, gold_path: &Path) -> Result<ParsevalScores>;
}

/// Internal-node spans, root excluded
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardParseval;

/// All node spans including terminals, root excluded
#[derive(Clone, Copy, Debug, Default)]
pub struct LegacyParseval;

impl ParsevalMetric for StandardParseval {
    fn evaluate(&self, pred_path: &Path, gold_path: &Path) -> Result<ParsevalScores> {
        evaluate_files(pred_path, gold_path, false)
    }
}

impl ParsevalMetric for LegacyParseval {
    fn evaluate(&self, pred_path: &Path, gold_path: &Path) -> Result<ParsevalScores> {
        evaluate_files(pred_path, gold_path, true)
    }
}

fn evaluate_files(pred_path: &Path, gold_path: &Path, include_terminals: bool) -> Result<ParsevalScores> {
    let pred = load_gold_trees(pred_path)?;
    let gold = load_gold_trees(gold_path)?;
    evaluate_trees(&pred, &gold, include_terminals)
}

/// Micro-averaged unlabeled Parseval over paired trees
pub fn evaluate_trees(pred: &[BinaryTree], gold: &[BinaryTree], include_terminals: bool) -> Result<ParsevalScores> {
    if pred.len() != gold.len() {
        return Err(RankerError::Evaluation(format!(
            "{} predicted trees but {} gold trees", pred.len(), gold.len()
        )));
    }

    let (mut matched, mut n_pred, mut n_gold) = (0, 0, 0);
    for (i, (p, g)) in pred.iter().zip(gold).enumerate() {
        if p.n_edus() != g.n_edus() {
            return Err(RankerError::Evaluation(format!(
                "Tree {}: predicted tree covers {} EDUs, gold covers {}", i, p.n_edus(), g.n_edus()
            )));
        }
        let p_spans = scored_spans(p, include_terminals);
        let g_spans = scored_spans(g, include_terminals);
        matched += multiset_intersection_size(&p_spans, &g_spans);
        n_pred += p_spans.len();
        n_gold += g_spans.len();
    }

    let mut scores = ParsevalScores::new();
    scores.insert(SPAN_CATEGORY.to_string(), CategoryScore::from_counts(matched, n_pred, n_gold));
    Ok(scores)
}

fn scored_spans(tree: &BinaryTree, include_terminals: bool) -> Vec<Span> {
    // Pre-order puts the root first
    let mut spans = tree.spans(Order::PreOrder, include_terminals);
    if let Some(root) = tree.root() {
        if spans.first() == Some(&tree.span(root)) {
            spans.remove(0);
        }
    }
    spans
}
