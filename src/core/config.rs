//! Training configuration

use std::path::{Path, PathBuf};
use serde::{Serialize, Deserialize};
use crate::data::BoundaryFlags;
use crate::nn::{Optimizer, OptimizerKind};
use crate::sampling::SamplerConfig;
use crate::{RankerError, Result};

/// Files read and written during training
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputPaths {
    /// Training stream, one record per mini-batch
    pub path_train_log: PathBuf,
    /// Validation stream, one record per validated epoch
    pub path_valid_log: PathBuf,
    /// Model checkpoint
    pub path_snapshot: PathBuf,
    /// Bracketings predicted for the dev set
    pub path_pred: PathBuf,
    /// Gold bracketings of the dev set
    pub path_gold: PathBuf,
}

impl OutputPaths {
    /// Conventional file names inside `dir`
    pub fn in_dir<P: AsRef<Path>, G: Into<PathBuf>>(dir: P, path_gold: G) -> Self {
        let dir = dir.as_ref();
        OutputPaths {
            path_train_log: dir.join("train.jsonl"),
            path_valid_log: dir.join("valid.jsonl"),
            path_snapshot: dir.join("model.json"),
            path_pred: dir.join("valid.pred.ctrees"),
            path_gold: path_gold.into(),
        }
    }
}

fn default_max_patience() -> usize {
    10
}

fn default_boundary_flags() -> Vec<BoundaryFlags> {
    vec![BoundaryFlags::new(true, false)]
}

/// Margin-ranking trainer configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Number of epochs
    pub max_epoch: usize,
    /// Epochs whose positive trees come from the tree sampler
    pub n_init_epochs: usize,
    /// Negative trees per instance
    pub negative_size: usize,
    /// Instances per mini-batch
    pub batch_size: usize,
    /// L2 weight decay, 0 disables
    pub weight_decay: f32,
    /// Gradient norm threshold, 0 disables
    pub gradient_clipping: f32,
    /// `sgd`, `momentum_sgd`, `adagrad` or `adam`
    pub optimizer_name: String,
    /// Overrides the optimizer's default learning rate
    #[serde(default)]
    pub learning_rate: Option<f32>,
    /// Non-improving validations tolerated before stopping
    #[serde(default = "default_max_patience")]
    pub max_patience: usize,
    /// Seed for permutations and samplers
    #[serde(default)]
    pub seed: Option<u64>,
    /// Boundary settings of the loss-augmented decoder negatives
    #[serde(default = "default_boundary_flags")]
    pub boundary_flags: Vec<BoundaryFlags>,
    /// Policies of the bootstrap tree sampler
    #[serde(default)]
    pub sampler: SamplerConfig,
    /// Log, checkpoint and evaluation files
    pub paths: OutputPaths,
}

impl TrainConfig {
    /// Configuration with the usual defaults writing into `paths`
    pub fn new(paths: OutputPaths) -> Self {
        TrainConfig {
            max_epoch: 40,
            n_init_epochs: 3,
            negative_size: 5,
            batch_size: 10,
            weight_decay: 1e-5,
            gradient_clipping: 5.0,
            optimizer_name: "adam".to_string(),
            learning_rate: None,
            max_patience: default_max_patience(),
            seed: None,
            boundary_flags: default_boundary_flags(),
            sampler: SamplerConfig::default(),
            paths,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(RankerError::InvalidConfig("Batch size must be positive".to_string()));
        }
        if self.boundary_flags.is_empty() {
            return Err(RankerError::InvalidConfig(
                "At least one boundary flag setting is required".to_string()
            ));
        }
        if self.negative_size < self.boundary_flags.len() {
            return Err(RankerError::InvalidConfig(format!(
                "negative_size ({}) must be at least the number of boundary flag settings ({})",
                self.negative_size,
                self.boundary_flags.len()
            )));
        }
        if self.weight_decay < 0.0 || self.gradient_clipping < 0.0 {
            return Err(RankerError::InvalidConfig(
                "Weight decay and gradient clipping must be non-negative".to_string()
            ));
        }
        if let Some(lr) = self.learning_rate {
            if lr <= 0.0 {
                return Err(RankerError::InvalidConfig(format!("Learning rate must be positive, got {}", lr)));
            }
        }
        self.optimizer_kind()?;
        Ok(())
    }

    /// Parsed optimizer name
    pub fn optimizer_kind(&self) -> Result<OptimizerKind> {
        self.optimizer_name.parse()
    }

    /// Optimizer with the configured hooks
    pub fn build_optimizer(&self) -> Result<Optimizer> {
        Ok(Optimizer::new(self.optimizer_kind()?, self.learning_rate)
            .with_weight_decay(self.weight_decay)
            .with_gradient_clipping(self.gradient_clipping))
    }
}
