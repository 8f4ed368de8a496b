//! Gradient-based optimizers with weight-decay and gradient-clipping hooks
//!
//! Hooks run in a fixed order before every update: weight decay first
//! (`g += wd * θ`), then clipping of the whole gradient by its L2 norm.

use ndarray::Array1;
use serde::{Serialize, Deserialize};
use crate::{RankerError, Result};

/// Update rule
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerKind {
    /// `θ = θ - lr * g`
    Sgd,
    /// `v = μ v - lr * g; θ = θ + v`
    MomentumSgd,
    /// `h = h + g²; θ = θ - lr * g / (√h + ε)`
    Adagrad,
    /// Adam with bias-corrected step size
    Adam,
}

impl OptimizerKind {
    /// Default learning rate (alpha for Adam)
    pub fn default_learning_rate(self) -> f32 {
        match self {
            OptimizerKind::Sgd | OptimizerKind::MomentumSgd => 0.01,
            OptimizerKind::Adagrad | OptimizerKind::Adam => 0.001,
        }
    }
}

impl std::str::FromStr for OptimizerKind {
    type Err = RankerError;

    fn from_str(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "sgd" => Ok(OptimizerKind::Sgd),
            "momentum_sgd" | "momentumsgd" => Ok(OptimizerKind::MomentumSgd),
            "adagrad" => Ok(OptimizerKind::Adagrad),
            "adam" => Ok(OptimizerKind::Adam),
            other => Err(RankerError::InvalidConfig(format!("Unknown optimizer {:?}", other))),
        }
    }
}

const MOMENTUM: f32 = 0.9;
const BETA1: f32 = 0.9;
const BETA2: f32 = 0.999;
const EPS: f32 = 1e-8;

/// Optimizer state for one flat parameter vector
#[derive(Clone, Debug)]
pub struct Optimizer {
    kind: OptimizerKind,
    learning_rate: f32,
    weight_decay: f32,
    gradient_clipping: f32,
    /// Velocity (momentum), squared-gradient sum (AdaGrad) or first moment (Adam)
    first: Array1<f32>,
    /// Second moment (Adam)
    second: Array1<f32>,
    t: i32,
}

impl Optimizer {
    /// Create an optimizer; `learning_rate` falls back to the kind's default
    pub fn new(kind: OptimizerKind, learning_rate: Option<f32>) -> Self {
        Optimizer {
            kind,
            learning_rate: learning_rate.unwrap_or_else(|| kind.default_learning_rate()),
            weight_decay: 0.0,
            gradient_clipping: 0.0,
            first: Array1::zeros(0),
            second: Array1::zeros(0),
            t: 0,
        }
    }

    /// Add L2 weight decay; zero disables it
    pub fn with_weight_decay(mut self, rate: f32) -> Self {
        self.weight_decay = rate;
        self
    }

    /// Clip the gradient norm at `threshold`; zero disables clipping
    pub fn with_gradient_clipping(mut self, threshold: f32) -> Self {
        self.gradient_clipping = threshold;
        self
    }

    /// Update rule in use
    pub fn kind(&self) -> OptimizerKind {
        self.kind
    }

    /// Number of updates performed
    pub fn steps(&self) -> usize {
        self.t as usize
    }

    /// Apply hooks to `grads` and update `params` in place
    pub fn update(&mut self, params: &mut Array1<f32>, grads: &Array1<f32>) {
        assert_eq!(
            params.len(),
            grads.len(),
            "Param length ({}) must match grad length ({})",
            params.len(),
            grads.len()
        );

        let mut g = grads.clone();
        if self.weight_decay > 0.0 {
            g.scaled_add(self.weight_decay, params);
        }
        if self.gradient_clipping > 0.0 {
            let norm = g.dot(&g).sqrt();
            if norm > self.gradient_clipping {
                g *= self.gradient_clipping / norm;
            }
        }

        if self.first.len() != params.len() {
            self.first = Array1::zeros(params.len());
            self.second = Array1::zeros(params.len());
        }
        self.t += 1;
        let lr = self.learning_rate;

        match self.kind {
            OptimizerKind::Sgd => {
                params.scaled_add(-lr, &g);
            }
            OptimizerKind::MomentumSgd => {
                self.first *= MOMENTUM;
                self.first.scaled_add(-lr, &g);
                *params += &self.first;
            }
            OptimizerKind::Adagrad => {
                self.first += &g.mapv(|x| x * x);
                let step = &g / &self.first.mapv(|h| h.sqrt() + EPS);
                params.scaled_add(-lr, &step);
            }
            OptimizerKind::Adam => {
                self.first.zip_mut_with(&g, |m, &gi| *m += (1.0 - BETA1) * (gi - *m));
                self.second.zip_mut_with(&g, |v, &gi| *v += (1.0 - BETA2) * (gi * gi - *v));
                let fix1 = 1.0 - BETA1.powi(self.t);
                let fix2 = 1.0 - BETA2.powi(self.t);
                let lr_t = lr * fix2.sqrt() / fix1;
                let step = &self.first / &self.second.mapv(|v| v.sqrt() + EPS);
                params.scaled_add(-lr_t, &step);
            }
        }
    }
}
