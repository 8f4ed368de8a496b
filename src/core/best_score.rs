//! Best validation score and patience bookkeeping

/// Tracks the best validation score seen so far and how many validations
/// have passed without a strict improvement
#[derive(Clone, Debug)]
pub struct BestScoreTracker {
    best_score: f64,
    best_epoch: usize,
    patience: usize,
    history: Vec<(usize, f64)>,
}

impl BestScoreTracker {
    /// Create a tracker whose sentinel is below any attainable score
    pub fn new() -> Self {
        BestScoreTracker {
            best_score: f64::NEG_INFINITY,
            best_epoch: 0,
            patience: 0,
            history: Vec::new(),
        }
    }

    /// Record a validation score; returns true on strict improvement
    ///
    /// Ties count as no improvement.
    pub fn compare_scores(&mut self, score: f64, epoch: usize) -> bool {
        self.history.push((epoch, score));
        if score > self.best_score {
            self.best_score = score;
            self.best_epoch = epoch;
            self.patience = 0;
            true
        } else {
            self.patience += 1;
            false
        }
    }

    /// True once `max_patience` validations in a row failed to improve
    pub fn ask_finishing(&self, max_patience: usize) -> bool {
        self.patience >= max_patience
    }

    /// Best score, if any score was recorded
    pub fn best_score(&self) -> Option<f64> {
        self.best_score.is_finite().then_some(self.best_score)
    }

    /// Epoch of the best score, if any score was recorded
    pub fn best_epoch(&self) -> Option<usize> {
        self.best_score().map(|_| self.best_epoch)
    }

    /// Validations since the last improvement
    pub fn patience(&self) -> usize {
        self.patience
    }

    /// Every `(epoch, score)` recorded, in order
    pub fn history(&self) -> &[(usize, f64)] {
        &self.history
    }
}

impl Default for BestScoreTracker {
    fn default() -> Self {
        Self::new()
    }
}
