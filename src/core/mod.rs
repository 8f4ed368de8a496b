//! Training core: configuration, loss, early stopping and the trainer loop

mod best_score;
mod config;
mod loss;
mod training;

pub use best_score::BestScoreTracker;
pub use config::{OutputPaths, TrainConfig};
pub use loss::{margin_ranking, ranked_first, RankingObjective};
pub use training::{
    BatchStats, ScoreRecord, TrainRecord, Trainer, TrainingReport, TrainingState, ValidationRecord,
};
