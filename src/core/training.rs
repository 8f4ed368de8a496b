//! Margin-ranking trainer
//!
//! Each mini-batch alternates an E-step (one positive tree per instance,
//! sampled during the first `n_init_epochs` epochs and decoded afterwards)
//! with an M-step: negatives come from the loss-augmented decoder, one per
//! boundary setting, and from the negative sampler for the rest. All trees
//! of an instance are scored in one batched call, the hinge losses are
//! summed, normalised by the actual batch size and applied in one update.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Serialize, Deserialize};
use tracing::{debug, info, warn};
use super::loss::{margin_ranking, RankingObjective};
use super::{BestScoreTracker, TrainConfig};
use crate::data::{BoundaryFlags, Document};
use crate::decoding::{parse_documents, IncrementalDecoder};
use crate::eval::{CategoryScore, LegacyParseval, ParsevalMetric, StandardParseval, SPAN_CATEGORY};
use crate::nn::{EncodedDocument, Optimizer, TrainableScorer};
use crate::sampling::{NegativeTreeSampler, TreeSampler};
use crate::tree::{compute_tree_distance, Order, Span};
use crate::utils::{CheckpointStore, JsonlWriter};
use crate::{RankerError, Result};

/// Margin coefficient of the tree distance
const DISTANCE_COEF: f32 = 1.0;

/// Counters threaded through the epoch loop
#[derive(Clone, Debug, Default)]
pub struct TrainingState {
    /// Current epoch, 0 before training
    pub epoch: usize,
    /// Mini-batches processed so far
    pub iteration: usize,
    /// Validation history and patience
    pub tracker: BestScoreTracker,
}

impl TrainingState {
    /// State at trainer start
    pub fn new() -> Self {
        Self::default()
    }
}

/// Summary returned by [`Trainer::train`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Epochs completed
    pub epochs_run: usize,
    /// Mini-batches processed
    pub iterations: usize,
    /// Best validation F1, when a dev set was given
    pub best_score: Option<f64>,
    /// Epoch of the best validation F1
    pub best_epoch: Option<usize>,
    /// Whether patience ran out before `max_epoch`
    pub stopped_early: bool,
    /// Checkpoints written
    pub checkpoints: usize,
    /// Negatives drawn from the negative sampler
    pub sampled_negatives: usize,
}

/// One line of the training stream
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainRecord {
    /// Global mini-batch counter
    pub iter: usize,
    /// Current epoch
    pub epoch: usize,
    /// `"{seen}/{total}"` instances of this epoch
    pub progress: String,
    /// Percentage of the epoch done
    pub progress_ratio: f64,
    /// Batch-normalised hinge loss
    #[serde(rename = "Constituency Loss")]
    pub loss: f32,
    /// Percentage of instances whose positive outranked every negative
    #[serde(rename = "Ranked Accuracy")]
    pub accuracy: f32,
}

/// Scores of one metric in a validation record, in percent
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    /// Precision
    #[serde(rename = "Unlabeled Precision")]
    pub precision: f64,
    /// `"matched/predicted"`
    #[serde(rename = "Precision_info")]
    pub precision_info: String,
    /// Recall
    #[serde(rename = "Unlabeled Recall")]
    pub recall: f64,
    /// `"matched/gold"`
    #[serde(rename = "Recall_info")]
    pub recall_info: String,
    /// Micro-averaged F1
    #[serde(rename = "Micro F1")]
    pub micro_f1: f64,
}

impl From<&CategoryScore> for ScoreRecord {
    fn from(score: &CategoryScore) -> Self {
        ScoreRecord {
            precision: score.precision * 100.0,
            precision_info: score.precision_info.clone(),
            recall: score.recall * 100.0,
            recall_info: score.recall_info.clone(),
            micro_f1: score.micro_f1 * 100.0,
        }
    }
}

/// One line of the validation stream
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationRecord {
    /// Validated epoch, 0 for the untrained baseline
    pub epoch: usize,
    /// Internal-node Parseval
    #[serde(rename = "Morey2018")]
    pub standard: ScoreRecord,
    /// RST-Parseval with terminals
    #[serde(rename = "Marcu2000")]
    pub legacy: ScoreRecord,
}

/// Loss and accuracy of one mini-batch
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BatchStats {
    /// Summed hinge loss divided by the batch size
    pub loss: f32,
    /// Ranked accuracy in percent
    pub accuracy: f32,
}

/// Instance scored for the update that closes its mini-batch
struct Prepared<'d> {
    doc: &'d Document,
    encoded: EncodedDocument,
    span_sets: Vec<Vec<Span>>,
    objective: RankingObjective,
}

/// Structured margin-ranking trainer for a span scorer `M`, persisting
/// checkpoints through `C`
pub struct Trainer<M, C> {
    config: TrainConfig,
    model: M,
    store: C,
    optimizer: Optimizer,
    decoder: IncrementalDecoder,
    sampler: TreeSampler,
    negative_sampler: NegativeTreeSampler,
    metric: Box<dyn ParsevalMetric>,
    legacy_metric: Box<dyn ParsevalMetric>,
    rng: StdRng,
    checkpoints: usize,
    sampled_negatives: usize,
}

impl<M: TrainableScorer, C: CheckpointStore<M>> Trainer<M, C> {
    /// Create a trainer; the configuration is validated first
    pub fn new(config: TrainConfig, model: M, store: C) -> Result<Self> {
        config.validate()?;
        let optimizer = config.build_optimizer()?;

        let (rng, sampler, negative_sampler) = match config.seed {
            Some(seed) => (
                StdRng::seed_from_u64(seed),
                TreeSampler::with_seed(config.sampler.clone(), seed.wrapping_add(1)),
                NegativeTreeSampler::with_seed(seed.wrapping_add(2)),
            ),
            None => (
                StdRng::from_entropy(),
                TreeSampler::new(config.sampler.clone()),
                NegativeTreeSampler::new(),
            ),
        };

        Ok(Trainer {
            config,
            model,
            store,
            optimizer,
            decoder: IncrementalDecoder::new(),
            sampler,
            negative_sampler,
            metric: Box::new(StandardParseval),
            legacy_metric: Box::new(LegacyParseval),
            rng,
            checkpoints: 0,
            sampled_negatives: 0,
        })
    }

    /// Replace the validation metrics
    pub fn with_metrics(mut self, metric: Box<dyn ParsevalMetric>, legacy_metric: Box<dyn ParsevalMetric>) -> Self {
        self.metric = metric;
        self.legacy_metric = legacy_metric;
        self
    }

    /// Training configuration
    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Model being trained
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Checkpoint store
    pub fn store(&self) -> &C {
        &self.store
    }

    /// Consume the trainer, returning the model
    pub fn into_model(self) -> M {
        self.model
    }

    /// Run the whole training schedule
    ///
    /// With a dev set the untrained model is validated first (epoch 0), a
    /// checkpoint is written on every strict improvement and training stops
    /// once patience runs out. Without one, a checkpoint is written after
    /// every epoch and all `max_epoch` epochs run.
    pub fn train(&mut self, train: &[Document], dev: Option<&[Document]>) -> Result<TrainingReport> {
        let mut train_log = JsonlWriter::create(&self.config.paths.path_train_log)?;
        let mut valid_log = match dev {
            Some(_) => Some(JsonlWriter::create(&self.config.paths.path_valid_log)?),
            None => None,
        };

        if train.is_empty() {
            warn!("Training set is empty; epochs will not update the model");
        }
        info!(
            "Training on {} documents for up to {} epochs ({} with sampled positives)",
            train.len(),
            self.config.max_epoch,
            self.config.n_init_epochs
        );

        let mut state = TrainingState::new();
        if let (Some(dev), Some(log)) = (dev, valid_log.as_mut()) {
            let score = self.validate(dev, state.epoch, log)?;
            if state.tracker.compare_scores(score, state.epoch) {
                self.save_checkpoint()?;
            }
        }

        let mut stopped_early = false;
        for epoch in 1..=self.config.max_epoch {
            state.epoch = epoch;
            state = self.train_epoch(state, train, &mut train_log)?;

            match (dev, valid_log.as_mut()) {
                (Some(dev), Some(log)) => {
                    let score = self.validate(dev, epoch, log)?;
                    if state.tracker.compare_scores(score, epoch) {
                        info!("Micro F1 improved to {:.2} at epoch {}", score, epoch);
                        self.save_checkpoint()?;
                    }
                    if state.tracker.ask_finishing(self.config.max_patience) {
                        info!(
                            "Patience {} reached at epoch {}; best Micro F1 {:.2} at epoch {}",
                            self.config.max_patience,
                            epoch,
                            state.tracker.best_score().unwrap_or(0.0),
                            state.tracker.best_epoch().unwrap_or(0)
                        );
                        stopped_early = true;
                        break;
                    }
                }
                _ => self.save_checkpoint()?,
            }
        }

        info!("Training finished after {} epochs ({} iterations)", state.epoch, state.iteration);
        Ok(TrainingReport {
            epochs_run: state.epoch,
            iterations: state.iteration,
            best_score: state.tracker.best_score(),
            best_epoch: state.tracker.best_epoch(),
            stopped_early,
            checkpoints: self.checkpoints,
            sampled_negatives: self.sampled_negatives,
        })
    }

    /// Train one epoch over a fresh permutation of `train`, writing one
    /// record per mini-batch
    pub fn train_epoch(
        &mut self,
        mut state: TrainingState,
        train: &[Document],
        log: &mut JsonlWriter,
    ) -> Result<TrainingState> {
        let n_train = train.len();
        let batch_size = self.config.batch_size;
        let mut perm: Vec<usize> = (0..n_train).collect();
        perm.shuffle(&mut self.rng);

        let mut seen = 0;
        for chunk in perm.chunks(batch_size) {
            let batch: Vec<&Document> = chunk.iter().map(|&i| &train[i]).collect();
            let stats = self.train_minibatch(&batch, state.epoch)?;
            state.iteration += 1;
            seen += batch.len();

            let record = TrainRecord {
                iter: state.iteration,
                epoch: state.epoch,
                progress: format!("{}/{}", seen, n_train),
                progress_ratio: seen as f64 / n_train as f64 * 100.0,
                loss: stats.loss,
                accuracy: stats.accuracy,
            };
            debug!(
                "[{}] epoch {} ({}) loss {:.4} accuracy {:.1}",
                record.iter, record.epoch, record.progress, record.loss, record.accuracy
            );
            log.write(&record)?;
        }

        Ok(state)
    }

    /// One E-step plus M-step over a mini-batch, ending in a single update
    pub fn train_minibatch(&mut self, batch: &[&Document], epoch: usize) -> Result<BatchStats> {
        if batch.is_empty() {
            return Ok(BatchStats { loss: 0.0, accuracy: 0.0 });
        }

        let mut prepared = Vec::with_capacity(batch.len());
        for &doc in batch {
            prepared.push(self.prepare_instance(doc, epoch)?);
        }

        let scale = 1.0 / batch.len() as f32;
        let loss = prepared.iter().map(|p| p.objective.loss).sum::<f32>() * scale;
        let n_correct = prepared.iter().filter(|p| p.objective.correct).count();

        self.model.zero_grads();
        for instance in &prepared {
            let upstream: Vec<f32> = instance.objective.upstream.iter().map(|g| g * scale).collect();
            self.model.backward(instance.doc, &instance.encoded, &instance.span_sets, &upstream)?;
        }
        let (params, grads) = self.model.parameters_mut();
        self.optimizer.update(params, grads);

        Ok(BatchStats {
            loss,
            accuracy: n_correct as f32 * scale * 100.0,
        })
    }

    fn prepare_instance<'d>(&mut self, doc: &'d Document, epoch: usize) -> Result<Prepared<'d>> {
        let encoded = self.model.encode(doc)?;

        // E-step
        let positive = if epoch <= self.config.n_init_epochs {
            self.sampler.sample(doc, BoundaryFlags::all())?
        } else {
            self.decoder.decode(&self.model, doc, &encoded, BoundaryFlags::all(), None)?
        };
        let pos_spans = positive.internal_spans(Order::PostOrder);

        // Negatives
        let mut margins = Vec::with_capacity(self.config.negative_size);
        let mut span_sets = Vec::with_capacity(self.config.negative_size + 1);
        span_sets.push(pos_spans.clone());
        for &flags in &self.config.boundary_flags {
            let tree = self.decoder.decode(&self.model, doc, &encoded, flags, Some(pos_spans.as_slice()))?;
            let spans = tree.internal_spans(Order::PreOrder);
            margins.push(compute_tree_distance(&pos_spans, &spans, DISTANCE_COEF));
            span_sets.push(spans);
        }
        for _ in self.config.boundary_flags.len()..self.config.negative_size {
            let tree = self.negative_sampler.sample(doc)?;
            self.sampled_negatives += 1;
            let spans = tree.internal_spans(Order::PreOrder);
            margins.push(compute_tree_distance(&pos_spans, &spans, DISTANCE_COEF));
            span_sets.push(spans);
        }

        let scores = self.model.score_spans(doc, &encoded, &span_sets, true)?;
        if scores.len() != span_sets.len() {
            return Err(RankerError::Scorer(format!(
                "Expected {} tree scores, got {}", span_sets.len(), scores.len()
            )));
        }
        let objective = margin_ranking(&scores.to_vec(), &margins);

        Ok(Prepared { doc, encoded, span_sets, objective })
    }

    /// Decode `dev` into the prediction file, evaluate it with both metrics
    /// and write one validation record; returns the Micro F1 (percent) of
    /// the internal-node metric
    pub fn validate(&mut self, dev: &[Document], epoch: usize, log: &mut JsonlWriter) -> Result<f64> {
        let paths = &self.config.paths;
        parse_documents(&self.decoder, &self.model, dev, &paths.path_pred)?;

        let standard = self.metric.evaluate(&paths.path_pred, &paths.path_gold)?;
        let legacy = self.legacy_metric.evaluate(&paths.path_pred, &paths.path_gold)?;
        let category = |scores: &crate::eval::ParsevalScores| -> Result<ScoreRecord> {
            scores
                .get(SPAN_CATEGORY)
                .map(ScoreRecord::from)
                .ok_or_else(|| RankerError::Evaluation(format!("Missing category {:?}", SPAN_CATEGORY)))
        };

        let record = ValidationRecord {
            epoch,
            standard: category(&standard)?,
            legacy: category(&legacy)?,
        };
        info!(
            "Validation at epoch {}: Micro F1 {:.2} (Morey2018), {:.2} (Marcu2000)",
            epoch, record.standard.micro_f1, record.legacy.micro_f1
        );
        log.write(&record)?;

        Ok(record.standard.micro_f1)
    }

    fn save_checkpoint(&mut self) -> Result<()> {
        self.store.save(&self.config.paths.path_snapshot, &self.model)?;
        self.checkpoints += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OutputPaths;
    use crate::data::test_support::document;
    use crate::nn::{LinearSpanModel, ScorerConfig, SpanScorer};
    use crate::utils::JsonCheckpointStore;

    fn trainer(dir: &std::path::Path) -> Trainer<LinearSpanModel, JsonCheckpointStore> {
        let mut config = TrainConfig::new(OutputPaths::in_dir(dir, dir.join("gold.ctrees")));
        config.batch_size = 2;
        config.negative_size = 3;
        config.n_init_epochs = 1;
        config.max_epoch = 2;
        config.optimizer_name = "sgd".to_string();
        config.learning_rate = Some(0.1);
        config.weight_decay = 0.0;
        config.seed = Some(17);
        let model = LinearSpanModel::new(ScorerConfig { dim: 16, seed: Some(2) }).unwrap();
        Trainer::new(config, model, JsonCheckpointStore).unwrap()
    }

    #[test]
    fn test_minibatch_normalises_by_actual_size() {
        let dir = tempfile::tempdir().unwrap();
        // Same seeds, so the reference trainer draws the same trees
        let mut reference = trainer(dir.path());
        let mut trainer = trainer(dir.path());
        let doc = document(5, &[(0, 2), (3, 4)], &[]);
        let expected = reference.prepare_instance(&doc, 1).unwrap().objective;

        assert_eq!(trainer.config().batch_size, 2);
        let stats = trainer.train_minibatch(&[&doc], 1).unwrap();
        assert!((stats.loss - expected.loss).abs() < 1e-6);
        assert_eq!(stats.accuracy, if expected.correct { 100.0 } else { 0.0 });
        assert_eq!(trainer.sampled_negatives, 2);
    }

    #[test]
    fn test_minibatch_loss_is_mean_of_instances() {
        let dir = tempfile::tempdir().unwrap();
        let mut reference = trainer(dir.path());
        let mut trainer = trainer(dir.path());
        let first = document(5, &[(0, 2), (3, 4)], &[]);
        let second = document(7, &[(0, 3), (4, 6)], &[]);

        let a = reference.prepare_instance(&first, 1).unwrap().objective;
        let b = reference.prepare_instance(&second, 1).unwrap().objective;

        let stats = trainer.train_minibatch(&[&first, &second], 1).unwrap();
        assert!((stats.loss - (a.loss + b.loss) / 2.0).abs() < 1e-6);
        let n_correct = [a.correct, b.correct].iter().filter(|&&c| c).count();
        assert_eq!(stats.accuracy, n_correct as f32 * 50.0);
    }

    #[test]
    fn test_into_model_returns_trained_weights() {
        let dir = tempfile::tempdir().unwrap();
        let mut trainer = trainer(dir.path());
        trainer.train_minibatch(&[&document(4, &[], &[])], 1).unwrap();
        let weights = trainer.model().weights().clone();
        assert_eq!(trainer.into_model().weights(), &weights);
    }

    #[test]
    fn test_update_reduces_violations() {
        let dir = tempfile::tempdir().unwrap();
        let mut trainer = trainer(dir.path());
        let doc = document(6, &[(0, 2), (3, 5)], &[]);

        let before = trainer.model().weights().clone();
        let stats = trainer.train_minibatch(&[&doc], 1).unwrap();
        if stats.loss > 0.0 {
            assert_ne!(trainer.model().weights(), &before);
        } else {
            assert_eq!(trainer.model().weights(), &before);
        }
    }

    #[test]
    fn test_epoch_logs_every_batch() {
        let dir = tempfile::tempdir().unwrap();
        let mut trainer = trainer(dir.path());
        let docs: Vec<Document> = (2..7).map(|n| document(n, &[], &[])).collect();
        let mut log = JsonlWriter::create(dir.path().join("train.jsonl")).unwrap();

        let mut state = TrainingState::new();
        state.epoch = 1;
        let state = trainer.train_epoch(state, &docs, &mut log).unwrap();
        assert_eq!(state.iteration, 3);

        let text = std::fs::read_to_string(dir.path().join("train.jsonl")).unwrap();
        let records: Vec<TrainRecord> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        let progress: Vec<&str> = records.iter().map(|r| r.progress.as_str()).collect();
        assert_eq!(progress, vec!["2/5", "4/5", "5/5"]);
        assert_eq!(records[2].progress_ratio, 100.0);
    }

    #[test]
    fn test_decoded_positive_after_init_epochs() {
        let dir = tempfile::tempdir().unwrap();
        let mut trainer = trainer(dir.path());
        let doc = document(4, &[], &[]);
        // Epoch 2 > n_init_epochs uses the decoder for the positive tree
        let prepared = trainer.prepare_instance(&doc, 2).unwrap();
        let decoded = trainer
            .decoder
            .decode(trainer.model(), &doc, &trainer.model().encode(&doc).unwrap(), BoundaryFlags::all(), None)
            .unwrap();
        assert_eq!(prepared.span_sets[0], decoded.internal_spans(Order::PostOrder));
        assert_eq!(prepared.span_sets.len(), 4);
        assert_eq!(prepared.objective.upstream.len(), 4);
    }

    #[test]
    fn test_record_field_names() {
        let record = TrainRecord {
            iter: 1,
            epoch: 1,
            progress: "4/4".to_string(),
            progress_ratio: 100.0,
            loss: 0.5,
            accuracy: 25.0,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["Constituency Loss"], 0.5);
        assert_eq!(value["Ranked Accuracy"], 25.0);

        let score = ScoreRecord::from(&CategoryScore {
            precision: 0.5,
            precision_info: "1/2".to_string(),
            recall: 0.25,
            recall_info: "1/4".to_string(),
            micro_f1: 1.0 / 3.0,
        });
        let value = serde_json::to_value(&ValidationRecord { epoch: 0, standard: score.clone(), legacy: score }).unwrap();
        assert_eq!(value["Morey2018"]["Unlabeled Precision"], 50.0);
        assert_eq!(value["Marcu2000"]["Recall_info"], "1/4");
        assert!(value["Morey2018"]["Micro F1"].is_number());
    }
}
