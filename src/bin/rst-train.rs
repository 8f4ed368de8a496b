//! Train a span scorer with margin-ranking self-training

use std::path::PathBuf;
use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;
use rst_ranker::data::load_documents;
use rst_ranker::prelude::*;

#[derive(Parser)]
#[command(name = "rst-train", about = "Margin-ranking training of an RST bracketing parser")]
struct Cli {
    /// JSON file with `scorer` and `training` sections
    #[arg(long)]
    config: PathBuf,

    /// Training documents, one JSON object per line
    #[arg(long)]
    train: PathBuf,

    /// Dev documents; enables validation and early stopping
    #[arg(long)]
    dev: Option<PathBuf>,

    /// Override the seed from the config file
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Deserialize)]
struct RunConfig {
    #[serde(default)]
    scorer: ScorerConfig,
    training: TrainConfig,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rst_ranker=info")),
        )
        .init();

    let cli = Cli::parse();

    let text = std::fs::read_to_string(&cli.config)
        .with_context(|| format!("reading config {}", cli.config.display()))?;
    let mut run: RunConfig = serde_json::from_str(&text)
        .with_context(|| format!("parsing config {}", cli.config.display()))?;
    if let Some(seed) = cli.seed {
        run.training.seed = Some(seed);
        run.scorer.seed = run.scorer.seed.or(Some(seed));
    }

    let train = load_documents(&cli.train)
        .with_context(|| format!("loading training set {}", cli.train.display()))?;
    let dev = match &cli.dev {
        Some(path) => Some(
            load_documents(path).with_context(|| format!("loading dev set {}", path.display()))?,
        ),
        None => None,
    };

    let model = LinearSpanModel::new(run.scorer).context("building scorer")?;
    let mut trainer = Trainer::new(run.training, model, JsonCheckpointStore)
        .context("building trainer")?;
    let report = trainer.train(&train, dev.as_deref()).context("training")?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
