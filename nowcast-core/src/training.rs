//! Offline training: synthetic corpus → bagged trees → model bundle.

use std::path::Path;

use chrono::Utc;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::{
    bundle::{ModelBundle, Provenance, TrainingMetrics},
    error::{PredictError, TrainError},
    features::FEATURE_COUNT,
    forest::{ForestParams, RandomForest},
    synth::generate_synthetic_weather,
};

pub const DEFAULT_NUM_SAMPLES: usize = 20_000;
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_N_TREES: usize = 300;
pub const DEFAULT_VALIDATION_FRACTION: f64 = 0.2;

/// Knobs for one training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingOptions {
    pub num_samples: usize,
    pub seed: u64,
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub validation_fraction: f64,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            num_samples: DEFAULT_NUM_SAMPLES,
            seed: DEFAULT_SEED,
            n_trees: DEFAULT_N_TREES,
            max_depth: None,
            min_samples_split: 2,
            validation_fraction: DEFAULT_VALIDATION_FRACTION,
        }
    }
}

impl TrainingOptions {
    fn forest_params(&self) -> ForestParams {
        ForestParams {
            n_trees: self.n_trees,
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            seed: self.seed,
        }
    }
}

type Rows = Vec<[f64; FEATURE_COUNT]>;

/// Shuffled train/validation partition of a dataset.
struct Split {
    train_x: Rows,
    train_y: Vec<f64>,
    valid_x: Rows,
    valid_y: Vec<f64>,
}

/// Shuffle row indices with `seed` and hold out `ceil(n * fraction)` rows.
fn train_validation_split(
    features: &[[f64; FEATURE_COUNT]],
    targets: &[f64],
    fraction: f64,
    seed: u64,
) -> Result<Split, TrainError> {
    let n = targets.len();
    let n_valid = (n as f64 * fraction).ceil() as usize;
    if !(0.0..1.0).contains(&fraction) || n_valid == 0 || n_valid >= n {
        return Err(TrainError::InvalidSplit { samples: n });
    }

    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));
    let (valid_idx, train_idx) = indices.split_at(n_valid);

    Ok(Split {
        train_x: train_idx.iter().map(|&i| features[i]).collect(),
        train_y: train_idx.iter().map(|&i| targets[i]).collect(),
        valid_x: valid_idx.iter().map(|&i| features[i]).collect(),
        valid_y: valid_idx.iter().map(|&i| targets[i]).collect(),
    })
}

/// Mean absolute error between predictions and targets.
pub fn mean_absolute_error(predicted: &[f64], actual: &[f64]) -> f64 {
    let total: f64 = predicted.iter().zip(actual).map(|(p, a)| (p - a).abs()).sum();
    total / actual.len().max(1) as f64
}

fn evaluate(model: &RandomForest, rows: &Rows, targets: &[f64]) -> Result<f64, PredictError> {
    let predicted = model.predict_many(rows)?;
    Ok(mean_absolute_error(&predicted, targets))
}

/// Generate a corpus, fit the forest and measure it.
pub fn train(options: &TrainingOptions) -> Result<ModelBundle, TrainError> {
    tracing::info!(
        samples = options.num_samples,
        seed = options.seed,
        trees = options.n_trees,
        "training next-hour temperature model"
    );

    let dataset = generate_synthetic_weather(options.num_samples, options.seed)?;
    let split = train_validation_split(
        &dataset.features,
        &dataset.targets,
        options.validation_fraction,
        options.seed,
    )?;

    let model = RandomForest::fit(&split.train_x, &split.train_y, &options.forest_params())?;

    let metrics = TrainingMetrics {
        train_mae: evaluate(&model, &split.train_x, &split.train_y)?,
        valid_mae: evaluate(&model, &split.valid_x, &split.valid_y)?,
    };
    tracing::info!(
        train_mae = metrics.train_mae,
        valid_mae = metrics.valid_mae,
        "model trained"
    );

    Ok(ModelBundle {
        model,
        feature_order: dataset.feature_order(),
        metrics,
        provenance: Provenance {
            trained_at: Utc::now(),
            num_samples: options.num_samples,
            seed: options.seed,
            n_trees: options.n_trees,
        },
    })
}

/// Train and persist the bundle at `path`, replacing any previous one.
pub fn train_and_save(options: &TrainingOptions, path: &Path) -> Result<ModelBundle, TrainError> {
    let bundle = train(options)?;
    bundle.save(path)?;
    Ok(bundle)
}
