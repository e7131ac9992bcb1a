use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{BundleError, PredictError},
    features::{FeatureName, FeatureVector, parse_feature_order},
    forest::RandomForest,
    observation::Observation,
};

/// Mean absolute error on each partition of the training corpus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub train_mae: f64,
    pub valid_mae: f64,
}

/// How a bundle was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub trained_at: DateTime<Utc>,
    pub num_samples: usize,
    pub seed: u64,
    pub n_trees: usize,
}

/// A fitted model together with the feature order it was trained on.
///
/// The order is persisted as plain names so that a bundle written by an older
/// build is checked against this build's feature set when it is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    pub model: RandomForest,
    pub feature_order: Vec<String>,
    pub metrics: TrainingMetrics,
    pub provenance: Provenance,
}

impl ModelBundle {
    /// Predict next-hour temperature (°C) from current conditions at `when`.
    pub fn predict<T: Datelike + Timelike>(
        &self,
        observation: &Observation,
        when: &T,
    ) -> Result<f64, PredictError> {
        observation.validate()?;
        let order = parse_feature_order(&self.feature_order)?;
        let features = FeatureVector::new(observation, when).ordered(&order);
        let prediction = self.model.predict(&features)?;

        tracing::debug!(temp_c = observation.temp_c, prediction, "predicted next-hour temperature");
        Ok(prediction)
    }

    /// Feature order as typed names.
    pub fn feature_names(&self) -> Result<Vec<FeatureName>, BundleError> {
        Ok(parse_feature_order(&self.feature_order)?)
    }

    /// Load a bundle, checking its feature contract.
    pub fn load(path: &Path) -> Result<Self, BundleError> {
        let contents = fs::read_to_string(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => BundleError::NotFound(path.to_path_buf()),
            _ => BundleError::Io { path: path.to_path_buf(), source },
        })?;

        let bundle: ModelBundle = serde_json::from_str(&contents)?;
        bundle.feature_names()?;
        bundle.model.validate().map_err(BundleError::Corrupt)?;
        if bundle.model.n_features() != bundle.feature_order.len() {
            return Err(BundleError::Corrupt(format!(
                "model expects {} features but the bundle lists {}",
                bundle.model.n_features(),
                bundle.feature_order.len()
            )));
        }

        tracing::info!(
            path = %path.display(),
            trees = bundle.model.n_trees(),
            valid_mae = bundle.metrics.valid_mae,
            "loaded model bundle"
        );
        Ok(bundle)
    }

    /// Write the bundle to `path`, replacing any existing file.
    ///
    /// Writes to a sibling temporary file first so a failure never leaves a
    /// truncated bundle behind.
    pub fn save(&self, path: &Path) -> Result<(), BundleError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error(parent))?;
        }

        let json = serde_json::to_string(self)?;
        let bytes = json.len();
        let tmp = temp_path(path);
        fs::write(&tmp, json).map_err(io_error(&tmp))?;
        fs::rename(&tmp, path).map_err(io_error(path))?;

        tracing::info!(path = %path.display(), bytes, "saved model bundle");
        Ok(())
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> BundleError + '_ {
    move |source| BundleError::Io { path: path.to_path_buf(), source }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
