//! Error types for the nowcast core.
//!
//! Each concern gets its own enum so callers can tell a broken feature
//! contract apart from a bad observation or an unreachable weather API.

use std::path::PathBuf;

use thiserror::Error;

/// Feature-order contract violations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FeatureError {
    #[error("Unknown feature '{0}' in feature order")]
    UnknownFeature(String),
}

/// Observation values rejected before inference.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ObservationError {
    #[error("Observation field '{field}' is not finite: {value}")]
    NonFinite { field: &'static str, value: f64 },

    #[error("Observation field '{field}' = {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Regression forest fitting failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FitError {
    #[error("Cannot fit on an empty dataset")]
    EmptyDataset,

    #[error("Feature matrix has {rows} rows but {targets} targets")]
    LengthMismatch { rows: usize, targets: usize },

    #[error("Row {row} has {found} features, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Non-finite value at row {row}")]
    NonFinite { row: usize },

    #[error("Invalid forest parameters: {0}")]
    InvalidParams(String),
}

/// Training pipeline failures.
#[derive(Debug, Error)]
pub enum TrainError {
    #[error("Sample count must be positive")]
    InvalidSampleCount,

    #[error("Cannot split {samples} samples into non-empty train/validation partitions")]
    InvalidSplit { samples: usize },

    #[error("Model fit failed: {0}")]
    Fit(#[from] FitError),

    #[error("Failed to evaluate model: {0}")]
    Evaluate(#[from] PredictError),

    #[error("Failed to persist model bundle: {0}")]
    Persist(#[from] BundleError),
}

/// Prediction failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PredictError {
    #[error(transparent)]
    Feature(#[from] FeatureError),

    #[error("Invalid observation: {0}")]
    InvalidObservation(#[from] ObservationError),

    #[error("Model expects {expected} features, got {found}")]
    FeatureCount { expected: usize, found: usize },
}

/// Model bundle persistence failures.
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("Model bundle not found at {}. Hint: run `nowcast train` first.", .0.display())]
    NotFound(PathBuf),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed model bundle: {0}")]
    Format(#[from] serde_json::Error),

    #[error("Model bundle feature order is invalid: {0}")]
    FeatureOrder(#[from] FeatureError),

    #[error("Model bundle is corrupt: {0}")]
    Corrupt(String),
}

/// Weather fetch failures.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Weather API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Location not found: {0}")]
    NotFound(String),
}

impl FetchError {
    /// Whether retrying the same request later might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network(_) => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            FetchError::Parse(_) | FetchError::NotFound(_) => false,
        }
    }
}

/// City forecast failures.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Could not fetch current weather: {0}")]
    Fetch(#[from] FetchError),

    #[error("Prediction error: {0}")]
    Predict(#[from] PredictError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses() {
        let server = FetchError::Status { status: 503, body: String::new() };
        let throttled = FetchError::Status { status: 429, body: String::new() };
        let client = FetchError::Status { status: 400, body: String::new() };

        assert!(server.is_retryable());
        assert!(throttled.is_retryable());
        assert!(!client.is_retryable());
        assert!(!FetchError::NotFound("Atlantis".into()).is_retryable());
        assert!(!FetchError::Parse("bad json".into()).is_retryable());
    }

    #[test]
    fn missing_bundle_message_has_hint() {
        let err = BundleError::NotFound(PathBuf::from("/tmp/none.json"));
        let msg = err.to_string();
        assert!(msg.contains("/tmp/none.json"));
        assert!(msg.contains("nowcast train"));
    }
}
