//! Core library for the `nowcast` CLI.
//!
//! This crate defines:
//! - Cyclical time encoding and the fixed-order feature vector
//! - The synthetic weather corpus and bagged regression trees fitted on it
//! - Model bundle persistence and next-hour inference
//! - An Open-Meteo client for live observations
//! - Configuration handling
//!
//! It is used by `nowcast-cli`, but can also be reused by other binaries or services.

pub mod bundle;
pub mod config;
pub mod error;
pub mod features;
pub mod forest;
pub mod observation;
pub mod provider;
pub mod service;
pub mod synth;
pub mod training;

pub use bundle::{ModelBundle, Provenance, TrainingMetrics};
pub use config::Config;
pub use error::{
    BundleError, FeatureError, FetchError, FitError, ObservationError, PredictError, ServiceError,
    TrainError,
};
pub use features::{CyclicalTime, FeatureName, FeatureVector, build_feature_vector, encode_cyclical};
pub use forest::{ForestParams, RandomForest};
pub use observation::{CityForecast, CurrentConditions, Observation, Place};
pub use provider::{OpenMeteoProvider, WeatherProvider};
pub use service::ForecastService;
pub use synth::{SyntheticDataset, generate_synthetic_weather};
pub use training::{TrainingOptions, train, train_and_save};
