//! Synthetic weather corpus.
//!
//! There is no real history to learn from, so training data comes from a
//! closed-form approximation: temperature follows a seasonal and a diurnal
//! cycle, the other readings are noisy functions of temperature and time, and
//! the next-hour target is a fixed linear blend of the current readings.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};

use crate::error::TrainError;
use crate::features::{CyclicalTime, FEATURE_COUNT, FeatureName, FeatureVector};
use crate::observation::Observation;

const BASE_TEMP_C: f64 = 15.0;
const SEASONAL_AMPLITUDE_C: f64 = 10.0;
const DIURNAL_AMPLITUDE_C: f64 = 5.0;
const MEAN_PRESSURE_HPA: f64 = 1013.0;

const TEMP_NOISE_SD: f64 = 2.0;
const HUMIDITY_NOISE_SD: f64 = 5.0;
const PRESSURE_NOISE_SD: f64 = 7.0;
const CLOUD_NOISE_SD: f64 = 10.0;
const TARGET_NOISE_SD: f64 = 1.5;

/// Generated feature rows (canonical feature order) and next-hour targets.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticDataset {
    pub features: Vec<[f64; FEATURE_COUNT]>,
    pub targets: Vec<f64>,
}

impl SyntheticDataset {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Feature names matching the column order of `features`.
    pub fn feature_order(&self) -> Vec<String> {
        FeatureName::canonical_order()
    }

    /// All values of one feature column.
    pub fn column(&self, name: FeatureName) -> Vec<f64> {
        self.features.iter().map(|row| row[name.index()]).collect()
    }
}

fn gaussian<R: Rng>(rng: &mut R, std_dev: f64) -> f64 {
    let z: f64 = StandardNormal.sample(rng);
    z * std_dev
}

/// Generate `num_samples` rows from `seed`. Same inputs give identical output.
pub fn generate_synthetic_weather(
    num_samples: usize,
    seed: u64,
) -> Result<SyntheticDataset, TrainError> {
    if num_samples == 0 {
        return Err(TrainError::InvalidSampleCount);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut features = Vec::with_capacity(num_samples);
    let mut targets = Vec::with_capacity(num_samples);

    for _ in 0..num_samples {
        let hour = rng.gen_range(0..24u32);
        let day_of_year = rng.gen_range(1..366u32);
        let time = CyclicalTime::from_parts(hour, day_of_year);

        let base_temp = BASE_TEMP_C
            + SEASONAL_AMPLITUDE_C * time.doy_sin
            + DIURNAL_AMPLITUDE_C * time.hour_cos;
        let temp_c = base_temp + gaussian(&mut rng, TEMP_NOISE_SD);

        let humidity = (70.0 - (temp_c - BASE_TEMP_C) * 2.0
            + gaussian(&mut rng, HUMIDITY_NOISE_SD))
        .clamp(5.0, 100.0);
        let pressure_hpa =
            MEAN_PRESSURE_HPA + gaussian(&mut rng, PRESSURE_NOISE_SD) - 0.1 * time.doy_cos;
        let gust: f64 = rng.gen_range(0.0..1.0);
        let wind_kph = (10.0 + 5.0 * gust + 2.0 * (1.0 - time.hour_cos)).max(0.0);
        let cloud_pct = (50.0 + 0.5 * humidity - 0.3 * (temp_c - BASE_TEMP_C)
            + gaussian(&mut rng, CLOUD_NOISE_SD))
        .clamp(0.0, 100.0);

        let target = 0.7 * temp_c + 0.05 * humidity
            - 0.03 * (pressure_hpa - MEAN_PRESSURE_HPA)
            - 0.1 * (cloud_pct / 100.0) * (1.0 + 0.2 * wind_kph)
            + 0.5 * time.hour_sin
            + 0.3 * time.doy_sin
            + gaussian(&mut rng, TARGET_NOISE_SD);

        let observation = Observation { temp_c, humidity, pressure_hpa, wind_kph, cloud_pct };
        features.push(FeatureVector::from_parts(&observation, time).to_canonical_array());
        targets.push(target);
    }

    Ok(SyntheticDataset { features, targets })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mean(values: &[f64]) -> f64 {
        values.iter().sum::<f64>() / values.len() as f64
    }

    #[test]
    fn zero_samples_is_rejected() {
        assert!(matches!(generate_synthetic_weather(0, 42), Err(TrainError::InvalidSampleCount)));
    }

    #[test]
    fn shape_matches_request() {
        let ds = generate_synthetic_weather(250, 42).expect("generate");
        assert_eq!(ds.len(), 250);
        assert_eq!(ds.features.len(), 250);
        assert_eq!(ds.feature_order(), FeatureName::canonical_order());
    }

    #[test]
    fn same_seed_same_data() {
        let a = generate_synthetic_weather(500, 7).expect("generate");
        let b = generate_synthetic_weather(500, 7).expect("generate");
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_differ() {
        let a = generate_synthetic_weather(500, 1).expect("generate");
        let b = generate_synthetic_weather(500, 2).expect("generate");

        let mean_a = mean(&a.column(FeatureName::TempC));
        let mean_b = mean(&b.column(FeatureName::TempC));
        assert!((mean_a - mean_b).abs() > 1e-9);
        assert_ne!(a.targets, b.targets);
    }

    #[test]
    fn generated_values_stay_in_range() {
        let ds = generate_synthetic_weather(5_000, 42).expect("generate");

        assert!(ds.column(FeatureName::Humidity).iter().all(|h| (5.0..=100.0).contains(h)));
        assert!(ds.column(FeatureName::CloudPct).iter().all(|c| (0.0..=100.0).contains(c)));
        assert!(ds.column(FeatureName::WindKph).iter().all(|w| *w >= 0.0));
        assert!(ds.targets.iter().all(|t| t.is_finite()));
    }

    #[test]
    fn time_terms_are_unit_circle_pairs() {
        let ds = generate_synthetic_weather(200, 3).expect("generate");
        for row in &ds.features {
            assert!((row[5].powi(2) + row[6].powi(2) - 1.0).abs() < 1e-9);
            assert!((row[7].powi(2) + row[8].powi(2) - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn temperature_centres_near_base() {
        let ds = generate_synthetic_weather(10_000, 42).expect("generate");
        let m = mean(&ds.column(FeatureName::TempC));
        assert!((m - BASE_TEMP_C).abs() < 1.0, "mean temp {m}");
    }
}
