//! Feature construction shared by training and inference.
//!
//! A feature vector is the five raw observation fields followed by sine and
//! cosine encodings of hour-of-day and day-of-year. Encoding time on the unit
//! circle keeps 23:00 next to 00:00 and 31 December next to 1 January.

use std::f64::consts::TAU;

use chrono::{Datelike, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::FeatureError;
use crate::observation::Observation;

pub const HOURS_PER_DAY: f64 = 24.0;
/// Day 366 of a leap year maps slightly past a full turn; it is not folded back.
pub const DAYS_PER_YEAR: f64 = 365.0;

pub const FEATURE_COUNT: usize = 9;

/// The closed set of model inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureName {
    TempC,
    Humidity,
    PressureHpa,
    WindKph,
    CloudPct,
    HourSin,
    HourCos,
    DoySin,
    DoyCos,
}

impl FeatureName {
    /// Canonical order, used when generating training data.
    pub const CANONICAL: [FeatureName; FEATURE_COUNT] = [
        FeatureName::TempC,
        FeatureName::Humidity,
        FeatureName::PressureHpa,
        FeatureName::WindKph,
        FeatureName::CloudPct,
        FeatureName::HourSin,
        FeatureName::HourCos,
        FeatureName::DoySin,
        FeatureName::DoyCos,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureName::TempC => "temp_c",
            FeatureName::Humidity => "humidity",
            FeatureName::PressureHpa => "pressure_hpa",
            FeatureName::WindKph => "wind_kph",
            FeatureName::CloudPct => "cloud_pct",
            FeatureName::HourSin => "hour_sin",
            FeatureName::HourCos => "hour_cos",
            FeatureName::DoySin => "doy_sin",
            FeatureName::DoyCos => "doy_cos",
        }
    }

    /// Position in the canonical order.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Canonical order as owned strings, the form persisted in a model bundle.
    pub fn canonical_order() -> Vec<String> {
        Self::CANONICAL.iter().map(|name| name.as_str().to_string()).collect()
    }
}

impl std::fmt::Display for FeatureName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for FeatureName {
    type Error = FeatureError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        FeatureName::CANONICAL
            .iter()
            .copied()
            .find(|name| name.as_str() == value)
            .ok_or_else(|| FeatureError::UnknownFeature(value.to_string()))
    }
}

/// Parse a persisted feature order.
pub fn parse_feature_order<S: AsRef<str>>(order: &[S]) -> Result<Vec<FeatureName>, FeatureError> {
    order.iter().map(|name| FeatureName::try_from(name.as_ref())).collect()
}

/// Map `value` with period `period` onto the unit circle.
pub fn encode_cyclical(value: f64, period: f64) -> (f64, f64) {
    let angle = TAU * value / period;
    (angle.sin(), angle.cos())
}

/// Sine/cosine encodings of hour-of-day and day-of-year.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CyclicalTime {
    pub hour_sin: f64,
    pub hour_cos: f64,
    pub doy_sin: f64,
    pub doy_cos: f64,
}

impl CyclicalTime {
    /// `hour` in `0..24`, `day_of_year` in `1..=366`.
    pub fn from_parts(hour: u32, day_of_year: u32) -> Self {
        let (hour_sin, hour_cos) = encode_cyclical(f64::from(hour), HOURS_PER_DAY);
        let (doy_sin, doy_cos) = encode_cyclical(f64::from(day_of_year), DAYS_PER_YEAR);
        Self { hour_sin, hour_cos, doy_sin, doy_cos }
    }

    /// Encode the hour and ordinal day of a timestamp; minutes are ignored.
    pub fn at<T: Datelike + Timelike>(when: &T) -> Self {
        Self::from_parts(when.hour(), when.ordinal())
    }
}

/// One model input, with every feature as a named field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    pub temp_c: f64,
    pub humidity: f64,
    pub pressure_hpa: f64,
    pub wind_kph: f64,
    pub cloud_pct: f64,
    pub hour_sin: f64,
    pub hour_cos: f64,
    pub doy_sin: f64,
    pub doy_cos: f64,
}

impl FeatureVector {
    pub fn new<T: Datelike + Timelike>(observation: &Observation, when: &T) -> Self {
        Self::from_parts(observation, CyclicalTime::at(when))
    }

    pub fn from_parts(observation: &Observation, time: CyclicalTime) -> Self {
        Self {
            temp_c: observation.temp_c,
            humidity: observation.humidity,
            pressure_hpa: observation.pressure_hpa,
            wind_kph: observation.wind_kph,
            cloud_pct: observation.cloud_pct,
            hour_sin: time.hour_sin,
            hour_cos: time.hour_cos,
            doy_sin: time.doy_sin,
            doy_cos: time.doy_cos,
        }
    }

    pub fn get(&self, name: FeatureName) -> f64 {
        match name {
            FeatureName::TempC => self.temp_c,
            FeatureName::Humidity => self.humidity,
            FeatureName::PressureHpa => self.pressure_hpa,
            FeatureName::WindKph => self.wind_kph,
            FeatureName::CloudPct => self.cloud_pct,
            FeatureName::HourSin => self.hour_sin,
            FeatureName::HourCos => self.hour_cos,
            FeatureName::DoySin => self.doy_sin,
            FeatureName::DoyCos => self.doy_cos,
        }
    }

    pub fn ordered(&self, order: &[FeatureName]) -> Vec<f64> {
        order.iter().map(|name| self.get(*name)).collect()
    }

    pub fn to_canonical_array(&self) -> [f64; FEATURE_COUNT] {
        FeatureName::CANONICAL.map(|name| self.get(name))
    }
}

/// Build the model input for `observation` at `when`, in exactly `order`.
///
/// Fails if `order` names a feature outside the known set; that means the
/// model bundle and this code disagree about the feature contract.
pub fn build_feature_vector<T, S>(
    observation: &Observation,
    when: &T,
    order: &[S],
) -> Result<Vec<f64>, FeatureError>
where
    T: Datelike + Timelike,
    S: AsRef<str>,
{
    let names = parse_feature_order(order)?;
    Ok(FeatureVector::new(observation, when).ordered(&names))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn sample_observation() -> Observation {
        Observation {
            temp_c: 15.0,
            humidity: 70.0,
            pressure_hpa: 1013.0,
            wind_kph: 10.0,
            cloud_pct: 50.0,
        }
    }

    /// Day 180 of 2025 is 29 June.
    fn noon_day_180() -> NaiveDateTime {
        NaiveDate::from_yo_opt(2025, 180)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .expect("valid date")
    }

    fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
        ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
    }

    #[test]
    fn hour_encoding_lies_on_unit_circle() {
        for hour in 0..24 {
            let (s, c) = encode_cyclical(f64::from(hour), HOURS_PER_DAY);
            assert!((s * s + c * c - 1.0).abs() < 1e-9, "hour {hour}");
        }
    }

    #[test]
    fn day_of_year_encoding_lies_on_unit_circle() {
        for day in 1..=365 {
            let (s, c) = encode_cyclical(f64::from(day), DAYS_PER_YEAR);
            assert!((s * s + c * c - 1.0).abs() < 1e-9, "day {day}");
        }
    }

    #[test]
    fn midnight_is_adjacent_to_late_evening() {
        let h23 = encode_cyclical(23.0, HOURS_PER_DAY);
        let h0 = encode_cyclical(0.0, HOURS_PER_DAY);
        let h12 = encode_cyclical(12.0, HOURS_PER_DAY);
        assert!(distance(h23, h0) < distance(h23, h12));
    }

    #[test]
    fn leap_day_is_not_folded() {
        let t = CyclicalTime::from_parts(0, 366);
        let (s, c) = encode_cyclical(1.0, DAYS_PER_YEAR);
        assert!((t.doy_sin - s).abs() < 1e-12);
        assert!((t.doy_cos - c).abs() < 1e-12);
    }

    #[test]
    fn canonical_order_names() {
        assert_eq!(
            FeatureName::canonical_order(),
            vec![
                "temp_c",
                "humidity",
                "pressure_hpa",
                "wind_kph",
                "cloud_pct",
                "hour_sin",
                "hour_cos",
                "doy_sin",
                "doy_cos"
            ]
        );
    }

    #[test]
    fn feature_name_roundtrip() {
        for (idx, name) in FeatureName::CANONICAL.into_iter().enumerate() {
            assert_eq!(FeatureName::try_from(name.as_str()), Ok(name));
            assert_eq!(name.index(), idx);
        }
    }

    #[test]
    fn noon_on_day_180() {
        let when = noon_day_180();
        let values =
            build_feature_vector(&sample_observation(), &when, &FeatureName::canonical_order())
                .expect("canonical order is valid");

        assert_eq!(values.len(), FEATURE_COUNT);
        assert_eq!(&values[..5], &[15.0, 70.0, 1013.0, 10.0, 50.0]);
        assert!(values[5].abs() < 1e-9, "hour_sin = {}", values[5]);
        assert!((values[6] + 1.0).abs() < 1e-9, "hour_cos = {}", values[6]);

        let (doy_sin, doy_cos) = encode_cyclical(180.0, DAYS_PER_YEAR);
        assert_eq!(values[7], doy_sin);
        assert_eq!(values[8], doy_cos);
    }

    #[test]
    fn output_follows_requested_order() {
        let when = noon_day_180();
        let obs = sample_observation();
        let canonical =
            build_feature_vector(&obs, &when, &FeatureName::canonical_order()).expect("valid");

        let mut reversed_names = FeatureName::canonical_order();
        reversed_names.reverse();
        let reversed = build_feature_vector(&obs, &when, &reversed_names).expect("valid");

        let mut expected = canonical.clone();
        expected.reverse();
        assert_eq!(reversed, expected);

        let subset = build_feature_vector(&obs, &when, &["cloud_pct", "temp_c"]).expect("valid");
        assert_eq!(subset, vec![50.0, 15.0]);
    }

    #[test]
    fn repeated_builds_are_bit_identical() {
        let when = noon_day_180();
        let order = FeatureName::canonical_order();
        let a = build_feature_vector(&sample_observation(), &when, &order).expect("valid");
        let b = build_feature_vector(&sample_observation(), &when, &order).expect("valid");
        let a_bits: Vec<u64> = a.iter().map(|v| v.to_bits()).collect();
        let b_bits: Vec<u64> = b.iter().map(|v| v.to_bits()).collect();
        assert_eq!(a_bits, b_bits);
    }

    #[test]
    fn unknown_feature_is_an_error() {
        let when = noon_day_180();
        let err = build_feature_vector(&sample_observation(), &when, &["temp_c", "dew_point"])
            .unwrap_err();
        assert_eq!(err, FeatureError::UnknownFeature("dew_point".into()));
    }

    #[test]
    fn struct_and_array_agree() {
        let fv = FeatureVector::new(&sample_observation(), &noon_day_180());
        assert_eq!(fv.to_canonical_array().to_vec(), fv.ordered(&FeatureName::CANONICAL));
    }
}
