use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::ObservationError;

/// Current weather readings, in the units the model was trained on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub temp_c: f64,
    /// Relative humidity, percent.
    pub humidity: f64,
    pub pressure_hpa: f64,
    pub wind_kph: f64,
    /// Cloud cover, percent.
    pub cloud_pct: f64,
}

impl Observation {
    /// Reject values the model can't sensibly consume.
    ///
    /// Every field must be finite; humidity and cloud cover must lie in
    /// `[0, 100]`. Temperature, pressure and wind are not range-checked.
    pub fn validate(&self) -> Result<(), ObservationError> {
        let fields = [
            ("temp_c", self.temp_c),
            ("humidity", self.humidity),
            ("pressure_hpa", self.pressure_hpa),
            ("wind_kph", self.wind_kph),
            ("cloud_pct", self.cloud_pct),
        ];

        for (field, value) in fields {
            if !value.is_finite() {
                return Err(ObservationError::NonFinite { field, value });
            }
        }

        for (field, value) in [("humidity", self.humidity), ("cloud_pct", self.cloud_pct)] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ObservationError::OutOfRange { field, value, min: 0.0, max: 100.0 });
            }
        }

        Ok(())
    }
}

/// A geocoded place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl std::fmt::Display for Place {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.country.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}, {}", self.name, self.country)
        }
    }
}

/// Current conditions for a place, as reported by a weather provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub place: Place,
    pub observation: Observation,
    /// Observation time in the place's local timezone.
    pub observed_at: NaiveDateTime,
}

/// Next-hour prediction for a city, together with what it was based on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityForecast {
    pub place: Place,
    pub observation: Observation,
    pub observed_at: NaiveDateTime,
    pub predicted_temp_c_next_hour: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Observation {
        Observation {
            temp_c: 15.0,
            humidity: 70.0,
            pressure_hpa: 1013.0,
            wind_kph: 10.0,
            cloud_pct: 50.0,
        }
    }

    #[test]
    fn plausible_observation_is_valid() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn nan_is_rejected() {
        let obs = Observation { pressure_hpa: f64::NAN, ..sample() };
        let err = obs.validate().unwrap_err();
        assert!(matches!(err, ObservationError::NonFinite { field: "pressure_hpa", .. }));
    }

    #[test]
    fn humidity_above_hundred_is_rejected() {
        let obs = Observation { humidity: 101.0, ..sample() };
        let err = obs.validate().unwrap_err();
        assert!(matches!(err, ObservationError::OutOfRange { field: "humidity", .. }));
    }

    #[test]
    fn negative_cloud_cover_is_rejected() {
        let obs = Observation { cloud_pct: -1.0, ..sample() };
        assert!(obs.validate().is_err());
    }

    #[test]
    fn place_display() {
        let place = Place {
            name: "London".into(),
            country: "United Kingdom".into(),
            latitude: 51.5,
            longitude: -0.12,
        };
        assert_eq!(place.to_string(), "London, United Kingdom");
    }
}
