use std::sync::Arc;

use crate::{
    CityForecast,
    bundle::ModelBundle,
    error::ServiceError,
    provider::WeatherProvider,
};

/// Fetches live conditions and predicts the next hour with a loaded bundle.
///
/// The bundle is shared read-only, so one service can answer concurrent
/// requests.
#[derive(Debug, Clone)]
pub struct ForecastService<P> {
    provider: P,
    bundle: Arc<ModelBundle>,
}

impl<P: WeatherProvider> ForecastService<P> {
    pub fn new(provider: P, bundle: Arc<ModelBundle>) -> Self {
        Self { provider, bundle }
    }

    pub fn bundle(&self) -> &ModelBundle {
        &self.bundle
    }

    pub async fn predict_for_city(&self, city: &str) -> Result<CityForecast, ServiceError> {
        let conditions = self.provider.current_conditions(city).await.inspect_err(|e| {
            if e.is_retryable() {
                tracing::warn!(%city, error = %e, "weather fetch failed, may succeed on retry");
            }
        })?;

        let predicted = self.bundle.predict(&conditions.observation, &conditions.observed_at)?;
        tracing::info!(place = %conditions.place, predicted, "next-hour forecast");

        Ok(CityForecast {
            place: conditions.place,
            observation: conditions.observation,
            observed_at: conditions.observed_at,
            predicted_temp_c_next_hour: predicted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        CurrentConditions, Observation, Place,
        error::{FetchError, PredictError},
        training::{TrainingOptions, train},
    };
    use async_trait::async_trait;
    use chrono::NaiveDate;

    #[derive(Debug)]
    struct FixedProvider {
        observation: Observation,
    }

    #[async_trait]
    impl WeatherProvider for FixedProvider {
        async fn current_conditions(&self, city: &str) -> Result<CurrentConditions, FetchError> {
            if city == "Nowhere" {
                return Err(FetchError::NotFound(city.to_string()));
            }
            Ok(CurrentConditions {
                place: Place {
                    name: city.to_string(),
                    country: "Testland".into(),
                    latitude: 0.0,
                    longitude: 0.0,
                },
                observation: self.observation,
                observed_at: NaiveDate::from_yo_opt(2025, 180)
                    .and_then(|d| d.and_hms_opt(12, 0, 0))
                    .expect("valid date"),
            })
        }
    }

    fn small_bundle() -> Arc<ModelBundle> {
        let opts = TrainingOptions { num_samples: 800, n_trees: 8, ..TrainingOptions::default() };
        Arc::new(train(&opts).expect("train"))
    }

    fn mild() -> Observation {
        Observation {
            temp_c: 15.0,
            humidity: 70.0,
            pressure_hpa: 1013.0,
            wind_kph: 10.0,
            cloud_pct: 50.0,
        }
    }

    #[tokio::test]
    async fn predicts_for_city() {
        let service = ForecastService::new(FixedProvider { observation: mild() }, small_bundle());
        let forecast = service.predict_for_city("London").await.expect("forecast");

        assert_eq!(forecast.place.name, "London");
        assert_eq!(forecast.observation, mild());
        assert!(forecast.predicted_temp_c_next_hour.is_finite());

        let direct = service
            .bundle()
            .predict(&forecast.observation, &forecast.observed_at)
            .expect("predict");
        assert_eq!(direct, forecast.predicted_temp_c_next_hour);
    }

    #[tokio::test]
    async fn fetch_failure_is_surfaced() {
        let service = ForecastService::new(FixedProvider { observation: mild() }, small_bundle());
        let err = service.predict_for_city("Nowhere").await.unwrap_err();
        assert!(matches!(err, ServiceError::Fetch(FetchError::NotFound(_))));
    }

    #[tokio::test]
    async fn invalid_observation_is_surfaced() {
        let broken = Observation { cloud_pct: 140.0, ..mild() };
        let service = ForecastService::new(FixedProvider { observation: broken }, small_bundle());
        let err = service.predict_for_city("London").await.unwrap_err();
        assert!(matches!(err, ServiceError::Predict(PredictError::InvalidObservation(_))));
    }
}
