use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    CurrentConditions, Observation, Place,
    error::FetchError,
    provider::{WeatherProvider, truncate_body},
};

pub const GEOCODING_BASE_URL: &str = "https://geocoding-api.open-meteo.com";
pub const FORECAST_BASE_URL: &str = "https://api.open-meteo.com";

const REQUEST_TIMEOUT_SECS: u64 = 10;
const CURRENT_FIELDS: &str =
    "temperature_2m,relative_humidity_2m,surface_pressure,wind_speed_10m,cloud_cover";
const MPS_TO_KPH: f64 = 3.6;

/// Open-Meteo geocoding + current weather. No API key required.
#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    http: Client,
    geocoding_url: String,
    forecast_url: String,
}

impl OpenMeteoProvider {
    pub fn new() -> Result<Self, FetchError> {
        Self::with_base_urls(GEOCODING_BASE_URL, FORECAST_BASE_URL)
    }

    /// Point the provider at other hosts (a mirror, or a mock server).
    pub fn with_base_urls(geocoding_url: &str, forecast_url: &str) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            geocoding_url: geocoding_url.trim_end_matches('/').to_string(),
            forecast_url: forecast_url.trim_end_matches('/').to_string(),
        })
    }

    /// Resolve a city name to its best-matching place.
    pub async fn geocode(&self, city: &str) -> Result<Place, FetchError> {
        let url = format!("{}/v1/search", self.geocoding_url);
        tracing::debug!(%city, "geocoding city");

        let res = self
            .http
            .get(&url)
            .query(&[("name", city), ("count", "1"), ("language", "en"), ("format", "json")])
            .send()
            .await?;

        let parsed: GeoResponse = read_json(res).await?;

        let hit = parsed
            .results
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::NotFound(city.to_string()))?;

        Ok(Place {
            name: hit.name,
            country: hit.country.unwrap_or_default(),
            latitude: hit.latitude,
            longitude: hit.longitude,
        })
    }

    /// Current observation at a place, timestamped in the place's local time.
    pub async fn fetch_current(&self, place: Place) -> Result<CurrentConditions, FetchError> {
        let url = format!("{}/v1/forecast", self.forecast_url);
        tracing::debug!(place = %place, "fetching current weather");

        let res = self
            .http
            .get(&url)
            .query(&[
                ("latitude", place.latitude.to_string()),
                ("longitude", place.longitude.to_string()),
                ("current", CURRENT_FIELDS.to_string()),
                ("wind_speed_unit", "ms".to_string()),
                ("timezone", "auto".to_string()),
            ])
            .send()
            .await?;

        let parsed: ForecastResponse = read_json(res).await?;
        let current = parsed.current;

        let observed_at = NaiveDateTime::parse_from_str(&current.time, "%Y-%m-%dT%H:%M")
            .map_err(|e| {
                FetchError::Parse(format!("bad observation time '{}': {e}", current.time))
            })?;

        Ok(CurrentConditions {
            place,
            observation: Observation {
                temp_c: current.temperature_2m,
                humidity: current.relative_humidity_2m,
                pressure_hpa: current.surface_pressure,
                wind_kph: current.wind_speed_10m * MPS_TO_KPH,
                cloud_pct: current.cloud_cover,
            },
            observed_at,
        })
    }
}

async fn read_json<T: DeserializeOwned>(res: reqwest::Response) -> Result<T, FetchError> {
    let status = res.status();
    let body = res.text().await?;

    if !status.is_success() {
        return Err(FetchError::Status { status: status.as_u16(), body: truncate_body(&body) });
    }

    serde_json::from_str(&body).map_err(|e| FetchError::Parse(e.to_string()))
}

#[derive(Debug, Deserialize)]
struct GeoResponse {
    #[serde(default)]
    results: Vec<GeoResult>,
}

#[derive(Debug, Deserialize)]
struct GeoResult {
    name: String,
    latitude: f64,
    longitude: f64,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: OmCurrent,
}

#[derive(Debug, Deserialize)]
struct OmCurrent {
    time: String,
    temperature_2m: f64,
    relative_humidity_2m: f64,
    surface_pressure: f64,
    wind_speed_10m: f64,
    cloud_cover: f64,
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    async fn current_conditions(&self, city: &str) -> Result<CurrentConditions, FetchError> {
        let place = self.geocode(city).await?;
        self.fetch_current(place).await
    }
}
