use async_trait::async_trait;
use std::fmt::Debug;

use crate::{CurrentConditions, error::FetchError};

pub mod openmeteo;

pub use openmeteo::OpenMeteoProvider;

/// Source of current weather conditions for a named city.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current_conditions(&self, city: &str) -> Result<CurrentConditions, FetchError>;
}

/// Trim an error body down to something printable.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let cut = (0..=MAX).rev().find(|&i| body.is_char_boundary(i)).unwrap_or(0);
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}
