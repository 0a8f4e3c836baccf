//! Weather provider seam.
//!
//! The ingest step talks to the provider through a trait so tests can swap in
//! a fake; the production implementation targets an Open-Meteo style current
//! conditions endpoint.

use async_trait::async_trait;
use chrono::Utc;
use ecoflow_core::models::WeatherReading;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("weather provider request failed: {0}")]
    Request(String),
    #[error("weather provider returned HTTP {0}")]
    Status(u16),
    #[error("weather provider response malformed: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Fetch the current reading for a coordinate.
    async fn fetch(&self, lat: f64, lon: f64) -> Result<WeatherReading, ProviderError>;
}

/// Production provider against an Open-Meteo compatible endpoint.
pub struct OpenMeteoProvider {
    client: Client,
    url: String,
}

impl OpenMeteoProvider {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            url: url.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    current: Option<WeatherCurrent>,
    current_weather: Option<WeatherCurrentAlt>,
}

#[derive(Debug, Deserialize)]
struct WeatherCurrent {
    temperature_2m: Option<f64>,
    relative_humidity_2m: Option<f64>,
    wind_speed_10m: Option<f64>,
    precipitation: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WeatherCurrentAlt {
    temperature: Option<f64>,
    windspeed: Option<f64>,
    precipitation: Option<f64>,
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    async fn fetch(&self, lat: f64, lon: f64) -> Result<WeatherReading, ProviderError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("latitude", lat.to_string()),
                ("longitude", lon.to_string()),
                (
                    "current",
                    "temperature_2m,relative_humidity_2m,wind_speed_10m,precipitation".to_string(),
                ),
                ("windspeed_unit", "ms".to_string()),
                ("timezone", "UTC".to_string()),
            ])
            .send()
            .await
            .map_err(|err| ProviderError::Request(err.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status().as_u16()));
        }

        let payload: WeatherResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::Malformed(err.to_string()))?;

        let reading = if let Some(current) = payload.current {
            WeatherReading {
                temperature_c: require("temperature_2m", current.temperature_2m)?,
                humidity_pct: current.relative_humidity_2m.unwrap_or(0.0),
                wind_speed_mps: require("wind_speed_10m", current.wind_speed_10m)?,
                precipitation_mm: require("precipitation", current.precipitation)?,
                recorded_at: Utc::now(),
            }
        } else if let Some(alt) = payload.current_weather {
            WeatherReading {
                temperature_c: require("temperature", alt.temperature)?,
                humidity_pct: 0.0,
                wind_speed_mps: require("windspeed", alt.windspeed)?,
                precipitation_mm: alt.precipitation.unwrap_or(0.0),
                recorded_at: Utc::now(),
            }
        } else {
            return Err(ProviderError::Malformed(
                "response missing current conditions".to_string(),
            ));
        };

        validate_reading(&reading)?;
        Ok(reading)
    }
}

/// Reject non-finite values so a half-broken payload never becomes a
/// persisted observation.
fn validate_reading(reading: &WeatherReading) -> Result<(), ProviderError> {
    for (field, value) in [
        ("temperature_c", reading.temperature_c),
        ("humidity_pct", reading.humidity_pct),
        ("wind_speed_mps", reading.wind_speed_mps),
        ("precipitation_mm", reading.precipitation_mm),
    ] {
        if !value.is_finite() {
            return Err(ProviderError::Malformed(format!(
                "{field} is not a finite number"
            )));
        }
    }
    if reading.wind_speed_mps < 0.0 || reading.precipitation_mm < 0.0 {
        return Err(ProviderError::Malformed(
            "negative wind or precipitation".to_string(),
        ));
    }
    Ok(())
}

fn require(field: &str, value: Option<f64>) -> Result<f64, ProviderError> {
    value.ok_or_else(|| ProviderError::Malformed(format!("missing field {field}")))
}
