//! Weather observation ingest.
//!
//! Fetch, classify, and persist one observation per destination. Each
//! destination runs independently with its own timeout; a batch of N where M
//! fail yields N-M successes plus M reported failures, never an
//! all-or-nothing error.

pub mod provider;
pub mod weather_loop;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use ecoflow_core::classify::classify;
use ecoflow_core::models::{Alert, AlertType, Destination, WeatherObservation};
use futures::future::join_all;

use crate::state::AppState;
use provider::{ProviderError, WeatherProvider};

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("weather fetch timed out after {0:?}")]
    Timeout(Duration),
    #[error("store write failed: {0}")]
    Store(String),
}

/// Outcome of one ingest cycle.
#[derive(Debug, Default, serde::Serialize)]
pub struct IngestOutcome {
    pub succeeded: Vec<String>,
    pub failed: Vec<IngestFailure>,
}

#[derive(Debug, serde::Serialize)]
pub struct IngestFailure {
    pub destination_id: String,
    pub error: String,
}

impl IngestOutcome {
    pub fn wrote_observations(&self) -> bool {
        !self.succeeded.is_empty()
    }
}

/// Fetch-classify-persist for a single destination.
///
/// Idempotent: the observation is a pure function of the reading and the
/// store upserts on (destination, recorded_at), so at-least-once retries are
/// safe. Nothing is written when the fetch or validation fails.
pub async fn ingest_destination(
    state: &AppState,
    provider: &dyn WeatherProvider,
    destination: &Destination,
) -> Result<WeatherObservation, IngestError> {
    let reading = provider
        .fetch(destination.location.lat, destination.location.lon)
        .await?;

    let (level, message) = classify(&state.config().thresholds, &reading);
    let observation =
        WeatherObservation::from_reading(&destination.id, &reading, level, message.clone());

    state
        .record_observation(observation.clone())
        .await
        .map_err(|err| IngestError::Store(err.to_string()))?;

    // A classified level lands as a persisted weather alert; each cycle's
    // alert supersedes the previous one, and a clear reading retires it.
    let alert = level.severity().map(|severity| Alert {
        id: format!("weather-{}-{}", destination.id, reading.recorded_at.timestamp()),
        alert_type: AlertType::Weather,
        title: format!("Weather warning for {}", destination.name),
        message: message.unwrap_or_else(|| "Adverse weather conditions".to_string()),
        severity,
        destination_id: Some(destination.id.clone()),
        timestamp: Utc::now(),
        is_active: true,
    });
    state
        .sync_weather_alert(&destination.id, alert)
        .await
        .map_err(|err| IngestError::Store(err.to_string()))?;

    Ok(observation)
}

/// Run one ingest cycle over all active destinations concurrently.
///
/// Per-destination timeout and isolated error capture; one stuck fetch never
/// stalls the rest of the batch.
pub async fn ingest_cycle(state: &Arc<AppState>, provider: &dyn WeatherProvider) -> IngestOutcome {
    let destinations = state.get_destinations(true);
    let timeout = Duration::from_secs(state.config().ingest_timeout_s);

    let tasks = destinations.iter().map(|destination| async move {
        let result = tokio::time::timeout(
            timeout,
            ingest_destination(state, provider, destination),
        )
        .await;
        let outcome = match result {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(IngestError::Timeout(timeout)),
        };
        (destination.id.clone(), outcome)
    });

    let mut outcome = IngestOutcome::default();
    for (destination_id, result) in join_all(tasks).await {
        match result {
            Ok(()) => outcome.succeeded.push(destination_id),
            Err(err) => {
                tracing::warn!("Ingest failed for {}: {}", destination_id, err);
                outcome.failed.push(IngestFailure {
                    destination_id,
                    error: err.to_string(),
                });
            }
        }
    }
    outcome
}
