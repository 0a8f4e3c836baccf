//! Continuous weather ingest loop.
//!
//! Runs in the background on a fixed interval, re-evaluating weather for all
//! active destinations and broadcasting an update event when new observations
//! land. Provider-wide outages back off exponentially instead of hammering
//! the endpoint every tick.

use std::sync::Arc;
use std::time::Duration;

use ecoflow_core::models::ChangeEvent;
use tokio::time::interval;

use crate::backoff::Backoff;
use crate::ingest::{ingest_cycle, provider::WeatherProvider};
use crate::state::AppState;

/// Start the weather ingest loop. Never returns.
pub async fn run_weather_loop(state: Arc<AppState>, provider: Arc<dyn WeatherProvider>) {
    let config = state.config();
    let mut ticker = interval(Duration::from_secs(config.ingest_interval_s.max(1)));
    let mut backoff = Backoff::new(
        Duration::from_millis(config.ingest_backoff_base_ms),
        Duration::from_millis(config.ingest_backoff_max_ms),
    );

    loop {
        ticker.tick().await;

        if !backoff.ready() {
            continue;
        }

        let outcome = ingest_cycle(&state, provider.as_ref()).await;

        if !outcome.failed.is_empty() {
            tracing::warn!(
                "Weather ingest cycle: {} succeeded, {} failed",
                outcome.succeeded.len(),
                outcome.failed.len()
            );
        } else if !outcome.succeeded.is_empty() {
            tracing::debug!(
                "Weather ingest cycle: {} destinations updated",
                outcome.succeeded.len()
            );
        }

        // Only a total blackout counts as a provider outage; partial failure
        // still made progress.
        if outcome.succeeded.is_empty() && !outcome.failed.is_empty() {
            let delay = backoff.fail();
            tracing::warn!(
                "Weather provider unavailable ({} consecutive failures), backing off {:?}",
                backoff.consecutive_failures(),
                delay
            );
        } else {
            backoff.succeed();
        }

        if outcome.wrote_observations() {
            state.publish(ChangeEvent::WeatherUpdate);
        }
    }
}
