//! Ingest cycle tests with a scripted weather provider.

use async_trait::async_trait;
use chrono::Utc;
use ecoflow_core::models::{
    AlertType, Destination, Location, SensitivityTier, WeatherAlertLevel, WeatherReading,
};
use ecoflow_server::config::Config;
use ecoflow_server::ingest::provider::{ProviderError, WeatherProvider};
use ecoflow_server::ingest::{ingest_cycle, ingest_destination};
use ecoflow_server::state::AppState;

/// Provider scripted by latitude: negative latitude simulates an outage,
/// otherwise wind speed is taken from the `wind` field.
struct ScriptedProvider {
    wind_mps: f64,
}

#[async_trait]
impl WeatherProvider for ScriptedProvider {
    async fn fetch(&self, lat: f64, _lon: f64) -> Result<WeatherReading, ProviderError> {
        if lat < 0.0 {
            return Err(ProviderError::Request("simulated outage".into()));
        }
        Ok(WeatherReading {
            temperature_c: 24.0,
            humidity_pct: 70.0,
            wind_speed_mps: self.wind_mps,
            precipitation_mm: 0.0,
            recorded_at: Utc::now(),
        })
    }
}

fn test_config(tag: &str) -> Config {
    let mut config = Config::from_env();
    let path = std::env::temp_dir().join(format!(
        "ecoflow-ingest-test-{}-{}.db",
        tag,
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);
    config.database_path = path.to_string_lossy().into_owned();
    config.database_max_connections = 1;
    config
}

fn destination(id: &str, lat: f64) -> Destination {
    Destination {
        id: id.into(),
        name: format!("{id} site"),
        location: Location {
            lat,
            lon: 97.0,
            region: String::new(),
        },
        max_capacity: 1000,
        current_occupancy: 0,
        ecological_sensitivity: SensitivityTier::Low,
        is_active: true,
        sustainability_features: None,
    }
}

#[tokio::test]
async fn cycle_tolerates_partial_failures() {
    let state = AppState::new(test_config("partial")).await.unwrap();
    state
        .upsert_destination(destination("healthy", 8.0))
        .await
        .unwrap();
    state
        .upsert_destination(destination("unreachable", -8.0))
        .await
        .unwrap();

    let provider = ScriptedProvider { wind_mps: 5.0 };
    let outcome = ingest_cycle(&state, &provider).await;

    assert_eq!(outcome.succeeded, vec!["healthy".to_string()]);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].destination_id, "unreachable");

    // The failed destination got no observation; the healthy one did.
    assert!(state.latest_observation("unreachable").is_none());
    let obs = state.latest_observation("healthy").unwrap();
    assert_eq!(obs.alert_level, WeatherAlertLevel::None);
}

#[tokio::test]
async fn stormy_reading_emits_alert_and_calm_reading_retires_it() {
    let state = AppState::new(test_config("storm")).await.unwrap();
    let dest = destination("bay", 8.0);
    state.upsert_destination(dest.clone()).await.unwrap();

    // Default wind ladder: 22 m/s is "high".
    let stormy = ScriptedProvider { wind_mps: 22.0 };
    ingest_destination(&state, &stormy, &dest).await.unwrap();

    let alerts = state.aggregated_alerts();
    let weather: Vec<_> = alerts
        .iter()
        .filter(|a| a.alert_type == AlertType::Weather)
        .collect();
    assert_eq!(weather.len(), 1);
    assert!(weather[0].message.contains("wind"));

    // Conditions clear: the persisted weather alert is retired.
    let calm = ScriptedProvider { wind_mps: 3.0 };
    ingest_destination(&state, &calm, &dest).await.unwrap();

    let alerts = state.aggregated_alerts();
    assert!(alerts.iter().all(|a| a.alert_type != AlertType::Weather));
}

#[tokio::test]
async fn reingesting_the_same_reading_is_idempotent() {
    let state = AppState::new(test_config("idem")).await.unwrap();
    let dest = destination("bay", 8.0);
    state.upsert_destination(dest.clone()).await.unwrap();

    let provider = ScriptedProvider { wind_mps: 5.0 };
    let first = ingest_destination(&state, &provider, &dest).await.unwrap();

    // Replay the identical reading through the store, as an at-least-once
    // retry would.
    state.record_observation(first.clone()).await.unwrap();
    let latest = state.latest_observation("bay").unwrap();
    assert_eq!(latest.recorded_at, first.recorded_at);
    assert_eq!(latest.wind_speed_mps, first.wind_speed_mps);
}
