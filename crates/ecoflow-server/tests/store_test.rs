//! State store integration tests against a throwaway SQLite file.

use chrono::Utc;
use ecoflow_core::models::{
    Alert, AlertType, Destination, Location, SensitivityTier, Severity, WeatherAlertLevel,
    WeatherObservation, WeatherReading,
};
use ecoflow_server::config::Config;
use ecoflow_server::state::AppState;

fn test_config(tag: &str) -> Config {
    let mut config = Config::from_env();
    let path = std::env::temp_dir().join(format!(
        "ecoflow-store-test-{}-{}.db",
        tag,
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);
    config.database_path = path.to_string_lossy().into_owned();
    config.database_max_connections = 1;
    config
}

fn destination(id: &str, max_capacity: u32, tier: SensitivityTier) -> Destination {
    Destination {
        id: id.into(),
        name: format!("{id} test site"),
        location: Location {
            lat: 8.5,
            lon: 97.2,
            region: "Test Coast".into(),
        },
        max_capacity,
        current_occupancy: 0,
        ecological_sensitivity: tier,
        is_active: true,
        sustainability_features: None,
    }
}

#[tokio::test]
async fn occupancy_update_flows_into_computed_alerts() {
    let state = AppState::new(test_config("alerts")).await.unwrap();

    state
        .upsert_destination(destination("island", 1000, SensitivityTier::High))
        .await
        .unwrap();

    // High tier multiplier 0.65 -> adjusted 650; 600 visitors is 92.3%.
    let updated = state.set_occupancy("island", 600).await.unwrap().unwrap();
    assert_eq!(updated.current_occupancy, 600);

    let dest = state.get_destination("island").unwrap();
    let capacity = state.capacity_for(&dest).unwrap();
    assert_eq!(capacity.adjusted_capacity, 650);

    let alerts = state.aggregated_alerts();
    let computed = alerts
        .iter()
        .find(|a| a.id == "computed-island-ecological-critical")
        .expect("expected a computed critical ecological alert");
    assert_eq!(computed.severity, Severity::Critical);
    assert_eq!(computed.alert_type, AlertType::Ecological);
}

#[tokio::test]
async fn severe_weather_observation_tightens_capacity() {
    let state = AppState::new(test_config("weather")).await.unwrap();

    state
        .upsert_destination(destination("bay", 1000, SensitivityTier::Low))
        .await
        .unwrap();

    let reading = WeatherReading {
        temperature_c: 24.0,
        humidity_pct: 80.0,
        wind_speed_mps: 22.0,
        precipitation_mm: 1.0,
        recorded_at: Utc::now(),
    };
    let observation = WeatherObservation::from_reading(
        "bay",
        &reading,
        WeatherAlertLevel::High,
        Some("Severe conditions: wind 22.0 m/s".into()),
    );
    state.record_observation(observation).await.unwrap();

    let dest = state.get_destination("bay").unwrap();
    let capacity = state.capacity_for(&dest).unwrap();
    assert_eq!(capacity.adjusted_capacity, 650);
    assert!(capacity.factors.weather);
    assert!(capacity.display_message.contains("weather"));
}

#[tokio::test]
async fn stale_observation_does_not_clobber_latest() {
    let state = AppState::new(test_config("stale")).await.unwrap();
    state
        .upsert_destination(destination("ridge", 500, SensitivityTier::Low))
        .await
        .unwrap();

    let now = Utc::now();
    let fresh = WeatherObservation::from_reading(
        "ridge",
        &WeatherReading {
            temperature_c: 20.0,
            humidity_pct: 60.0,
            wind_speed_mps: 3.0,
            precipitation_mm: 0.0,
            recorded_at: now,
        },
        WeatherAlertLevel::None,
        None,
    );
    let stale = WeatherObservation::from_reading(
        "ridge",
        &WeatherReading {
            temperature_c: 18.0,
            humidity_pct: 65.0,
            wind_speed_mps: 30.0,
            precipitation_mm: 10.0,
            recorded_at: now - chrono::Duration::hours(6),
        },
        WeatherAlertLevel::Critical,
        Some("old storm".into()),
    );

    state.record_observation(fresh).await.unwrap();
    // Replayed older reading persists but the cache keeps the newer one.
    state.record_observation(stale).await.unwrap();

    let latest = state.latest_observation("ridge").unwrap();
    assert_eq!(latest.alert_level, WeatherAlertLevel::None);
    assert_eq!(latest.recorded_at, now);
}

#[tokio::test]
async fn misconfigured_destination_is_isolated_in_sweep() {
    let state = AppState::new(test_config("sweep")).await.unwrap();

    state
        .upsert_destination(destination("good", 800, SensitivityTier::Medium))
        .await
        .unwrap();
    // Bypass handler validation: a zero-capacity row in the store must not
    // poison the sweep for everyone else.
    let broken = destination("broken", 0, SensitivityTier::Low);
    state.upsert_destination(broken).await.unwrap();

    let sweep = state.capacity_sweep();
    assert_eq!(sweep.results.len(), 1);
    assert_eq!(sweep.results[0].destination_id, "good");
    assert_eq!(sweep.errors.len(), 1);
    assert_eq!(sweep.errors[0].destination_id, "broken");
}

#[tokio::test]
async fn persisted_alert_dedup_survives_aggregation() {
    let state = AppState::new(test_config("dedup")).await.unwrap();

    state
        .upsert_destination(destination("bay", 1000, SensitivityTier::Low))
        .await
        .unwrap();

    let now = Utc::now();
    let make = |id: &str, timestamp| Alert {
        id: id.into(),
        alert_type: AlertType::Weather,
        title: "Heavy Rain Warning".into(),
        message: "test".into(),
        severity: Severity::High,
        destination_id: Some("bay".into()),
        timestamp,
        is_active: true,
    };
    state
        .append_alert(make("older", now - chrono::Duration::hours(2)))
        .await
        .unwrap();
    state.append_alert(make("newer", now)).await.unwrap();

    let alerts = state.aggregated_alerts();
    let rain: Vec<&Alert> = alerts
        .iter()
        .filter(|a| a.title == "Heavy Rain Warning")
        .collect();
    assert_eq!(rain.len(), 1);
    assert_eq!(rain[0].id, "newer");
}
