//! Weather observation persistence operations.

use anyhow::Result;
use chrono::{DateTime, Utc};
use ecoflow_core::models::{WeatherAlertLevel, WeatherObservation};
use sqlx::SqlitePool;

fn level_to_str(level: WeatherAlertLevel) -> &'static str {
    match level {
        WeatherAlertLevel::None => "none",
        WeatherAlertLevel::Low => "low",
        WeatherAlertLevel::Medium => "medium",
        WeatherAlertLevel::High => "high",
        WeatherAlertLevel::Critical => "critical",
    }
}

fn level_from_str(raw: &str) -> WeatherAlertLevel {
    match raw {
        "low" => WeatherAlertLevel::Low,
        "medium" => WeatherAlertLevel::Medium,
        "high" => WeatherAlertLevel::High,
        "critical" => WeatherAlertLevel::Critical,
        _ => WeatherAlertLevel::None,
    }
}

/// Append an observation. Keyed on (destination, recorded_at) so re-running
/// ingest with the same reading is a no-op rather than a duplicate row.
pub async fn append_observation(pool: &SqlitePool, obs: &WeatherObservation) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO weather_observations (destination_id, recorded_at, temperature_c, humidity_pct, wind_speed_mps, precipitation_mm, alert_level, alert_message)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(destination_id, recorded_at) DO UPDATE SET
            temperature_c = ?3, humidity_pct = ?4,
            wind_speed_mps = ?5, precipitation_mm = ?6,
            alert_level = ?7, alert_message = ?8
        "#,
    )
    .bind(&obs.destination_id)
    .bind(obs.recorded_at.to_rfc3339())
    .bind(obs.temperature_c)
    .bind(obs.humidity_pct)
    .bind(obs.wind_speed_mps)
    .bind(obs.precipitation_mm)
    .bind(level_to_str(obs.alert_level))
    .bind(&obs.alert_message)
    .execute(pool)
    .await?;

    Ok(())
}

/// Latest observation per destination, for cache warm-up at startup.
pub async fn load_latest_observations(pool: &SqlitePool) -> Result<Vec<WeatherObservation>> {
    let rows = sqlx::query_as::<_, ObservationRow>(
        r#"
        SELECT o.destination_id, o.recorded_at, o.temperature_c, o.humidity_pct, o.wind_speed_mps, o.precipitation_mm, o.alert_level, o.alert_message
        FROM weather_observations o
        INNER JOIN (
            SELECT destination_id, MAX(recorded_at) AS recorded_at
            FROM weather_observations
            GROUP BY destination_id
        ) latest
        ON o.destination_id = latest.destination_id AND o.recorded_at = latest.recorded_at
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

// Internal row type for SQLx
#[derive(sqlx::FromRow)]
struct ObservationRow {
    destination_id: String,
    recorded_at: String,
    temperature_c: f64,
    humidity_pct: f64,
    wind_speed_mps: f64,
    precipitation_mm: f64,
    alert_level: String,
    alert_message: Option<String>,
}

impl From<ObservationRow> for WeatherObservation {
    fn from(row: ObservationRow) -> Self {
        let recorded_at = DateTime::parse_from_rfc3339(&row.recorded_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        WeatherObservation {
            destination_id: row.destination_id,
            temperature_c: row.temperature_c,
            humidity_pct: row.humidity_pct,
            wind_speed_mps: row.wind_speed_mps,
            precipitation_mm: row.precipitation_mm,
            recorded_at,
            alert_level: level_from_str(&row.alert_level),
            alert_message: row.alert_message,
        }
    }
}
