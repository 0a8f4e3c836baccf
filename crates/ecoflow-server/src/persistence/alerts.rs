//! Persisted alert operations.
//!
//! Only operator-created and ingest-created alerts live here; computed
//! ecological alerts are synthesized at read time and never stored.

use anyhow::Result;
use chrono::{DateTime, Utc};
use ecoflow_core::models::{Alert, AlertType, Severity};
use sqlx::SqlitePool;

fn type_to_str(alert_type: AlertType) -> &'static str {
    match alert_type {
        AlertType::Capacity => "capacity",
        AlertType::Weather => "weather",
        AlertType::Emergency => "emergency",
        AlertType::Maintenance => "maintenance",
        AlertType::Ecological => "ecological",
    }
}

fn type_from_str(raw: &str) -> AlertType {
    match raw {
        "capacity" => AlertType::Capacity,
        "weather" => AlertType::Weather,
        "emergency" => AlertType::Emergency,
        "maintenance" => AlertType::Maintenance,
        _ => AlertType::Ecological,
    }
}

fn severity_to_str(severity: Severity) -> &'static str {
    match severity {
        Severity::Low => "low",
        Severity::Medium => "medium",
        Severity::High => "high",
        Severity::Critical => "critical",
    }
}

fn severity_from_str(raw: &str) -> Severity {
    match raw {
        "low" => Severity::Low,
        "medium" => Severity::Medium,
        "high" => Severity::High,
        _ => Severity::Critical,
    }
}

/// Append one alert row.
pub async fn append_alert(pool: &SqlitePool, alert: &Alert) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO alerts (id, alert_type, title, message, severity, destination_id, timestamp, is_active)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(id) DO UPDATE SET
            alert_type = ?2, title = ?3, message = ?4,
            severity = ?5, destination_id = ?6,
            timestamp = ?7, is_active = ?8
        "#,
    )
    .bind(&alert.id)
    .bind(type_to_str(alert.alert_type))
    .bind(&alert.title)
    .bind(&alert.message)
    .bind(severity_to_str(alert.severity))
    .bind(&alert.destination_id)
    .bind(alert.timestamp.to_rfc3339())
    .bind(alert.is_active as i64)
    .execute(pool)
    .await?;

    Ok(())
}

/// Deactivate all active weather alerts for one destination, returning the
/// ids that were cleared. Used by ingest so a fresh observation supersedes
/// the previous cycle's weather alert instead of accumulating beside it.
pub async fn deactivate_weather_alerts(
    pool: &SqlitePool,
    destination_id: &str,
) -> Result<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT id FROM alerts WHERE destination_id = ?1 AND alert_type = 'weather' AND is_active = 1",
    )
    .bind(destination_id)
    .fetch_all(pool)
    .await?;

    sqlx::query(
        "UPDATE alerts SET is_active = 0 WHERE destination_id = ?1 AND alert_type = 'weather' AND is_active = 1",
    )
    .bind(destination_id)
    .execute(pool)
    .await?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Load active alerts, most recent first.
pub async fn load_active_alerts(pool: &SqlitePool) -> Result<Vec<Alert>> {
    let rows = sqlx::query_as::<_, AlertRow>(
        "SELECT id, alert_type, title, message, severity, destination_id, timestamp, is_active FROM alerts WHERE is_active = 1 ORDER BY timestamp DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

// Internal row type for SQLx
#[derive(sqlx::FromRow)]
struct AlertRow {
    id: String,
    alert_type: String,
    title: String,
    message: String,
    severity: String,
    destination_id: Option<String>,
    timestamp: String,
    is_active: i64,
}

impl From<AlertRow> for Alert {
    fn from(row: AlertRow) -> Self {
        let timestamp = DateTime::parse_from_rfc3339(&row.timestamp)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Alert {
            id: row.id,
            alert_type: type_from_str(&row.alert_type),
            title: row.title,
            message: row.message,
            severity: severity_from_str(&row.severity),
            destination_id: row.destination_id,
            timestamp,
            is_active: row.is_active != 0,
        }
    }
}
