//! Destination persistence operations.

use anyhow::Result;
use chrono::{DateTime, Utc};
use ecoflow_core::models::{Destination, Location, SensitivityTier, SustainabilityFeatures};
use sqlx::SqlitePool;

fn tier_to_str(tier: SensitivityTier) -> &'static str {
    match tier {
        SensitivityTier::Low => "low",
        SensitivityTier::Medium => "medium",
        SensitivityTier::High => "high",
        SensitivityTier::Critical => "critical",
    }
}

fn tier_from_str(raw: &str) -> SensitivityTier {
    match raw {
        "low" => SensitivityTier::Low,
        "medium" => SensitivityTier::Medium,
        "high" => SensitivityTier::High,
        _ => SensitivityTier::Critical,
    }
}

/// Upsert a destination row.
pub async fn upsert_destination(pool: &SqlitePool, destination: &Destination) -> Result<()> {
    let features = destination
        .sustainability_features
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    sqlx::query(
        r#"
        INSERT INTO destinations (id, name, lat, lon, region, max_capacity, current_occupancy, ecological_sensitivity, is_active, sustainability_features, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ON CONFLICT(id) DO UPDATE SET
            name = ?2, lat = ?3, lon = ?4, region = ?5,
            max_capacity = ?6, current_occupancy = ?7,
            ecological_sensitivity = ?8, is_active = ?9,
            sustainability_features = ?10, updated_at = ?11
        "#,
    )
    .bind(&destination.id)
    .bind(&destination.name)
    .bind(destination.location.lat)
    .bind(destination.location.lon)
    .bind(&destination.location.region)
    .bind(destination.max_capacity as i64)
    .bind(destination.current_occupancy as i64)
    .bind(tier_to_str(destination.ecological_sensitivity))
    .bind(destination.is_active as i64)
    .bind(features)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Update only the occupancy column.
pub async fn set_occupancy(pool: &SqlitePool, destination_id: &str, occupancy: u32) -> Result<()> {
    sqlx::query(
        "UPDATE destinations SET current_occupancy = ?2, updated_at = ?3 WHERE id = ?1",
    )
    .bind(destination_id)
    .bind(occupancy as i64)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load all destinations from the database.
pub async fn load_all_destinations(pool: &SqlitePool) -> Result<Vec<Destination>> {
    let rows = sqlx::query_as::<_, DestinationRow>(
        "SELECT id, name, lat, lon, region, max_capacity, current_occupancy, ecological_sensitivity, is_active, sustainability_features FROM destinations",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

// Internal row type for SQLx
#[derive(sqlx::FromRow)]
struct DestinationRow {
    id: String,
    name: String,
    lat: f64,
    lon: f64,
    region: String,
    max_capacity: i64,
    current_occupancy: i64,
    ecological_sensitivity: String,
    is_active: i64,
    sustainability_features: Option<String>,
}

impl From<DestinationRow> for Destination {
    fn from(row: DestinationRow) -> Self {
        let sustainability_features: Option<SustainabilityFeatures> = row
            .sustainability_features
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok());

        Destination {
            id: row.id,
            name: row.name,
            location: Location {
                lat: row.lat,
                lon: row.lon,
                region: row.region,
            },
            max_capacity: row.max_capacity.max(0) as u32,
            current_occupancy: row.current_occupancy.max(0) as u32,
            ecological_sensitivity: tier_from_str(&row.ecological_sensitivity),
            is_active: row.is_active != 0,
            sustainability_features,
        }
    }
}

/// Load recent occupancy samples for one destination, newest first.
pub async fn load_occupancy_samples(
    pool: &SqlitePool,
    destination_id: &str,
    since: DateTime<Utc>,
) -> Result<Vec<ecoflow_core::models::OccupancySample>> {
    let rows = sqlx::query_as::<_, OccupancyRow>(
        "SELECT recorded_at, occupancy FROM occupancy_samples WHERE destination_id = ?1 AND recorded_at >= ?2 ORDER BY recorded_at DESC",
    )
    .bind(destination_id)
    .bind(since.to_rfc3339())
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// Append one occupancy sample (idempotent on destination + timestamp).
pub async fn append_occupancy_sample(
    pool: &SqlitePool,
    destination_id: &str,
    sample: &ecoflow_core::models::OccupancySample,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO occupancy_samples (destination_id, recorded_at, occupancy)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(destination_id, recorded_at) DO UPDATE SET occupancy = ?3
        "#,
    )
    .bind(destination_id)
    .bind(sample.recorded_at.to_rfc3339())
    .bind(sample.occupancy as i64)
    .execute(pool)
    .await?;

    Ok(())
}

#[derive(sqlx::FromRow)]
struct OccupancyRow {
    recorded_at: String,
    occupancy: i64,
}

impl From<OccupancyRow> for ecoflow_core::models::OccupancySample {
    fn from(row: OccupancyRow) -> Self {
        let recorded_at = DateTime::parse_from_rfc3339(&row.recorded_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());
        Self {
            recorded_at,
            occupancy: row.occupancy.max(0) as u32,
        }
    }
}
