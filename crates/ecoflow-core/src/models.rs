//! Core data models for the ecological capacity engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Static ecological fragility classification for a destination.
///
/// Drives the base capacity multiplier; ordering is low < medium < high < critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensitivityTier {
    Low,
    Medium,
    High,
    Critical,
}

impl SensitivityTier {
    pub const ALL: [SensitivityTier; 4] = [
        SensitivityTier::Low,
        SensitivityTier::Medium,
        SensitivityTier::High,
        SensitivityTier::Critical,
    ];
}

/// Geographic location of a destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
    /// Administrative region or park name, for display only.
    #[serde(default)]
    pub region: String,
}

/// Waste-management maturity recorded for a destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WasteTier {
    #[default]
    Basic,
    Intermediate,
    Advanced,
}

/// Sustainability facilities recorded for a destination.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SustainabilityFeatures {
    #[serde(default)]
    pub waste_management: WasteTier,
    #[serde(default)]
    pub wildlife_protection: bool,
    #[serde(default)]
    pub certifications: Vec<String>,
}

/// A managed tourist destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Destination {
    pub id: String,
    pub name: String,
    pub location: Location,
    /// Physical visitor ceiling; must be > 0.
    pub max_capacity: u32,
    /// Current visitor count; may transiently exceed capacity.
    #[serde(default)]
    pub current_occupancy: u32,
    pub ecological_sensitivity: SensitivityTier,
    pub is_active: bool,
    #[serde(default)]
    pub sustainability_features: Option<SustainabilityFeatures>,
}

impl Destination {
    /// Validate destination configuration.
    /// Returns list of validation errors (empty = valid).
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.id.trim().is_empty() {
            errors.push("Destination id must not be empty".to_string());
        }
        if self.max_capacity == 0 {
            errors.push("max_capacity must be greater than zero".to_string());
        }
        if !self.location.lat.is_finite() || !(-90.0..=90.0).contains(&self.location.lat) {
            errors.push("Latitude out of range".to_string());
        }
        if !self.location.lon.is_finite() || !(-180.0..=180.0).contains(&self.location.lon) {
            errors.push("Longitude out of range".to_string());
        }

        errors
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Occupancy as a fraction of the physical ceiling.
    pub fn occupancy_ratio(&self) -> f64 {
        if self.max_capacity == 0 {
            return 0.0;
        }
        self.current_occupancy as f64 / self.max_capacity as f64
    }
}

// ========== WEATHER ==========

/// Raw weather sample obtained from the external provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherReading {
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub wind_speed_mps: f64,
    /// Precipitation intensity, mm over the last hour.
    pub precipitation_mm: f64,
    pub recorded_at: DateTime<Utc>,
}

/// Alert level derived from a weather reading.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum WeatherAlertLevel {
    #[default]
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl WeatherAlertLevel {
    /// Map to an alert severity; `None` carries no alert.
    pub fn severity(self) -> Option<Severity> {
        match self {
            WeatherAlertLevel::None => None,
            WeatherAlertLevel::Low => Some(Severity::Low),
            WeatherAlertLevel::Medium => Some(Severity::Medium),
            WeatherAlertLevel::High => Some(Severity::High),
            WeatherAlertLevel::Critical => Some(Severity::Critical),
        }
    }
}

/// A classified weather observation for one destination.
///
/// Immutable once written; the latest observation per destination feeds the
/// capacity policy, older rows are read-only history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub destination_id: String,
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub wind_speed_mps: f64,
    pub precipitation_mm: f64,
    pub recorded_at: DateTime<Utc>,
    pub alert_level: WeatherAlertLevel,
    #[serde(default)]
    pub alert_message: Option<String>,
}

impl WeatherObservation {
    /// Build an observation from a raw reading and its classification.
    pub fn from_reading(
        destination_id: impl Into<String>,
        reading: &WeatherReading,
        alert_level: WeatherAlertLevel,
        alert_message: Option<String>,
    ) -> Self {
        Self {
            destination_id: destination_id.into(),
            temperature_c: reading.temperature_c,
            humidity_pct: reading.humidity_pct,
            wind_speed_mps: reading.wind_speed_mps,
            precipitation_mm: reading.precipitation_mm,
            recorded_at: reading.recorded_at,
            alert_level,
            alert_message,
        }
    }
}

// ========== ALERTS ==========

/// Alert severity; ordering is total (low < medium < high < critical).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Sort rank: critical first.
    pub fn priority_rank(self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::High => 1,
            Severity::Medium => 2,
            Severity::Low => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Capacity,
    Weather,
    Emergency,
    Maintenance,
    Ecological,
}

/// An operator-visible alert.
///
/// Two provenances: persisted rows (operator- or ingest-created) and computed
/// alerts synthesized at read time from utilization, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Empty on an inbound create request; the server assigns one.
    #[serde(default)]
    pub id: String,
    pub alert_type: AlertType,
    pub title: String,
    pub message: String,
    pub severity: Severity,
    #[serde(default)]
    pub destination_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub is_active: bool,
}

// ========== CAPACITY ==========

/// Which dynamic multipliers deviated from neutral.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveFactors {
    pub weather: bool,
    pub season: bool,
    pub infrastructure: bool,
}

/// Result of a dynamic capacity evaluation.
///
/// Computed on demand, never persisted; always derivable from the destination,
/// its latest observation, the calendar date, and occupancy history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicCapacityResult {
    pub destination_id: String,
    pub adjusted_capacity: u32,
    pub factors: ActiveFactors,
    /// Names the binding constraint, or a neutral message if none active.
    pub display_message: String,
}

impl DynamicCapacityResult {
    /// Occupancy against the adjusted ceiling. A zero ceiling with visitors
    /// present reads as infinite utilization.
    pub fn utilization(&self, occupancy: u32) -> f64 {
        if self.adjusted_capacity == 0 {
            if occupancy == 0 {
                return 0.0;
            }
            return f64::INFINITY;
        }
        occupancy as f64 / self.adjusted_capacity as f64
    }
}

/// One historical occupancy data point, used for infrastructure strain.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OccupancySample {
    pub recorded_at: DateTime<Utc>,
    pub occupancy: u32,
}

// ========== SCORING ==========

/// Composite sustainability score for a destination, all components 0-100.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SustainabilityScore {
    pub destination_id: String,
    pub overall_score: f64,
    pub carbon: f64,
    pub community: f64,
    pub wildlife: f64,
    pub certification: f64,
}

// ========== CHANGE EVENTS ==========

/// Event pushed to stream subscribers. Observers treat every event as a
/// cache-invalidation signal and re-pull full state rather than patching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeEvent {
    WeatherUpdateAvailable,
    CapacityUpdate,
    WeatherUpdate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn severity_ordering_is_total() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert_eq!(Severity::Critical.priority_rank(), 0);
        assert_eq!(Severity::Low.priority_rank(), 3);
    }

    #[test]
    fn weather_level_maps_to_severity() {
        assert_eq!(WeatherAlertLevel::None.severity(), None);
        assert_eq!(
            WeatherAlertLevel::Critical.severity(),
            Some(Severity::Critical)
        );
    }

    #[test]
    fn destination_validation_rejects_zero_capacity() {
        let dest = Destination {
            id: "reef-bay".into(),
            name: "Reef Bay".into(),
            location: Location {
                lat: 8.5,
                lon: 97.2,
                region: "South Coast".into(),
            },
            max_capacity: 0,
            current_occupancy: 0,
            ecological_sensitivity: SensitivityTier::High,
            is_active: true,
            sustainability_features: None,
        };
        assert!(!dest.is_valid());
        assert!(dest.validate().iter().any(|e| e.contains("max_capacity")));
    }

    #[test]
    fn utilization_handles_zero_ceiling() {
        let result = DynamicCapacityResult {
            destination_id: "d1".into(),
            adjusted_capacity: 0,
            factors: ActiveFactors::default(),
            display_message: String::new(),
        };
        assert_eq!(result.utilization(0), 0.0);
        assert!(result.utilization(5).is_infinite());
    }

    #[test]
    fn change_event_wire_shape() {
        let json = serde_json::to_string(&ChangeEvent::WeatherUpdateAvailable).unwrap();
        assert_eq!(json, r#"{"type":"weather_update_available"}"#);
        let back: ChangeEvent = serde_json::from_str(r#"{"type":"capacity_update"}"#).unwrap();
        assert_eq!(back, ChangeEvent::CapacityUpdate);
    }

    #[test]
    fn observation_from_reading_copies_fields() {
        let reading = WeatherReading {
            temperature_c: 31.0,
            humidity_pct: 78.0,
            wind_speed_mps: 6.5,
            precipitation_mm: 0.4,
            recorded_at: Utc::now(),
        };
        let obs = WeatherObservation::from_reading("d1", &reading, WeatherAlertLevel::None, None);
        assert_eq!(obs.destination_id, "d1");
        assert_eq!(obs.wind_speed_mps, 6.5);
        assert_eq!(obs.recorded_at, reading.recorded_at);
    }
}
