//! Dynamic capacity policy engine.
//!
//! Maps a destination's sensitivity tier plus the latest weather observation,
//! calendar date, and occupancy history into an adjusted visitor ceiling and
//! the set of factors that bound it. Explicitly constructed and injected;
//! configuration in, engine out, no globals.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::{
    ActiveFactors, Destination, DynamicCapacityResult, OccupancySample, SensitivityTier,
    WeatherAlertLevel, WeatherObservation,
};

/// Base capacity multiplier per sensitivity tier. Values are deployment
/// policy, not mechanism; they must decrease strictly from low to critical.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TierMultipliers {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

impl Default for TierMultipliers {
    fn default() -> Self {
        Self {
            low: 1.00,
            medium: 0.85,
            high: 0.65,
            critical: 0.40,
        }
    }
}

impl TierMultipliers {
    pub fn for_tier(&self, tier: SensitivityTier) -> f64 {
        match tier {
            SensitivityTier::Low => self.low,
            SensitivityTier::Medium => self.medium,
            SensitivityTier::High => self.high,
            SensitivityTier::Critical => self.critical,
        }
    }
}

/// Degrading factor applied when the latest observation reaches the keyed
/// severity. Levels below medium stay neutral.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WeatherFactors {
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

impl Default for WeatherFactors {
    fn default() -> Self {
        Self {
            medium: 0.85,
            high: 0.65,
            critical: 0.40,
        }
    }
}

/// An ecologically sensitive calendar window for one destination.
///
/// `factor` direction is per-window: < 1.0 narrows capacity (breeding season,
/// monsoon landslide risk), > 1.0 widens it (peak-staffing season); the final
/// result is still clamped to the physical ceiling. Windows may wrap the year
/// end (e.g. Nov 15 - Feb 10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonWindow {
    pub label: String,
    pub start_month: u32,
    pub start_day: u32,
    pub end_month: u32,
    pub end_day: u32,
    pub factor: f64,
}

impl SeasonWindow {
    /// Inclusive on both endpoints, year-wrap aware.
    pub fn contains(&self, date: NaiveDate) -> bool {
        let day = (date.month(), date.day());
        let start = (self.start_month, self.start_day);
        let end = (self.end_month, self.end_day);
        if start <= end {
            day >= start && day <= end
        } else {
            day >= start || day <= end
        }
    }
}

/// Tunables for the infrastructure-strain factor: occupancy sustained above
/// `ratio` of base capacity across the trailing window triggers `factor`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StrainPolicy {
    pub ratio: f64,
    pub window_days: i64,
    pub min_samples: usize,
    pub factor: f64,
}

impl Default for StrainPolicy {
    fn default() -> Self {
        Self {
            ratio: 0.80,
            window_days: 14,
            min_samples: 3,
            factor: 0.90,
        }
    }
}

/// Full capacity policy configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapacityPolicy {
    #[serde(default)]
    pub tier_multipliers: TierMultipliers,
    #[serde(default)]
    pub weather_factors: WeatherFactors,
    #[serde(default)]
    pub strain: StrainPolicy,
    /// Seasonal windows keyed by destination id.
    #[serde(default)]
    pub season_windows: HashMap<String, Vec<SeasonWindow>>,
}

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("destination {id} is misconfigured: {reason}")]
    InvalidDestination { id: String, reason: String },
}

/// The policy engine. Stateless beyond its read-only configuration, so one
/// instance may be shared across threads and invoked concurrently per
/// destination.
#[derive(Debug, Clone)]
pub struct CapacityPolicyEngine {
    policy: CapacityPolicy,
}

impl CapacityPolicyEngine {
    pub fn new(policy: CapacityPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &CapacityPolicy {
        &self.policy
    }

    /// Base capacity multiplier for a tier.
    pub fn tier_multiplier(&self, tier: SensitivityTier) -> f64 {
        self.policy.tier_multipliers.for_tier(tier)
    }

    /// Legacy synchronous variant: static-tier ceiling only, no dynamic
    /// factors. Degraded-accuracy fallback for callers without weather or
    /// history inputs, not a second source of truth.
    pub fn static_capacity(&self, destination: &Destination) -> Result<u32, PolicyError> {
        let base = self.base_capacity(destination)?;
        Ok(clamp_capacity(base, destination.max_capacity))
    }

    /// Full dynamic evaluation.
    pub fn dynamic_capacity(
        &self,
        destination: &Destination,
        latest_observation: Option<&WeatherObservation>,
        date: NaiveDate,
        occupancy_history: &[OccupancySample],
    ) -> Result<DynamicCapacityResult, PolicyError> {
        let base = self.base_capacity(destination)?;

        let weather_factor = self.weather_factor(latest_observation);
        let season_factor = self.season_factor(&destination.id, date);
        let infrastructure_factor = self.infrastructure_factor(base, date, occupancy_history);

        let factors = ActiveFactors {
            weather: weather_factor < 1.0,
            season: (season_factor - 1.0).abs() > f64::EPSILON,
            infrastructure: infrastructure_factor < 1.0,
        };

        let adjusted = clamp_capacity(
            base * weather_factor * season_factor * infrastructure_factor,
            destination.max_capacity,
        );

        let display_message = binding_factor_message(
            weather_factor,
            season_factor,
            infrastructure_factor,
        );

        Ok(DynamicCapacityResult {
            destination_id: destination.id.clone(),
            adjusted_capacity: adjusted,
            factors,
            display_message,
        })
    }

    fn base_capacity(&self, destination: &Destination) -> Result<f64, PolicyError> {
        if destination.max_capacity == 0 {
            return Err(PolicyError::InvalidDestination {
                id: destination.id.clone(),
                reason: "max_capacity is zero".to_string(),
            });
        }
        let multiplier = self.tier_multiplier(destination.ecological_sensitivity);
        Ok(destination.max_capacity as f64 * multiplier)
    }

    fn weather_factor(&self, latest: Option<&WeatherObservation>) -> f64 {
        let Some(observation) = latest else {
            return 1.0;
        };
        match observation.alert_level {
            WeatherAlertLevel::Medium => self.policy.weather_factors.medium,
            WeatherAlertLevel::High => self.policy.weather_factors.high,
            WeatherAlertLevel::Critical => self.policy.weather_factors.critical,
            WeatherAlertLevel::None | WeatherAlertLevel::Low => 1.0,
        }
    }

    /// Most restrictive factor among windows covering `date`; 1.0 outside all
    /// windows.
    fn season_factor(&self, destination_id: &str, date: NaiveDate) -> f64 {
        let Some(windows) = self.policy.season_windows.get(destination_id) else {
            return 1.0;
        };
        windows
            .iter()
            .filter(|w| w.contains(date))
            .map(|w| w.factor)
            .fold(1.0, f64::min)
    }

    /// Wear factor when occupancy stayed above the strain ratio for the whole
    /// trailing window. Requires a minimum sample count so a single spike
    /// cannot trigger it.
    fn infrastructure_factor(
        &self,
        base: f64,
        date: NaiveDate,
        history: &[OccupancySample],
    ) -> f64 {
        let strain = &self.policy.strain;
        let threshold = base * strain.ratio;
        let window_start = date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc() - chrono::Duration::days(strain.window_days));

        let Some(window_start) = window_start else {
            return 1.0;
        };

        let recent: Vec<&OccupancySample> = history
            .iter()
            .filter(|s| s.recorded_at >= window_start)
            .collect();
        if recent.len() < strain.min_samples {
            return 1.0;
        }
        if recent.iter().all(|s| s.occupancy as f64 > threshold) {
            strain.factor
        } else {
            1.0
        }
    }
}

fn clamp_capacity(value: f64, max_capacity: u32) -> u32 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    (value.round() as u64).min(max_capacity as u64) as u32
}

/// Single most-restrictive active factor, ties broken weather > season >
/// infrastructure.
fn binding_factor_message(weather: f64, season: f64, infrastructure: f64) -> String {
    // Tie-break order encoded by candidate position.
    let candidates = [
        (weather, "Capacity reduced due to adverse weather conditions"),
        (season, "Capacity adjusted for seasonal ecological protection"),
        (infrastructure, "Capacity reduced due to sustained infrastructure strain"),
    ];

    let mut binding: Option<(f64, &str)> = None;
    for (factor, message) in candidates {
        if (factor - 1.0).abs() <= f64::EPSILON {
            continue;
        }
        let more_restrictive = match binding {
            Some((best, _)) => factor < best,
            None => true,
        };
        if more_restrictive {
            binding = Some((factor, message));
        }
    }

    match binding {
        Some((_, message)) => message.to_string(),
        None => "Operating at standard capacity".to_string(),
    }
}
