//! Weather severity classification against configured thresholds.
//!
//! Each metric (wind, precipitation, temperature) has its own cutoff ladder;
//! the classified level is the worst any single metric reaches, never an
//! additive combination.

use serde::{Deserialize, Serialize};

use crate::models::{WeatherAlertLevel, WeatherReading};

/// Ascending cutoffs for one metric. A value at or above a cutoff reaches
/// that level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ThresholdLadder {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

impl ThresholdLadder {
    pub fn level(&self, value: f64) -> WeatherAlertLevel {
        if !value.is_finite() {
            return WeatherAlertLevel::None;
        }
        if value >= self.critical {
            WeatherAlertLevel::Critical
        } else if value >= self.high {
            WeatherAlertLevel::High
        } else if value >= self.medium {
            WeatherAlertLevel::Medium
        } else if value >= self.low {
            WeatherAlertLevel::Low
        } else {
            WeatherAlertLevel::None
        }
    }
}

/// Deployment-configurable classification thresholds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WeatherThresholds {
    /// Sustained wind speed, m/s.
    pub wind_mps: ThresholdLadder,
    /// Precipitation intensity, mm/h.
    pub precipitation_mm: ThresholdLadder,
    /// Air temperature, degrees C (heat stress side).
    pub temperature_c: ThresholdLadder,
}

impl Default for WeatherThresholds {
    fn default() -> Self {
        Self {
            wind_mps: ThresholdLadder {
                low: 10.0,
                medium: 15.0,
                high: 20.0,
                critical: 28.0,
            },
            precipitation_mm: ThresholdLadder {
                low: 2.5,
                medium: 7.5,
                high: 15.0,
                critical: 30.0,
            },
            temperature_c: ThresholdLadder {
                low: 32.0,
                medium: 36.0,
                high: 40.0,
                critical: 44.0,
            },
        }
    }
}

/// Classify a reading: worst-of-three across wind, precipitation, and
/// temperature. Returns the level plus a message naming the metric(s) that
/// reached it, or `(None, None)` when nothing triggered.
pub fn classify(
    thresholds: &WeatherThresholds,
    reading: &WeatherReading,
) -> (WeatherAlertLevel, Option<String>) {
    let wind = thresholds.wind_mps.level(reading.wind_speed_mps);
    let precip = thresholds.precipitation_mm.level(reading.precipitation_mm);
    let temp = thresholds.temperature_c.level(reading.temperature_c);

    let level = wind.max(precip).max(temp);
    let label = match level {
        WeatherAlertLevel::None => return (level, None),
        WeatherAlertLevel::Low => "Elevated",
        WeatherAlertLevel::Medium => "Adverse",
        WeatherAlertLevel::High => "Severe",
        WeatherAlertLevel::Critical => "Extreme",
    };

    let mut triggers = Vec::new();
    if wind == level {
        triggers.push(format!("wind {:.1} m/s", reading.wind_speed_mps));
    }
    if precip == level {
        triggers.push(format!("precipitation {:.1} mm/h", reading.precipitation_mm));
    }
    if temp == level {
        triggers.push(format!("temperature {:.1} C", reading.temperature_c));
    }

    (level, Some(format!("{} conditions: {}", label, triggers.join(", "))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn reading(wind: f64, precip: f64, temp: f64) -> WeatherReading {
        WeatherReading {
            temperature_c: temp,
            humidity_pct: 60.0,
            wind_speed_mps: wind,
            precipitation_mm: precip,
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn calm_reading_classifies_as_none() {
        let thresholds = WeatherThresholds::default();
        let (level, message) = classify(&thresholds, &reading(3.0, 0.0, 24.0));
        assert_eq!(level, WeatherAlertLevel::None);
        assert!(message.is_none());
    }

    #[test]
    fn worst_single_metric_wins() {
        let thresholds = WeatherThresholds::default();
        // Wind barely low, precipitation critical: critical overall.
        let (level, message) = classify(&thresholds, &reading(10.5, 35.0, 20.0));
        assert_eq!(level, WeatherAlertLevel::Critical);
        let message = message.unwrap();
        assert!(message.contains("precipitation"));
        assert!(!message.contains("wind"));
    }

    #[test]
    fn levels_are_not_additive() {
        let thresholds = WeatherThresholds::default();
        // Three metrics all at "low" must not escalate past low.
        let (level, _) = classify(&thresholds, &reading(11.0, 3.0, 33.0));
        assert_eq!(level, WeatherAlertLevel::Low);
    }

    #[test]
    fn message_names_all_metrics_at_the_worst_level() {
        let thresholds = WeatherThresholds::default();
        let (level, message) = classify(&thresholds, &reading(21.0, 16.0, 25.0));
        assert_eq!(level, WeatherAlertLevel::High);
        let message = message.unwrap();
        assert!(message.contains("wind"));
        assert!(message.contains("precipitation"));
    }

    #[test]
    fn ladder_boundary_is_inclusive() {
        let ladder = ThresholdLadder {
            low: 10.0,
            medium: 15.0,
            high: 20.0,
            critical: 28.0,
        };
        assert_eq!(ladder.level(9.99), WeatherAlertLevel::None);
        assert_eq!(ladder.level(10.0), WeatherAlertLevel::Low);
        assert_eq!(ladder.level(28.0), WeatherAlertLevel::Critical);
        assert_eq!(ladder.level(f64::NAN), WeatherAlertLevel::None);
    }
}
