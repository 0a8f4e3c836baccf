//! Server configuration from environment.
//!
//! Every tunable the policy engine or ingest loop consumes is an `ECOFLOW_*`
//! variable with a documented default; nothing numeric is hard-coded at use
//! sites.

use std::collections::HashMap;
use std::env;

use ecoflow_core::alerts::UtilizationThresholds;
use ecoflow_core::capacity::{CapacityPolicy, SeasonWindow, StrainPolicy, TierMultipliers, WeatherFactors};
use ecoflow_core::classify::{ThresholdLadder, WeatherThresholds};
use ecoflow_core::scoring::DEFAULT_SPARE_HEADROOM;

#[derive(Debug, Clone)]
pub struct Config {
    /// ECOFLOW_PORT, default 3000.
    pub server_port: u16,
    /// ECOFLOW_DB, default data/ecoflow.db.
    pub database_path: String,
    /// ECOFLOW_DB_MAX_CONNECTIONS, default 5.
    pub database_max_connections: u32,
    /// ECOFLOW_WEATHER_URL, default Open-Meteo forecast endpoint.
    pub weather_url: String,
    /// ECOFLOW_INGEST_INTERVAL_S, default 900 (15 min).
    pub ingest_interval_s: u64,
    /// ECOFLOW_INGEST_TIMEOUT_S, per-destination fetch timeout, default 10.
    pub ingest_timeout_s: u64,
    /// ECOFLOW_INGEST_BACKOFF_BASE_MS / _MAX_MS, defaults 2000 / 300000.
    pub ingest_backoff_base_ms: u64,
    pub ingest_backoff_max_ms: u64,
    /// ECOFLOW_WS_CHANNEL_CAPACITY, default 256 events buffered per observer.
    pub ws_channel_capacity: usize,
    /// ECOFLOW_OCCUPANCY_HISTORY_DAYS, retained sample horizon, default 30.
    pub occupancy_history_days: i64,
    /// ECOFLOW_SPARE_HEADROOM, alternative-finder cutoff, default 0.70.
    pub spare_headroom: f64,
    pub thresholds: WeatherThresholds,
    pub utilization: UtilizationThresholds,
    pub policy: CapacityPolicy,
}

impl Config {
    pub fn from_env() -> Self {
        let thresholds = WeatherThresholds {
            wind_mps: ladder_from_env("ECOFLOW_WIND", WeatherThresholds::default().wind_mps),
            precipitation_mm: ladder_from_env(
                "ECOFLOW_PRECIP",
                WeatherThresholds::default().precipitation_mm,
            ),
            temperature_c: ladder_from_env(
                "ECOFLOW_TEMP",
                WeatherThresholds::default().temperature_c,
            ),
        };

        let tier_defaults = TierMultipliers::default();
        let weather_defaults = WeatherFactors::default();
        let strain_defaults = StrainPolicy::default();
        let policy = CapacityPolicy {
            tier_multipliers: TierMultipliers {
                low: env_f64("ECOFLOW_TIER_LOW", tier_defaults.low),
                medium: env_f64("ECOFLOW_TIER_MEDIUM", tier_defaults.medium),
                high: env_f64("ECOFLOW_TIER_HIGH", tier_defaults.high),
                critical: env_f64("ECOFLOW_TIER_CRITICAL", tier_defaults.critical),
            },
            weather_factors: WeatherFactors {
                medium: env_f64("ECOFLOW_WEATHER_FACTOR_MEDIUM", weather_defaults.medium),
                high: env_f64("ECOFLOW_WEATHER_FACTOR_HIGH", weather_defaults.high),
                critical: env_f64("ECOFLOW_WEATHER_FACTOR_CRITICAL", weather_defaults.critical),
            },
            strain: StrainPolicy {
                ratio: env_f64("ECOFLOW_STRAIN_RATIO", strain_defaults.ratio),
                window_days: env_i64("ECOFLOW_STRAIN_WINDOW_DAYS", strain_defaults.window_days),
                min_samples: env_usize("ECOFLOW_STRAIN_MIN_SAMPLES", strain_defaults.min_samples),
                factor: env_f64("ECOFLOW_STRAIN_FACTOR", strain_defaults.factor),
            },
            season_windows: season_windows_from_env(),
        };

        let utilization_defaults = UtilizationThresholds::default();

        Self {
            server_port: env::var("ECOFLOW_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3000),
            database_path: env::var("ECOFLOW_DB")
                .unwrap_or_else(|_| "data/ecoflow.db".to_string()),
            database_max_connections: env_u32("ECOFLOW_DB_MAX_CONNECTIONS", 5),
            weather_url: env::var("ECOFLOW_WEATHER_URL")
                .unwrap_or_else(|_| "https://api.open-meteo.com/v1/forecast".to_string()),
            ingest_interval_s: env_u64("ECOFLOW_INGEST_INTERVAL_S", 900),
            ingest_timeout_s: env_u64("ECOFLOW_INGEST_TIMEOUT_S", 10),
            ingest_backoff_base_ms: env_u64("ECOFLOW_INGEST_BACKOFF_BASE_MS", 2_000),
            ingest_backoff_max_ms: env_u64("ECOFLOW_INGEST_BACKOFF_MAX_MS", 300_000),
            ws_channel_capacity: env_usize("ECOFLOW_WS_CHANNEL_CAPACITY", 256),
            occupancy_history_days: env_i64("ECOFLOW_OCCUPANCY_HISTORY_DAYS", 30),
            spare_headroom: env_f64("ECOFLOW_SPARE_HEADROOM", DEFAULT_SPARE_HEADROOM),
            thresholds,
            utilization: UtilizationThresholds {
                critical: env_f64("ECOFLOW_UTILIZATION_CRITICAL", utilization_defaults.critical),
                high: env_f64("ECOFLOW_UTILIZATION_HIGH", utilization_defaults.high),
            },
            policy,
        }
    }
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn env_i64(key: &str, default: i64) -> i64 {
    env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

/// Ladder cutoffs from `{prefix}_LOW/_MEDIUM/_HIGH/_CRITICAL`.
fn ladder_from_env(prefix: &str, default: ThresholdLadder) -> ThresholdLadder {
    ThresholdLadder {
        low: env_f64(&format!("{prefix}_LOW"), default.low),
        medium: env_f64(&format!("{prefix}_MEDIUM"), default.medium),
        high: env_f64(&format!("{prefix}_HIGH"), default.high),
        critical: env_f64(&format!("{prefix}_CRITICAL"), default.critical),
    }
}

/// ECOFLOW_SEASON_WINDOWS: JSON map of destination id to windows, e.g.
/// `{"reef-bay":[{"label":"nesting","start_month":5,"start_day":1,
/// "end_month":7,"end_day":31,"factor":0.5}]}`. Invalid JSON logs a warning
/// and yields no windows rather than failing startup.
fn season_windows_from_env() -> HashMap<String, Vec<SeasonWindow>> {
    let Ok(raw) = env::var("ECOFLOW_SEASON_WINDOWS") else {
        return HashMap::new();
    };
    match serde_json::from_str(&raw) {
        Ok(windows) => windows,
        Err(err) => {
            tracing::warn!("Ignoring malformed ECOFLOW_SEASON_WINDOWS: {}", err);
            HashMap::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_env() {
        let config = Config::from_env();
        assert_eq!(config.ingest_interval_s, 900);
        assert!(config.weather_url.contains("open-meteo"));
        assert_eq!(config.utilization.critical, 0.85);
        assert_eq!(config.policy.tier_multipliers.high, 0.65);
    }

    #[test]
    fn season_windows_parse_from_json() {
        let raw = r#"{"reef-bay":[{"label":"nesting","start_month":5,"start_day":1,"end_month":7,"end_day":31,"factor":0.5}]}"#;
        let parsed: HashMap<String, Vec<SeasonWindow>> = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed["reef-bay"].len(), 1);
        assert_eq!(parsed["reef-bay"][0].factor, 0.5);
    }
}
