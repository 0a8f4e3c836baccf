//! Alert aggregation: computed-alert synthesis, merge, dedup, and priority
//! ordering.
//!
//! The aggregator is a pure function of its inputs; re-running with unchanged
//! inputs produces an identical list in identical order.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Alert, AlertType, DynamicCapacityResult, Severity};

/// Utilization cutoffs for computed ecological alerts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UtilizationThresholds {
    /// Above this ratio a critical alert is synthesized.
    pub critical: f64,
    /// Above this ratio (but at or below `critical`) a high alert is
    /// synthesized.
    pub high: f64,
}

impl Default for UtilizationThresholds {
    fn default() -> Self {
        Self {
            critical: 0.85,
            high: 0.70,
        }
    }
}

/// Deterministic identity for a computed alert, derived from destination and
/// kind so repeated synthesis yields the same id and no cleanup is ever
/// needed.
fn computed_alert_id(destination_id: &str, kind: &str) -> String {
    format!("computed-{destination_id}-{kind}")
}

/// Synthesize unpersisted ecological alerts from current utilization.
///
/// `occupancy` maps destination id to current visitor count; destinations
/// without an entry are skipped. `now` stamps the computed alerts and is
/// passed in so the whole pipeline stays a pure function.
pub fn synthesize_capacity_alerts(
    capacities: &[DynamicCapacityResult],
    occupancy: &HashMap<String, u32>,
    thresholds: UtilizationThresholds,
    now: DateTime<Utc>,
) -> Vec<Alert> {
    let mut computed = Vec::new();
    for capacity in capacities {
        let Some(&current) = occupancy.get(&capacity.destination_id) else {
            continue;
        };
        let utilization = capacity.utilization(current);

        let (severity, kind, title) = if utilization > thresholds.critical {
            (
                Severity::Critical,
                "ecological-critical",
                "Ecological capacity critical",
            )
        } else if utilization > thresholds.high {
            (
                Severity::High,
                "ecological-high",
                "Ecological capacity strained",
            )
        } else {
            continue;
        };

        computed.push(Alert {
            id: computed_alert_id(&capacity.destination_id, kind),
            alert_type: AlertType::Ecological,
            title: title.to_string(),
            message: format!(
                "Occupancy at {:.0}% of adjusted capacity {}",
                utilization * 100.0,
                capacity.adjusted_capacity
            ),
            severity,
            destination_id: Some(capacity.destination_id.clone()),
            timestamp: now,
            is_active: true,
        });
    }
    computed
}

#[derive(PartialEq, Eq, Hash)]
struct DedupKey {
    title: String,
    message: String,
    destination_id: Option<String>,
    alert_type: AlertType,
}

fn dedup_key(alert: &Alert) -> DedupKey {
    DedupKey {
        title: alert.title.clone(),
        message: alert.message.clone(),
        destination_id: alert.destination_id.clone(),
        alert_type: alert.alert_type,
    }
}

/// Merge persisted and computed alerts into one deduplicated, priority-sorted
/// list.
///
/// Within a dedup group the most-recently-timestamped entry survives; on an
/// exact timestamp tie the earlier input position wins, so callers passing
/// persisted alerts most-recent-first get a deterministic result.
pub fn merge_alerts(persisted: Vec<Alert>, computed: Vec<Alert>) -> Vec<Alert> {
    let merged = persisted
        .into_iter()
        .filter(|a| a.is_active)
        .chain(computed);

    let mut kept: Vec<Alert> = Vec::new();
    let mut index: HashMap<DedupKey, usize> = HashMap::new();
    for alert in merged {
        match index.entry(dedup_key(&alert)) {
            std::collections::hash_map::Entry::Occupied(entry) => {
                let slot = *entry.get();
                if alert.timestamp > kept[slot].timestamp {
                    kept[slot] = alert;
                }
            }
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(kept.len());
                kept.push(alert);
            }
        }
    }

    // Critical first, then newest; id as the final deterministic tie-break.
    kept.sort_by(|a, b| {
        a.severity
            .priority_rank()
            .cmp(&b.severity.priority_rank())
            .then_with(|| b.timestamp.cmp(&a.timestamp))
            .then_with(|| a.id.cmp(&b.id))
    });
    kept
}

/// Full aggregation pipeline: synthesize, merge, dedup, sort.
pub fn aggregate_alerts(
    persisted: Vec<Alert>,
    capacities: &[DynamicCapacityResult],
    occupancy: &HashMap<String, u32>,
    thresholds: UtilizationThresholds,
    now: DateTime<Utc>,
) -> Vec<Alert> {
    let computed = synthesize_capacity_alerts(capacities, occupancy, thresholds, now);
    merge_alerts(persisted, computed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActiveFactors;
    use chrono::{Duration, TimeZone, Utc};

    fn capacity(dest: &str, adjusted: u32) -> DynamicCapacityResult {
        DynamicCapacityResult {
            destination_id: dest.into(),
            adjusted_capacity: adjusted,
            factors: ActiveFactors::default(),
            display_message: String::new(),
        }
    }

    fn persisted(
        id: &str,
        title: &str,
        dest: Option<&str>,
        severity: Severity,
        timestamp: DateTime<Utc>,
    ) -> Alert {
        Alert {
            id: id.into(),
            alert_type: AlertType::Weather,
            title: title.into(),
            message: "test".into(),
            severity,
            destination_id: dest.map(String::from),
            timestamp,
            is_active: true,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn synthesizes_critical_above_85_percent() {
        // maxCapacity 1000, high tier -> adjusted 650; occupancy 600 is 92.3%.
        let capacities = vec![capacity("island", 650)];
        let occupancy = HashMap::from([("island".to_string(), 600)]);
        let alerts = synthesize_capacity_alerts(
            &capacities,
            &occupancy,
            UtilizationThresholds::default(),
            now(),
        );
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::Critical);
        assert_eq!(alerts[0].alert_type, AlertType::Ecological);
        assert_eq!(alerts[0].id, "computed-island-ecological-critical");
    }

    #[test]
    fn synthesizes_high_between_70_and_85_percent() {
        let capacities = vec![capacity("bay", 1000)];
        let occupancy = HashMap::from([("bay".to_string(), 750)]);
        let alerts = synthesize_capacity_alerts(
            &capacities,
            &occupancy,
            UtilizationThresholds::default(),
            now(),
        );
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::High);
    }

    #[test]
    fn no_alert_below_headroom_threshold() {
        let capacities = vec![capacity("bay", 1000)];
        let occupancy = HashMap::from([("bay".to_string(), 500)]);
        let alerts = synthesize_capacity_alerts(
            &capacities,
            &occupancy,
            UtilizationThresholds::default(),
            now(),
        );
        assert!(alerts.is_empty());
    }

    #[test]
    fn computed_identity_is_stable_across_runs() {
        let capacities = vec![capacity("island", 650)];
        let occupancy = HashMap::from([("island".to_string(), 600)]);
        let first = synthesize_capacity_alerts(
            &capacities,
            &occupancy,
            UtilizationThresholds::default(),
            now(),
        );
        let second = synthesize_capacity_alerts(
            &capacities,
            &occupancy,
            UtilizationThresholds::default(),
            now(),
        );
        assert_eq!(first[0].id, second[0].id);
    }

    #[test]
    fn dedup_keeps_most_recent_duplicate() {
        let older = persisted(
            "a1",
            "Heavy Rain Warning",
            Some("bay"),
            Severity::High,
            now() - Duration::hours(3),
        );
        let newer = persisted("a2", "Heavy Rain Warning", Some("bay"), Severity::High, now());
        // Most-recent-first input ordering, as callers provide.
        let merged = merge_alerts(vec![newer.clone(), older], Vec::new());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id, "a2");
    }

    #[test]
    fn dedup_tie_on_timestamp_keeps_first_input() {
        let first = persisted("a1", "Trail closed", Some("ridge"), Severity::Medium, now());
        let second = persisted("a2", "Trail closed", Some("ridge"), Severity::Medium, now());
        let merged = merge_alerts(vec![first, second], Vec::new());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id, "a1");
    }

    #[test]
    fn inactive_persisted_alerts_are_dropped() {
        let mut alert = persisted("a1", "Old news", None, Severity::Low, now());
        alert.is_active = false;
        let merged = merge_alerts(vec![alert], Vec::new());
        assert!(merged.is_empty());
    }

    #[test]
    fn sorted_by_severity_then_recency() {
        let alerts = vec![
            persisted("low", "A", None, Severity::Low, now()),
            persisted("crit-old", "B", None, Severity::Critical, now() - Duration::hours(2)),
            persisted("crit-new", "C", None, Severity::Critical, now()),
            persisted("high", "D", None, Severity::High, now()),
        ];
        let merged = merge_alerts(alerts, Vec::new());
        let ids: Vec<&str> = merged.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["crit-new", "crit-old", "high", "low"]);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let capacities = vec![capacity("island", 650), capacity("bay", 1000)];
        let occupancy = HashMap::from([
            ("island".to_string(), 600),
            ("bay".to_string(), 750),
        ]);
        let persisted_alerts = vec![
            persisted("w1", "Heavy Rain Warning", Some("bay"), Severity::High, now()),
            persisted(
                "w2",
                "Heavy Rain Warning",
                Some("bay"),
                Severity::High,
                now() - Duration::hours(1),
            ),
        ];

        let run = || {
            aggregate_alerts(
                persisted_alerts.clone(),
                &capacities,
                &occupancy,
                UtilizationThresholds::default(),
                now(),
            )
        };
        let first = run();
        let second = run();
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        // The duplicate pair collapsed to the newer entry.
        assert!(first.iter().filter(|a| a.title == "Heavy Rain Warning").count() == 1);
        assert!(first.iter().any(|a| a.id == "w1"));
    }
}
