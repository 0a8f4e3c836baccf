//! Sustainability scoring and the low-impact alternative finder.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{
    Destination, DynamicCapacityResult, SensitivityTier, SustainabilityScore, WasteTier,
};

/// Relative weight of each sub-score in the overall score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub carbon: f64,
    pub community: f64,
    pub wildlife: f64,
    pub certification: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            carbon: 0.35,
            community: 0.25,
            wildlife: 0.25,
            certification: 0.15,
        }
    }
}

/// Utilization ceiling below which a destination counts as having spare
/// headroom for the alternative finder.
pub const DEFAULT_SPARE_HEADROOM: f64 = 0.70;

#[derive(Debug, thiserror::Error)]
pub enum ScoreError {
    #[error("destination {id} cannot be scored: {reason}")]
    InvalidDestination { id: String, reason: String },
}

fn tier_pressure_weight(tier: SensitivityTier) -> f64 {
    match tier {
        SensitivityTier::Low => 0.25,
        SensitivityTier::Medium => 0.50,
        SensitivityTier::High => 0.75,
        SensitivityTier::Critical => 1.00,
    }
}

fn clamp_score(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

/// Composite sustainability score, all components on a 0-100 scale.
///
/// Carbon is an inverse footprint estimate: visitor pressure scaled by the
/// tier's fragility weight. Community, wildlife, and certification come from
/// the recorded sustainability features; a destination with none recorded
/// scores conservatively rather than being excluded.
pub fn sustainability_score(destination: &Destination) -> Result<SustainabilityScore, ScoreError> {
    if destination.max_capacity == 0 {
        return Err(ScoreError::InvalidDestination {
            id: destination.id.clone(),
            reason: "max_capacity is zero".to_string(),
        });
    }

    let occupancy_ratio = destination.occupancy_ratio().min(1.5);
    let pressure =
        occupancy_ratio * (0.5 + tier_pressure_weight(destination.ecological_sensitivity));
    let carbon = clamp_score(100.0 * (1.0 - pressure));

    let (community, wildlife, certification) = match &destination.sustainability_features {
        Some(features) => {
            let waste_points = match features.waste_management {
                WasteTier::Basic => 0.0,
                WasteTier::Intermediate => 20.0,
                WasteTier::Advanced => 35.0,
            };
            let cert_count = features.certifications.len();
            let cert_points = (cert_count as f64 * 5.0).min(25.0);
            let community = clamp_score(40.0 + waste_points + cert_points);

            let wildlife = if features.wildlife_protection { 90.0 } else { 35.0 };

            let certification = match cert_count {
                0 => 20.0,
                1 => 55.0,
                2 => 75.0,
                _ => 90.0,
            };
            (community, wildlife, certification)
        }
        // Nothing recorded: conservative floor, not zero.
        None => (25.0, 30.0, 10.0),
    };

    let weights = ScoreWeights::default();
    let overall = clamp_score(
        carbon * weights.carbon
            + community * weights.community
            + wildlife * weights.wildlife
            + certification * weights.certification,
    );

    Ok(SustainabilityScore {
        destination_id: destination.id.clone(),
        overall_score: overall,
        carbon,
        community,
        wildlife,
        certification,
    })
}

/// Rank lower-impact substitutes for `reference_id`.
///
/// Candidates are active destinations other than the reference whose current
/// utilization against adjusted capacity leaves spare headroom. Destinations
/// without a capacity entry, or that fail scoring, are excluded rather than
/// failing the batch. Ties on score break by destination id ascending so the
/// output is stable across identical snapshots.
pub fn low_impact_alternatives(
    destinations: &[Destination],
    reference_id: &str,
    capacities: &HashMap<String, DynamicCapacityResult>,
    spare_headroom: f64,
    k: usize,
) -> Vec<Destination> {
    let mut ranked: Vec<(f64, &Destination)> = destinations
        .iter()
        .filter(|d| d.is_active && d.id != reference_id)
        .filter_map(|d| {
            let capacity = capacities.get(&d.id)?;
            let utilization = capacity.utilization(d.current_occupancy);
            if utilization >= spare_headroom {
                return None;
            }
            let score = sustainability_score(d).ok()?;
            Some((score.overall_score, d))
        })
        .collect();

    ranked.sort_by(|(score_a, dest_a), (score_b, dest_b)| {
        score_b
            .partial_cmp(score_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| dest_a.id.cmp(&dest_b.id))
    });

    ranked.into_iter().take(k).map(|(_, d)| d.clone()).collect()
}
