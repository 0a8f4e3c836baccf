//! Demo destination fixtures for seeding a fresh server.

use ecoflow_core::models::{
    Destination, Location, SensitivityTier, SustainabilityFeatures, WasteTier,
};

fn destination(
    id: &str,
    name: &str,
    lat: f64,
    lon: f64,
    region: &str,
    max_capacity: u32,
    tier: SensitivityTier,
    features: Option<SustainabilityFeatures>,
) -> Destination {
    Destination {
        id: id.to_string(),
        name: name.to_string(),
        location: Location {
            lat,
            lon,
            region: region.to_string(),
        },
        max_capacity,
        current_occupancy: 0,
        ecological_sensitivity: tier,
        is_active: true,
        sustainability_features: features,
    }
}

/// A small mixed-tier destination set for demos and smoke tests.
pub fn demo_destinations() -> Vec<Destination> {
    vec![
        destination(
            "reef-bay",
            "Reef Bay Marine Park",
            8.52,
            97.21,
            "South Coast",
            400,
            SensitivityTier::Critical,
            Some(SustainabilityFeatures {
                waste_management: WasteTier::Advanced,
                wildlife_protection: true,
                certifications: vec!["green-globe".into(), "blue-flag".into()],
            }),
        ),
        destination(
            "cloud-ridge",
            "Cloud Ridge Trailhead",
            9.11,
            98.04,
            "Highlands",
            1200,
            SensitivityTier::High,
            Some(SustainabilityFeatures {
                waste_management: WasteTier::Intermediate,
                wildlife_protection: true,
                certifications: vec!["earthcheck".into()],
            }),
        ),
        destination(
            "lagoon-walk",
            "Lagoon Boardwalk",
            8.87,
            97.65,
            "South Coast",
            2500,
            SensitivityTier::Medium,
            Some(SustainabilityFeatures {
                waste_management: WasteTier::Intermediate,
                wildlife_protection: false,
                certifications: vec![],
            }),
        ),
        destination(
            "old-town",
            "Old Town Promenade",
            9.30,
            98.39,
            "City",
            6000,
            SensitivityTier::Low,
            None,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_set_is_valid_and_mixed_tier() {
        let destinations = demo_destinations();
        assert!(destinations.iter().all(|d| d.is_valid()));
        let tiers: std::collections::HashSet<_> = destinations
            .iter()
            .map(|d| d.ecological_sensitivity)
            .collect();
        assert!(tiers.len() >= 3);
    }
}
