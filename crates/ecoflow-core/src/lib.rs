pub mod alerts;
pub mod capacity;
pub mod classify;
pub mod models;
pub mod scoring;

pub use alerts::{aggregate_alerts, merge_alerts, synthesize_capacity_alerts, UtilizationThresholds};
pub use capacity::{
    CapacityPolicy, CapacityPolicyEngine, PolicyError, SeasonWindow, StrainPolicy,
    TierMultipliers, WeatherFactors,
};
pub use classify::{classify, ThresholdLadder, WeatherThresholds};
pub use models::{
    ActiveFactors, Alert, AlertType, ChangeEvent, Destination, DynamicCapacityResult, Location,
    OccupancySample, SensitivityTier, Severity, SustainabilityFeatures, SustainabilityScore,
    WasteTier, WeatherAlertLevel, WeatherObservation, WeatherReading,
};
pub use scoring::{
    low_impact_alternatives, sustainability_score, ScoreError, ScoreWeights,
    DEFAULT_SPARE_HEADROOM,
};
