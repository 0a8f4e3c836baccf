//! In-memory state store with SQLite write-through.
//!
//! DashMap caches serve reads; mutations persist first, then update the
//! cache, then broadcast a change event. Capacity results and aggregated
//! alerts are never cached: they are recomputed from inputs on every read so
//! they can't go stale independently of their inputs.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use dashmap::DashMap;
use ecoflow_core::alerts::aggregate_alerts;
use ecoflow_core::capacity::{CapacityPolicyEngine, PolicyError};
use ecoflow_core::models::{
    Alert, ChangeEvent, Destination, DynamicCapacityResult, OccupancySample, WeatherObservation,
};
use tokio::sync::broadcast;

use crate::config::Config;
use crate::persistence::{self, Database};

/// Application state - thread-safe store for destinations, observations,
/// alerts, and the change broadcast channel.
pub struct AppState {
    config: Config,
    engine: CapacityPolicyEngine,
    db: Database,
    destinations: DashMap<String, Destination>,
    latest_observations: DashMap<String, WeatherObservation>,
    active_alerts: DashMap<String, Alert>,
    occupancy_history: DashMap<String, Vec<OccupancySample>>,
    pub tx: broadcast::Sender<ChangeEvent>,
}

/// Per-destination outcome of a full capacity sweep: successes plus isolated
/// validation failures.
#[derive(Debug, Default, serde::Serialize)]
pub struct CapacitySweep {
    pub results: Vec<DynamicCapacityResult>,
    pub errors: Vec<CapacityFailure>,
}

#[derive(Debug, serde::Serialize)]
pub struct CapacityFailure {
    pub destination_id: String,
    pub error: String,
}

impl AppState {
    /// Initialize the store: open the database and warm the caches.
    pub async fn new(config: Config) -> Result<Arc<Self>> {
        let db = persistence::init_database(&config.database_path, config.database_max_connections)
            .await?;
        let (tx, _) = broadcast::channel(config.ws_channel_capacity);
        let engine = CapacityPolicyEngine::new(config.policy.clone());

        let state = Self {
            config,
            engine,
            db,
            destinations: DashMap::new(),
            latest_observations: DashMap::new(),
            active_alerts: DashMap::new(),
            occupancy_history: DashMap::new(),
            tx,
        };
        state.warm_caches().await?;
        Ok(Arc::new(state))
    }

    async fn warm_caches(&self) -> Result<()> {
        let pool = self.db.pool();

        let destinations = persistence::destinations::load_all_destinations(pool).await?;
        let history_start =
            Utc::now() - chrono::Duration::days(self.config.occupancy_history_days);
        for destination in destinations {
            let samples = persistence::destinations::load_occupancy_samples(
                pool,
                &destination.id,
                history_start,
            )
            .await?;
            self.occupancy_history
                .insert(destination.id.clone(), samples);
            self.destinations.insert(destination.id.clone(), destination);
        }

        for observation in persistence::observations::load_latest_observations(pool).await? {
            self.latest_observations
                .insert(observation.destination_id.clone(), observation);
        }

        for alert in persistence::alerts::load_active_alerts(pool).await? {
            self.active_alerts.insert(alert.id.clone(), alert);
        }

        tracing::info!(
            "Warmed caches: {} destinations, {} observations, {} alerts",
            self.destinations.len(),
            self.latest_observations.len(),
            self.active_alerts.len()
        );
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn engine(&self) -> &CapacityPolicyEngine {
        &self.engine
    }

    /// Publish a change event to all subscribed observers. Errors only when
    /// nobody is listening, which is not a fault.
    pub fn publish(&self, event: ChangeEvent) {
        let _ = self.tx.send(event);
    }

    // ========== DESTINATIONS ==========

    pub fn get_destination(&self, id: &str) -> Option<Destination> {
        self.destinations.get(id).map(|r| r.value().clone())
    }

    pub fn get_destinations(&self, active_only: bool) -> Vec<Destination> {
        let mut all: Vec<Destination> = self
            .destinations
            .iter()
            .filter(|r| !active_only || r.value().is_active)
            .map(|r| r.value().clone())
            .collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    pub async fn upsert_destination(&self, destination: Destination) -> Result<()> {
        persistence::destinations::upsert_destination(self.db.pool(), &destination).await?;
        self.destinations
            .insert(destination.id.clone(), destination);
        self.publish(ChangeEvent::CapacityUpdate);
        Ok(())
    }

    /// Set occupancy (status-change collaborator surface). Appends a history
    /// sample for the strain factor and broadcasts a capacity update.
    pub async fn set_occupancy(&self, id: &str, occupancy: u32) -> Result<Option<Destination>> {
        if !self.destinations.contains_key(id) {
            return Ok(None);
        }

        let sample = OccupancySample {
            recorded_at: Utc::now(),
            occupancy,
        };
        persistence::destinations::set_occupancy(self.db.pool(), id, occupancy).await?;
        persistence::destinations::append_occupancy_sample(self.db.pool(), id, &sample).await?;

        let updated = self.destinations.get_mut(id).map(|mut entry| {
            entry.current_occupancy = occupancy;
            entry.clone()
        });

        let horizon =
            Utc::now() - chrono::Duration::days(self.config.occupancy_history_days);
        let mut history = self.occupancy_history.entry(id.to_string()).or_default();
        history.insert(0, sample);
        history.retain(|s| s.recorded_at >= horizon);
        drop(history);

        self.publish(ChangeEvent::CapacityUpdate);
        Ok(updated)
    }

    // ========== WEATHER ==========

    pub fn latest_observation(&self, destination_id: &str) -> Option<WeatherObservation> {
        self.latest_observations
            .get(destination_id)
            .map(|r| r.value().clone())
    }

    /// Write-through record of a classified observation. The cache only moves
    /// forward: a replayed older reading persists (idempotent upsert) but
    /// cannot clobber a newer latest-observation.
    pub async fn record_observation(&self, observation: WeatherObservation) -> Result<()> {
        persistence::observations::append_observation(self.db.pool(), &observation).await?;

        match self
            .latest_observations
            .entry(observation.destination_id.clone())
        {
            dashmap::mapref::entry::Entry::Occupied(mut entry) => {
                if observation.recorded_at >= entry.get().recorded_at {
                    entry.insert(observation);
                }
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(observation);
            }
        }
        Ok(())
    }

    // ========== ALERTS ==========

    pub async fn append_alert(&self, alert: Alert) -> Result<()> {
        persistence::alerts::append_alert(self.db.pool(), &alert).await?;
        if alert.is_active {
            self.active_alerts.insert(alert.id.clone(), alert);
        } else {
            self.active_alerts.remove(&alert.id);
        }
        Ok(())
    }

    /// Replace the destination's weather alert with the latest classification
    /// outcome: the previous cycle's alert is deactivated and, when the new
    /// level warrants one, the fresh alert is appended.
    pub async fn sync_weather_alert(
        &self,
        destination_id: &str,
        alert: Option<Alert>,
    ) -> Result<()> {
        let cleared =
            persistence::alerts::deactivate_weather_alerts(self.db.pool(), destination_id).await?;
        for id in cleared {
            self.active_alerts.remove(&id);
        }
        if let Some(alert) = alert {
            self.append_alert(alert).await?;
        }
        Ok(())
    }

    fn persisted_alerts_most_recent_first(&self) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = self
            .active_alerts
            .iter()
            .map(|r| r.value().clone())
            .collect();
        // Most-recent-first; id breaks exact timestamp ties deterministically.
        alerts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
        alerts
    }

    // ========== DERIVED STATE ==========

    /// Dynamic capacity for one destination, from current inputs.
    pub fn capacity_for(&self, destination: &Destination) -> Result<DynamicCapacityResult, PolicyError> {
        let observation = self.latest_observation(&destination.id);
        let history = self
            .occupancy_history
            .get(&destination.id)
            .map(|r| r.value().clone())
            .unwrap_or_default();
        self.engine.dynamic_capacity(
            destination,
            observation.as_ref(),
            Utc::now().date_naive(),
            &history,
        )
    }

    /// Capacity results for all active destinations. A misconfigured
    /// destination lands in `errors`; it never fails the sweep.
    pub fn capacity_sweep(&self) -> CapacitySweep {
        let mut sweep = CapacitySweep::default();
        for destination in self.get_destinations(true) {
            match self.capacity_for(&destination) {
                Ok(result) => sweep.results.push(result),
                Err(err) => {
                    tracing::warn!("Skipping {} in capacity sweep: {}", destination.id, err);
                    sweep.errors.push(CapacityFailure {
                        destination_id: destination.id.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }
        sweep
    }

    /// Aggregated alert list: persisted + computed, deduplicated,
    /// priority-sorted.
    pub fn aggregated_alerts(&self) -> Vec<Alert> {
        let sweep = self.capacity_sweep();
        let occupancy: HashMap<String, u32> = self
            .get_destinations(true)
            .into_iter()
            .map(|d| (d.id, d.current_occupancy))
            .collect();
        aggregate_alerts(
            self.persisted_alerts_most_recent_first(),
            &sweep.results,
            &occupancy,
            self.config.utilization,
            Utc::now(),
        )
    }
}
