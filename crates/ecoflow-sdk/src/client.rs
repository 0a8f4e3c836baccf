//! REST client for the ecoflow server.

use anyhow::Result;
use ecoflow_core::models::{
    Alert, Destination, DynamicCapacityResult, SustainabilityScore, WeatherObservation,
};
use serde::Deserialize;

/// Client for the ecoflow REST API.
pub struct EcoflowClient {
    pub(crate) base_url: String,
    pub(crate) client: reqwest::Client,
}

/// One full pull of current server state. Observers re-fetch this whole
/// snapshot on every change event instead of patching incrementally, which
/// makes lost or duplicated events harmless.
#[derive(Debug, Clone, Deserialize)]
pub struct StateSnapshot {
    pub destinations: Vec<Destination>,
    pub capacities: Vec<DynamicCapacityResult>,
    pub alerts: Vec<Alert>,
}

/// Capacity sweep response: per-destination results plus isolated failures.
#[derive(Debug, Clone, Deserialize)]
pub struct CapacitySweepResponse {
    pub results: Vec<DynamicCapacityResult>,
    #[serde(default)]
    pub errors: Vec<CapacityFailure>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CapacityFailure {
    pub destination_id: String,
    pub error: String,
}

/// Manual weather refresh summary.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshSummary {
    pub succeeded: Vec<String>,
    #[serde(default)]
    pub failed: Vec<RefreshFailure>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshFailure {
    pub destination_id: String,
    pub error: String,
}

impl EcoflowClient {
    /// Create a new client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// List destinations.
    pub async fn fetch_destinations(&self, active_only: bool) -> Result<Vec<Destination>> {
        let url = format!(
            "{}/v1/destinations?active_only={}",
            self.base_url, active_only
        );
        let destinations = self.client.get(&url).send().await?.json().await?;
        Ok(destinations)
    }

    /// Dynamic capacity for one destination.
    pub async fn fetch_capacity(&self, destination_id: &str) -> Result<DynamicCapacityResult> {
        let url = format!(
            "{}/v1/destinations/{}/capacity",
            self.base_url, destination_id
        );
        let capacity = self.client.get(&url).send().await?.json().await?;
        Ok(capacity)
    }

    /// Capacity results for all active destinations.
    pub async fn fetch_capacity_sweep(&self) -> Result<CapacitySweepResponse> {
        let url = format!("{}/v1/capacity", self.base_url);
        let sweep = self.client.get(&url).send().await?.json().await?;
        Ok(sweep)
    }

    /// Latest weather observation for one destination, if any was recorded.
    pub async fn fetch_latest_weather(
        &self,
        destination_id: &str,
    ) -> Result<Option<WeatherObservation>> {
        let url = format!(
            "{}/v1/destinations/{}/weather",
            self.base_url, destination_id
        );
        let response = self.client.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let observation = response.json().await?;
        Ok(Some(observation))
    }

    /// Aggregated, priority-sorted alerts.
    pub async fn fetch_alerts(&self) -> Result<Vec<Alert>> {
        let url = format!("{}/v1/alerts", self.base_url);
        let alerts = self.client.get(&url).send().await?.json().await?;
        Ok(alerts)
    }

    /// Sustainability score for one destination.
    pub async fn fetch_score(&self, destination_id: &str) -> Result<SustainabilityScore> {
        let url = format!("{}/v1/destinations/{}/score", self.base_url, destination_id);
        let score = self.client.get(&url).send().await?.json().await?;
        Ok(score)
    }

    /// Low-impact alternatives to a destination.
    pub async fn fetch_alternatives(
        &self,
        destination_id: &str,
        k: usize,
    ) -> Result<Vec<Destination>> {
        let url = format!(
            "{}/v1/destinations/{}/alternatives?k={}",
            self.base_url, destination_id, k
        );
        let alternatives = self.client.get(&url).send().await?.json().await?;
        Ok(alternatives)
    }

    /// Create or update a destination.
    pub async fn upsert_destination(&self, destination: &Destination) -> Result<()> {
        let url = format!("{}/v1/destinations", self.base_url);
        let response = self.client.post(&url).json(destination).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("Failed to upsert destination: {}", response.status());
        }
        Ok(())
    }

    /// Report a new occupancy count for a destination.
    pub async fn set_occupancy(&self, destination_id: &str, occupancy: u32) -> Result<()> {
        let url = format!(
            "{}/v1/destinations/{}/occupancy",
            self.base_url, destination_id
        );
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "occupancy": occupancy }))
            .send()
            .await?;
        if !response.status().is_success() {
            anyhow::bail!("Failed to set occupancy: {}", response.status());
        }
        Ok(())
    }

    /// Trigger a manual weather re-evaluation across all active destinations.
    pub async fn refresh_weather(&self) -> Result<RefreshSummary> {
        let url = format!("{}/v1/weather/refresh", self.base_url);
        let summary = self.client.post(&url).send().await?.json().await?;
        Ok(summary)
    }

    /// Pull the full current state in one round: destinations, capacity
    /// results, and aggregated alerts.
    pub async fn fetch_snapshot(&self) -> Result<StateSnapshot> {
        let destinations = self.fetch_destinations(true).await?;
        let sweep = self.fetch_capacity_sweep().await?;
        let alerts = self.fetch_alerts().await?;
        Ok(StateSnapshot {
            destinations,
            capacities: sweep.results,
            alerts,
        })
    }
}
