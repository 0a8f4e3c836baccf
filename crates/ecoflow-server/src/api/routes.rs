//! REST API routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::api::ws;
use crate::ingest::{self, provider::OpenMeteoProvider};
use crate::state::AppState;
use ecoflow_core::models::{Alert, ChangeEvent, Destination, DynamicCapacityResult};
use ecoflow_core::scoring::{low_impact_alternatives, sustainability_score};

/// Create the API router.
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/v1/destinations", get(list_destinations))
        .route("/v1/destinations", post(create_destination))
        .route("/v1/destinations/:id", get(get_destination))
        .route("/v1/destinations/:id/occupancy", post(set_occupancy))
        .route("/v1/destinations/:id/capacity", get(get_capacity))
        .route("/v1/destinations/:id/weather", get(get_latest_weather))
        .route("/v1/destinations/:id/score", get(get_score))
        .route("/v1/destinations/:id/alternatives", get(get_alternatives))
        .route("/v1/capacity", get(list_capacity))
        .route("/v1/alerts", get(list_alerts))
        .route("/v1/alerts", post(create_alert))
        .route("/v1/weather/refresh", post(refresh_weather))
        // WebSocket streaming
        .route("/v1/ws", get(ws::ws_handler))
}

// === Request/Response types ===

#[derive(Debug, Deserialize)]
pub struct ListDestinationsQuery {
    /// Restrict to active destinations.
    pub active_only: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct OccupancyRequest {
    pub occupancy: u32,
}

#[derive(Debug, Deserialize)]
pub struct AlternativesQuery {
    /// Number of alternatives to return, default 2.
    pub k: Option<usize>,
}

fn bad_request(message: &str) -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn not_found(id: &str) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Destination not found", "destination_id": id })),
    )
}

// === Handlers ===

async fn list_destinations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListDestinationsQuery>,
) -> Json<Vec<Destination>> {
    Json(state.get_destinations(query.active_only.unwrap_or(false)))
}

async fn get_destination(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Destination>, (StatusCode, Json<serde_json::Value>)> {
    state.get_destination(&id).map(Json).ok_or_else(|| not_found(&id))
}

async fn create_destination(
    State(state): State<Arc<AppState>>,
    Json(destination): Json<Destination>,
) -> impl IntoResponse {
    let errors = destination.validate();
    if !errors.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid destination", "details": errors })),
        );
    }

    let id = destination.id.clone();
    match state.upsert_destination(destination).await {
        Ok(()) => (
            StatusCode::CREATED,
            Json(json!({ "destination_id": id })),
        ),
        Err(err) => {
            tracing::error!("Failed to persist destination {}: {}", id, err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to store destination" })),
            )
        }
    }
}

async fn set_occupancy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<OccupancyRequest>,
) -> impl IntoResponse {
    match state.set_occupancy(&id, request.occupancy).await {
        Ok(Some(updated)) => (StatusCode::OK, Json(json!(updated))),
        Ok(None) => {
            let (status, body) = not_found(&id);
            (status, body)
        }
        Err(err) => {
            tracing::error!("Failed to update occupancy for {}: {}", id, err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to update occupancy" })),
            )
        }
    }
}

async fn get_capacity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DynamicCapacityResult>, (StatusCode, Json<serde_json::Value>)> {
    let destination = state.get_destination(&id).ok_or_else(|| not_found(&id))?;
    state
        .capacity_for(&destination)
        .map(Json)
        .map_err(|err| bad_request(&err.to_string()))
}

async fn get_latest_weather(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ecoflow_core::models::WeatherObservation>, (StatusCode, Json<serde_json::Value>)>
{
    if state.get_destination(&id).is_none() {
        return Err(not_found(&id));
    }
    state.latest_observation(&id).map(Json).ok_or((
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "No observation recorded yet", "destination_id": id })),
    ))
}

async fn list_capacity(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let sweep = state.capacity_sweep();
    Json(json!({
        "results": sweep.results,
        "errors": sweep.errors,
    }))
}

async fn list_alerts(State(state): State<Arc<AppState>>) -> Json<Vec<Alert>> {
    Json(state.aggregated_alerts())
}

async fn create_alert(
    State(state): State<Arc<AppState>>,
    Json(alert): Json<Alert>,
) -> impl IntoResponse {
    if alert.title.trim().is_empty() {
        return bad_request("Alert title is required");
    }

    let mut alert = alert;
    if alert.id.trim().is_empty() {
        alert.id = uuid::Uuid::new_v4().to_string();
    }
    let id = alert.id.clone();
    match state.append_alert(alert).await {
        Ok(()) => (StatusCode::CREATED, Json(json!({ "alert_id": id }))),
        Err(err) => {
            tracing::error!("Failed to persist alert {}: {}", id, err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to store alert" })),
            )
        }
    }
}

async fn get_score(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ecoflow_core::models::SustainabilityScore>, (StatusCode, Json<serde_json::Value>)>
{
    let destination = state.get_destination(&id).ok_or_else(|| not_found(&id))?;
    sustainability_score(&destination)
        .map(Json)
        .map_err(|err| bad_request(&err.to_string()))
}

async fn get_alternatives(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<AlternativesQuery>,
) -> Result<Json<Vec<Destination>>, (StatusCode, Json<serde_json::Value>)> {
    if state.get_destination(&id).is_none() {
        return Err(not_found(&id));
    }

    let destinations = state.get_destinations(true);
    let sweep = state.capacity_sweep();
    let capacities: HashMap<String, DynamicCapacityResult> = sweep
        .results
        .into_iter()
        .map(|r| (r.destination_id.clone(), r))
        .collect();

    Ok(Json(low_impact_alternatives(
        &destinations,
        &id,
        &capacities,
        state.config().spare_headroom,
        query.k.unwrap_or(2),
    )))
}

/// Manual weather re-evaluation: one on-demand ingest cycle across all
/// active destinations. Idempotent; reports partial failures.
async fn refresh_weather(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    state.publish(ChangeEvent::WeatherUpdateAvailable);

    let provider = OpenMeteoProvider::new(
        state.config().weather_url.clone(),
        Duration::from_secs(state.config().ingest_timeout_s),
    );
    let outcome = ingest::ingest_cycle(&state, &provider).await;

    if outcome.wrote_observations() {
        state.publish(ChangeEvent::WeatherUpdate);
    }

    Json(json!({
        "succeeded": outcome.succeeded,
        "failed": outcome.failed,
    }))
}
