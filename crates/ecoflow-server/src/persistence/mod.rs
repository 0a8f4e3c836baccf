//! Persistence layer for the ecoflow server.
//!
//! SQLite-backed storage for destinations, weather observations, persisted
//! alerts, and occupancy samples. Hot data is served from DashMap caches in
//! the state store with write-through to these tables.

pub mod alerts;
pub mod db;
pub mod destinations;
pub mod observations;

pub use db::{init_database, Database};
