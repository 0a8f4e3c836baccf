//! Ecoflow SDK - REST snapshot client plus the reconnecting event-stream
//! observer.

pub mod client;
pub mod stream;

pub use client::{
    CapacitySweepResponse, EcoflowClient, RefreshSummary, StateSnapshot,
};
pub use stream::{ConnectionState, EventObserver, ReconnectPolicy};
