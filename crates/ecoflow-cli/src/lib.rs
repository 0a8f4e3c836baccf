//! Ecoflow CLI - operator tools for the capacity and alerting system.
//!
//! Binaries:
//! - seed_destinations: load a demo set of destinations into a server
//! - set_occupancy: report a visitor count for one destination
//! - watch_stream: follow the live change stream and print refreshed state

pub mod demo;

pub use demo::demo_destinations;
