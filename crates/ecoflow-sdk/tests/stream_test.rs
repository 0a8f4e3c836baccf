//! Event stream integration tests.
//!
//! Run with: cargo test --test stream_test -- --ignored
//!
//! Note: Requires a running ecoflow server at http://localhost:3000
//! or set ECOFLOW_TEST_URL environment variable.

use std::time::Duration;

use ecoflow_sdk::{EcoflowClient, EventObserver};
use tokio::sync::mpsc;

fn base_url() -> String {
    std::env::var("ECOFLOW_TEST_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

#[tokio::test]
#[ignore] // Run only when server is running
async fn observer_receives_snapshot_on_connect_and_on_event() {
    let base = base_url();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let observer = EventObserver::new(EcoflowClient::new(&base)).unwrap();
    let task = tokio::spawn(async move {
        observer
            .run(move |snapshot| {
                let _ = tx.send(snapshot.alerts.len());
            })
            .await;
    });

    // Initial snapshot arrives right after connect, before any event.
    let first = tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("timed out waiting for initial snapshot");
    assert!(first.is_some());

    // Any state mutation triggers a broadcast and thus another snapshot.
    let client = EcoflowClient::new(&base);
    let destinations = client.fetch_destinations(true).await.unwrap();
    if let Some(dest) = destinations.first() {
        client
            .set_occupancy(&dest.id, dest.current_occupancy + 1)
            .await
            .unwrap();

        let second = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("timed out waiting for event-driven snapshot");
        assert!(second.is_some());
    }

    task.abort();
}
